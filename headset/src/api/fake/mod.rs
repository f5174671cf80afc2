mod driver;

pub use self::driver::FakeDriver;
