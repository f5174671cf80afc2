mod driver;

pub use self::driver::OculusDriver;
