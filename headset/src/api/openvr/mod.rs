mod constants;
mod driver;

pub use self::driver::OpenVRDriver;
