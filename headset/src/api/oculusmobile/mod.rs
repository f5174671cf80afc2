pub mod bridge;
mod driver;

pub use self::driver::OculusMobileDriver;
