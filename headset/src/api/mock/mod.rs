mod driver;

pub use self::driver::{MockControl, MockDriver, MockVendorEvent};
