use headset_api::HeadsetDriver;

#[cfg(feature = "fake")]
mod fake;
#[cfg(feature = "fake")]
pub use self::fake::FakeDriver;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use self::mock::{MockControl, MockDriver, MockVendorEvent};

#[cfg(feature = "oculusmobile")]
mod oculusmobile;
#[cfg(feature = "oculusmobile")]
pub use self::oculusmobile::{bridge, OculusMobileDriver};

#[cfg(feature = "openvr")]
mod openvr;
#[cfg(feature = "openvr")]
pub use self::openvr::OpenVRDriver;

#[cfg(all(feature = "oculus", target_os = "windows"))]
mod oculus;
#[cfg(all(feature = "oculus", target_os = "windows"))]
pub use self::oculus::OculusDriver;

/// Built-in candidate order: real hardware drivers first, the fake desktop
/// driver as the always-available fallback.
pub const DEFAULT_DRIVERS: &[&str] = &["openvr", "oculus", "oculusmobile", "fake"];

/// Builds a driver for a config token. `None` for tokens that are unknown or
/// whose backend is not compiled in.
pub fn create_driver(name: &str) -> Option<Box<dyn HeadsetDriver>> {
    match name {
        #[cfg(feature = "openvr")]
        "openvr" => Some(Box::new(openvr::OpenVRDriver::new())),
        #[cfg(all(feature = "oculus", target_os = "windows"))]
        "oculus" => Some(Box::new(oculus::OculusDriver::new())),
        #[cfg(feature = "oculusmobile")]
        "oculusmobile" => Some(Box::new(oculusmobile::OculusMobileDriver::new())),
        #[cfg(feature = "fake")]
        "fake" => Some(Box::new(fake::FakeDriver::new())),
        #[cfg(feature = "mock")]
        "mock" => Some(Box::new(mock::MockDriver::new().0)),
        _ => None,
    }
}
