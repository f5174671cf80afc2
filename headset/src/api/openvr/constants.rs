//! Interface versions this driver was written against.

pub const IVRSYSTEM_VERSION: &str = "IVRSystem_019";
pub const IVRCOMPOSITOR_VERSION: &str = "IVRCompositor_022";
pub const IVRCHAPERONE_VERSION: &str = "IVRChaperone_003";

/// Pose array size handed to the compositor; index 0 is the HMD.
pub const MAX_POSES: usize = 16;
