slotmap::new_key_type! {
    /// Generational key identifying a tracked controller.
    ///
    /// Handles never alias: once a controller disconnects, its key resolves to
    /// nothing forever, even if the vendor later reuses the underlying device
    /// index. Accessors taking a stale handle return neutral values.
    pub struct ControllerHandle;
}

/// Hand assignment reported by the vendor runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum ControllerHand {
    Unknown,
    Left,
    Right,
}

impl Default for ControllerHand {
    fn default() -> ControllerHand {
        ControllerHand::Unknown
    }
}

/// Analog inputs common to the supported controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum ControllerAxis {
    Trigger,
    Grip,
    TouchpadX,
    TouchpadY,
}

/// Digital inputs common to the supported controllers. Vendor buttons that do
/// not map onto this set are reported as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum ControllerButton {
    System,
    Menu,
    Grip,
    Trigger,
    Touchpad,
    A,
    B,
    X,
    Y,
    Unknown,
}

/// Registry entry for one tracked controller.
///
/// `device_index` is the vendor's native identifier (tracked-device index,
/// hand index or bridge id); it never crosses the driver boundary.
#[derive(Debug, Clone, Copy)]
pub struct Controller {
    pub device_index: u32,
    pub hand: ControllerHand,
    pub connected: bool,
}
