use crate::controller::{ControllerButton, ControllerHandle};

/// Lifecycle events surfaced by a driver (or by the façade itself) for the
/// application's event queue.
///
/// Recoverable frame conditions are events, never errors: a lost swap chain
/// becomes `FrameSkipped` and rendering resumes on its own if the device
/// recovers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadsetEvent {
    /// The runtime asked the application to quit.
    Quit,
    /// Input focus was captured from or returned to the application.
    Focus(bool),
    /// The proximity sensor reported the headset being put on or taken off.
    Mounted(bool),
    ControllerAdded(ControllerHandle),
    ControllerRemoved(ControllerHandle),
    ControllerPressed(ControllerHandle, ControllerButton),
    ControllerReleased(ControllerHandle, ControllerButton),
    /// Positional tracking dropped out; poses freeze or fall back to
    /// orientation-only until it returns.
    TrackingLost,
    /// The tracking origin was re-established (user or runtime recenter).
    Recentered,
    /// A frame was dropped without compositor submission.
    FrameSkipped,
    /// The vendor session died; the subsystem is now driverless.
    DriverLost,
}
