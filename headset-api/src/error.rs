use thiserror::Error;

/// Errors crossing the driver boundary.
///
/// `Unavailable` and `InitFailed` only ever occur during driver selection and
/// drive fallback to the next candidate. `DriverLost` is the one mid-session
/// error: the vendor session died and the façade downgrades to the driverless
/// state. Transient frame conditions (lost swap chain, compositor timeout)
/// are not errors; they surface as `HeadsetEvent::FrameSkipped`.
#[derive(Debug, Error)]
pub enum HeadsetError {
    /// The vendor runtime is not installed or no HMD is present.
    #[error("headset runtime unavailable: {0}")]
    Unavailable(String),

    /// The runtime is present but refused to start a session.
    #[error("headset driver failed to initialize: {0}")]
    InitFailed(String),

    /// The vendor session was destroyed out from under us.
    #[error("headset driver lost: {0}")]
    DriverLost(String),

    /// A call that requires an initialized driver reached one that has none.
    /// This is a caller bug; the façade never forwards it.
    #[error("headset subsystem not initialized")]
    NotInitialized,
}
