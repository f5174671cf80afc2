use crate::controller::{ControllerAxis, ControllerButton, ControllerHand, ControllerHandle};
use crate::error::HeadsetError;
use crate::event::HeadsetEvent;
use crate::eye::Eye;
use crate::frame::RenderPass;
use crate::graphics::Graphics;
use crate::headset_type::HeadsetType;
use crate::origin::HeadsetOrigin;
use crate::platform::Platform;
use crate::pose::Pose;

/// Configuration consumed once at subsystem init.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub struct HeadsetOptions {
    /// Ordered driver name tokens. Empty means the built-in default order.
    /// Unrecognized tokens are skipped with a warning.
    pub drivers: Vec<String>,
    /// Head height in meters, added to poses by drivers with a head-locked
    /// origin so y = 0 stays on the floor.
    pub offset: f32,
    pub msaa: u32,
}

impl Default for HeadsetOptions {
    fn default() -> HeadsetOptions {
        HeadsetOptions {
            drivers: Vec::new(),
            offset: 1.7,
            msaa: 4,
        }
    }
}

/// Collaborators lent to a driver for the operations that need them.
pub struct DriverContext<'a> {
    pub graphics: &'a mut dyn Graphics,
    pub platform: &'a mut dyn Platform,
}

/// The contract every vendor backend implements.
///
/// One instance is selected at subsystem init and stays the sole active driver
/// for the life of the process (driver death downgrades to no driver, it never
/// re-selects). All calls happen on the render thread; implementations are
/// free to block in `render_to` on vendor frame timing.
///
/// Every query on a driver whose `initialize` failed (or that has been
/// destroyed) returns the neutral value documented on the method rather than
/// erroring, so a headset-less system can be polled safely.
pub trait HeadsetDriver: Send {
    /// Brings up the vendor runtime and session. Must be side-effect-free on
    /// failure; a missing runtime or HMD is `Err(Unavailable)`, which makes
    /// the façade try the next candidate.
    fn initialize(
        &mut self,
        ctx: &mut DriverContext,
        options: &HeadsetOptions,
    ) -> Result<(), HeadsetError>;

    /// Releases the vendor session, render targets and the controller
    /// registry. Idempotent, and safe to call after a failed `initialize`.
    fn destroy(&mut self, ctx: &mut DriverContext);

    fn headset_type(&self) -> HeadsetType;

    fn origin_type(&self) -> HeadsetOrigin;

    /// Human-readable product name. Empty when unavailable.
    fn name(&self) -> String;

    /// Whether the headset is on the user's head. Rendering proceeds either
    /// way; only this query reflects the physical state.
    fn is_mounted(&self) -> bool;

    fn is_mirrored(&self) -> bool;

    fn set_mirrored(&mut self, mirrored: bool);

    /// Total render target size in pixels (both eyes). (0, 0) when unknown.
    fn display_dimensions(&self) -> (u32, u32);

    fn clip_distance(&self) -> (f32, f32);

    /// Takes effect on the next frame's projection, never retroactively.
    fn set_clip_distance(&mut self, near: f32, far: f32);

    /// Play area size in meters (width, depth). (0, 0) when unsupported.
    fn bounds_dimensions(&self) -> (f32, f32);

    /// Play area boundary polygon. Empty when unsupported.
    fn bounds_geometry(&self) -> Vec<[f32; 3]> {
        Vec::new()
    }

    /// Head pose relative to the tracking origin, engine conventions.
    fn pose(&self) -> Pose;

    fn eye_pose(&self, eye: Eye) -> Pose;

    fn velocity(&self) -> [f32; 3];

    fn angular_velocity(&self) -> [f32; 3];

    /// Re-establishes the tracking origin at the current head pose.
    fn recenter(&mut self) {}

    /// Connected controller handles, in connection order.
    fn controllers(&self) -> Vec<ControllerHandle>;

    fn controller_count(&self) -> usize {
        self.controllers().len()
    }

    fn controller_is_connected(&self, controller: ControllerHandle) -> bool;

    fn controller_hand(&self, controller: ControllerHandle) -> ControllerHand;

    fn controller_pose(&self, controller: ControllerHandle) -> Pose;

    fn controller_velocity(&self, _controller: ControllerHandle) -> [f32; 3] {
        [0.0; 3]
    }

    /// Axis value in [-1, 1] (triggers in [0, 1]). Zero for stale handles or
    /// unsupported axes.
    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32;

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool;

    fn controller_is_touched(&self, controller: ControllerHandle, button: ControllerButton)
        -> bool;

    /// Haptic pulse. `power` in [0, 1]; ignored where the vendor only supports
    /// fixed-strength pulses. No-op for stale handles or duration <= 0.
    fn controller_vibrate(&mut self, controller: ControllerHandle, duration: f32, power: f32);

    /// Renders one full stereo frame: snapshot poses, run the per-eye loop
    /// invoking `callback` with an explicit frame context, submit to the
    /// compositor (or blit to the window), then mirror if enabled.
    ///
    /// Recoverable conditions (lost swap chain, submit failure) are handled
    /// inside: the frame is skipped whole, a `FrameSkipped` event is queued
    /// and `Ok` is returned. `Err(DriverLost)` means the vendor session is
    /// gone for good.
    fn render_to(
        &mut self,
        ctx: &mut DriverContext,
        callback: &mut dyn FnMut(&RenderPass),
    ) -> Result<(), HeadsetError>;

    /// Per-frame housekeeping: vendor event pump, input state refresh, motion
    /// integration. No-op for drivers that need none.
    fn update(&mut self, _ctx: &mut DriverContext, _dt: f32) {}

    /// Drains lifecycle events accumulated since the last call.
    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        Vec::new()
    }
}
