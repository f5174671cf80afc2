//! Glue between the mobile host activity and the driver.
//!
//! On mobile the control flow is inverted: the host activity owns the vendor
//! session and the render loop, and feeds this bridge once per frame from the
//! render thread (`on_update`). Activity lifecycle callbacks (`on_pause`,
//! `on_resume`) arrive on a different thread; they only flip one atomic flag,
//! which the driver folds into its per-frame state machine on the render
//! thread. The bridge never calls back into the engine.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Hardware family reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDevice {
    Gear,
    Go,
}

/// Controller button bits in `BridgeUpdateData::{buttons_down, buttons_touched}`.
pub const BUTTON_MENU: u32 = 1 << 0;
pub const BUTTON_SHOULDER: u32 = 1 << 1;
pub const BUTTON_TOUCHPAD: u32 = 1 << 2;

/// Raw touchpad coordinate range of the Go controller.
pub const TOUCHPAD_RANGE: f32 = 320.0;

#[derive(Debug, Clone, Copy)]
pub struct BridgePose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Default for BridgePose {
    fn default() -> BridgePose {
        BridgePose {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeVelocity {
    pub linear: [f32; 3],
    pub angular: [f32; 3],
}

/// Static configuration delivered once, before the first frame.
#[derive(Debug, Clone, Copy)]
pub struct BridgeInitData {
    pub eye_width: u32,
    pub eye_height: u32,
    pub device: BridgeDevice,
}

/// Per-frame data from the vendor runtime, delivered on the render thread.
///
/// Matrices are in the vendor's row-major layout; the driver converts them at
/// this boundary. `trackpad` is in the controller's raw coordinate range.
#[derive(Debug, Clone)]
pub struct BridgeUpdateData {
    pub display_time: f64,
    pub head_pose: BridgePose,
    pub head_velocity: BridgeVelocity,
    pub hand_pose: BridgePose,
    pub hand_velocity: BridgeVelocity,
    pub has_controller: bool,
    pub buttons_down: u32,
    pub buttons_touched: u32,
    pub trackpad: [f32; 2],
    pub eye_views: [[[f32; 4]; 4]; 2],
    pub eye_projections: [[[f32; 4]; 4]; 2],
    pub eye_framebuffers: [u64; 2],
}

const LIFECYCLE_NONE: u8 = 0;
const LIFECYCLE_PAUSE: u8 = 1;
const LIFECYCLE_RESUME: u8 = 2;

struct BridgeShared {
    // Written from the activity thread, consumed once per frame on the
    // render thread. The latest request wins.
    lifecycle: AtomicU8,
    inner: Mutex<BridgeInner>,
}

#[derive(Default)]
struct BridgeInner {
    init: Option<BridgeInitData>,
    update: Option<BridgeUpdateData>,
}

/// Handle the host activity keeps to feed the driver.
#[derive(Clone)]
pub struct Bridge(Arc<BridgeShared>);

impl Bridge {
    pub fn new() -> Bridge {
        Bridge(Arc::new(BridgeShared {
            lifecycle: AtomicU8::new(LIFECYCLE_NONE),
            inner: Mutex::new(BridgeInner::default()),
        }))
    }

    pub fn on_init(&self, data: BridgeInitData) {
        self.0.lock_inner().init = Some(data);
    }

    /// Render thread: latest vendor frame data.
    pub fn on_update(&self, data: BridgeUpdateData) {
        self.0.lock_inner().update = Some(data);
    }

    /// Activity thread: the app is being paused.
    pub fn on_pause(&self) {
        self.0.lifecycle.store(LIFECYCLE_PAUSE, Ordering::Release);
    }

    /// Activity thread: the app resumed.
    pub fn on_resume(&self) {
        self.0.lifecycle.store(LIFECYCLE_RESUME, Ordering::Release);
    }

    pub(crate) fn init_data(&self) -> Option<BridgeInitData> {
        self.0.lock_inner().init
    }

    pub(crate) fn take_update(&self) -> Option<BridgeUpdateData> {
        self.0.lock_inner().update.take()
    }

    /// Consumes the pending lifecycle request, if any.
    pub(crate) fn take_lifecycle(&self) -> LifecycleRequest {
        match self.0.lifecycle.swap(LIFECYCLE_NONE, Ordering::Acquire) {
            LIFECYCLE_PAUSE => LifecycleRequest::Pause,
            LIFECYCLE_RESUME => LifecycleRequest::Resume,
            _ => LifecycleRequest::None,
        }
    }
}

impl BridgeShared {
    fn lock_inner(&self) -> std::sync::MutexGuard<BridgeInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleRequest {
    None,
    Pause,
    Resume,
}

static INSTALLED: Mutex<Option<Bridge>> = Mutex::new(None);

/// Registers the bridge the driver will attach to at `initialize`. Called by
/// the host before the headset subsystem starts; without it the mobile driver
/// reports itself unavailable and selection falls through to the next
/// candidate.
pub fn install(bridge: Bridge) {
    *INSTALLED.lock().unwrap() = Some(bridge);
}

pub fn uninstall() {
    *INSTALLED.lock().unwrap() = None;
}

pub fn installed() -> Option<Bridge> {
    INSTALLED.lock().unwrap().clone()
}
