//! Headset abstraction API.
//!
//! This crate holds everything a headset driver implementation and its host
//! application share: the `HeadsetDriver` contract, the pose/controller data
//! model, lifecycle events, the collaborator traits (`Graphics`, `Platform`)
//! and the matrix/quaternion utilities used to convert vendor-native
//! transforms into the engine convention (column-major 4x4, right-handed,
//! meters/radians).

pub mod controller;
pub mod driver;
pub mod error;
pub mod event;
pub mod eye;
pub mod frame;
pub mod graphics;
pub mod headset_type;
pub mod origin;
pub mod platform;
pub mod pose;
pub mod registry;
pub mod utils;

pub use controller::{Controller, ControllerAxis, ControllerButton, ControllerHand, ControllerHandle};
pub use driver::{DriverContext, HeadsetDriver, HeadsetOptions};
pub use error::HeadsetError;
pub use event::HeadsetEvent;
pub use eye::Eye;
pub use frame::{EyeView, RenderPass, Viewport};
pub use graphics::{CanvasDesc, CanvasHandle, Graphics};
pub use headset_type::HeadsetType;
pub use origin::HeadsetOrigin;
pub use platform::{Key, MouseButton, MouseMode, Platform};
pub use pose::Pose;
pub use registry::ControllerRegistry;
