//! Headset driver implementations and the runtime driver selection façade.
//!
//! The `Headset` type selects exactly one driver at startup from an ordered
//! candidate list and forwards every public call to it; when no candidate
//! initializes (no runtime installed, no HMD plugged in), every call returns a
//! documented neutral default so applications run unchanged on headset-less
//! machines. Vendor backends live under `api::<vendor>` behind Cargo
//! features.

#[macro_use]
extern crate log;

pub mod api;
mod headset;

pub use crate::headset::Headset;
pub use headset_api::*;
