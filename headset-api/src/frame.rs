use crate::eye::Eye;
use crate::graphics::CanvasHandle;

/// Pixel rectangle inside a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Everything needed to draw one eye: which eye, where, and with which
/// matrices. Matrices are column-major, right-handed.
#[derive(Debug, Clone, Copy)]
pub struct EyeView {
    pub eye: Eye,
    pub view: [f32; 16],
    pub projection: [f32; 16],
    pub viewport: Viewport,
}

/// The explicit frame context handed to the application's render callback.
///
/// Multi-pass drivers invoke the callback once per eye with a single entry in
/// `views`; single-pass drivers invoke it once with both entries and expect
/// the application to draw each viewport. `canvas` is `None` when the target
/// is the window's own framebuffer.
#[derive(Debug)]
pub struct RenderPass<'a> {
    pub canvas: Option<CanvasHandle>,
    pub views: &'a [EyeView],
}

impl<'a> RenderPass<'a> {
    pub fn is_single_pass(&self) -> bool {
        self.views.len() == 2
    }
}
