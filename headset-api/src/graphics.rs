use crate::error::HeadsetError;

/// Opaque identifier for a render target owned by the graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasHandle(pub u64);

/// Parameters for an offscreen render target.
#[derive(Debug, Clone, Copy)]
pub struct CanvasDesc {
    pub width: u32,
    pub height: u32,
    /// Double-wide layout with one viewport per eye.
    pub stereo: bool,
    pub depth: bool,
    pub msaa: u32,
}

/// The GPU backend as seen from the headset subsystem.
///
/// Drivers use exactly this surface: create an offscreen canvas to render
/// into, wrap a texture the vendor runtime already owns (swap-chain images),
/// resolve multisampling, fetch the native texture id for compositor
/// submission, and blit a finished canvas to the window for mirroring.
/// Everything else about rendering belongs to the application's draw callback.
pub trait Graphics {
    fn create_canvas(&mut self, desc: &CanvasDesc) -> Result<CanvasHandle, HeadsetError>;

    /// Wraps a vendor-owned native texture (e.g. a swap-chain image) in a
    /// canvas handle. The backend must not take ownership.
    fn import_texture(&mut self, native: u64, width: u32, height: u32) -> CanvasHandle;

    fn destroy_canvas(&mut self, canvas: CanvasHandle);

    /// Native texture id backing the canvas, for handing to a compositor.
    fn native_texture(&self, canvas: CanvasHandle) -> u64;

    /// Resolves the canvas' multisampled contents. No-op for msaa <= 1.
    fn resolve(&mut self, canvas: CanvasHandle);

    /// Draws the canvas to the application window.
    fn blit_to_window(&mut self, canvas: CanvasHandle);
}
