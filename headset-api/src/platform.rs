/// Keys the fake driver's desktop camera responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    Normal,
    /// Cursor hidden and locked to the window, for mouse-look.
    Grabbed,
}

/// Desktop window and input, as consumed by the fake driver.
///
/// Poll-based: drivers sample this once per `update` and cache what their
/// query accessors need.
pub trait Platform {
    fn window_size(&self) -> (u32, u32);
    fn framebuffer_size(&self) -> (u32, u32);
    fn is_key_down(&self, key: Key) -> bool;
    fn is_mouse_down(&self, button: MouseButton) -> bool;
    fn mouse_position(&self) -> (f64, f64);
    fn set_mouse_mode(&mut self, mode: MouseMode);
}
