//! Test doubles for the graphics and platform collaborators. No GPU, no
//! window: the graphics double hands out sequential canvas handles and
//! records every call, the platform double replays scripted input.

// Not every test binary exercises every double.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use headset::{
    CanvasDesc, CanvasHandle, Graphics, HeadsetError, Key, MouseButton, MouseMode, Platform,
};

#[derive(Default)]
pub struct GraphicsLog {
    pub created: Vec<CanvasDesc>,
    pub imported: Vec<u64>,
    pub destroyed: Vec<CanvasHandle>,
    pub resolves: usize,
    pub blits: usize,
}

pub struct RecordingGraphics {
    next: u64,
    log: Arc<Mutex<GraphicsLog>>,
}

impl RecordingGraphics {
    pub fn new() -> (RecordingGraphics, Arc<Mutex<GraphicsLog>>) {
        let log = Arc::new(Mutex::new(GraphicsLog::default()));
        (
            RecordingGraphics {
                next: 1,
                log: log.clone(),
            },
            log,
        )
    }
}

impl Graphics for RecordingGraphics {
    fn create_canvas(&mut self, desc: &CanvasDesc) -> Result<CanvasHandle, HeadsetError> {
        self.log.lock().unwrap().created.push(*desc);
        let handle = CanvasHandle(self.next);
        self.next += 1;
        Ok(handle)
    }

    fn import_texture(&mut self, native: u64, _width: u32, _height: u32) -> CanvasHandle {
        self.log.lock().unwrap().imported.push(native);
        let handle = CanvasHandle(self.next);
        self.next += 1;
        handle
    }

    fn destroy_canvas(&mut self, canvas: CanvasHandle) {
        self.log.lock().unwrap().destroyed.push(canvas);
    }

    fn native_texture(&self, canvas: CanvasHandle) -> u64 {
        canvas.0
    }

    fn resolve(&mut self, _canvas: CanvasHandle) {
        self.log.lock().unwrap().resolves += 1;
    }

    fn blit_to_window(&mut self, _canvas: CanvasHandle) {
        self.log.lock().unwrap().blits += 1;
    }
}

pub struct InputState {
    pub keys: Vec<Key>,
    pub mouse_left: bool,
    pub mouse_right: bool,
    pub mouse_position: (f64, f64),
    pub window_size: (u32, u32),
    pub framebuffer_size: (u32, u32),
    pub mouse_mode: MouseMode,
}

impl Default for InputState {
    fn default() -> InputState {
        InputState {
            keys: Vec::new(),
            mouse_left: false,
            mouse_right: false,
            mouse_position: (0.0, 0.0),
            window_size: (800, 600),
            framebuffer_size: (1600, 1200),
            mouse_mode: MouseMode::Normal,
        }
    }
}

pub struct ScriptedPlatform {
    state: Arc<Mutex<InputState>>,
}

impl ScriptedPlatform {
    pub fn new() -> (ScriptedPlatform, Arc<Mutex<InputState>>) {
        let state = Arc::new(Mutex::new(InputState::default()));
        (
            ScriptedPlatform {
                state: state.clone(),
            },
            state,
        )
    }
}

impl Platform for ScriptedPlatform {
    fn window_size(&self) -> (u32, u32) {
        self.state.lock().unwrap().window_size
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.state.lock().unwrap().framebuffer_size
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.state.lock().unwrap().keys.contains(&key)
    }

    fn is_mouse_down(&self, button: MouseButton) -> bool {
        let state = self.state.lock().unwrap();
        match button {
            MouseButton::Left => state.mouse_left,
            MouseButton::Right => state.mouse_right,
        }
    }

    fn mouse_position(&self) -> (f64, f64) {
        self.state.lock().unwrap().mouse_position
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.state.lock().unwrap().mouse_mode = mode;
    }
}
