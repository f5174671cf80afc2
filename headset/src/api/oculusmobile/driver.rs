use headset_api::utils;
use headset_api::{
    ControllerAxis, ControllerButton, ControllerHand, ControllerHandle, ControllerRegistry,
    DriverContext, Eye, EyeView, HeadsetDriver, HeadsetError, HeadsetEvent, HeadsetOptions,
    HeadsetOrigin, HeadsetType, Pose, RenderPass, Viewport,
};

use super::bridge::{
    self, Bridge, BridgeDevice, BridgeUpdateData, LifecycleRequest, BUTTON_MENU, BUTTON_SHOULDER,
    BUTTON_TOUCHPAD, TOUCHPAD_RANGE,
};

/// Pause/resume correction, folded once per frame on the render thread.
///
/// A resumed app must not perceive the time spent paused, and the first
/// vendor frame after a resume carries a garbage display time (a known mobile
/// SDK defect), so the machine walks NONE -> PAUSED -> BUG -> RESUME: the BUG
/// frame's display time is replaced with the last one seen before the pause,
/// and the RESUME frame re-bases the clock offset so corrected time continues
/// where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseState {
    None,
    Paused,
    Bug,
    Resume,
}

/// Bridge-driven mobile driver (Gear VR / Oculus Go).
///
/// The vendor session lives in the host activity; this driver renders with
/// whatever per-eye matrices and framebuffers the bridge delivered for the
/// current frame. Poses are pull-model over the latest bridge snapshot.
pub struct OculusMobileDriver {
    initialized: bool,
    bridge: Option<Bridge>,
    device: BridgeDevice,
    display_size: (u32, u32),
    offset: f32,
    clip_near: f32,
    clip_far: f32,
    data: Option<BridgeUpdateData>,
    pause_state: PauseState,
    time_offset: f64,
    last_pause_at: f64,
    last_pause_at_raw: f64,
    registry: ControllerRegistry,
    controller: Option<ControllerHandle>,
    events: Vec<HeadsetEvent>,
}

impl OculusMobileDriver {
    pub fn new() -> OculusMobileDriver {
        OculusMobileDriver {
            initialized: false,
            bridge: None,
            device: BridgeDevice::Go,
            display_size: (0, 0),
            offset: 0.0,
            clip_near: 0.1,
            clip_far: 100.0,
            data: None,
            pause_state: PauseState::None,
            time_offset: 0.0,
            last_pause_at: 0.0,
            last_pause_at_raw: 0.0,
            registry: ControllerRegistry::new(),
            controller: None,
            events: Vec::new(),
        }
    }

    /// Display time with the pause correction applied.
    pub fn display_time(&self) -> f64 {
        self.data
            .as_ref()
            .map_or(0.0, |d| d.display_time - self.time_offset)
    }

    fn fold_lifecycle(&mut self, request: LifecycleRequest) {
        match request {
            LifecycleRequest::None => {}
            LifecycleRequest::Pause => {
                self.last_pause_at = self.display_time();
                self.last_pause_at_raw =
                    self.data.as_ref().map_or(0.0, |d| d.display_time);
                self.pause_state = PauseState::Paused;
                self.events.push(HeadsetEvent::Focus(false));
            }
            LifecycleRequest::Resume => {
                // A pause that was never observed (pause + resume between two
                // frames) still needs the clock dance; the times captured on
                // the last frame before the pause stand in.
                if self.pause_state == PauseState::None {
                    self.last_pause_at = self.display_time();
                    self.last_pause_at_raw =
                        self.data.as_ref().map_or(0.0, |d| d.display_time);
                }
                self.pause_state = PauseState::Bug;
                self.events.push(HeadsetEvent::Focus(true));
            }
        }
    }

    fn absorb_update(&mut self, mut update: BridgeUpdateData) {
        match self.pause_state {
            PauseState::Bug => {
                // First frame after the resume reports nonsense time.
                update.display_time = self.last_pause_at_raw;
                self.pause_state = PauseState::Resume;
            }
            PauseState::Resume => {
                // Rewind the clock so no pause time is perceived.
                self.time_offset = update.display_time - self.last_pause_at;
                self.pause_state = PauseState::None;
            }
            _ => {}
        }

        let had_controller = self.controller.is_some();
        if update.has_controller && !had_controller {
            let handle = self.registry.add(0, ControllerHand::Right);
            self.controller = Some(handle);
            self.events.push(HeadsetEvent::ControllerAdded(handle));
        } else if !update.has_controller && had_controller {
            if let Some(handle) = self.controller.take() {
                self.registry.remove(handle);
                self.events.push(HeadsetEvent::ControllerRemoved(handle));
            }
        }

        self.data = Some(update);
    }

    fn buttons(&self, controller: ControllerHandle, mask_of: fn(&BridgeUpdateData) -> u32) -> u32 {
        if self.registry.get(controller).is_none() {
            return 0;
        }
        self.data.as_ref().map_or(0, mask_of)
    }
}

fn button_bit(button: ControllerButton) -> Option<u32> {
    match button {
        ControllerButton::Menu => Some(BUTTON_MENU),
        ControllerButton::Trigger => Some(BUTTON_SHOULDER),
        ControllerButton::Touchpad => Some(BUTTON_TOUCHPAD),
        _ => None,
    }
}

impl HeadsetDriver for OculusMobileDriver {
    fn initialize(
        &mut self,
        _ctx: &mut DriverContext,
        options: &HeadsetOptions,
    ) -> Result<(), HeadsetError> {
        let bridge = bridge::installed()
            .ok_or_else(|| HeadsetError::Unavailable("no mobile bridge attached".into()))?;
        let init = bridge
            .init_data()
            .ok_or_else(|| HeadsetError::Unavailable("mobile bridge not initialized".into()))?;

        self.device = init.device;
        self.display_size = (init.eye_width * 2, init.eye_height);
        self.offset = options.offset;
        self.clip_near = 0.1;
        self.clip_far = 100.0;
        self.bridge = Some(bridge);
        self.initialized = true;
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut DriverContext) {
        self.registry.clear();
        self.controller = None;
        self.data = None;
        self.bridge = None;
        self.events.clear();
        self.pause_state = PauseState::None;
        self.time_offset = 0.0;
        self.initialized = false;
    }

    fn headset_type(&self) -> HeadsetType {
        match self.device {
            BridgeDevice::Gear => HeadsetType::Gear,
            BridgeDevice::Go => HeadsetType::Go,
        }
    }

    fn origin_type(&self) -> HeadsetOrigin {
        HeadsetOrigin::Head
    }

    fn name(&self) -> String {
        if !self.initialized {
            return String::new();
        }
        match self.device {
            BridgeDevice::Gear => "Gear VR".to_string(),
            BridgeDevice::Go => "Oculus Go".to_string(),
        }
    }

    fn is_mounted(&self) -> bool {
        self.initialized && self.pause_state == PauseState::None
    }

    fn is_mirrored(&self) -> bool {
        // No desktop window to mirror to.
        false
    }

    fn set_mirrored(&mut self, _mirrored: bool) {}

    fn display_dimensions(&self) -> (u32, u32) {
        self.display_size
    }

    fn clip_distance(&self) -> (f32, f32) {
        (self.clip_near, self.clip_far)
    }

    fn set_clip_distance(&mut self, near: f32, far: f32) {
        self.clip_near = near;
        self.clip_far = far;
    }

    fn bounds_dimensions(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn pose(&self) -> Pose {
        let data = match (&self.data, self.initialized) {
            (Some(data), true) => data,
            _ => return Pose::default(),
        };
        Pose {
            position: [
                data.head_pose.position[0],
                data.head_pose.position[1] + self.offset,
                data.head_pose.position[2],
            ],
            orientation: utils::quat_normalize(&data.head_pose.orientation),
            linear_velocity: data.head_velocity.linear,
            angular_velocity: data.head_velocity.angular,
        }
    }

    fn eye_pose(&self, eye: Eye) -> Pose {
        let data = match (&self.data, self.initialized) {
            (Some(data), true) => data,
            _ => return Pose::default(),
        };
        let view = utils::mat4_from_rm44(&data.eye_views[eye.index()]);
        let mut pose = Pose::from_matrix(&utils::mat4_invert_pose(&view));
        pose.position[1] += self.offset;
        pose
    }

    fn velocity(&self) -> [f32; 3] {
        self.data.as_ref().map_or([0.0; 3], |d| d.head_velocity.linear)
    }

    fn angular_velocity(&self) -> [f32; 3] {
        self.data.as_ref().map_or([0.0; 3], |d| d.head_velocity.angular)
    }

    fn controllers(&self) -> Vec<ControllerHandle> {
        self.registry.handles()
    }

    fn controller_is_connected(&self, controller: ControllerHandle) -> bool {
        self.initialized && self.registry.get(controller).is_some()
    }

    fn controller_hand(&self, controller: ControllerHandle) -> ControllerHand {
        self.registry
            .get(controller)
            .map_or(ControllerHand::Unknown, |c| c.hand)
    }

    fn controller_pose(&self, controller: ControllerHandle) -> Pose {
        let data = match (&self.data, self.registry.get(controller)) {
            (Some(data), Some(_)) => data,
            _ => return Pose::default(),
        };
        Pose {
            position: [
                data.hand_pose.position[0],
                data.hand_pose.position[1] + self.offset,
                data.hand_pose.position[2],
            ],
            orientation: utils::quat_normalize(&data.hand_pose.orientation),
            linear_velocity: data.hand_velocity.linear,
            angular_velocity: data.hand_velocity.angular,
        }
    }

    fn controller_velocity(&self, controller: ControllerHandle) -> [f32; 3] {
        if self.registry.get(controller).is_none() {
            return [0.0; 3];
        }
        self.data.as_ref().map_or([0.0; 3], |d| d.hand_velocity.linear)
    }

    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        let data = match (&self.data, self.registry.get(controller)) {
            (Some(data), Some(_)) => data,
            _ => return 0.0,
        };
        match axis {
            ControllerAxis::Trigger => {
                if data.buttons_down & BUTTON_SHOULDER != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            // Normalize the raw touchpad range to [-1, 1].
            ControllerAxis::TouchpadX => {
                (data.trackpad[0] - TOUCHPAD_RANGE / 2.0) / (TOUCHPAD_RANGE / 2.0)
            }
            ControllerAxis::TouchpadY => {
                (data.trackpad[1] - TOUCHPAD_RANGE / 2.0) / (TOUCHPAD_RANGE / 2.0)
            }
            ControllerAxis::Grip => 0.0,
        }
    }

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        button_bit(button)
            .map_or(false, |bit| self.buttons(controller, |d| d.buttons_down) & bit != 0)
    }

    fn controller_is_touched(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        button_bit(button)
            .map_or(false, |bit| self.buttons(controller, |d| d.buttons_touched) & bit != 0)
    }

    fn controller_vibrate(&mut self, _controller: ControllerHandle, _duration: f32, _power: f32) {
        // The Go/Gear controllers have no haptics.
    }

    fn render_to(
        &mut self,
        ctx: &mut DriverContext,
        callback: &mut dyn FnMut(&RenderPass),
    ) -> Result<(), HeadsetError> {
        if !self.initialized || self.pause_state == PauseState::Paused {
            return Ok(());
        }
        let data = match self.data.clone() {
            Some(data) => data,
            None => {
                // Nothing delivered by the bridge yet.
                return Ok(());
            }
        };

        let (eye_width, eye_height) = (self.display_size.0 / 2, self.display_size.1);
        let viewport = Viewport {
            x: 0,
            y: 0,
            width: eye_width as i32,
            height: eye_height as i32,
        };

        for eye in [Eye::Left, Eye::Right].iter() {
            let i = eye.index();
            let view = utils::mat4_multiply(
                &utils::mat4_from_rm44(&data.eye_views[i]),
                &utils::mat4_translation(0.0, -self.offset, 0.0),
            );
            let projection = utils::mat4_from_rm44(&data.eye_projections[i]);
            let canvas = ctx
                .graphics
                .import_texture(data.eye_framebuffers[i], eye_width, eye_height);
            callback(&RenderPass {
                canvas: Some(canvas),
                views: &[EyeView {
                    eye: *eye,
                    view,
                    projection,
                    viewport,
                }],
            });
        }

        Ok(())
    }

    fn update(&mut self, _ctx: &mut DriverContext, _dt: f32) {
        if !self.initialized {
            return;
        }
        let bridge = match self.bridge.clone() {
            Some(bridge) => bridge,
            None => return,
        };

        let request = bridge.take_lifecycle();
        self.fold_lifecycle(request);

        if let Some(update) = bridge.take_update() {
            if self.pause_state != PauseState::Paused {
                self.absorb_update(update);
            }
        }
    }

    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::bridge::{BridgeInitData, BridgeVelocity};
    use super::*;

    fn update_at(display_time: f64) -> BridgeUpdateData {
        BridgeUpdateData {
            display_time,
            head_pose: Default::default(),
            head_velocity: BridgeVelocity::default(),
            hand_pose: Default::default(),
            hand_velocity: BridgeVelocity::default(),
            has_controller: false,
            buttons_down: 0,
            buttons_touched: 0,
            trackpad: [0.0; 2],
            eye_views: [[[0.0; 4]; 4]; 2],
            eye_projections: [[[0.0; 4]; 4]; 2],
            eye_framebuffers: [0; 2],
        }
    }

    fn driver_with_bridge() -> (OculusMobileDriver, Bridge) {
        let bridge = Bridge::new();
        bridge.on_init(BridgeInitData {
            eye_width: 1024,
            eye_height: 1024,
            device: BridgeDevice::Go,
        });
        let mut driver = OculusMobileDriver::new();
        driver.bridge = Some(bridge.clone());
        driver.device = BridgeDevice::Go;
        driver.display_size = (2048, 1024);
        driver.initialized = true;
        (driver, bridge)
    }

    fn pump(driver: &mut OculusMobileDriver, bridge: &Bridge) {
        driver.fold_lifecycle(bridge.take_lifecycle());
        if let Some(update) = bridge.take_update() {
            if driver.pause_state != PauseState::Paused {
                driver.absorb_update(update);
            }
        }
    }

    #[test]
    fn pause_resume_rewinds_the_clock() {
        let (mut driver, bridge) = driver_with_bridge();

        bridge.on_update(update_at(10.0));
        pump(&mut driver, &bridge);
        bridge.on_update(update_at(10.1));
        pump(&mut driver, &bridge);
        assert!((driver.display_time() - 10.1).abs() < 1e-9);

        bridge.on_pause();
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::Paused);

        bridge.on_resume();
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::Bug);

        // First frame after the resume: garbage display time gets replaced.
        bridge.on_update(update_at(9999.0));
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::Resume);
        assert!((driver.display_time() - 10.1).abs() < 1e-9);

        // Second frame re-bases the clock; time continues where it stopped.
        bridge.on_update(update_at(9999.1));
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::None);
        assert!((driver.display_time() - 10.1).abs() < 1e-9);

        bridge.on_update(update_at(9999.2));
        pump(&mut driver, &bridge);
        assert!((driver.display_time() - 10.2).abs() < 1e-6);
    }

    #[test]
    fn fast_pause_resume_still_corrects() {
        let (mut driver, bridge) = driver_with_bridge();
        bridge.on_update(update_at(5.0));
        pump(&mut driver, &bridge);

        // Pause and resume both land before the next frame; only the resume
        // request survives in the flag.
        bridge.on_pause();
        bridge.on_resume();
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::Bug);

        bridge.on_update(update_at(777.0));
        pump(&mut driver, &bridge);
        bridge.on_update(update_at(777.1));
        pump(&mut driver, &bridge);
        assert_eq!(driver.pause_state, PauseState::None);
        assert!((driver.display_time() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn controller_arrival_is_one_event() {
        let (mut driver, bridge) = driver_with_bridge();

        let mut update = update_at(1.0);
        update.has_controller = true;
        bridge.on_update(update);
        pump(&mut driver, &bridge);
        assert_eq!(driver.controller_count(), 1);

        let added = driver.poll_events();
        assert_eq!(
            added
                .iter()
                .filter(|e| matches!(e, HeadsetEvent::ControllerAdded(_)))
                .count(),
            1
        );

        bridge.on_update(update_at(1.1));
        pump(&mut driver, &bridge);
        assert_eq!(driver.controller_count(), 0);
        let removed = driver.poll_events();
        assert_eq!(
            removed
                .iter()
                .filter(|e| matches!(e, HeadsetEvent::ControllerRemoved(_)))
                .count(),
            1
        );
    }
}
