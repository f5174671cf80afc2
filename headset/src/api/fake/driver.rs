use std::f32::consts::PI;

use headset_api::utils;
use headset_api::{
    ControllerAxis, ControllerButton, ControllerHand, ControllerHandle, ControllerRegistry,
    DriverContext, Eye, EyeView, HeadsetDriver, HeadsetError, HeadsetEvent, HeadsetOptions,
    HeadsetOrigin, HeadsetType, Key, MouseButton, MouseMode, Pose, RenderPass, Viewport,
};

const MOVE_SPEED: f32 = 3.0;
const TURN_SPEED: f32 = 3.0;
const DAMPING: f32 = 20.0;
const FOV: f32 = 67.0 * PI / 180.0;

/// Synthetic desktop headset: WASD + mouse-look camera rendered straight to
/// the application window. Always initializes, which makes it the fallback
/// candidate on machines without any VR runtime.
///
/// One virtual controller is exposed, floating 0.75 m in front of the head;
/// the right mouse button is its trigger.
pub struct FakeDriver {
    initialized: bool,
    mirrored: bool,
    offset: f32,
    clip_near: f32,
    clip_far: f32,
    position: [f32; 3],
    velocity: [f32; 3],
    local_velocity: [f32; 3],
    angular_velocity: [f32; 3],
    yaw: f32,
    pitch: f32,
    transform: [f32; 16],
    prev_cursor: Option<(f64, f64)>,
    display_size: (u32, u32),
    trigger_down: bool,
    registry: ControllerRegistry,
    controller: Option<ControllerHandle>,
    events: Vec<HeadsetEvent>,
}

impl FakeDriver {
    pub fn new() -> FakeDriver {
        FakeDriver {
            initialized: false,
            mirrored: true,
            offset: 0.0,
            clip_near: 0.1,
            clip_far: 100.0,
            position: [0.0; 3],
            velocity: [0.0; 3],
            local_velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
            yaw: 0.0,
            pitch: 0.0,
            transform: utils::MAT4_IDENTITY,
            prev_cursor: None,
            display_size: (0, 0),
            trigger_down: false,
            registry: ControllerRegistry::new(),
            controller: None,
            events: Vec::new(),
        }
    }

    fn orientation(&self) -> [f32; 4] {
        let yaw = utils::quat_from_angle_axis(self.yaw, &[0.0, 1.0, 0.0]);
        let pitch = utils::quat_from_angle_axis(self.pitch, &[1.0, 0.0, 0.0]);
        utils::quat_multiply(&yaw, &pitch)
    }

    fn rebuild_transform(&mut self) {
        let position = [
            self.position[0],
            self.position[1] + self.offset,
            self.position[2],
        ];
        self.transform = utils::mat4_from_pose(&position, &self.orientation());
    }

    fn is_live(&self, controller: ControllerHandle) -> bool {
        self.initialized && self.registry.get(controller).is_some()
    }
}

impl HeadsetDriver for FakeDriver {
    fn initialize(
        &mut self,
        ctx: &mut DriverContext,
        options: &HeadsetOptions,
    ) -> Result<(), HeadsetError> {
        self.offset = options.offset;
        self.mirrored = true;
        self.clip_near = 0.1;
        self.clip_far = 100.0;
        self.display_size = ctx.platform.framebuffer_size();
        self.rebuild_transform();
        self.controller = Some(self.registry.add(0, ControllerHand::Unknown));
        self.initialized = true;
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut DriverContext) {
        self.registry.clear();
        self.controller = None;
        self.events.clear();
        self.initialized = false;
    }

    fn headset_type(&self) -> HeadsetType {
        HeadsetType::Fake
    }

    fn origin_type(&self) -> HeadsetOrigin {
        HeadsetOrigin::Head
    }

    fn name(&self) -> String {
        "Simulator".to_string()
    }

    fn is_mounted(&self) -> bool {
        self.initialized
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

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
        if !self.initialized {
            return Pose::default();
        }
        Pose {
            position: utils::mat4_transform_point(&self.transform, &[0.0; 3]),
            orientation: self.orientation(),
            linear_velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    fn eye_pose(&self, _eye: Eye) -> Pose {
        // No per-eye offset for the synthetic camera.
        self.pose()
    }

    fn velocity(&self) -> [f32; 3] {
        self.velocity
    }

    fn angular_velocity(&self) -> [f32; 3] {
        self.angular_velocity
    }

    fn recenter(&mut self) {
        self.position = [0.0; 3];
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.rebuild_transform();
        self.events.push(HeadsetEvent::Recentered);
    }

    fn controllers(&self) -> Vec<ControllerHandle> {
        self.registry.handles()
    }

    fn controller_is_connected(&self, controller: ControllerHandle) -> bool {
        self.is_live(controller)
    }

    fn controller_hand(&self, controller: ControllerHandle) -> ControllerHand {
        self.registry
            .get(controller)
            .map_or(ControllerHand::Unknown, |c| c.hand)
    }

    fn controller_pose(&self, controller: ControllerHandle) -> Pose {
        if !self.is_live(controller) {
            return Pose::default();
        }
        Pose {
            position: utils::mat4_transform_point(&self.transform, &[0.0, 0.0, -0.75]),
            orientation: self.orientation(),
            ..Pose::default()
        }
    }

    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        if self.is_live(controller) && axis == ControllerAxis::Trigger && self.trigger_down {
            1.0
        } else {
            0.0
        }
    }

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        self.is_live(controller) && button == ControllerButton::Trigger && self.trigger_down
    }

    fn controller_is_touched(&self, _controller: ControllerHandle, _button: ControllerButton) -> bool {
        false
    }

    fn controller_vibrate(&mut self, _controller: ControllerHandle, _duration: f32, _power: f32) {}

    fn render_to(
        &mut self,
        ctx: &mut DriverContext,
        callback: &mut dyn FnMut(&RenderPass),
    ) -> Result<(), HeadsetError> {
        if !self.initialized {
            return Ok(());
        }

        self.display_size = ctx.platform.framebuffer_size();
        let (width, height) = self.display_size;
        if width == 0 || height == 0 {
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        let view = utils::mat4_invert_pose(&self.transform);
        let aspect = (width as f32 / 2.0) / height as f32;
        let projection = utils::mat4_perspective(self.clip_near, self.clip_far, FOV, aspect);

        let half = (width / 2) as i32;
        let views = [
            EyeView {
                eye: Eye::Left,
                view,
                projection,
                viewport: Viewport {
                    x: 0,
                    y: 0,
                    width: half,
                    height: height as i32,
                },
            },
            EyeView {
                eye: Eye::Right,
                view,
                projection,
                viewport: Viewport {
                    x: half,
                    y: 0,
                    width: half,
                    height: height as i32,
                },
            },
        ];

        // Single pass straight into the window framebuffer; both viewports in
        // one callback invocation. Mirroring has nothing extra to do since
        // the window is already the target.
        callback(&RenderPass {
            canvas: None,
            views: &views,
        });

        Ok(())
    }

    fn update(&mut self, ctx: &mut DriverContext, dt: f32) {
        if !self.initialized {
            return;
        }

        self.display_size = ctx.platform.framebuffer_size();

        // Right mouse button doubles as the virtual controller's trigger.
        let trigger = ctx.platform.is_mouse_down(MouseButton::Right);
        if trigger != self.trigger_down {
            if let Some(controller) = self.controller {
                self.events.push(if trigger {
                    HeadsetEvent::ControllerPressed(controller, ControllerButton::Trigger)
                } else {
                    HeadsetEvent::ControllerReleased(controller, ControllerButton::Trigger)
                });
            }
            self.trigger_down = trigger;
        }

        if dt <= 0.0 {
            return;
        }

        let front = ctx.platform.is_key_down(Key::W) || ctx.platform.is_key_down(Key::Up);
        let back = ctx.platform.is_key_down(Key::S) || ctx.platform.is_key_down(Key::Down);
        let left = ctx.platform.is_key_down(Key::A) || ctx.platform.is_key_down(Key::Left);
        let right = ctx.platform.is_key_down(Key::D) || ctx.platform.is_key_down(Key::Right);
        let up = ctx.platform.is_key_down(Key::Q);
        let down = ctx.platform.is_key_down(Key::E);

        let movespeed = MOVE_SPEED * dt;
        let turnspeed = TURN_SPEED * dt;
        let damping = (1.0 - DAMPING * dt).max(0.0);

        if ctx.platform.is_mouse_down(MouseButton::Left) {
            ctx.platform.set_mouse_mode(MouseMode::Grabbed);

            let (width, height) = ctx.platform.window_size();
            let (mx, my) = ctx.platform.mouse_position();
            let (px, py) = self.prev_cursor.unwrap_or((mx, my));

            let aspect = width as f64 / height as f64;
            let dx = (mx - px) / width as f64;
            let dy = (my - py) / (height as f64 * aspect);
            self.angular_velocity[0] = (dy / dt as f64) as f32;
            self.angular_velocity[1] = (dx / dt as f64) as f32;
            self.prev_cursor = Some((mx, my));
        } else {
            ctx.platform.set_mouse_mode(MouseMode::Normal);
            for v in self.angular_velocity.iter_mut() {
                *v *= damping;
            }
            self.prev_cursor = None;
        }

        // Velocity in head-local space, damped toward rest.
        if left {
            self.local_velocity[0] = -movespeed;
        } else if right {
            self.local_velocity[0] = movespeed;
        }
        if up {
            self.local_velocity[1] = movespeed;
        } else if down {
            self.local_velocity[1] = -movespeed;
        }
        if front {
            self.local_velocity[2] = -movespeed;
        } else if back {
            self.local_velocity[2] = movespeed;
        }

        self.velocity = utils::mat4_transform_direction(&self.transform, &self.local_velocity);
        for v in self.local_velocity.iter_mut() {
            *v *= damping;
        }

        for i in 0..3 {
            self.position[i] += self.velocity[i];
        }

        self.pitch = (self.pitch - self.angular_velocity[0] * turnspeed)
            .max(-PI / 2.0)
            .min(PI / 2.0);
        self.yaw -= self.angular_velocity[1] * turnspeed;

        self.rebuild_transform();
    }

    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StillPlatform;

    impl headset_api::Platform for StillPlatform {
        fn window_size(&self) -> (u32, u32) {
            (800, 600)
        }
        fn framebuffer_size(&self) -> (u32, u32) {
            (1600, 1200)
        }
        fn is_key_down(&self, _key: Key) -> bool {
            false
        }
        fn is_mouse_down(&self, _button: MouseButton) -> bool {
            false
        }
        fn mouse_position(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
        fn set_mouse_mode(&mut self, _mode: MouseMode) {}
    }

    struct NoGraphics;

    impl headset_api::Graphics for NoGraphics {
        fn create_canvas(
            &mut self,
            _desc: &headset_api::CanvasDesc,
        ) -> Result<headset_api::CanvasHandle, HeadsetError> {
            Ok(headset_api::CanvasHandle(0))
        }
        fn import_texture(&mut self, _native: u64, _w: u32, _h: u32) -> headset_api::CanvasHandle {
            headset_api::CanvasHandle(0)
        }
        fn destroy_canvas(&mut self, _canvas: headset_api::CanvasHandle) {}
        fn native_texture(&self, _canvas: headset_api::CanvasHandle) -> u64 {
            0
        }
        fn resolve(&mut self, _canvas: headset_api::CanvasHandle) {}
        fn blit_to_window(&mut self, _canvas: headset_api::CanvasHandle) {}
    }

    #[test]
    fn starts_at_head_height_looking_forward() {
        let mut driver = FakeDriver::new();
        let mut graphics = NoGraphics;
        let mut platform = StillPlatform;
        let mut ctx = DriverContext {
            graphics: &mut graphics,
            platform: &mut platform,
        };
        driver
            .initialize(&mut ctx, &HeadsetOptions {
                offset: 1.7,
                ..HeadsetOptions::default()
            })
            .unwrap();

        let pose = driver.pose();
        assert_eq!(pose.position, [0.0, 1.7, 0.0]);
        let (angle, _axis) = pose.angle_axis();
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut driver = FakeDriver::new();
        let mut graphics = NoGraphics;
        let mut platform = StillPlatform;
        let mut ctx = DriverContext {
            graphics: &mut graphics,
            platform: &mut platform,
        };
        driver
            .initialize(&mut ctx, &HeadsetOptions::default())
            .unwrap();
        driver.destroy(&mut ctx);
        driver.destroy(&mut ctx);
        assert_eq!(driver.controller_count(), 0);
    }
}
