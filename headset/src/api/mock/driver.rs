use std::sync::{Arc, Mutex};

use headset_api::utils;
use headset_api::{
    CanvasDesc, CanvasHandle, ControllerAxis, ControllerButton, ControllerHand, ControllerHandle,
    ControllerRegistry, DriverContext, Eye, EyeView, HeadsetDriver, HeadsetError, HeadsetEvent,
    HeadsetOptions, HeadsetOrigin, HeadsetType, Pose, RenderPass, Viewport,
};

const DISPLAY_WIDTH: u32 = 2160;
const DISPLAY_HEIGHT: u32 = 1200;
const EYE_DISTANCE: f32 = 0.064;
const TAN_UP: f32 = 1.11;
const TAN_DOWN: f32 = 1.11;
const TAN_LEFT: f32 = 1.19;
const TAN_RIGHT: f32 = 1.19;

/// Events the "vendor runtime" of the mock driver can be scripted to emit.
#[derive(Debug, Clone, Copy)]
pub enum MockVendorEvent {
    /// A tracked device took on a controller role (device connected).
    RoleChanged { device_index: u32, hand: ControllerHand },
    Disconnected { device_index: u32 },
    Mounted(bool),
    Focus(bool),
    SessionLost,
}

#[derive(Default, Clone)]
struct MockInput {
    axes: Vec<(ControllerAxis, f32)>,
    down: Vec<ControllerButton>,
    touched: Vec<ControllerButton>,
}

struct MockState {
    fail_init: bool,
    fail_acquire: bool,
    single_pass: bool,
    pose: Pose,
    vendor_events: Vec<MockVendorEvent>,
    input: Vec<(u32, MockInput)>,
    vibrations: Vec<(u32, f32, f32)>,
}

impl Default for MockState {
    fn default() -> MockState {
        MockState {
            fail_init: false,
            fail_acquire: false,
            single_pass: false,
            pose: Pose::default(),
            vendor_events: Vec::new(),
            input: Vec::new(),
            vibrations: Vec::new(),
        }
    }
}

/// Scripting handle for a `MockDriver`. Clone freely; all clones share the
/// same simulated runtime.
#[derive(Clone)]
pub struct MockControl(Arc<Mutex<MockState>>);

impl MockControl {
    /// Makes the next `initialize` fail as if no hardware were present.
    pub fn fail_next_init(&self) {
        self.0.lock().unwrap().fail_init = true;
    }

    /// Makes the next frame's render-target acquisition fail (lost swap
    /// chain); the driver skips that frame.
    pub fn fail_next_acquire(&self) {
        self.0.lock().unwrap().fail_acquire = true;
    }

    /// Switches between per-eye rendering (default) and single-pass stereo.
    pub fn set_single_pass(&self, single_pass: bool) {
        self.0.lock().unwrap().single_pass = single_pass;
    }

    pub fn set_pose(&self, pose: Pose) {
        self.0.lock().unwrap().pose = pose;
    }

    /// Simulates the vendor reporting a new controller role.
    pub fn connect_controller(&self, device_index: u32, hand: ControllerHand) {
        self.0
            .lock()
            .unwrap()
            .vendor_events
            .push(MockVendorEvent::RoleChanged { device_index, hand });
    }

    pub fn disconnect_controller(&self, device_index: u32) {
        self.0
            .lock()
            .unwrap()
            .vendor_events
            .push(MockVendorEvent::Disconnected { device_index });
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.0
            .lock()
            .unwrap()
            .vendor_events
            .push(MockVendorEvent::Mounted(mounted));
    }

    pub fn set_focus(&self, focused: bool) {
        self.0
            .lock()
            .unwrap()
            .vendor_events
            .push(MockVendorEvent::Focus(focused));
    }

    /// Kills the simulated vendor session; the next frame reports the driver
    /// as lost.
    pub fn lose_session(&self) {
        self.0
            .lock()
            .unwrap()
            .vendor_events
            .push(MockVendorEvent::SessionLost);
    }

    pub fn set_axis(&self, device_index: u32, axis: ControllerAxis, value: f32) {
        let mut state = self.0.lock().unwrap();
        let input = find_input(&mut state.input, device_index);
        input.axes.retain(|(a, _)| *a != axis);
        input.axes.push((axis, value));
    }

    pub fn set_button(&self, device_index: u32, button: ControllerButton, down: bool, touched: bool) {
        let mut state = self.0.lock().unwrap();
        let input = find_input(&mut state.input, device_index);
        input.down.retain(|b| *b != button);
        input.touched.retain(|b| *b != button);
        if down {
            input.down.push(button);
        }
        if touched {
            input.touched.push(button);
        }
    }

    /// Haptic pulses the driver received, as (device_index, duration, power).
    pub fn vibrations(&self) -> Vec<(u32, f32, f32)> {
        self.0.lock().unwrap().vibrations.clone()
    }
}

fn find_input<'a>(input: &'a mut Vec<(u32, MockInput)>, device_index: u32) -> &'a mut MockInput {
    if let Some(i) = input.iter().position(|(d, _)| *d == device_index) {
        return &mut input[i].1;
    }
    input.push((device_index, MockInput::default()));
    &mut input.last_mut().unwrap().1
}

/// Fully scriptable driver used by the test suite and for development
/// without hardware. Defaults to a floor origin, an identity head pose and
/// per-eye rendering into an offscreen stereo canvas.
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    initialized: bool,
    session_lost: bool,
    mounted: bool,
    mirrored: bool,
    msaa: u32,
    clip_near: f32,
    clip_far: f32,
    canvas: Option<CanvasHandle>,
    registry: ControllerRegistry,
    events: Vec<HeadsetEvent>,
}

impl MockDriver {
    pub fn new() -> (MockDriver, MockControl) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let driver = MockDriver {
            state: state.clone(),
            initialized: false,
            session_lost: false,
            mounted: true,
            mirrored: true,
            msaa: 0,
            clip_near: 0.1,
            clip_far: 30.0,
            canvas: None,
            registry: ControllerRegistry::new(),
            events: Vec::new(),
        };
        (driver, MockControl(state))
    }

    fn head_pose(&self) -> Pose {
        if !self.initialized {
            return Pose::default();
        }
        self.state.lock().unwrap().pose
    }

    fn input_for(&self, controller: ControllerHandle) -> Option<MockInput> {
        let device_index = self.registry.get(controller)?.device_index;
        let state = self.state.lock().unwrap();
        Some(
            state
                .input
                .iter()
                .find(|(d, _)| *d == device_index)
                .map(|(_, i)| i.clone())
                .unwrap_or_default(),
        )
    }

    fn drain_vendor_events(&mut self) {
        let vendor_events: Vec<MockVendorEvent> = {
            let mut state = self.state.lock().unwrap();
            state.vendor_events.drain(..).collect()
        };

        for event in vendor_events {
            match event {
                MockVendorEvent::RoleChanged { device_index, hand } => {
                    match self.registry.find_by_device(device_index) {
                        Some(handle) => {
                            if let Some(controller) = self.registry.get_mut(handle) {
                                controller.hand = hand;
                            }
                        }
                        None => {
                            let handle = self.registry.add(device_index, hand);
                            self.events.push(HeadsetEvent::ControllerAdded(handle));
                        }
                    }
                }
                MockVendorEvent::Disconnected { device_index } => {
                    if let Some(handle) = self.registry.remove_by_device(device_index) {
                        self.events.push(HeadsetEvent::ControllerRemoved(handle));
                    }
                }
                MockVendorEvent::Mounted(mounted) => {
                    self.mounted = mounted;
                    self.events.push(HeadsetEvent::Mounted(mounted));
                }
                MockVendorEvent::Focus(focused) => {
                    self.events.push(HeadsetEvent::Focus(focused));
                }
                MockVendorEvent::SessionLost => {
                    self.session_lost = true;
                }
            }
        }
    }
}

impl HeadsetDriver for MockDriver {
    fn initialize(
        &mut self,
        _ctx: &mut DriverContext,
        options: &HeadsetOptions,
    ) -> Result<(), HeadsetError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_init {
                state.fail_init = false;
                return Err(HeadsetError::Unavailable("no mock hardware scripted".into()));
            }
        }
        self.msaa = options.msaa;
        self.clip_near = 0.1;
        self.clip_far = 30.0;
        self.mounted = true;
        self.initialized = true;
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut DriverContext) {
        if let Some(canvas) = self.canvas.take() {
            ctx.graphics.destroy_canvas(canvas);
        }
        self.registry.clear();
        self.events.clear();
        self.session_lost = false;
        self.initialized = false;
    }

    fn headset_type(&self) -> HeadsetType {
        HeadsetType::Mock
    }

    fn origin_type(&self) -> HeadsetOrigin {
        HeadsetOrigin::Floor
    }

    fn name(&self) -> String {
        "Mock HMD".to_string()
    }

    fn is_mounted(&self) -> bool {
        self.initialized && self.mounted
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    fn display_dimensions(&self) -> (u32, u32) {
        if self.initialized {
            (DISPLAY_WIDTH, DISPLAY_HEIGHT)
        } else {
            (0, 0)
        }
    }

    fn clip_distance(&self) -> (f32, f32) {
        (self.clip_near, self.clip_far)
    }

    fn set_clip_distance(&mut self, near: f32, far: f32) {
        self.clip_near = near;
        self.clip_far = far;
    }

    fn bounds_dimensions(&self) -> (f32, f32) {
        if self.initialized {
            (2.0, 2.0)
        } else {
            (0.0, 0.0)
        }
    }

    fn bounds_geometry(&self) -> Vec<[f32; 3]> {
        if !self.initialized {
            return Vec::new();
        }
        vec![
            [-1.0, 0.0, -1.0],
            [1.0, 0.0, -1.0],
            [1.0, 0.0, 1.0],
            [-1.0, 0.0, 1.0],
        ]
    }

    fn pose(&self) -> Pose {
        self.head_pose()
    }

    fn eye_pose(&self, eye: Eye) -> Pose {
        let head = self.head_pose();
        let offset = match eye {
            Eye::Left => -EYE_DISTANCE / 2.0,
            Eye::Right => EYE_DISTANCE / 2.0,
        };
        let transform = utils::mat4_from_pose(&head.position, &head.orientation);
        Pose {
            position: utils::mat4_transform_point(&transform, &[offset, 0.0, 0.0]),
            ..head
        }
    }

    fn velocity(&self) -> [f32; 3] {
        self.head_pose().linear_velocity
    }

    fn angular_velocity(&self) -> [f32; 3] {
        self.head_pose().angular_velocity
    }

    fn recenter(&mut self) {
        if self.initialized {
            self.state.lock().unwrap().pose = Pose::default();
            self.events.push(HeadsetEvent::Recentered);
        }
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
        if self.registry.get(controller).is_none() {
            return Pose::default();
        }
        // Controllers float half a meter in front of the head.
        let head = self.head_pose();
        let transform = utils::mat4_from_pose(&head.position, &head.orientation);
        Pose {
            position: utils::mat4_transform_point(&transform, &[0.0, -0.2, -0.5]),
            orientation: head.orientation,
            ..Pose::default()
        }
    }

    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        self.input_for(controller)
            .and_then(|input| {
                input
                    .axes
                    .iter()
                    .find(|(a, _)| *a == axis)
                    .map(|(_, value)| *value)
            })
            .unwrap_or(0.0)
    }

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        self.input_for(controller)
            .map_or(false, |input| input.down.contains(&button))
    }

    fn controller_is_touched(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        self.input_for(controller)
            .map_or(false, |input| input.touched.contains(&button))
    }

    fn controller_vibrate(&mut self, controller: ControllerHandle, duration: f32, power: f32) {
        if duration <= 0.0 {
            return;
        }
        if let Some(c) = self.registry.get(controller) {
            self.state
                .lock()
                .unwrap()
                .vibrations
                .push((c.device_index, duration, power));
        }
    }

    fn render_to(
        &mut self,
        ctx: &mut DriverContext,
        callback: &mut dyn FnMut(&RenderPass),
    ) -> Result<(), HeadsetError> {
        if !self.initialized {
            return Ok(());
        }
        if self.session_lost {
            return Err(HeadsetError::DriverLost("mock session lost".into()));
        }

        let (pose, single_pass, fail_acquire) = {
            let mut state = self.state.lock().unwrap();
            let fail = state.fail_acquire;
            state.fail_acquire = false;
            (state.pose, state.single_pass, fail)
        };

        if fail_acquire {
            warn!("Mock swap chain unavailable, skipping frame");
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        if self.canvas.is_none() {
            let desc = CanvasDesc {
                width: DISPLAY_WIDTH,
                height: DISPLAY_HEIGHT,
                stereo: true,
                depth: true,
                msaa: self.msaa,
            };
            match ctx.graphics.create_canvas(&desc) {
                Ok(canvas) => self.canvas = Some(canvas),
                Err(err) => {
                    warn!("Mock canvas creation failed ({}), skipping frame", err);
                    self.events.push(HeadsetEvent::FrameSkipped);
                    return Ok(());
                }
            }
        }
        let canvas = self.canvas;

        // Pose snapshot for the whole frame; clip distances captured here so
        // mid-frame changes only affect the next frame.
        let head = utils::mat4_from_pose(&pose.position, &pose.orientation);
        let (near, far) = (self.clip_near, self.clip_far);

        let half = (DISPLAY_WIDTH / 2) as i32;
        let mut views = [EyeView {
            eye: Eye::Left,
            view: utils::MAT4_IDENTITY,
            projection: utils::MAT4_IDENTITY,
            viewport: Viewport {
                x: 0,
                y: 0,
                width: half,
                height: DISPLAY_HEIGHT as i32,
            },
        }; 2];

        for (i, eye) in [Eye::Left, Eye::Right].iter().enumerate() {
            let offset = match eye {
                Eye::Left => -EYE_DISTANCE / 2.0,
                Eye::Right => EYE_DISTANCE / 2.0,
            };
            let eye_to_head = utils::mat4_translation(offset, 0.0, 0.0);
            views[i] = EyeView {
                eye: *eye,
                view: utils::mat4_invert_pose(&utils::mat4_multiply(&head, &eye_to_head)),
                projection: utils::mat4_fov_projection(TAN_UP, TAN_DOWN, TAN_LEFT, TAN_RIGHT, near, far),
                viewport: Viewport {
                    x: i as i32 * half,
                    y: 0,
                    width: half,
                    height: DISPLAY_HEIGHT as i32,
                },
            };
        }

        if single_pass {
            callback(&RenderPass {
                canvas,
                views: &views,
            });
        } else {
            for view in &views {
                callback(&RenderPass {
                    canvas,
                    views: std::slice::from_ref(view),
                });
            }
        }

        if let Some(canvas) = canvas {
            ctx.graphics.resolve(canvas);
            if self.mirrored {
                ctx.graphics.blit_to_window(canvas);
            }
        }

        Ok(())
    }

    fn update(&mut self, _ctx: &mut DriverContext, _dt: f32) {
        if self.initialized {
            self.drain_vendor_events();
        }
    }

    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        self.events.drain(..).collect()
    }
}
