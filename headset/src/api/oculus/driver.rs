use std::cell::RefCell;
use std::ffi::CStr;
use std::mem;
use std::ptr;

use headset_api::utils;
use headset_api::{
    CanvasHandle, ControllerAxis, ControllerButton, ControllerHand, ControllerHandle,
    ControllerRegistry, DriverContext, Eye, EyeView, HeadsetDriver, HeadsetError, HeadsetEvent,
    HeadsetOptions, HeadsetOrigin, HeadsetType, Pose, RenderPass, Viewport,
};
use ovr_sys as ovr;

const LEFT_INDEX: u32 = 0;
const RIGHT_INDEX: u32 = 1;

fn succeeded(result: ovr::ovrResult) -> bool {
    result >= 0
}

fn pose_to_matrix(pose: &ovr::ovrPosef) -> [f32; 16] {
    utils::mat4_from_pose(
        &[pose.Position.x, pose.Position.y, pose.Position.z],
        &[
            pose.Orientation.x,
            pose.Orientation.y,
            pose.Orientation.z,
            pose.Orientation.w,
        ],
    )
}

fn pose_state_to_pose(state: &ovr::ovrPoseStatef) -> Pose {
    Pose {
        position: [
            state.ThePose.Position.x,
            state.ThePose.Position.y,
            state.ThePose.Position.z,
        ],
        orientation: utils::quat_normalize(&[
            state.ThePose.Orientation.x,
            state.ThePose.Orientation.y,
            state.ThePose.Orientation.z,
            state.ThePose.Orientation.w,
        ]),
        linear_velocity: [
            state.LinearVelocity.x,
            state.LinearVelocity.y,
            state.LinearVelocity.z,
        ],
        angular_velocity: [
            state.AngularVelocity.x,
            state.AngularVelocity.y,
            state.AngularVelocity.z,
        ],
    }
}

/// Tracking and input snapshots, refreshed at most once per frame. `update`
/// marks them dirty; the first query afterwards polls the runtime again.
struct Caches {
    tracking_dirty: bool,
    tracking: ovr::ovrTrackingState,
    input_dirty: bool,
    input: ovr::ovrInputState,
}

/// Oculus PC (LibOVR) driver.
///
/// The swap chain is vendor-owned; its GL textures are wrapped in canvases
/// through `Graphics::import_texture` and cycled per frame. Both eyes render
/// into the double-wide current image, which a single `ovr_SubmitFrame` layer
/// hands to the compositor.
pub struct OculusDriver {
    initialized: bool,
    session: ovr::ovrSession,
    session_lost: bool,
    frame_index: i64,
    product_name: String,
    default_fov: [ovr::ovrFovPort; 2],
    eye_size: (u32, u32),
    chain: ovr::ovrTextureSwapChain,
    chain_canvases: Vec<CanvasHandle>,
    mirror: ovr::ovrMirrorTexture,
    mirror_canvas: Option<CanvasHandle>,
    mirrored: bool,
    clip_near: f32,
    clip_far: f32,
    caches: RefCell<Caches>,
    registry: ControllerRegistry,
    events: Vec<HeadsetEvent>,
}

unsafe impl Send for OculusDriver {}

impl OculusDriver {
    pub fn new() -> OculusDriver {
        OculusDriver {
            initialized: false,
            session: ptr::null_mut(),
            session_lost: false,
            frame_index: 0,
            product_name: String::new(),
            default_fov: unsafe { mem::zeroed() },
            eye_size: (0, 0),
            chain: ptr::null_mut(),
            chain_canvases: Vec::new(),
            mirror: ptr::null_mut(),
            mirror_canvas: None,
            mirrored: true,
            clip_near: 0.1,
            clip_far: 30.0,
            caches: RefCell::new(Caches {
                tracking_dirty: true,
                tracking: unsafe { mem::zeroed() },
                input_dirty: true,
                input: unsafe { mem::zeroed() },
            }),
            registry: ControllerRegistry::new(),
            events: Vec::new(),
        }
    }

    fn tracking(&self) -> ovr::ovrTrackingState {
        let mut caches = self.caches.borrow_mut();
        if caches.tracking_dirty {
            // Poll the state head and hands are predicted to be in at display
            // time, per the frame timing docs.
            let predicted = unsafe { ovr::ovr_GetPredictedDisplayTime(self.session, 0) };
            caches.tracking =
                unsafe { ovr::ovr_GetTrackingState(self.session, predicted, ovr::ovrTrue as _) };
            caches.tracking_dirty = false;
        }
        caches.tracking
    }

    fn input(&self) -> ovr::ovrInputState {
        let mut caches = self.caches.borrow_mut();
        if caches.input_dirty {
            unsafe {
                ovr::ovr_GetInputState(
                    self.session,
                    ovr::ovrControllerType_Touch as _,
                    &mut caches.input,
                );
            }
            caches.input_dirty = false;
        }
        caches.input
    }

    fn hand_index(&self, controller: ControllerHandle) -> Option<usize> {
        self.registry.get(controller).map(|c| c.device_index as usize)
    }

    fn sync_controllers(&mut self) {
        let connected = unsafe { ovr::ovr_GetConnectedControllerTypes(self.session) };
        let pairs = [
            (LEFT_INDEX, ovr::ovrControllerType_LTouch, ControllerHand::Left),
            (RIGHT_INDEX, ovr::ovrControllerType_RTouch, ControllerHand::Right),
        ];
        for (device_index, mask, hand) in pairs.iter() {
            let present = connected & (*mask as u32) != 0;
            let registered = self.registry.find_by_device(*device_index);
            match (present, registered) {
                (true, None) => {
                    let handle = self.registry.add(*device_index, *hand);
                    self.events.push(HeadsetEvent::ControllerAdded(handle));
                }
                (false, Some(handle)) => {
                    self.registry.remove(handle);
                    self.events.push(HeadsetEvent::ControllerRemoved(handle));
                }
                _ => {}
            }
        }
    }

    fn check_session_status(&mut self) {
        let mut status: ovr::ovrSessionStatus = unsafe { mem::zeroed() };
        let result = unsafe { ovr::ovr_GetSessionStatus(self.session, &mut status) };
        if !succeeded(result) {
            return;
        }
        if status.ShouldQuit != 0 {
            self.events.push(HeadsetEvent::Quit);
        }
        if status.ShouldRecenter != 0 {
            unsafe { ovr::ovr_RecenterTrackingOrigin(self.session) };
            self.events.push(HeadsetEvent::Recentered);
        }
        if status.DisplayLost != 0 {
            self.session_lost = true;
        }
    }

    fn button_mask(button: ControllerButton, hand: usize) -> Option<u32> {
        let mask = match button {
            ControllerButton::A => ovr::ovrButton_A,
            ControllerButton::B => ovr::ovrButton_B,
            ControllerButton::X => ovr::ovrButton_X,
            ControllerButton::Y => ovr::ovrButton_Y,
            ControllerButton::Menu => ovr::ovrButton_Enter,
            ControllerButton::Touchpad => {
                if hand == LEFT_INDEX as usize {
                    ovr::ovrButton_LThumb
                } else {
                    ovr::ovrButton_RThumb
                }
            }
            _ => return None,
        };
        Some(mask as u32)
    }

    fn touch_mask(button: ControllerButton, hand: usize) -> Option<u32> {
        let mask = match button {
            ControllerButton::A => ovr::ovrTouch_A,
            ControllerButton::B => ovr::ovrTouch_B,
            ControllerButton::X => ovr::ovrTouch_X,
            ControllerButton::Y => ovr::ovrTouch_Y,
            ControllerButton::Trigger => {
                if hand == LEFT_INDEX as usize {
                    ovr::ovrTouch_LIndexTrigger
                } else {
                    ovr::ovrTouch_RIndexTrigger
                }
            }
            ControllerButton::Touchpad => {
                if hand == LEFT_INDEX as usize {
                    ovr::ovrTouch_LThumb
                } else {
                    ovr::ovrTouch_RThumb
                }
            }
            _ => return None,
        };
        Some(mask as u32)
    }

    fn destroy_render_targets(&mut self, ctx: &mut DriverContext) {
        for canvas in self.chain_canvases.drain(..) {
            ctx.graphics.destroy_canvas(canvas);
        }
        if let Some(canvas) = self.mirror_canvas.take() {
            ctx.graphics.destroy_canvas(canvas);
        }
        unsafe {
            if !self.mirror.is_null() {
                ovr::ovr_DestroyMirrorTexture(self.session, self.mirror);
                self.mirror = ptr::null_mut();
            }
            if !self.chain.is_null() {
                ovr::ovr_DestroyTextureSwapChain(self.session, self.chain);
                self.chain = ptr::null_mut();
            }
        }
    }

    fn ensure_swap_chain(&mut self, ctx: &mut DriverContext) -> bool {
        if !self.chain.is_null() {
            return true;
        }

        let (eye_width, eye_height) = self.eye_size;
        let desc = ovr::ovrTextureSwapChainDesc {
            Type: ovr::ovrTexture_2D,
            Format: ovr::OVR_FORMAT_R8G8B8A8_UNORM_SRGB,
            ArraySize: 1,
            Width: (eye_width * 2) as i32,
            Height: eye_height as i32,
            MipLevels: 1,
            SampleCount: 1,
            StaticImage: ovr::ovrFalse as _,
            MiscFlags: 0,
            BindFlags: 0,
        };

        let result =
            unsafe { ovr::ovr_CreateTextureSwapChainGL(self.session, &desc, &mut self.chain) };
        if !succeeded(result) || self.chain.is_null() {
            warn!("Swap chain creation failed ({})", result);
            self.chain = ptr::null_mut();
            return false;
        }

        let mut length = 0i32;
        unsafe { ovr::ovr_GetTextureSwapChainLength(self.session, self.chain, &mut length) };
        for i in 0..length {
            let mut texture = 0u32;
            unsafe {
                ovr::ovr_GetTextureSwapChainBufferGL(self.session, self.chain, i, &mut texture)
            };
            self.chain_canvases.push(ctx.graphics.import_texture(
                texture as u64,
                eye_width * 2,
                eye_height,
            ));
        }
        true
    }
}

impl HeadsetDriver for OculusDriver {
    fn initialize(
        &mut self,
        _ctx: &mut DriverContext,
        _options: &HeadsetOptions,
    ) -> Result<(), HeadsetError> {
        unsafe {
            let result = ovr::ovr_Initialize(ptr::null());
            if !succeeded(result) {
                return Err(HeadsetError::Unavailable("LibOVR unavailable".into()));
            }

            let mut luid: ovr::ovrGraphicsLuid = mem::zeroed();
            let result = ovr::ovr_Create(&mut self.session, &mut luid);
            if !succeeded(result) || self.session.is_null() {
                ovr::ovr_Shutdown();
                self.session = ptr::null_mut();
                return Err(HeadsetError::Unavailable("no Oculus HMD".into()));
            }

            ovr::ovr_SetTrackingOriginType(self.session, ovr::ovrTrackingOrigin_FloorLevel);

            let desc = ovr::ovr_GetHmdDesc(self.session);
            self.product_name = CStr::from_ptr(desc.ProductName.as_ptr())
                .to_string_lossy()
                .into_owned();
            self.default_fov = desc.DefaultEyeFov;

            let size = ovr::ovr_GetFovTextureSize(
                self.session,
                ovr::ovrEye_Left,
                self.default_fov[0],
                1.0,
            );
            self.eye_size = (size.w as u32, size.h as u32);
        }

        self.clip_near = 0.1;
        self.clip_far = 30.0;
        self.mirrored = true;
        self.frame_index = 0;
        self.session_lost = false;
        {
            let mut caches = self.caches.borrow_mut();
            caches.tracking_dirty = true;
            caches.input_dirty = true;
        }

        info!("Oculus session up: {}", self.product_name);
        self.initialized = true;
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut DriverContext) {
        if self.initialized {
            self.destroy_render_targets(ctx);
            unsafe {
                ovr::ovr_Destroy(self.session);
                ovr::ovr_Shutdown();
            }
        }
        self.session = ptr::null_mut();
        self.registry.clear();
        self.events.clear();
        self.initialized = false;
    }

    fn headset_type(&self) -> HeadsetType {
        HeadsetType::Rift
    }

    fn origin_type(&self) -> HeadsetOrigin {
        HeadsetOrigin::Floor
    }

    fn name(&self) -> String {
        self.product_name.clone()
    }

    fn is_mounted(&self) -> bool {
        if !self.initialized {
            return false;
        }
        let mut status: ovr::ovrSessionStatus = unsafe { mem::zeroed() };
        let result = unsafe { ovr::ovr_GetSessionStatus(self.session, &mut status) };
        succeeded(result) && status.HmdMounted != 0
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    fn display_dimensions(&self) -> (u32, u32) {
        if self.initialized {
            (self.eye_size.0 * 2, self.eye_size.1)
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
        if !self.initialized {
            return (0.0, 0.0);
        }
        let mut dimensions: ovr::ovrVector3f = unsafe { mem::zeroed() };
        let result = unsafe {
            ovr::ovr_GetBoundaryDimensions(
                self.session,
                ovr::ovrBoundary_PlayArea,
                &mut dimensions,
            )
        };
        if succeeded(result) {
            (dimensions.x, dimensions.z)
        } else {
            (0.0, 0.0)
        }
    }

    fn pose(&self) -> Pose {
        if !self.initialized {
            return Pose::default();
        }
        pose_state_to_pose(&self.tracking().HeadPose)
    }

    fn eye_pose(&self, eye: Eye) -> Pose {
        if !self.initialized {
            return Pose::default();
        }
        let tracking = self.tracking();
        let head = pose_to_matrix(&tracking.HeadPose.ThePose);
        let vr_eye = match eye {
            Eye::Left => ovr::ovrEye_Left,
            Eye::Right => ovr::ovrEye_Right,
        };
        let render_desc = unsafe {
            ovr::ovr_GetRenderDesc(self.session, vr_eye, self.default_fov[eye.index()])
        };
        let transform =
            utils::mat4_multiply(&head, &pose_to_matrix(&render_desc.HmdToEyePose));
        Pose::from_matrix(&transform)
    }

    fn velocity(&self) -> [f32; 3] {
        if !self.initialized {
            return [0.0; 3];
        }
        let state = self.tracking().HeadPose;
        [
            state.LinearVelocity.x,
            state.LinearVelocity.y,
            state.LinearVelocity.z,
        ]
    }

    fn angular_velocity(&self) -> [f32; 3] {
        if !self.initialized {
            return [0.0; 3];
        }
        let state = self.tracking().HeadPose;
        [
            state.AngularVelocity.x,
            state.AngularVelocity.y,
            state.AngularVelocity.z,
        ]
    }

    fn recenter(&mut self) {
        if self.initialized {
            unsafe { ovr::ovr_RecenterTrackingOrigin(self.session) };
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
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return Pose::default(),
        };
        pose_state_to_pose(&self.tracking().HandPoses[hand])
    }

    fn controller_velocity(&self, controller: ControllerHandle) -> [f32; 3] {
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return [0.0; 3],
        };
        let state = self.tracking().HandPoses[hand];
        [
            state.LinearVelocity.x,
            state.LinearVelocity.y,
            state.LinearVelocity.z,
        ]
    }

    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return 0.0,
        };
        let input = self.input();
        match axis {
            ControllerAxis::Trigger => input.IndexTrigger[hand],
            ControllerAxis::Grip => input.HandTrigger[hand],
            ControllerAxis::TouchpadX => input.Thumbstick[hand].x,
            ControllerAxis::TouchpadY => input.Thumbstick[hand].y,
        }
    }

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return false,
        };
        OculusDriver::button_mask(button, hand)
            .map_or(false, |mask| self.input().Buttons as u32 & mask != 0)
    }

    fn controller_is_touched(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return false,
        };
        OculusDriver::touch_mask(button, hand)
            .map_or(false, |mask| self.input().Touches as u32 & mask != 0)
    }

    fn controller_vibrate(&mut self, controller: ControllerHandle, duration: f32, power: f32) {
        if duration <= 0.0 {
            return;
        }
        let hand = match (self.initialized, self.hand_index(controller)) {
            (true, Some(hand)) => hand,
            _ => return,
        };
        // The runtime caps pulses itself; duration beyond that is ignored.
        let controller_type = if hand == LEFT_INDEX as usize {
            ovr::ovrControllerType_LTouch
        } else {
            ovr::ovrControllerType_RTouch
        };
        unsafe {
            ovr::ovr_SetControllerVibration(self.session, controller_type, 1.0, power);
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
            return Err(HeadsetError::DriverLost("Oculus display lost".into()));
        }
        if !self.ensure_swap_chain(ctx) {
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        let (eye_width, eye_height) = self.eye_size;
        let predicted =
            unsafe { ovr::ovr_GetPredictedDisplayTime(self.session, self.frame_index) };
        let tracking =
            unsafe { ovr::ovr_GetTrackingState(self.session, predicted, ovr::ovrTrue as _) };
        {
            // This is the frame's pose snapshot; queries during the frame
            // reuse it.
            let mut caches = self.caches.borrow_mut();
            caches.tracking = tracking;
            caches.tracking_dirty = false;
        }

        let head = pose_to_matrix(&tracking.HeadPose.ThePose);

        let mut index = 0i32;
        let result = unsafe {
            ovr::ovr_GetTextureSwapChainCurrentIndex(self.session, self.chain, &mut index)
        };
        if !succeeded(result) || index < 0 || index as usize >= self.chain_canvases.len() {
            warn!("Swap chain image unavailable ({}), skipping frame", result);
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }
        let canvas = self.chain_canvases[index as usize];

        let (near, far) = (self.clip_near, self.clip_far);
        let mut render_poses: [ovr::ovrPosef; 2] = unsafe { mem::zeroed() };

        for eye in [Eye::Left, Eye::Right].iter() {
            let i = eye.index();
            let vr_eye = match eye {
                Eye::Left => ovr::ovrEye_Left,
                Eye::Right => ovr::ovrEye_Right,
            };
            let render_desc =
                unsafe { ovr::ovr_GetRenderDesc(self.session, vr_eye, self.default_fov[i]) };
            let eye_transform =
                utils::mat4_multiply(&head, &pose_to_matrix(&render_desc.HmdToEyePose));
            let orientation = utils::quat_from_matrix(&eye_transform);
            render_poses[i] = ovr::ovrPosef {
                Orientation: ovr::ovrQuatf {
                    x: orientation[0],
                    y: orientation[1],
                    z: orientation[2],
                    w: orientation[3],
                },
                Position: ovr::ovrVector3f {
                    x: eye_transform[12],
                    y: eye_transform[13],
                    z: eye_transform[14],
                },
            };

            let fov = self.default_fov[i];
            let projection =
                utils::mat4_fov_projection(fov.UpTan, fov.DownTan, fov.LeftTan, fov.RightTan, near, far);

            callback(&RenderPass {
                canvas: Some(canvas),
                views: &[EyeView {
                    eye: *eye,
                    view: utils::mat4_invert_pose(&eye_transform),
                    projection,
                    viewport: Viewport {
                        x: i as i32 * eye_width as i32,
                        y: 0,
                        width: eye_width as i32,
                        height: eye_height as i32,
                    },
                }],
            });
        }

        ctx.graphics.resolve(canvas);
        unsafe { ovr::ovr_CommitTextureSwapChain(self.session, self.chain) };

        let mut layer: ovr::ovrLayerEyeFov = unsafe { mem::zeroed() };
        layer.Header.Type = ovr::ovrLayerType_EyeFov;
        layer.Header.Flags = ovr::ovrLayerFlag_TextureOriginAtBottomLeft as u32;
        layer.SensorSampleTime = predicted;
        for i in 0..2 {
            layer.ColorTexture[i] = self.chain;
            layer.Fov[i] = self.default_fov[i];
            layer.RenderPose[i] = render_poses[i];
            layer.Viewport[i] = ovr::ovrRecti {
                Pos: ovr::ovrVector2i {
                    x: i as i32 * eye_width as i32,
                    y: 0,
                },
                Size: ovr::ovrSizei {
                    w: eye_width as i32,
                    h: eye_height as i32,
                },
            };
        }

        let layers: [*const ovr::ovrLayerHeader; 1] = [&layer.Header];
        let result = unsafe {
            ovr::ovr_SubmitFrame(
                self.session,
                self.frame_index,
                ptr::null(),
                layers.as_ptr() as *mut _,
                1,
            )
        };
        self.frame_index += 1;

        if result == ovr::ovrError_DisplayLost {
            self.session_lost = true;
            return Err(HeadsetError::DriverLost("Oculus display lost".into()));
        }
        if !succeeded(result) {
            // Recoverable: count it as a skipped frame and keep going.
            warn!("ovr_SubmitFrame failed ({})", result);
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        if self.mirrored {
            if let Some(mirror) = self.mirror_canvas {
                ctx.graphics.blit_to_window(mirror);
            } else {
                let desc = ovr::ovrMirrorTextureDesc {
                    Format: ovr::OVR_FORMAT_R8G8B8A8_UNORM_SRGB,
                    Width: (eye_width * 2) as i32,
                    Height: eye_height as i32,
                    MiscFlags: 0,
                };
                let result = unsafe {
                    ovr::ovr_CreateMirrorTextureGL(self.session, &desc, &mut self.mirror)
                };
                if succeeded(result) && !self.mirror.is_null() {
                    let mut texture = 0u32;
                    unsafe {
                        ovr::ovr_GetMirrorTextureBufferGL(self.session, self.mirror, &mut texture)
                    };
                    let canvas =
                        ctx.graphics
                            .import_texture(texture as u64, eye_width * 2, eye_height);
                    self.mirror_canvas = Some(canvas);
                    ctx.graphics.blit_to_window(canvas);
                }
            }
        }

        Ok(())
    }

    fn update(&mut self, _ctx: &mut DriverContext, _dt: f32) {
        if !self.initialized {
            return;
        }
        {
            let mut caches = self.caches.borrow_mut();
            caches.tracking_dirty = true;
            caches.input_dirty = true;
        }
        self.check_session_status();
        self.sync_controllers();
    }

    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        self.events.drain(..).collect()
    }
}
