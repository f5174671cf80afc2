use std::ffi::CString;
use std::mem;
use std::ptr;

use headset_api::utils;
use headset_api::{
    CanvasDesc, CanvasHandle, ControllerAxis, ControllerButton, ControllerHand, ControllerHandle,
    ControllerRegistry, DriverContext, Eye, EyeView, HeadsetDriver, HeadsetError, HeadsetEvent,
    HeadsetOptions, HeadsetOrigin, HeadsetType, Pose, RenderPass, Viewport,
};
use openvr_sys as sys;

use super::constants;

/// SteamVR/OpenVR driver.
///
/// Poses are compositor-synchronized: `render_to` blocks in `WaitGetPoses`
/// and every pose query made while the frame is in flight reuses that
/// snapshot; queries outside a frame poll a fresh predicted pose. Both eyes
/// render into one double-wide canvas submitted with per-eye texture bounds.
pub struct OpenVRDriver {
    initialized: bool,
    system: *mut sys::VR_IVRSystem_FnTable,
    compositor: *mut sys::VR_IVRCompositor_FnTable,
    chaperone: *mut sys::VR_IVRChaperone_FnTable,
    headset_index: u32,
    htype: HeadsetType,
    is_rendering: bool,
    tracking_lost: bool,
    render_poses: [sys::TrackedDevicePose_t; constants::MAX_POSES],
    refresh_rate: f32,
    vsync_to_photons: f32,
    offset: f32,
    msaa: u32,
    mirrored: bool,
    clip_near: f32,
    clip_far: f32,
    canvas: Option<CanvasHandle>,
    canvas_size: (u32, u32),
    registry: ControllerRegistry,
    events: Vec<HeadsetEvent>,
}

unsafe impl Send for OpenVRDriver {}

fn get_fn_table<T>(version: &str) -> Result<*mut T, HeadsetError> {
    let name = CString::new(format!("FnTable:{}", version)).unwrap();
    let mut error = sys::EVRInitError_VRInitError_None;
    let table = unsafe { sys::VR_GetGenericInterface(name.as_ptr(), &mut error) };
    if error != sys::EVRInitError_VRInitError_None || table == 0 {
        return Err(HeadsetError::InitFailed(format!(
            "missing interface {}",
            version
        )));
    }
    Ok(table as *mut T)
}

impl OpenVRDriver {
    pub fn new() -> OpenVRDriver {
        OpenVRDriver {
            initialized: false,
            system: ptr::null_mut(),
            compositor: ptr::null_mut(),
            chaperone: ptr::null_mut(),
            headset_index: sys::k_unTrackedDeviceIndex_Hmd,
            htype: HeadsetType::Unknown,
            is_rendering: false,
            tracking_lost: false,
            render_poses: unsafe { mem::zeroed() },
            refresh_rate: 90.0,
            vsync_to_photons: 0.0,
            offset: 0.0,
            msaa: 0,
            mirrored: true,
            clip_near: 0.1,
            clip_far: 30.0,
            canvas: None,
            canvas_size: (0, 0),
            registry: ControllerRegistry::new(),
            events: Vec::new(),
        }
    }

    fn string_property(&self, index: u32, prop: sys::ETrackedDeviceProperty) -> String {
        let mut buffer = [0u8; 128];
        let mut error = sys::ETrackedPropertyError_TrackedProp_Success;
        let size = unsafe {
            (*self.system).GetStringTrackedDeviceProperty.unwrap()(
                index,
                prop,
                buffer.as_mut_ptr() as *mut i8,
                buffer.len() as u32,
                &mut error,
            )
        };
        if size == 0 || error != sys::ETrackedPropertyError_TrackedProp_Success {
            return String::new();
        }
        let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
        String::from_utf8_lossy(&buffer[..end]).into_owned()
    }

    fn float_property(&self, index: u32, prop: sys::ETrackedDeviceProperty) -> f32 {
        let mut error = sys::ETrackedPropertyError_TrackedProp_Success;
        let value = unsafe {
            (*self.system).GetFloatTrackedDeviceProperty.unwrap()(index, prop, &mut error)
        };
        if error == sys::ETrackedPropertyError_TrackedProp_Success {
            value
        } else {
            0.0
        }
    }

    fn is_controller(&self, index: u32) -> bool {
        unsafe {
            if !(*self.system).IsTrackedDeviceConnected.unwrap()(index) {
                return false;
            }
            let class = (*self.system).GetTrackedDeviceClass.unwrap()(index);
            class == sys::ETrackedDeviceClass_TrackedDeviceClass_Controller
                || class == sys::ETrackedDeviceClass_TrackedDeviceClass_GenericTracker
        }
    }

    /// Snapshot pose inside a frame, fresh predicted pose outside one.
    fn device_pose(&self, index: u32) -> sys::TrackedDevicePose_t {
        if self.is_rendering {
            return self.render_poses[index as usize];
        }

        let mut time_since_vsync = 0.0f32;
        unsafe {
            (*self.system).GetTimeSinceLastVsync.unwrap()(&mut time_since_vsync, ptr::null_mut());
        }
        let frame_duration = 1.0 / self.refresh_rate;
        let seconds_in_future = frame_duration - time_since_vsync + self.vsync_to_photons;

        let mut poses: [sys::TrackedDevicePose_t; constants::MAX_POSES] = unsafe { mem::zeroed() };
        unsafe {
            (*self.system).GetDeviceToAbsoluteTrackingPose.unwrap()(
                sys::ETrackingUniverseOrigin_TrackingUniverseStanding,
                seconds_in_future,
                poses.as_mut_ptr(),
                poses.len() as u32,
            );
        }
        poses[index as usize]
    }

    fn pose_of(&self, index: u32) -> Pose {
        let device_pose = self.device_pose(index);
        if !device_pose.bPoseIsValid || !device_pose.bDeviceIsConnected {
            return Pose::default();
        }
        let transform = utils::mat4_from_rm34(&device_pose.mDeviceToAbsoluteTracking.m);
        Pose {
            position: [transform[12], transform[13], transform[14]],
            orientation: utils::quat_from_matrix(&transform),
            linear_velocity: device_pose.vVelocity.v,
            angular_velocity: device_pose.vAngularVelocity.v,
        }
    }

    fn controller_state(&self, index: u32) -> sys::VRControllerState_t {
        let mut state: sys::VRControllerState_t = unsafe { mem::zeroed() };
        unsafe {
            (*self.system).GetControllerState.unwrap()(
                index,
                &mut state,
                mem::size_of::<sys::VRControllerState_t>() as u32,
            );
        }
        state
    }

    fn map_button(&self, vendor_button: u32, hand: ControllerHand) -> ControllerButton {
        if self.htype == HeadsetType::Rift {
            return match vendor_button {
                sys::EVRButtonId_k_EButton_Axis1 => ControllerButton::Trigger,
                sys::EVRButtonId_k_EButton_Axis2 => ControllerButton::Grip,
                sys::EVRButtonId_k_EButton_Axis0 => ControllerButton::Touchpad,
                sys::EVRButtonId_k_EButton_A => match hand {
                    ControllerHand::Left => ControllerButton::X,
                    ControllerHand::Right => ControllerButton::A,
                    ControllerHand::Unknown => ControllerButton::Unknown,
                },
                sys::EVRButtonId_k_EButton_ApplicationMenu => match hand {
                    ControllerHand::Left => ControllerButton::Y,
                    ControllerHand::Right => ControllerButton::B,
                    ControllerHand::Unknown => ControllerButton::Unknown,
                },
                _ => ControllerButton::Unknown,
            };
        }
        match vendor_button {
            sys::EVRButtonId_k_EButton_System => ControllerButton::System,
            sys::EVRButtonId_k_EButton_ApplicationMenu => ControllerButton::Menu,
            sys::EVRButtonId_k_EButton_SteamVR_Trigger => ControllerButton::Trigger,
            sys::EVRButtonId_k_EButton_Grip => ControllerButton::Grip,
            sys::EVRButtonId_k_EButton_SteamVR_Touchpad => ControllerButton::Touchpad,
            _ => ControllerButton::Unknown,
        }
    }

    fn button_mask_state(&self, mask: u64, button: ControllerButton, hand: ControllerHand) -> bool {
        let bit = |id: u32| (mask >> id) & 1 == 1;
        if self.htype == HeadsetType::Rift {
            return match button {
                ControllerButton::Trigger => bit(sys::EVRButtonId_k_EButton_Axis1),
                ControllerButton::Grip => bit(sys::EVRButtonId_k_EButton_Axis2),
                ControllerButton::Touchpad => bit(sys::EVRButtonId_k_EButton_Axis0),
                ControllerButton::A => {
                    hand == ControllerHand::Right && bit(sys::EVRButtonId_k_EButton_A)
                }
                ControllerButton::B => {
                    hand == ControllerHand::Right && bit(sys::EVRButtonId_k_EButton_ApplicationMenu)
                }
                ControllerButton::X => {
                    hand == ControllerHand::Left && bit(sys::EVRButtonId_k_EButton_A)
                }
                ControllerButton::Y => {
                    hand == ControllerHand::Left && bit(sys::EVRButtonId_k_EButton_ApplicationMenu)
                }
                _ => false,
            };
        }
        match button {
            ControllerButton::System => bit(sys::EVRButtonId_k_EButton_System),
            ControllerButton::Menu => bit(sys::EVRButtonId_k_EButton_ApplicationMenu),
            ControllerButton::Trigger => bit(sys::EVRButtonId_k_EButton_SteamVR_Trigger),
            ControllerButton::Grip => bit(sys::EVRButtonId_k_EButton_Grip),
            ControllerButton::Touchpad => bit(sys::EVRButtonId_k_EButton_SteamVR_Touchpad),
            _ => false,
        }
    }

    fn hand_of(&self, index: u32) -> ControllerHand {
        match unsafe { (*self.system).GetControllerRoleForTrackedDeviceIndex.unwrap()(index) } {
            sys::ETrackedControllerRole_TrackedControllerRole_LeftHand => ControllerHand::Left,
            sys::ETrackedControllerRole_TrackedControllerRole_RightHand => ControllerHand::Right,
            _ => ControllerHand::Unknown,
        }
    }

    fn pump_vendor_events(&mut self) {
        let mut event: sys::VREvent_t = unsafe { mem::zeroed() };
        loop {
            let pending = unsafe {
                (*self.system).PollNextEvent.unwrap()(
                    &mut event,
                    mem::size_of::<sys::VREvent_t>() as u32,
                )
            };
            if !pending {
                break;
            }

            let index = event.trackedDeviceIndex;
            match event.eventType {
                t if t == sys::EVREventType_VREvent_TrackedDeviceActivated => {
                    if self.is_controller(index) && self.registry.find_by_device(index).is_none() {
                        let handle = self.registry.add(index, self.hand_of(index));
                        self.events.push(HeadsetEvent::ControllerAdded(handle));
                    }
                }
                t if t == sys::EVREventType_VREvent_TrackedDeviceDeactivated => {
                    if let Some(handle) = self.registry.remove_by_device(index) {
                        self.events.push(HeadsetEvent::ControllerRemoved(handle));
                    }
                }
                t if t == sys::EVREventType_VREvent_ButtonPress
                    || t == sys::EVREventType_VREvent_ButtonUnpress =>
                {
                    let pressed = event.eventType == sys::EVREventType_VREvent_ButtonPress;
                    let vendor_button = unsafe { event.data.controller.button };

                    if index == self.headset_index
                        && vendor_button == sys::EVRButtonId_k_EButton_ProximitySensor
                    {
                        self.events.push(HeadsetEvent::Mounted(pressed));
                        continue;
                    }

                    if let Some(handle) = self.registry.find_by_device(index) {
                        let button = self.map_button(vendor_button, self.hand_of(index));
                        self.events.push(if pressed {
                            HeadsetEvent::ControllerPressed(handle, button)
                        } else {
                            HeadsetEvent::ControllerReleased(handle, button)
                        });
                    }
                }
                t if t == sys::EVREventType_VREvent_InputFocusCaptured
                    || t == sys::EVREventType_VREvent_InputFocusReleased =>
                {
                    let focused = event.eventType == sys::EVREventType_VREvent_InputFocusReleased;
                    self.events.push(HeadsetEvent::Focus(focused));
                }
                t if t == sys::EVREventType_VREvent_Quit => {
                    self.events.push(HeadsetEvent::Quit);
                }
                _ => {}
            }
        }
    }
}

impl HeadsetDriver for OpenVRDriver {
    fn initialize(
        &mut self,
        _ctx: &mut DriverContext,
        options: &HeadsetOptions,
    ) -> Result<(), HeadsetError> {
        unsafe {
            if !sys::VR_IsHmdPresent() || !sys::VR_IsRuntimeInstalled() {
                return Err(HeadsetError::Unavailable("no HMD or runtime".into()));
            }

            let mut error = sys::EVRInitError_VRInitError_None;
            sys::VR_InitInternal(&mut error, sys::EVRApplicationType_VRApplication_Scene);
            if error != sys::EVRInitError_VRInitError_None {
                return Err(HeadsetError::Unavailable(format!(
                    "VR_InitInternal failed ({})",
                    error
                )));
            }
        }

        let tables = (|| {
            self.system = get_fn_table(constants::IVRSYSTEM_VERSION)?;
            self.compositor = get_fn_table(constants::IVRCOMPOSITOR_VERSION)?;
            self.chaperone = get_fn_table(constants::IVRCHAPERONE_VERSION)?;
            Ok(())
        })();
        if let Err(err) = tables {
            unsafe { sys::VR_ShutdownInternal() };
            self.system = ptr::null_mut();
            self.compositor = ptr::null_mut();
            self.chaperone = ptr::null_mut();
            return Err(err);
        }

        self.headset_index = sys::k_unTrackedDeviceIndex_Hmd;

        let manufacturer = self.string_property(
            self.headset_index,
            sys::ETrackedDeviceProperty_Prop_ManufacturerName_String,
        );
        self.htype = if manufacturer.starts_with("HTC") {
            HeadsetType::Vive
        } else if manufacturer.starts_with("Oculus") {
            HeadsetType::Rift
        } else if manufacturer.starts_with("WindowsMR") {
            HeadsetType::WindowsMr
        } else {
            HeadsetType::Unknown
        };

        self.refresh_rate = self.float_property(
            self.headset_index,
            sys::ETrackedDeviceProperty_Prop_DisplayFrequency_Float,
        );
        if self.refresh_rate <= 0.0 {
            self.refresh_rate = 90.0;
        }
        self.vsync_to_photons = self.float_property(
            self.headset_index,
            sys::ETrackedDeviceProperty_Prop_SecondsFromVsyncToPhotons_Float,
        );

        let origin = unsafe { (*self.compositor).GetTrackingSpace.unwrap()() };
        self.offset = if origin == sys::ETrackingUniverseOrigin_TrackingUniverseStanding {
            0.0
        } else {
            options.offset
        };
        self.msaa = options.msaa;
        self.mirrored = true;
        self.clip_near = 0.1;
        self.clip_far = 30.0;
        self.is_rendering = false;

        let mut width = 0u32;
        let mut height = 0u32;
        unsafe {
            (*self.system).GetRecommendedRenderTargetSize.unwrap()(&mut width, &mut height);
        }
        self.canvas_size = (width * 2, height);

        for index in 0..constants::MAX_POSES as u32 {
            if self.is_controller(index) {
                self.registry.add(index, self.hand_of(index));
            }
        }

        info!(
            "OpenVR runtime up: {} ({} Hz)",
            self.string_property(
                self.headset_index,
                sys::ETrackedDeviceProperty_Prop_ModelNumber_String
            ),
            self.refresh_rate
        );

        self.initialized = true;
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut DriverContext) {
        if let Some(canvas) = self.canvas.take() {
            ctx.graphics.destroy_canvas(canvas);
        }
        self.registry.clear();
        self.events.clear();
        if self.initialized {
            unsafe { sys::VR_ShutdownInternal() };
        }
        self.system = ptr::null_mut();
        self.compositor = ptr::null_mut();
        self.chaperone = ptr::null_mut();
        self.initialized = false;
    }

    fn headset_type(&self) -> HeadsetType {
        self.htype
    }

    fn origin_type(&self) -> HeadsetOrigin {
        if !self.initialized {
            return HeadsetOrigin::Head;
        }
        match unsafe { (*self.compositor).GetTrackingSpace.unwrap()() } {
            sys::ETrackingUniverseOrigin_TrackingUniverseStanding => HeadsetOrigin::Floor,
            _ => HeadsetOrigin::Head,
        }
    }

    fn name(&self) -> String {
        if !self.initialized {
            return String::new();
        }
        format!(
            "{} {}",
            self.string_property(
                self.headset_index,
                sys::ETrackedDeviceProperty_Prop_ManufacturerName_String
            ),
            self.string_property(
                self.headset_index,
                sys::ETrackedDeviceProperty_Prop_ModelNumber_String
            )
        )
    }

    fn is_mounted(&self) -> bool {
        if !self.initialized {
            return false;
        }
        let state = self.controller_state(self.headset_index);
        (state.ulButtonPressed >> sys::EVRButtonId_k_EButton_ProximitySensor) & 1 == 1
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    fn display_dimensions(&self) -> (u32, u32) {
        if self.initialized {
            self.canvas_size
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
        let mut width = 0.0f32;
        let mut depth = 0.0f32;
        unsafe {
            (*self.chaperone).GetPlayAreaSize.unwrap()(&mut width, &mut depth);
        }
        (width, depth)
    }

    fn bounds_geometry(&self) -> Vec<[f32; 3]> {
        if !self.initialized {
            return Vec::new();
        }
        let mut rect: sys::HmdQuad_t = unsafe { mem::zeroed() };
        let ok = unsafe { (*self.chaperone).GetPlayAreaRect.unwrap()(&mut rect) };
        if !ok {
            return Vec::new();
        }
        rect.vCorners.iter().map(|corner| corner.v).collect()
    }

    fn pose(&self) -> Pose {
        if !self.initialized {
            return Pose::default();
        }
        let mut pose = self.pose_of(self.headset_index);
        pose.position[1] += self.offset;
        pose
    }

    fn eye_pose(&self, eye: Eye) -> Pose {
        if !self.initialized {
            return Pose::default();
        }
        let device_pose = self.device_pose(self.headset_index);
        if !device_pose.bPoseIsValid || !device_pose.bDeviceIsConnected {
            return Pose::default();
        }
        let vr_eye = match eye {
            Eye::Left => sys::EVREye_Eye_Left,
            Eye::Right => sys::EVREye_Eye_Right,
        };
        let eye_to_head =
            unsafe { utils::mat4_from_rm34(&(*self.system).GetEyeToHeadTransform.unwrap()(vr_eye).m) };
        let head = utils::mat4_from_rm34(&device_pose.mDeviceToAbsoluteTracking.m);
        let mut transform = utils::mat4_multiply(&head, &eye_to_head);
        transform[13] += self.offset;
        Pose::from_matrix(&transform)
    }

    fn velocity(&self) -> [f32; 3] {
        if !self.initialized {
            return [0.0; 3];
        }
        self.pose_of(self.headset_index).linear_velocity
    }

    fn angular_velocity(&self) -> [f32; 3] {
        if !self.initialized {
            return [0.0; 3];
        }
        self.pose_of(self.headset_index).angular_velocity
    }

    fn recenter(&mut self) {
        if self.initialized {
            unsafe { (*self.system).ResetSeatedZeroPose.unwrap()() };
            self.events.push(HeadsetEvent::Recentered);
        }
    }

    fn controllers(&self) -> Vec<ControllerHandle> {
        self.registry.handles()
    }

    fn controller_is_connected(&self, controller: ControllerHandle) -> bool {
        match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => unsafe {
                (*self.system).IsTrackedDeviceConnected.unwrap()(c.device_index)
            },
            _ => false,
        }
    }

    fn controller_hand(&self, controller: ControllerHandle) -> ControllerHand {
        match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => self.hand_of(c.device_index),
            _ => ControllerHand::Unknown,
        }
    }

    fn controller_pose(&self, controller: ControllerHandle) -> Pose {
        match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => {
                let mut pose = self.pose_of(c.device_index);
                pose.position[1] += self.offset;
                pose
            }
            _ => Pose::default(),
        }
    }

    fn controller_velocity(&self, controller: ControllerHandle) -> [f32; 3] {
        match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => self.pose_of(c.device_index).linear_velocity,
            _ => [0.0; 3],
        }
    }

    fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        let device_index = match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => c.device_index,
            _ => return 0.0,
        };
        let state = self.controller_state(device_index);
        match axis {
            ControllerAxis::Trigger => state.rAxis[1].x,
            ControllerAxis::Grip => {
                if self.htype == HeadsetType::Rift {
                    state.rAxis[2].x
                } else {
                    0.0
                }
            }
            ControllerAxis::TouchpadX => state.rAxis[0].x,
            ControllerAxis::TouchpadY => state.rAxis[0].y,
        }
    }

    fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        let device_index = match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => c.device_index,
            _ => return false,
        };
        let state = self.controller_state(device_index);
        self.button_mask_state(state.ulButtonPressed, button, self.hand_of(device_index))
    }

    fn controller_is_touched(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        let device_index = match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => c.device_index,
            _ => return false,
        };
        let state = self.controller_state(device_index);
        self.button_mask_state(state.ulButtonTouched, button, self.hand_of(device_index))
    }

    fn controller_vibrate(&mut self, controller: ControllerHandle, duration: f32, _power: f32) {
        if duration <= 0.0 {
            return;
        }
        let device_index = match (self.initialized, self.registry.get(controller)) {
            (true, Some(c)) => c.device_index,
            _ => return,
        };
        let microseconds = (duration * 1e6) as u16;
        unsafe {
            (*self.system).TriggerHapticPulse.unwrap()(device_index, 0, microseconds);
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

        if self.canvas.is_none() {
            let desc = CanvasDesc {
                width: self.canvas_size.0,
                height: self.canvas_size.1,
                stereo: true,
                depth: true,
                msaa: self.msaa,
            };
            match ctx.graphics.create_canvas(&desc) {
                Ok(canvas) => self.canvas = Some(canvas),
                Err(err) => {
                    warn!("OpenVR canvas creation failed ({}), skipping frame", err);
                    self.events.push(HeadsetEvent::FrameSkipped);
                    return Ok(());
                }
            }
        }
        let canvas = self.canvas.unwrap();

        // Blocks until the compositor hands out this frame's predicted poses.
        self.is_rendering = true;
        let wait_error = unsafe {
            (*self.compositor).WaitGetPoses.unwrap()(
                self.render_poses.as_mut_ptr(),
                self.render_poses.len() as u32,
                ptr::null_mut(),
                0,
            )
        };
        if wait_error != sys::EVRCompositorError_VRCompositorError_None {
            self.is_rendering = false;
            warn!("WaitGetPoses failed ({}), skipping frame", wait_error);
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        let head_pose = self.render_poses[self.headset_index as usize];
        if !head_pose.bDeviceIsConnected {
            self.is_rendering = false;
            self.events.push(HeadsetEvent::FrameSkipped);
            return Err(HeadsetError::DriverLost("HMD disconnected".into()));
        }
        if !head_pose.bPoseIsValid && !self.tracking_lost {
            self.events.push(HeadsetEvent::TrackingLost);
        }
        self.tracking_lost = !head_pose.bPoseIsValid;
        let head = utils::mat4_from_rm34(&head_pose.mDeviceToAbsoluteTracking.m);

        let (near, far) = (self.clip_near, self.clip_far);
        let half = (self.canvas_size.0 / 2) as i32;

        for eye in [Eye::Left, Eye::Right].iter() {
            let vr_eye = match eye {
                Eye::Left => sys::EVREye_Eye_Left,
                Eye::Right => sys::EVREye_Eye_Right,
            };

            let (projection, eye_to_head) = unsafe {
                (
                    utils::mat4_from_rm44(
                        &(*self.system).GetProjectionMatrix.unwrap()(vr_eye, near, far).m,
                    ),
                    utils::mat4_from_rm34(&(*self.system).GetEyeToHeadTransform.unwrap()(vr_eye).m),
                )
            };

            let mut eye_transform = utils::mat4_multiply(&head, &eye_to_head);
            eye_transform[13] += self.offset;
            let view = utils::mat4_invert_pose(&eye_transform);

            callback(&RenderPass {
                canvas: Some(canvas),
                views: &[EyeView {
                    eye: *eye,
                    view,
                    projection,
                    viewport: Viewport {
                        x: eye.index() as i32 * half,
                        y: 0,
                        width: half,
                        height: self.canvas_size.1 as i32,
                    },
                }],
            });
        }

        self.is_rendering = false;

        ctx.graphics.resolve(canvas);
        let mut texture = sys::Texture_t {
            handle: ctx.graphics.native_texture(canvas) as *mut std::os::raw::c_void,
            eType: sys::ETextureType_TextureType_OpenGL,
            eColorSpace: sys::EColorSpace_ColorSpace_Gamma,
        };
        let mut left_bounds = sys::VRTextureBounds_t {
            uMin: 0.0,
            vMin: 0.0,
            uMax: 0.5,
            vMax: 1.0,
        };
        let mut right_bounds = sys::VRTextureBounds_t {
            uMin: 0.5,
            vMin: 0.0,
            uMax: 1.0,
            vMax: 1.0,
        };
        let submit_errors = unsafe {
            let left = (*self.compositor).Submit.unwrap()(
                sys::EVREye_Eye_Left,
                &mut texture,
                &mut left_bounds,
                sys::EVRSubmitFlags_Submit_Default,
            );
            let right = (*self.compositor).Submit.unwrap()(
                sys::EVREye_Eye_Right,
                &mut texture,
                &mut right_bounds,
                sys::EVRSubmitFlags_Submit_Default,
            );
            (left, right)
        };
        if submit_errors.0 != sys::EVRCompositorError_VRCompositorError_None
            || submit_errors.1 != sys::EVRCompositorError_VRCompositorError_None
        {
            // Recoverable: log it, count the frame as skipped, try again next
            // frame.
            warn!(
                "Compositor rejected frame ({}/{})",
                submit_errors.0, submit_errors.1
            );
            self.events.push(HeadsetEvent::FrameSkipped);
            return Ok(());
        }

        if self.mirrored {
            ctx.graphics.blit_to_window(canvas);
        }

        Ok(())
    }

    fn update(&mut self, _ctx: &mut DriverContext, _dt: f32) {
        if self.initialized {
            self.pump_vendor_events();
        }
    }

    fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        self.events.drain(..).collect()
    }
}
