use headset_api::{
    ControllerAxis, ControllerButton, ControllerHand, ControllerHandle, DriverContext, Eye,
    Graphics, HeadsetDriver, HeadsetError, HeadsetEvent, HeadsetOptions, HeadsetOrigin,
    HeadsetType, Platform, Pose, RenderPass,
};

use crate::api;

/// Single entry point to the headset subsystem.
///
/// Owns the graphics/platform collaborators and at most one live driver,
/// selected once at construction. Not reentrant and not internally locked;
/// the application's single-threaded frame loop is the synchronization model.
/// When no driver is active every query returns its neutral default and
/// `render_to`/`update` are no-ops, so a headset-less machine behaves like a
/// plain desktop application.
pub struct Headset {
    driver: Option<Box<dyn HeadsetDriver>>,
    graphics: Box<dyn Graphics>,
    platform: Box<dyn Platform>,
    pending: Vec<HeadsetEvent>,
}

impl Headset {
    /// Selects a driver from the configured token list (or the built-in
    /// default order when the list is empty). Unrecognized tokens and tokens
    /// whose backend is not compiled in are skipped with a warning.
    pub fn new(
        graphics: Box<dyn Graphics>,
        platform: Box<dyn Platform>,
        options: HeadsetOptions,
    ) -> Headset {
        let tokens: Vec<String> = if options.drivers.is_empty() {
            api::DEFAULT_DRIVERS.iter().map(|s| s.to_string()).collect()
        } else {
            options.drivers.clone()
        };

        let mut candidates = Vec::new();
        for token in &tokens {
            match api::create_driver(token) {
                Some(driver) => candidates.push(driver),
                None => warn!("Ignoring unknown headset driver '{}'", token),
            }
        }

        Headset::from_candidates(graphics, platform, options, candidates)
    }

    /// Like `new`, but with an explicit candidate list. The first candidate
    /// whose `initialize` succeeds becomes the sole active driver; the rest
    /// are never initialized.
    pub fn from_candidates(
        mut graphics: Box<dyn Graphics>,
        mut platform: Box<dyn Platform>,
        options: HeadsetOptions,
        candidates: Vec<Box<dyn HeadsetDriver>>,
    ) -> Headset {
        let mut selected = None;

        for mut candidate in candidates {
            if selected.is_some() {
                break;
            }
            let mut ctx = DriverContext {
                graphics: &mut *graphics,
                platform: &mut *platform,
            };
            match candidate.initialize(&mut ctx, &options) {
                Ok(()) => {
                    info!(
                        "Selected headset driver '{}' ({})",
                        candidate.headset_type().as_str(),
                        candidate.name()
                    );
                    selected = Some(candidate);
                }
                Err(err) => {
                    info!("Headset driver unavailable: {}", err);
                    candidate.destroy(&mut ctx);
                }
            }
        }

        if selected.is_none() {
            warn!("No headset driver initialized; queries will return neutral defaults");
        }

        Headset {
            driver: selected,
            graphics,
            platform,
            pending: Vec::new(),
        }
    }

    /// Injects a single externally-constructed driver (tests, embedders).
    pub fn with_driver(
        graphics: Box<dyn Graphics>,
        platform: Box<dyn Platform>,
        options: HeadsetOptions,
        driver: Box<dyn HeadsetDriver>,
    ) -> Headset {
        Headset::from_candidates(graphics, platform, options, vec![driver])
    }

    /// Whether a driver is active.
    pub fn is_present(&self) -> bool {
        self.driver.is_some()
    }

    pub fn headset_type(&self) -> HeadsetType {
        self.driver
            .as_ref()
            .map_or(HeadsetType::Unknown, |d| d.headset_type())
    }

    pub fn origin_type(&self) -> HeadsetOrigin {
        self.driver
            .as_ref()
            .map_or(HeadsetOrigin::Head, |d| d.origin_type())
    }

    pub fn name(&self) -> String {
        self.driver.as_ref().map_or(String::new(), |d| d.name())
    }

    pub fn is_mounted(&self) -> bool {
        self.driver.as_ref().map_or(false, |d| d.is_mounted())
    }

    pub fn is_mirrored(&self) -> bool {
        self.driver.as_ref().map_or(false, |d| d.is_mirrored())
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        if let Some(driver) = self.driver.as_mut() {
            driver.set_mirrored(mirrored);
        }
    }

    pub fn display_dimensions(&self) -> (u32, u32) {
        self.driver.as_ref().map_or((0, 0), |d| d.display_dimensions())
    }

    pub fn clip_distance(&self) -> (f32, f32) {
        self.driver.as_ref().map_or((0.0, 0.0), |d| d.clip_distance())
    }

    pub fn set_clip_distance(&mut self, near: f32, far: f32) {
        if let Some(driver) = self.driver.as_mut() {
            driver.set_clip_distance(near, far);
        }
    }

    pub fn bounds_dimensions(&self) -> (f32, f32) {
        self.driver.as_ref().map_or((0.0, 0.0), |d| d.bounds_dimensions())
    }

    pub fn bounds_geometry(&self) -> Vec<[f32; 3]> {
        self.driver.as_ref().map_or(Vec::new(), |d| d.bounds_geometry())
    }

    pub fn pose(&self) -> Pose {
        self.driver.as_ref().map_or(Pose::default(), |d| d.pose())
    }

    pub fn eye_pose(&self, eye: Eye) -> Pose {
        self.driver.as_ref().map_or(Pose::default(), |d| d.eye_pose(eye))
    }

    pub fn velocity(&self) -> [f32; 3] {
        self.driver.as_ref().map_or([0.0; 3], |d| d.velocity())
    }

    pub fn angular_velocity(&self) -> [f32; 3] {
        self.driver.as_ref().map_or([0.0; 3], |d| d.angular_velocity())
    }

    pub fn recenter(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            driver.recenter();
        }
    }

    pub fn controllers(&self) -> Vec<ControllerHandle> {
        self.driver.as_ref().map_or(Vec::new(), |d| d.controllers())
    }

    pub fn controller_count(&self) -> usize {
        self.driver.as_ref().map_or(0, |d| d.controller_count())
    }

    pub fn controller_is_connected(&self, controller: ControllerHandle) -> bool {
        self.driver
            .as_ref()
            .map_or(false, |d| d.controller_is_connected(controller))
    }

    pub fn controller_hand(&self, controller: ControllerHandle) -> ControllerHand {
        self.driver
            .as_ref()
            .map_or(ControllerHand::Unknown, |d| d.controller_hand(controller))
    }

    pub fn controller_pose(&self, controller: ControllerHandle) -> Pose {
        self.driver
            .as_ref()
            .map_or(Pose::default(), |d| d.controller_pose(controller))
    }

    pub fn controller_velocity(&self, controller: ControllerHandle) -> [f32; 3] {
        self.driver
            .as_ref()
            .map_or([0.0; 3], |d| d.controller_velocity(controller))
    }

    pub fn controller_axis(&self, controller: ControllerHandle, axis: ControllerAxis) -> f32 {
        self.driver
            .as_ref()
            .map_or(0.0, |d| d.controller_axis(controller, axis))
    }

    pub fn controller_is_down(&self, controller: ControllerHandle, button: ControllerButton) -> bool {
        self.driver
            .as_ref()
            .map_or(false, |d| d.controller_is_down(controller, button))
    }

    pub fn controller_is_touched(
        &self,
        controller: ControllerHandle,
        button: ControllerButton,
    ) -> bool {
        self.driver
            .as_ref()
            .map_or(false, |d| d.controller_is_touched(controller, button))
    }

    pub fn controller_vibrate(&mut self, controller: ControllerHandle, duration: f32, power: f32) {
        if let Some(driver) = self.driver.as_mut() {
            driver.controller_vibrate(controller, duration, power);
        }
    }

    /// Renders one stereo frame through the active driver. Without an active
    /// driver this returns immediately and the callback is never invoked.
    ///
    /// A driver reporting `DriverLost` is destroyed here; the subsystem then
    /// stays driverless for the rest of the session and a `DriverLost` event
    /// is queued.
    pub fn render_to<F>(&mut self, mut callback: F)
    where
        F: FnMut(&RenderPass),
    {
        let mut lost = false;
        if let Some(driver) = self.driver.as_mut() {
            let mut ctx = DriverContext {
                graphics: &mut *self.graphics,
                platform: &mut *self.platform,
            };
            match driver.render_to(&mut ctx, &mut callback) {
                Ok(()) => {}
                Err(HeadsetError::DriverLost(reason)) => {
                    error!("Headset driver lost: {}", reason);
                    driver.destroy(&mut ctx);
                    lost = true;
                }
                Err(err) => {
                    warn!("Headset frame failed: {}", err);
                }
            }
        }
        if lost {
            self.driver = None;
            self.pending.push(HeadsetEvent::DriverLost);
        }
    }

    /// Per-frame housekeeping for drivers that need it (event pump, input
    /// refresh, motion integration).
    pub fn update(&mut self, dt: f32) {
        if let Some(driver) = self.driver.as_mut() {
            let mut ctx = DriverContext {
                graphics: &mut *self.graphics,
                platform: &mut *self.platform,
            };
            driver.update(&mut ctx, dt);
        }
    }

    /// Drains lifecycle events from the façade and the active driver.
    pub fn poll_events(&mut self) -> Vec<HeadsetEvent> {
        let mut events: Vec<HeadsetEvent> = self.pending.drain(..).collect();
        if let Some(driver) = self.driver.as_mut() {
            events.append(&mut driver.poll_events());
        }
        events
    }

    /// Tears the subsystem down. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            let mut ctx = DriverContext {
                graphics: &mut *self.graphics,
                platform: &mut *self.platform,
            };
            driver.destroy(&mut ctx);
        }
    }
}

impl Drop for Headset {
    fn drop(&mut self) {
        self.destroy();
    }
}
