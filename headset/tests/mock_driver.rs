//! Mock driver scenarios:
//! - controller lifecycle driven by simulated vendor events
//! - per-eye vs single-pass callback invariants
//! - lost swap chain => whole frame skipped, recovery next frame
//! - clip distance changes apply to the next frame's projection
//! - graphics collaborator interactions (canvas, resolve, mirror blit)

mod common;

use common::{GraphicsLog, RecordingGraphics, ScriptedPlatform};
use headset::api::{MockControl, MockDriver};
use headset::{
    ControllerAxis, ControllerButton, ControllerHand, Headset, HeadsetEvent, HeadsetOptions,
    Pose,
};
use std::sync::{Arc, Mutex};

fn mock_headset() -> (Headset, MockControl, Arc<Mutex<GraphicsLog>>) {
    let (graphics, log) = RecordingGraphics::new();
    let (platform, _) = ScriptedPlatform::new();
    let (driver, control) = MockDriver::new();
    let headset = Headset::with_driver(
        Box::new(graphics),
        Box::new(platform),
        HeadsetOptions::default(),
        Box::new(driver),
    );
    (headset, control, log)
}

#[test]
fn controller_lifecycle_events_fire_exactly_once() {
    let (mut headset, control, _log) = mock_headset();
    assert_eq!(headset.controller_count(), 0);

    control.connect_controller(3, ControllerHand::Left);
    headset.update(0.016);
    assert_eq!(headset.controller_count(), 1);

    let controller = headset.controllers()[0];
    assert!(headset.controller_is_connected(controller));
    assert_eq!(headset.controller_hand(controller), ControllerHand::Left);

    let events = headset.poll_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HeadsetEvent::ControllerAdded(_)))
            .count(),
        1
    );

    control.disconnect_controller(3);
    headset.update(0.016);
    assert_eq!(headset.controller_count(), 0);

    let events = headset.poll_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HeadsetEvent::ControllerRemoved(_)))
            .count(),
        1
    );

    // The old handle is dead, not recycled: every accessor is neutral.
    assert!(!headset.controller_is_connected(controller));
    assert_eq!(headset.controller_hand(controller), ControllerHand::Unknown);
    assert_eq!(headset.controller_pose(controller), Pose::default());
    assert_eq!(headset.controller_axis(controller, ControllerAxis::Trigger), 0.0);
}

#[test]
fn multi_pass_invokes_callback_once_per_eye() {
    let (mut headset, control, _log) = mock_headset();

    let mut calls = 0;
    headset.render_to(|pass| {
        calls += 1;
        assert_eq!(pass.views.len(), 1);
        assert!(pass.canvas.is_some());
        assert!(!pass.is_single_pass());
    });
    assert_eq!(calls, 2);

    control.set_single_pass(true);
    let mut calls = 0;
    let mut views = 0;
    headset.render_to(|pass| {
        calls += 1;
        views = pass.views.len();
    });
    assert_eq!(calls, 1);
    assert_eq!(views, 2);
}

#[test]
fn lost_swap_chain_skips_the_whole_frame() {
    let (mut headset, control, _log) = mock_headset();

    control.fail_next_acquire();
    let mut calls = 0;
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 0);

    let events = headset.poll_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HeadsetEvent::FrameSkipped))
            .count(),
        1
    );

    // The device "recovered": the next frame renders normally.
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 2);
}

#[test]
fn clip_changes_take_effect_next_frame() {
    let (mut headset, _control, _log) = mock_headset();

    let mut first = [0.0f32; 16];
    headset.render_to(|pass| first = pass.views[0].projection);

    headset.set_clip_distance(0.5, 500.0);
    assert_eq!(headset.clip_distance(), (0.5, 500.0));

    let mut second = [0.0f32; 16];
    headset.render_to(|pass| second = pass.views[0].projection);

    // The depth terms move with the clip planes.
    assert!(first[10] != second[10] || first[14] != second[14]);
}

#[test]
fn graphics_sees_canvas_resolve_and_mirror() {
    let (mut headset, _control, log) = mock_headset();

    headset.render_to(|_| {});
    headset.render_to(|_| {});
    {
        let log = log.lock().unwrap();
        // One lazily-created stereo canvas, resolved every frame, mirrored to
        // the window every frame.
        assert_eq!(log.created.len(), 1);
        assert!(log.created[0].stereo);
        assert_eq!(log.resolves, 2);
        assert_eq!(log.blits, 2);
    }

    headset.set_mirrored(false);
    headset.render_to(|_| {});
    {
        let log = log.lock().unwrap();
        assert_eq!(log.resolves, 3);
        assert_eq!(log.blits, 2);
    }

    headset.destroy();
    assert_eq!(log.lock().unwrap().destroyed.len(), 1);
}

#[test]
fn scripted_input_reaches_the_accessors() {
    let (mut headset, control, _log) = mock_headset();

    control.connect_controller(0, ControllerHand::Right);
    headset.update(0.016);
    let controller = headset.controllers()[0];

    control.set_axis(0, ControllerAxis::Trigger, 0.7);
    control.set_button(0, ControllerButton::A, true, true);
    assert_eq!(headset.controller_axis(controller, ControllerAxis::Trigger), 0.7);
    assert!(headset.controller_is_down(controller, ControllerButton::A));
    assert!(headset.controller_is_touched(controller, ControllerButton::A));
    assert!(!headset.controller_is_down(controller, ControllerButton::B));

    headset.controller_vibrate(controller, 0.1, 0.5);
    headset.controller_vibrate(controller, 0.0, 1.0);
    assert_eq!(control.vibrations(), vec![(0, 0.1, 0.5)]);
}

#[test]
fn eye_poses_are_separated_horizontally() {
    let (headset, _control, _log) = mock_headset();

    let left = headset.eye_pose(headset::Eye::Left);
    let right = headset.eye_pose(headset::Eye::Right);
    let separation = right.position[0] - left.position[0];
    assert!((separation - 0.064).abs() < 1e-6);
}

#[test]
fn mount_state_follows_vendor_events() {
    let (mut headset, control, _log) = mock_headset();
    assert!(headset.is_mounted());

    control.set_mounted(false);
    headset.update(0.016);
    assert!(!headset.is_mounted());

    let events = headset.poll_events();
    assert!(events.contains(&HeadsetEvent::Mounted(false)));
}

#[test]
fn bounds_are_reported() {
    let (headset, _control, _log) = mock_headset();
    assert_eq!(headset.bounds_dimensions(), (2.0, 2.0));
    assert_eq!(headset.bounds_geometry().len(), 4);
}
