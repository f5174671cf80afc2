//! Fake (desktop) driver behavior through the façade:
//! - identity orientation at rest, clip distance round-trip
//! - single-pass rendering: one callback invocation carrying both eye views
//! - the virtual controller and its right-mouse trigger
//! - WASD motion integration

mod common;

use common::{RecordingGraphics, ScriptedPlatform};
use headset::{
    ControllerButton, Headset, HeadsetEvent, HeadsetOptions, HeadsetOrigin, HeadsetType, Key,
};

fn fake_headset() -> (Headset, std::sync::Arc<std::sync::Mutex<common::InputState>>) {
    let (graphics, _) = RecordingGraphics::new();
    let (platform, input) = ScriptedPlatform::new();
    let headset = Headset::new(
        Box::new(graphics),
        Box::new(platform),
        HeadsetOptions {
            drivers: vec!["fake".into()],
            ..HeadsetOptions::default()
        },
    );
    (headset, input)
}

#[test]
fn identity_orientation_after_init() {
    let (headset, _input) = fake_headset();
    assert!(headset.is_present());
    assert_eq!(headset.headset_type(), HeadsetType::Fake);
    assert_eq!(headset.origin_type(), HeadsetOrigin::Head);
    assert_eq!(headset.name(), "Simulator");
    assert!(headset.is_mounted());
    assert!(headset.is_mirrored());

    let (angle, axis) = headset.pose().angle_axis();
    assert!(angle.abs() < 1e-6);
    assert!(axis.iter().all(|c| c.is_finite()));
    // Head starts at the configured height.
    assert!((headset.pose().position[1] - 1.7).abs() < 1e-6);
}

#[test]
fn clip_distance_round_trips_exactly() {
    let (mut headset, _input) = fake_headset();
    headset.set_clip_distance(0.05, 50.0);
    assert_eq!(headset.clip_distance(), (0.05, 50.0));
}

#[test]
fn renders_single_pass_with_two_views() {
    let (mut headset, _input) = fake_headset();

    let mut calls = 0;
    let mut view_count = 0;
    let mut viewports = Vec::new();
    headset.render_to(|pass| {
        calls += 1;
        view_count = pass.views.len();
        assert!(pass.canvas.is_none());
        assert!(pass.is_single_pass());
        viewports = pass.views.iter().map(|v| v.viewport).collect();
    });

    assert_eq!(calls, 1);
    assert_eq!(view_count, 2);
    // Double-wide split of the 1600x1200 framebuffer.
    assert_eq!(viewports[0].x, 0);
    assert_eq!(viewports[0].width, 800);
    assert_eq!(viewports[1].x, 800);
    assert_eq!(viewports[1].width, 800);
    assert_eq!(viewports[0].height, 1200);

    // Disabling the mirror does not stop rendering.
    headset.set_mirrored(false);
    let mut more = 0;
    headset.render_to(|_| more += 1);
    assert_eq!(more, 1);
}

#[test]
fn display_dimensions_track_the_framebuffer() {
    let (mut headset, input) = fake_headset();
    assert_eq!(headset.display_dimensions(), (1600, 1200));

    input.lock().unwrap().framebuffer_size = (1024, 768);
    headset.update(0.016);
    assert_eq!(headset.display_dimensions(), (1024, 768));
}

#[test]
fn virtual_controller_uses_right_mouse_as_trigger() {
    let (mut headset, input) = fake_headset();

    assert_eq!(headset.controller_count(), 1);
    let controller = headset.controllers()[0];
    assert!(headset.controller_is_connected(controller));
    assert_eq!(headset.controller_axis(controller, headset::ControllerAxis::Trigger), 0.0);

    input.lock().unwrap().mouse_right = true;
    headset.update(0.016);
    assert!(headset.controller_is_down(controller, ControllerButton::Trigger));
    assert_eq!(headset.controller_axis(controller, headset::ControllerAxis::Trigger), 1.0);

    input.lock().unwrap().mouse_right = false;
    headset.update(0.016);
    assert!(!headset.controller_is_down(controller, ControllerButton::Trigger));

    let events = headset.poll_events();
    let pressed = events
        .iter()
        .filter(|e| matches!(e, HeadsetEvent::ControllerPressed(_, ControllerButton::Trigger)))
        .count();
    let released = events
        .iter()
        .filter(|e| matches!(e, HeadsetEvent::ControllerReleased(_, ControllerButton::Trigger)))
        .count();
    assert_eq!((pressed, released), (1, 1));
}

#[test]
fn holding_w_moves_forward() {
    let (mut headset, input) = fake_headset();
    input.lock().unwrap().keys.push(Key::W);

    for _ in 0..10 {
        headset.update(0.016);
    }

    let position = headset.pose().position;
    // Forward is -z in a right-handed engine space.
    assert!(position[2] < -0.01, "did not move forward: {:?}", position);
    assert_eq!(position[0], 0.0);
}

#[test]
fn destroy_is_idempotent_and_silences_rendering() {
    let (mut headset, _input) = fake_headset();
    headset.destroy();
    headset.destroy();

    let mut calls = 0;
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 0);
    assert_eq!(headset.controller_count(), 0);
}
