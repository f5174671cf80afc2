//! Driver selection and fallback behavior:
//! - first candidate whose initialize succeeds wins, later ones stay cold
//! - unknown config tokens are skipped, not fatal
//! - all candidates failing leaves a driverless subsystem returning neutral
//!   defaults from every query
//! - a lost vendor session downgrades to the driverless state exactly once

mod common;

use common::{RecordingGraphics, ScriptedPlatform};
use headset::api::MockDriver;
use headset::{Headset, HeadsetEvent, HeadsetOptions, HeadsetType, Pose};

fn options() -> HeadsetOptions {
    HeadsetOptions::default()
}

#[test]
fn first_successful_candidate_wins() {
    let (graphics, _) = RecordingGraphics::new();
    let (platform, _) = ScriptedPlatform::new();

    let (first, first_control) = MockDriver::new();
    first_control.fail_next_init();

    let (second, second_control) = MockDriver::new();
    let marker = Pose {
        position: [0.0, 7.0, 0.0],
        ..Pose::default()
    };
    second_control.set_pose(marker);

    let (third, third_control) = MockDriver::new();
    third_control.set_pose(Pose {
        position: [9.0, 9.0, 9.0],
        ..Pose::default()
    });

    let headset = Headset::from_candidates(
        Box::new(graphics),
        Box::new(platform),
        options(),
        vec![Box::new(first), Box::new(second), Box::new(third)],
    );

    assert!(headset.is_present());
    assert_eq!(headset.headset_type(), HeadsetType::Mock);
    // The second candidate's scripted pose proves it is the active one.
    assert_eq!(headset.pose().position, [0.0, 7.0, 0.0]);
}

#[test]
fn unknown_tokens_fall_through_to_fake() {
    let (graphics, _) = RecordingGraphics::new();
    let (platform, _) = ScriptedPlatform::new();

    let headset = Headset::new(
        Box::new(graphics),
        Box::new(platform),
        HeadsetOptions {
            drivers: vec!["openvr".into(), "nonsense".into(), "fake".into()],
            ..options()
        },
    );

    assert!(headset.is_present());
    assert_eq!(headset.headset_type(), HeadsetType::Fake);
}

#[test]
fn all_failed_selection_is_neutral_and_safe() {
    let (graphics, _) = RecordingGraphics::new();
    let (platform, _) = ScriptedPlatform::new();

    let (driver, control) = MockDriver::new();
    control.fail_next_init();

    let mut headset = Headset::with_driver(
        Box::new(graphics),
        Box::new(platform),
        options(),
        Box::new(driver),
    );

    assert!(!headset.is_present());
    assert_eq!(headset.headset_type(), HeadsetType::Unknown);
    assert_eq!(headset.name(), "");
    assert!(!headset.is_mounted());
    assert!(!headset.is_mirrored());
    assert_eq!(headset.display_dimensions(), (0, 0));
    assert_eq!(headset.clip_distance(), (0.0, 0.0));
    assert_eq!(headset.bounds_dimensions(), (0.0, 0.0));
    assert!(headset.bounds_geometry().is_empty());
    assert_eq!(headset.pose(), Pose::default());
    assert_eq!(headset.velocity(), [0.0; 3]);
    assert_eq!(headset.angular_velocity(), [0.0; 3]);
    assert_eq!(headset.controller_count(), 0);
    assert!(headset.controllers().is_empty());

    let mut calls = 0;
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 0);

    headset.update(0.016);
    assert!(headset.poll_events().is_empty());

    headset.destroy();
    headset.destroy();
}

#[test]
fn lost_session_downgrades_to_no_driver() {
    let (graphics, _) = RecordingGraphics::new();
    let (platform, _) = ScriptedPlatform::new();

    let (driver, control) = MockDriver::new();
    let mut headset = Headset::with_driver(
        Box::new(graphics),
        Box::new(platform),
        options(),
        Box::new(driver),
    );
    assert!(headset.is_present());

    control.lose_session();
    headset.update(0.016);

    let mut calls = 0;
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 0);
    assert!(!headset.is_present());

    let events = headset.poll_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HeadsetEvent::DriverLost))
            .count(),
        1
    );

    // No re-selection: the subsystem stays driverless and neutral.
    headset.render_to(|_| calls += 1);
    assert_eq!(calls, 0);
    assert_eq!(headset.headset_type(), HeadsetType::Unknown);
    assert!(headset.poll_events().is_empty());
}
