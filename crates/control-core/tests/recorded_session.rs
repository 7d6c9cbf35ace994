use std::path::PathBuf;

use myopoint_control_core::{
    ControllerVariant, GestureClassifier, MotionController, MotionStep,
};
use myopoint_sensor_model::action::GestureEvent;
use myopoint_sensor_model::sample::{ingest, parse_header, parse_samples_lossy, Sample};
use myopoint_sensor_model::thresholds::ThresholdConfig;

fn load_fixture() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sessions")
        .join("gyro-drag.jsonl");

    std::fs::read_to_string(path).expect("fixture samples should be readable")
}

#[derive(Default)]
struct Replay {
    steps: Vec<MotionStep>,
    gestures: Vec<GestureEvent>,
    ingress_errors: usize,
}

fn replay(jsonl: &str, controller: &mut MotionController, classifier: &mut GestureClassifier) -> Replay {
    let (raw, _) = parse_samples_lossy(jsonl);
    let mut out = Replay::default();
    for sample in &raw {
        match ingest(sample) {
            Ok(Sample::Inertial(s)) => out.steps.push(controller.update(&s)),
            Ok(Sample::Envelope(a)) => {
                controller.update_emg(a.microvolts);
            }
            Ok(Sample::Signal(a)) => {
                if let Some(g) = classifier.classify(a.microvolts, a.timestamp_ns) {
                    out.gestures.push(g);
                }
            }
            Err(_) => out.ingress_errors += 1,
        }
    }
    out
}

#[test]
fn recorded_session_skips_bad_lines_and_reads_header() {
    let jsonl = load_fixture();
    let header = parse_header(&jsonl).expect("fixture has a header");
    assert_eq!(header.mems_rate_hz, 200);

    let (samples, skipped) = parse_samples_lossy(&jsonl);
    assert_eq!(skipped, 2);
    assert_eq!(samples.len(), 147);
}

#[test]
fn recorded_session_drives_pointer_and_gestures() {
    let jsonl = load_fixture();
    let mut controller = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
    let mut classifier =
        GestureClassifier::new(ThresholdConfig::with_levels(220.0, 550.0, 825.0)).unwrap();

    let run = replay(&jsonl, &mut controller, &mut classifier);
    assert_eq!(run.ingress_errors, 1);
    assert_eq!(run.steps.len(), 130);

    let locks: Vec<usize> = run
        .steps
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, MotionStep::Locked { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(locks, vec![49]);

    let baseline = controller.baseline().unwrap();
    assert!((baseline.x - 1.0).abs() < 1e-9);
    assert!((baseline.z - 2.0).abs() < 1e-9);

    let moves: Vec<_> = run.steps.iter().filter_map(MotionStep::displacement).collect();
    assert!(!moves.is_empty());
    for d in &moves {
        // Rotation only about Z, so only horizontal motion, against the turn.
        assert!(d.dx <= 0.0 && d.dx >= -50.0);
        assert_eq!(d.dy, 0.0);
    }
    assert!(run.steps.contains(&MotionStep::Still));
    assert!(controller.velocity().is_zero());

    assert_eq!(
        run.gestures,
        vec![
            GestureEvent::LeftClick,
            GestureEvent::RightClick,
            GestureEvent::DragStart,
            GestureEvent::DragEnd,
        ]
    );
    assert!(!classifier.is_dragging());
    assert_eq!(classifier.recent_amplitudes().count(), 8);
}

#[test]
fn every_variant_stays_within_its_step_bound() {
    let jsonl = load_fixture();
    for variant in ControllerVariant::ALL {
        let mut controller = MotionController::for_variant(variant).unwrap();
        let max_step = controller.profile().shaper.max_step_px;
        let mut classifier = GestureClassifier::new(ThresholdConfig::default()).unwrap();
        let run = replay(&jsonl, &mut controller, &mut classifier);
        for d in run.steps.iter().filter_map(MotionStep::displacement) {
            assert!(d.dx.abs() <= max_step, "{variant}: dx {}", d.dx);
            assert!(d.dy.abs() <= max_step, "{variant}: dy {}", d.dy);
        }
    }
}
