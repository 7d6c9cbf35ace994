use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use myopoint_control_core::ControllerVariant;
use myopoint_pointer_engine::{
    ControlEngine, EngineConfig, IntentStreamHeader, JsonlSink, RecordingSink,
};
use myopoint_sensor_model::action::{parse_intents, IntentKind};
use myopoint_sensor_model::sample::{parse_samples_lossy, RawSample, Vec3};
use myopoint_sensor_model::thresholds::ThresholdConfig;

fn fixture_samples() -> Vec<RawSample> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sessions")
        .join("gyro-drag.jsonl");
    let content = std::fs::read_to_string(path).expect("fixture samples should be readable");
    parse_samples_lossy(&content).0
}

fn config() -> EngineConfig {
    EngineConfig::new(
        ControllerVariant::GyroResponsive,
        ThresholdConfig::with_levels(220.0, 550.0, 825.0),
    )
}

#[tokio::test]
async fn run_consumes_producer_until_channel_closes() {
    let samples = fixture_samples();
    let total = samples.len() as u64;

    let sink = RecordingSink::new();
    let mut engine = ControlEngine::new(config(), Box::new(sink.clone())).unwrap();
    let telemetry = engine.telemetry();

    let (tx, rx) = mpsc::channel(16);
    let producer = tokio::spawn(async move {
        for sample in samples {
            if tx.send(sample).await.is_err() {
                break;
            }
        }
    });

    let stats = engine.run(rx).await.unwrap();
    producer.await.unwrap();

    assert_eq!(stats.samples_received, total);
    assert_eq!(stats.dropped_malformed, 1);
    assert_eq!(stats.gestures, 4);
    assert!(stats.moves > 0);
    assert_eq!(stats.sink_failures, 0);

    let intents = sink.intents();
    assert_eq!(intents.len() as u64, stats.moves + stats.gestures);
    let actions: Vec<_> = intents
        .iter()
        .filter(|i| i.is_action())
        .map(|i| i.kind.clone())
        .collect();
    assert_eq!(actions.len(), 4);
    assert!(matches!(actions[0], IntentKind::Click { .. }));
    assert!(matches!(actions[2], IntentKind::Button { .. }));

    let snap = telemetry.snapshot();
    assert_eq!(snap.gyro.len(), 130);
    assert_eq!(snap.signal_peak.len(), 8);
    assert_eq!(snap.envelope.len(), 8);
}

#[tokio::test]
async fn stop_flag_ends_idle_run() {
    let mut engine = ControlEngine::new(config(), Box::new(RecordingSink::new())).unwrap();
    let stop = engine.stop_flag();
    let (tx, rx) = mpsc::channel::<RawSample>(4);

    tx.send(RawSample::mems(0, Vec3::ZERO, Vec3::ZERO))
        .await
        .unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    // The sender is still alive, so only the stop flag can end the loop.
    let stats = tokio::time::timeout(Duration::from_secs(5), engine.run(rx))
        .await
        .expect("run should notice the stop flag")
        .unwrap();
    assert_eq!(stats.samples_received, 1);
    drop(tx);
}

#[tokio::test]
async fn jsonl_sink_records_replayable_intents() {
    let dir = std::env::temp_dir().join("myopoint_test_engine_jsonl");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("intents.jsonl");

    let sink = JsonlSink::create(&path, &IntentStreamHeader::new("gyro_responsive")).unwrap();
    let mut engine = ControlEngine::new(config(), Box::new(sink)).unwrap();

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        for sample in fixture_samples() {
            let _ = tx.send(sample).await;
        }
    });
    let stats = engine.run(rx).await.unwrap();
    drop(engine);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# "));
    let intents = parse_intents(&content).unwrap();
    assert_eq!(intents.len() as u64, stats.moves + stats.gestures);
    for pair in intents.windows(2) {
        assert!(pair[0].timestamp_ns <= pair[1].timestamp_ns);
    }

    std::fs::remove_dir_all(&dir).ok();
}
