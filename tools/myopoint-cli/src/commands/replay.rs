//! Replay a recorded sample stream through the control engine.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use myopoint_common::config::AppConfig;
use myopoint_pointer_engine::{
    ControlEngine, EngineConfig, IntentStreamHeader, JsonlSink, PointerSink, TracingSink,
};
use myopoint_sensor_model::sample::{parse_header, parse_samples_lossy};
use myopoint_sensor_model::thresholds::{ThresholdConfig, ThresholdStore};

const CHANNEL_CAPACITY: usize = 256;

pub struct ReplayOptions {
    pub path: PathBuf,
    pub variant: Option<String>,
    pub emg_gate: bool,
    pub thresholds: Option<PathBuf>,
    pub intents_out: Option<PathBuf>,
    pub realtime: bool,
}

pub async fn run(app: &AppConfig, opts: ReplayOptions) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&opts.path)
        .with_context(|| format!("Failed to read sample stream {}", opts.path.display()))?;

    let (samples, skipped) = parse_samples_lossy(&content);
    println!("Replaying: {}", opts.path.display());
    if let Some(header) = parse_header(&content) {
        println!(
            "  Source: {} (started {}, {} Hz)",
            header.source, header.started_at, header.mems_rate_hz
        );
    }
    println!("  Samples: {} ({} unparseable lines skipped)", samples.len(), skipped);

    let mut control = app.control.clone();
    if let Some(variant) = opts.variant {
        control.variant = variant;
    }
    if opts.emg_gate {
        control.emg_gate_enabled = true;
    }

    let store = ThresholdStore::new(opts.thresholds.unwrap_or_else(|| app.thresholds_path.clone()));
    let load = store.load_or_default(&ThresholdConfig::default());
    if let Some(reason) = &load.fallback_reason {
        println!("  Thresholds: defaults ({reason})");
    } else {
        println!("  Thresholds: {}", store.path().display());
    }

    let config = EngineConfig::from_defaults(&control, load.config)?;
    println!(
        "  Controller: {} (EMG gate {})",
        config.profile.variant,
        if config.profile.activation.enabled { "on" } else { "off" }
    );
    println!();

    let sink: Box<dyn PointerSink> = match &opts.intents_out {
        Some(out) => {
            let header = IntentStreamHeader::new(config.profile.variant.to_string());
            Box::new(
                JsonlSink::create(out, &header)
                    .with_context(|| format!("Failed to create {}", out.display()))?,
            )
        }
        None => Box::new(TracingSink),
    };

    let mut engine = ControlEngine::new(config, sink)?;

    let stop = engine.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let realtime = opts.realtime;
    let producer = tokio::spawn(async move {
        let mut previous = None;
        for sample in samples {
            if realtime {
                if let Some(prev) = previous {
                    let gap = sample.timestamp_ns.saturating_sub(prev);
                    if gap > 0 {
                        tokio::time::sleep(Duration::from_nanos(gap)).await;
                    }
                }
                previous = Some(sample.timestamp_ns);
            }
            if tx.send(sample).await.is_err() {
                break;
            }
        }
    });

    let stats = engine.run(rx).await?;
    producer.abort();

    println!("Replay finished:");
    println!("  Received: {}", stats.samples_received);
    println!("  Dropped (malformed): {}", stats.dropped_malformed);
    println!(
        "  Inertial: {} processed, {} rate-limited, {} spikes rejected",
        stats.inertial_processed, stats.rate_limited, stats.spikes_rejected
    );
    println!("  Moves: {}", stats.moves);
    println!("  Gestures: {}", stats.gestures);
    if stats.sink_failures > 0 {
        println!("  Sink failures: {}", stats.sink_failures);
    }
    if let Some(out) = &opts.intents_out {
        println!("  Intents written to: {}", out.display());
    }

    Ok(())
}
