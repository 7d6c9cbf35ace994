//! Generate a synthetic sample stream.
//!
//! The stream starts with the hand at rest long enough to calibrate, then
//! sweeps the wrist in slow overlapping sine waves while the forearm fires
//! a fixed pattern of contractions.

use std::f64::consts::TAU;
use std::path::PathBuf;

use anyhow::Context;

use myopoint_common::clock::secs_to_ns;
use myopoint_control_core::{ControllerProfile, ControllerVariant};
use myopoint_sensor_model::sample::{serialize_samples, RawSample, SampleStreamHeader, Vec3};

/// Resting gyro offset, deg/s.
const GYRO_BIAS: Vec3 = Vec3 {
    x: 1.0,
    y: 0.0,
    z: 2.0,
};

const ENVELOPE_PERIOD_SECS: f64 = 0.05;
const SIGNAL_PERIOD_SECS: f64 = 0.1;

/// Contraction peaks (µV) fired one after another once motion begins.
const CONTRACTIONS: [f64; 5] = [180.0, 600.0, 900.0, 300.0, 900.0];
const CONTRACTION_SPACING_SECS: f64 = 1.2;

pub fn run(output: PathBuf, secs: f64, rate_hz: u32, variant: &str) -> anyhow::Result<()> {
    if !(secs.is_finite() && secs > 0.0) {
        anyhow::bail!("--secs must be positive");
    }
    if rate_hz == 0 {
        anyhow::bail!("--rate-hz must be positive");
    }

    let variant: ControllerVariant = variant.parse()?;
    let profile = ControllerProfile::for_variant(variant);
    let rest_secs = (profile.neutral_samples as f64 / rate_hz as f64 + 0.5).max(1.0);

    let samples = synthesize(secs, rate_hz, rest_secs);

    let header = SampleStreamHeader {
        schema_version: "1.0".to_string(),
        source: format!("myopoint-simulate ({variant})"),
        started_at: chrono::Utc::now().to_rfc3339(),
        mems_rate_hz: rate_hz,
    };

    let mut content = format!("# {}\n", serde_json::to_string(&header)?);
    content.push_str(&serialize_samples(&samples)?);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Generated {} samples over {secs:.1}s", samples.len());
    println!("  Rest phase: {rest_secs:.2}s ({variant} warm-up)");
    println!("  Output: {}", output.display());
    Ok(())
}

fn synthesize(secs: f64, rate_hz: u32, rest_secs: f64) -> Vec<RawSample> {
    let mut samples = Vec::new();

    let mems_count = (secs * rate_hz as f64).floor() as u64;
    for i in 0..mems_count {
        let t = i as f64 / rate_hz as f64;
        samples.push(RawSample::mems(secs_to_ns(t), accel_at(t, rest_secs), gyro_at(t, rest_secs)));
    }

    let envelope_count = (secs / ENVELOPE_PERIOD_SECS).floor() as u64;
    for i in 0..envelope_count {
        let t = i as f64 * ENVELOPE_PERIOD_SECS;
        let microvolts = 3.0 + 0.5 * (t * 13.0).sin().abs() + 4.0 * contraction_at(t, rest_secs) / 900.0;
        samples.push(RawSample::envelope(secs_to_ns(t) + 1, microvolts / 1e6));
    }

    let signal_count = (secs / SIGNAL_PERIOD_SECS).floor() as u64;
    for i in 0..signal_count {
        let t = i as f64 * SIGNAL_PERIOD_SECS;
        let peak = 40.0 + 10.0 * (t * 7.0).sin().abs() + contraction_at(t, rest_secs);
        let volts = peak / 1e6;
        samples.push(RawSample::signal(
            secs_to_ns(t) + 2,
            vec![volts * 0.3, -volts * 0.7, volts, -volts * 0.4],
        ));
    }

    samples.sort_by_key(|s| s.timestamp_ns);
    samples
}

/// Small deterministic sensor noise.
fn jitter(t: f64, seed: f64) -> f64 {
    0.05 * (t * 97.0 + seed).sin() * (t * 31.0 + seed * 3.0).cos()
}

fn motion_phase(t: f64, rest_secs: f64) -> Option<f64> {
    (t >= rest_secs).then(|| t - rest_secs)
}

fn gyro_at(t: f64, rest_secs: f64) -> Vec3 {
    let (sweep_x, sweep_z) = match motion_phase(t, rest_secs) {
        Some(m) => (15.0 * (TAU * 0.25 * m).sin(), 25.0 * (TAU * 0.5 * m).sin()),
        None => (0.0, 0.0),
    };
    Vec3::new(
        GYRO_BIAS.x + sweep_x + jitter(t, 1.0),
        GYRO_BIAS.y + jitter(t, 2.0),
        GYRO_BIAS.z + sweep_z + jitter(t, 3.0),
    )
}

fn accel_at(t: f64, rest_secs: f64) -> Vec3 {
    let (tilt_x, tilt_y) = match motion_phase(t, rest_secs) {
        Some(m) => (0.3 * (TAU * 0.2 * m).sin(), 0.2 * (TAU * 0.15 * m).sin()),
        None => (0.0, 0.0),
    };
    Vec3::new(
        tilt_x + jitter(t, 4.0) * 0.01,
        tilt_y + jitter(t, 5.0) * 0.01,
        0.97 + jitter(t, 6.0) * 0.01,
    )
}

/// Contraction amplitude (µV) above the resting signal at time `t`.
fn contraction_at(t: f64, rest_secs: f64) -> f64 {
    let Some(m) = motion_phase(t, rest_secs) else {
        return 0.0;
    };
    let slot = (m / CONTRACTION_SPACING_SECS).floor() as usize;
    let offset = m - slot as f64 * CONTRACTION_SPACING_SECS;
    // Spans one and a half signal periods so sampling jitter cannot skip it.
    if slot >= 1 && offset < SIGNAL_PERIOD_SECS * 1.5 {
        CONTRACTIONS.get(slot - 1).copied().unwrap_or(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myopoint_sensor_model::sample::{ingest, RawPayload, Sample};

    #[test]
    fn test_synthesized_stream_is_sorted_and_valid() {
        let samples = synthesize(4.0, 200, 1.0);
        assert!(samples
            .windows(2)
            .all(|w| w[0].timestamp_ns <= w[1].timestamp_ns));
        assert!(samples.iter().all(|s| ingest(s).is_ok()));
        let mems = samples
            .iter()
            .filter(|s| matches!(s.payload, RawPayload::Mems { .. }))
            .count();
        assert_eq!(mems, 800);
    }

    #[test]
    fn test_rest_phase_is_quiet() {
        for i in 0..100 {
            let t = i as f64 * 0.005;
            let g = gyro_at(t, 1.0);
            assert!((g.z - GYRO_BIAS.z).abs() < 0.1);
            assert_eq!(contraction_at(t, 1.0), 0.0);
        }
    }

    #[test]
    fn test_contractions_appear_after_rest() {
        let samples = synthesize(8.0, 100, 1.0);
        let peaks: Vec<f64> = samples
            .iter()
            .filter_map(|s| match ingest(s) {
                Ok(Sample::Signal(a)) if a.microvolts > 150.0 => Some(a.microvolts),
                _ => None,
            })
            .collect();
        assert!(!peaks.is_empty());
        assert!(peaks.iter().any(|p| *p > 825.0));
    }
}
