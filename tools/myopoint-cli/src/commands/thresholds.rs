//! Inspect or update the persisted click thresholds.

use std::path::Path;

use myopoint_sensor_model::thresholds::{
    ThresholdConfig, ThresholdError, ThresholdRecord, ThresholdStore,
};

pub fn show(path: &Path) -> anyhow::Result<()> {
    let store = ThresholdStore::new(path);
    println!("Thresholds: {}", store.path().display());

    match store.load() {
        Ok(record) => {
            println!("  Left:  {:.1} µV", record.left_threshold);
            println!("  Right: {:.1} µV", record.right_threshold);
            println!("  Hold:  {:.1} µV", record.hold_threshold);
            if let Some(updated) = &record.updated_at {
                println!("  Updated: {updated}");
            }
            if let Err(e) = record.apply_to(&ThresholdConfig::default()).validate() {
                println!("  [WARN] {e}; defaults would be used");
            }
        }
        Err(ThresholdError::NotFound { .. }) => {
            let defaults = ThresholdConfig::default();
            println!("  No record stored, defaults apply:");
            println!("  Left:  {:.1} µV", defaults.left_threshold);
            println!("  Right: {:.1} µV", defaults.right_threshold);
            println!("  Hold:  {:.1} µV", defaults.hold_threshold);
        }
        Err(e) => anyhow::bail!("Failed to read thresholds: {e}"),
    }

    Ok(())
}

pub fn set(
    path: &Path,
    left: Option<f64>,
    right: Option<f64>,
    hold: Option<f64>,
) -> anyhow::Result<()> {
    if left.is_none() && right.is_none() && hold.is_none() {
        anyhow::bail!("Nothing to set: pass at least one of --left, --right, --hold");
    }

    let store = ThresholdStore::new(path);
    let mut config = store.load_or_default(&ThresholdConfig::default()).config;
    if let Some(v) = left {
        config.left_threshold = v;
    }
    if let Some(v) = right {
        config.right_threshold = v;
    }
    if let Some(v) = hold {
        config.hold_threshold = v;
    }
    config.validate()?;

    let record = ThresholdRecord::from_config(&config);
    store.save(&record)?;

    tracing::info!(path = %store.path().display(), "Saved click thresholds");
    println!(
        "Saved thresholds to {}: left {:.1}, right {:.1}, hold {:.1} µV",
        store.path().display(),
        record.left_threshold,
        record.right_threshold,
        record.hold_threshold
    );
    Ok(())
}
