//! Show the effective configuration.

use myopoint_common::config::AppConfig;
use myopoint_control_core::{ControllerProfile, ControllerVariant, MotionController, ResponseCurve};
use myopoint_sensor_model::thresholds::{ThresholdConfig, ThresholdStore};

pub fn run(app: &AppConfig) -> anyhow::Result<()> {
    println!("Myopoint Configuration Check");
    println!("{}", "=".repeat(50));

    let config_path = AppConfig::path();
    if config_path.exists() {
        println!("[OK] Config file: {}", config_path.display());
    } else {
        println!("[--] Config file: {} (not present, defaults)", config_path.display());
    }
    println!(
        "     Logging: level={} json={}{}",
        app.logging.level,
        app.logging.json,
        app.logging
            .file
            .as_ref()
            .map(|f| format!(" file={}", f.display()))
            .unwrap_or_default()
    );

    let selected = match app.control.variant.parse::<ControllerVariant>() {
        Ok(v) => {
            println!("[OK] Controller variant: {v}");
            Some(v)
        }
        Err(e) => {
            println!("[ERR] {e}");
            None
        }
    };
    println!(
        "     EMG gate: {}",
        if app.control.emg_gate_enabled { "enabled" } else { "disabled" }
    );
    println!("     Telemetry buffer: {} readings", app.control.telemetry_capacity);

    println!();
    println!("Controller presets:");
    let mut all_valid = selected.is_some();
    for variant in ControllerVariant::ALL {
        let profile = ControllerProfile::for_variant(variant);
        let marker = if Some(variant) == selected { "*" } else { " " };
        let s = &profile.shaper;
        let curve = match s.curve {
            ResponseCurve::Linear => "linear".to_string(),
            ResponseCurve::Power { exponent, .. } => format!("power {exponent}"),
        };
        println!(
            " {marker} {variant:<16} {:?} axes {:?}/{:?}, {} neutral samples, every {:.0} ms",
            profile.channel,
            profile.axis_x,
            profile.axis_y,
            profile.neutral_samples,
            profile.update_interval_secs * 1000.0
        );
        println!(
            "     deadzone {}, alpha {}, curve {curve}, sensitivity {}x{}, max step {} px",
            s.deadzone, s.smooth_alpha, s.sensitivity_x, s.sensitivity_y, s.max_step_px
        );
        if let Err(e) = MotionController::new(profile) {
            println!("     [ERR] {e}");
            all_valid = false;
        }
    }

    println!();
    let store = ThresholdStore::new(&app.thresholds_path);
    let load = store.load_or_default(&ThresholdConfig::default());
    match &load.fallback_reason {
        None => println!("[OK] Thresholds: {}", store.path().display()),
        Some(reason) => println!("[--] Thresholds: defaults ({reason})"),
    }
    println!(
        "     left {:.1} / right {:.1} / hold {:.1} µV, cooldown {:.2}s, {:?} mode",
        load.config.left_threshold,
        load.config.right_threshold,
        load.config.hold_threshold,
        load.config.cooldown_secs,
        load.config.mode
    );

    println!();
    if all_valid {
        println!("Configuration is valid.");
    } else {
        println!("Configuration has errors. See above.");
    }
    Ok(())
}
