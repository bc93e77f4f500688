//! Runs a world for the configured number of ticks and logs what happens.
//!
//! Usage: `eco-runner [config.json]`. Without a path the default configuration
//! is used.

#[macro_use]
mod telemetry;

use anyhow::{Context, Result};
use eco_core::SimulationConfig;
use eco_world::{Notification, Simulation};
use tracing::{debug, info};

fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = load_config(std::env::args().nth(1).as_deref())?;
    info!(
        seed = config.seed,
        num_ticks = config.num_ticks,
        grid_width = config.world.grid_width,
        grid_height = config.world.grid_height,
        "Starting eco-tick runner"
    );

    let mut simulation = Simulation::new(config).context("failed to build world")?;

    let result = simulation.run_with(|report| {
        for notification in &report.notifications {
            log_notification(notification);
        }
        if report.parallel {
            record_counter!("parallel_ticks", 1u64, tick = report.tick);
        }
        if report.eroded > 0.0 {
            record_histogram!("erosion_moved", report.eroded);
        }
        record_gauge!("interactions", report.interactions as u64, tick = report.tick);
    })?;

    record_gauge!("final_living", result.final_stats.living as u64);
    record_gauge!("final_mean_energy", result.final_stats.mean_energy);
    record_counter!("notifications_total", result.notifications.total());

    info!(
        ticks_run = result.ticks_run,
        living = result.final_stats.living,
        "Run complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<SimulationConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
            let config = SimulationConfig::from_json(&json).with_context(|| format!("invalid config in {}", path))?;
            info!(path, "Loaded configuration");
            Ok(config)
        }
        None => Ok(SimulationConfig::default()),
    }
}

fn log_notification(notification: &Notification) {
    let position = notification.position();
    match notification {
        Notification::BiomeTransition { details, .. } => {
            debug!(
                event = notification.kind(),
                tick = notification.tick(),
                x = position.x,
                y = position.y,
                from = details.from.name(),
                to = details.to.name(),
                "Biome changed"
            );
        }
        Notification::EventStart { event_id, event_type, details, .. } => {
            info!(
                event = notification.kind(),
                tick = notification.tick(),
                event_id = event_id.0,
                event_type = event_type.name(),
                x = position.x,
                y = position.y,
                intensity = details.intensity,
                "Environmental event started"
            );
        }
        Notification::EventEnd { event_id, event_type, details, .. } => {
            info!(
                event = notification.kind(),
                tick = notification.tick(),
                event_id = event_id.0,
                event_type = event_type.name(),
                reason = ?details.reason,
                affected_cells = details.affected_cells,
                "Environmental event ended"
            );
        }
        Notification::GeologicalEvent { event_type, details, .. } => {
            info!(
                event = notification.kind(),
                tick = notification.tick(),
                event_type = event_type.name(),
                x = position.x,
                y = position.y,
                radius = details.radius,
                "Geological event"
            );
        }
    }
}
