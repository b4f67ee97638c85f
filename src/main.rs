use anyhow::Result;
use std::time::Instant;
use std::fs::File;
use std::io::Write;
use log::{info, error, debug, trace};

use gridfluid_common::{OutputConfig, ParticleRecord, SimulationConfig, Snapshot};
use gridfluid_engine::GridSimulation;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting GridFluid Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = GridSimulation::new(&config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());

    let total_ticks = config.run.total_ticks;
    let record_interval = config.run.record_interval_ticks.max(1);
    info!("Running {} ticks, recording a snapshot every {} ticks.", total_ticks, record_interval);

    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    sim.record_snapshot()?;

    for tick in 0..total_ticks {
        let tick_start_time = Instant::now();
        let report = match sim.advance() {
            Ok(report) => report,
            Err(e) => {
                error!("Error during tick {}: {}", tick, e);
                anyhow::bail!("Simulation tick failed.");
            }
        };
        let tick_duration = tick_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_tick = (tick + 1) % record_interval == 0;
        let is_last_tick = tick + 1 == total_ticks;

        if should_print_status || is_record_tick || is_last_tick {
            info!(
                "Tick [{}/{}] | Particles: {} | Mass: {:.2} | Tick Time: {:6.2} ms | Elapsed: {:.2} s",
                tick + 1,
                total_ticks,
                sim.live_particle_count(),
                sim.total_mass(),
                tick_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_tick || is_last_tick {
                sim.record_snapshot()?;
            }
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.2} ms (reassigned: {})",
                tick + 1,
                total_ticks,
                tick_duration.as_secs_f64() * 1000.0,
                report.reassigned.is_some()
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    if config.output.save_stats {
        save_snapshots(&config.output, sim.recorded_snapshots())?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if config.output.save_positions {
        save_final_positions(&config.output, &sim.final_positions())?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes all snapshots in the configured format ("json", "bincode" or "messagepack").
fn save_snapshots(output: &OutputConfig, snapshots: &[Snapshot]) -> Result<()> {
    let format = output.format.as_deref().unwrap_or("json");
    match format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", output.base_filename);
            let file = File::create(&filename)?;
            bincode::serialize_into(file, snapshots)?;
            info!("All snapshots saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", output.base_filename);
            let mut file = File::create(&filename)?;
            rmp_serde::encode::write(&mut file, snapshots)?;
            info!("All snapshots saved to {} (MessagePack format)", filename);
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", output.base_filename);
            let json_string = serde_json::to_string(snapshots)?;
            let mut file = File::create(&filename)?;
            file.write_all(json_string.as_bytes())?;
            info!("All snapshots saved to {} ({} KB)", filename, json_string.len() / 1024);
        }
    }
    Ok(())
}

fn save_final_positions(output: &OutputConfig, records: &[ParticleRecord]) -> Result<()> {
    let filename = format!("{}_final_positions.csv", output.base_filename);
    let mut writer = csv::Writer::from_path(&filename)?;
    writer.write_record(["id", "x", "y", "density", "mass"])?;
    for r in records {
        writer.write_record(&[
            r.id.to_string(),
            format!("{:.4}", r.x),
            format!("{:.4}", r.y),
            format!("{:.4}", r.density),
            format!("{:.4}", r.mass),
        ])?;
    }
    writer.flush()?;
    info!("Final positions of {} particles saved to {}", records.len(), filename);
    Ok(())
}
