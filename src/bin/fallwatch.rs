use clap::{Parser, Subcommand};
use spdlog::prelude::*;
use spdlog::{Level, LevelFilter};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use fallwatch::scenario::Scenario;
use fallwatch::trace::{TraceReader, TraceWriter};
use fallwatch::{
    AlertDispatcher, BufferConfig, EngineConfig, FallConfirmed, FallDetectionEngine, RawSample,
    Sensitivity, Stage, inspect, latency, pipe, progress,
};

#[derive(Parser)]
#[command(name = "fallwatch", about = "Offline runner for the fall-detection engine")]
struct Args {
    /// Also log classifier scores.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a synthetic motion scenario through the engine.
    Simulate {
        #[arg(long, value_enum)]
        scenario: Scenario,
        #[arg(long, value_enum, default_value_t)]
        sensitivity: Sensitivity,
        #[arg(long, default_value_t = 20)]
        interval_ms: i64,
        /// Save the generated samples as a trace file.
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Replay a recorded trace file.
    Replay {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        sensitivity: Sensitivity,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::Debug } else { Level::Info };
    spdlog::default_logger().set_level_filter(LevelFilter::MoreSevereEqual(level));

    match args.command {
        Command::Simulate {
            scenario,
            sensitivity,
            interval_ms,
            record,
        } => {
            let samples = scenario.samples(interval_ms);
            if let Some(path) = record {
                let mut writer = TraceWriter::create(&path, interval_ms)?;
                writer.write_all(&samples)?;
                info!(
                    "[System] Recorded {} samples to {}",
                    writer.written(),
                    path.display()
                );
                writer.finish()?;
            }

            let confirmed = run(&samples, sensitivity, interval_ms)?;
            if confirmed != scenario.expected_falls() {
                warn!(
                    "[System] {:?} expected {} fall(s), engine reported {}",
                    scenario,
                    scenario.expected_falls(),
                    confirmed
                );
            }
        }
        Command::Replay { file, sensitivity } => {
            let reader = TraceReader::open(&file)?;
            info!(
                "[System] Replaying {} samples from {}",
                reader.len(),
                file.display()
            );
            run(
                reader.samples(),
                sensitivity,
                reader.header().sample_interval_ms,
            )?;
        }
    }

    Ok(())
}

fn run(
    samples: &[RawSample],
    sensitivity: Sensitivity,
    interval_ms: i64,
) -> Result<usize, Box<dyn Error>> {
    let config = EngineConfig {
        buffer: BufferConfig {
            sample_interval_ms: interval_ms,
            ..Default::default()
        },
        ..EngineConfig::with_sensitivity(sensitivity)
    };
    let engine = FallDetectionEngine::new(1, config)?;

    let dispatcher = AlertDispatcher::spawn(|event| {
        info!(
            "[Alert] Fall confirmed at {}ms (suspected since {}ms, {:?})",
            event.at_ms, event.confirming_since_ms, event.trigger
        );
    });
    let mut alerts = dispatcher.sender().ok_or("alert worker is not running")?;

    let mut pipeline = pipe![
        progress::<RawSample>("Samples", 1_000),
        latency("Detection", 1_000, 1, engine),
        inspect(|event: &FallConfirmed| {
            if let Some(c) = &event.classification {
                debug!(
                    "[System] Triggering window: probability={:.3} confidence={:.2} {:?}",
                    c.fall_probability, c.confidence, c.detected_patterns
                );
            }
        }),
    ];
    for sample in samples {
        pipeline.process(sample, &mut alerts);
    }

    let detection = pipeline.second().first();
    let stats = detection.inner().stats();
    info!(
        "[System] accepted={} rate_limited={} dropped={} confirmed={}",
        stats.accepted, stats.rate_limited, stats.dropped, stats.confirmed
    );
    info!("[Latency/Detection]{}", detection.measurer().format_stats());
    if !detection
        .measurer()
        .within_budget(Duration::from_millis(interval_ms as u64))
    {
        warn!("[System] Detection p99 exceeds the {}ms sample period", interval_ms);
    }

    dispatcher.shutdown();
    Ok(stats.confirmed as usize)
}
