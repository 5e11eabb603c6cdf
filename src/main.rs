//! Streams synthetic sensor readings through a [`Monitor`].
//!
//! One producer thread per sensor generates readings and sends them over a
//! channel; the main thread is the only consumer and owns the monitor.
//! Alerts are logged and appended to an alert file.
//!
//! Built only with the `demo` feature, which pulls in the CLI, channel,
//! logger and generator crates the library itself does not need.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use crossbeam::channel::{unbounded, Sender};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use heatwatch::{Monitor, MonitorConfig, Reading};

/// Run a simulated sensor array through the spike monitor.
#[derive(clap::Parser)]
struct Args {
    /// Number of simulated sensors, numbered from 1.
    #[clap(short, long, default_value_t = 15)]
    sensors: u32,
    /// Delay between two readings of the same sensor, in milliseconds.
    #[clap(short, long, default_value_t = 100)]
    interval_ms: u64,
    /// Every this many readings a sensor may produce a spike or a cold spot.
    #[clap(long, default_value_t = 15)]
    anomaly_every: u32,
    /// How long the producers run, in seconds.
    #[clap(short, long, default_value_t = 30)]
    duration_secs: u64,
    /// Seed for the reading generators.
    #[clap(long, default_value_t = 42)]
    seed: u64,
    /// File alerts are appended to.
    #[clap(long, default_value = "alert_logging.txt")]
    alert_file: PathBuf,
    /// How long a reading stays active, in milliseconds.
    #[clap(long, default_value_t = 60_000)]
    ttl_ms: i64,
    /// Temperatures above this are hot.
    #[clap(short, long, default_value_t = 48.0)]
    threshold: f64,
    /// Number of hottest readings checked on every ingestion.
    #[clap(short = 'k', long, default_value_t = 5)]
    check_width: usize,
}

#[derive(Clone, Copy)]
struct Generator {
    interval: Duration,
    anomaly_every: u32,
    seed: u64,
    deadline: Instant,
}

impl Generator {
    fn run(self, sensor_id: u32, tx: Sender<Reading>) {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(sensor_id as u64));
        let mut count = 0u32;

        while Instant::now() < self.deadline {
            let mut temperature = rng.gen_range(40.0..45.0);

            if count % self.anomaly_every == 0 {
                let roll: f64 = rng.gen();
                if roll < 0.4 {
                    temperature = rng.gen_range(75.0..85.0);
                } else if roll < 0.7 {
                    temperature = rng.gen_range(10.0..25.0);
                }
            }

            let reading = Reading::new(sensor_id, Utc::now().timestamp_millis(), temperature);
            if tx.send(reading).is_err() {
                break;
            }

            thread::sleep(self.interval);
            count = count.wrapping_add(1);
        }
    }
}

/// Waits for every producer, logging the ones that panicked.
///
/// # Returns
///
/// The number of producers that panicked.
fn join_producers(producers: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for producer in producers {
        if let Err(panic) = producer.join() {
            warn!("producer thread panicked: {panic:?}");
            panicked += 1;
        }
    }
    panicked
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = MonitorConfig::default()
        .with_ttl_ms(args.ttl_ms)
        .with_check_width(args.check_width)
        .with_high_threshold(args.threshold)
        .with_sensor_range(1, args.sensors.max(1));
    let mut monitor = Monitor::new(config)?;

    let mut alert_log = BufWriter::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.alert_file)?,
    );

    let generator = Generator {
        interval: Duration::from_millis(args.interval_ms),
        anomaly_every: args.anomaly_every.max(1),
        seed: args.seed,
        deadline: Instant::now() + Duration::from_secs(args.duration_secs),
    };

    let (tx, rx) = unbounded();
    let producers: Vec<_> = (1..=args.sensors)
        .map(|sensor_id| {
            let tx = tx.clone();
            thread::spawn(move || generator.run(sensor_id, tx))
        })
        .collect();
    drop(tx);

    info!(
        "streaming {} sensors for {}s, alerts to {}",
        args.sensors,
        args.duration_secs,
        args.alert_file.display()
    );

    let mut alert_count = 0usize;
    for reading in rx.iter() {
        for alert in monitor.ingest(reading)? {
            warn!("{alert}");
            writeln!(alert_log, "{alert}")?;
            alert_count += 1;
        }

        if monitor.total_ingested() % 100 == 0 {
            info!(
                "{} ingested, {} active, avg {:.2} C, min {:.2} C, max {:.2} C",
                monitor.total_ingested(),
                monitor.active_len(),
                monitor.average().unwrap_or_default(),
                monitor.min().map_or(0.0, |r| r.temperature),
                monitor.max().map_or(0.0, |r| r.temperature),
            );
        }
    }

    join_producers(producers);
    alert_log.flush()?;

    info!(
        "done: {} readings ingested, {} alerts raised",
        monitor.total_ingested(),
        alert_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panicked_producers_are_counted() {
        let producers = vec![
            thread::spawn(|| {}),
            thread::spawn(|| panic!("sensor thread died")),
            thread::spawn(|| {}),
        ];

        assert_eq!(join_producers(producers), 1);
    }
}
