use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use walk_nav::replay::load_fixes;
use walk_nav::{
    parse_route_json, ChannelSink, Fix, LogFeedback, NavConfig, NavigationTracker, Route,
    TrackerInput,
};

#[derive(Parser, Debug)]
#[command(name = "walk_nav")]
#[command(about = "Pedestrian turn-by-turn tracker - replays position fixes against a route", long_about = None)]
struct Args {
    /// Route JSON (full routing response or a single path)
    #[arg(long)]
    route: PathBuf,

    /// Fix log: JSON array or JSON lines, optionally .gz
    #[arg(long)]
    fixes: PathBuf,

    /// Navigation config JSON (defaults: prepare 30 m, turn 15 m, prepare signal 99)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Status snapshot rewritten after every input
    #[arg(long)]
    status_file: Option<String>,

    /// File receiving peripheral signal bytes (peripheral not connected if omitted)
    #[arg(long)]
    device_log: Option<PathBuf>,

    /// Delay between replayed fixes in milliseconds
    #[arg(long, default_value = "0")]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("[{}] Walk Nav Starting", ts_now());
    println!("  Route: {}", args.route.display());
    println!("  Fixes: {}", args.fixes.display());
    println!("  Interval: {} ms", args.interval_ms);

    let config = match &args.config {
        Some(path) => NavConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NavConfig::default(),
    };

    // Reject bad route data before any navigation state exists
    let route_json = fs::read_to_string(&args.route)
        .with_context(|| format!("reading route {}", args.route.display()))?;
    let route = Route::from_data(parse_route_json(&route_json)?)?;
    let fixes = load_fixes(&args.fixes)?;
    println!(
        "[{}] Loaded {} instructions over {} points, {} fixes",
        ts_now(),
        route.len(),
        route.coordinates().len(),
        fixes.len()
    );

    let (sink, device_handle) = match &args.device_log {
        Some(path) => {
            let (tx, rx) = mpsc::channel::<u8>(32);
            let handle = tokio::spawn(device_loop(rx, path.clone()));
            (ChannelSink::connected(tx), Some(handle))
        }
        None => {
            warn!("No device log given, peripheral treated as not connected");
            (ChannelSink::disconnected(), None)
        }
    };

    let mut tracker = NavigationTracker::new(config, sink, LogFeedback)?;
    if let Some(path) = &args.status_file {
        tracker = tracker.with_status_file(path.clone());
    }

    let (input_tx, input_rx) = mpsc::channel::<TrackerInput>(64);
    let source = tokio::spawn(fix_source(input_tx, route, fixes, args.interval_ms));

    let stats = tracker.run(input_rx).await;
    source.await?;

    // Dropping the tracker closes the device channel
    drop(tracker);
    if let Some(handle) = device_handle {
        let written = handle.await??;
        info!("Device received {} signal bytes", written);
    }

    println!("[{}] Replay finished", ts_now());
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

/// Plays the route start and every recorded fix into the tracker, in order
async fn fix_source(tx: mpsc::Sender<TrackerInput>, route: Route, fixes: Vec<Fix>, interval_ms: u64) {
    if tx.send(TrackerInput::StartRoute(route)).await.is_err() {
        return;
    }

    for (count, fix) in fixes.into_iter().enumerate() {
        if interval_ms > 0 {
            sleep(Duration::from_millis(interval_ms)).await;
        }
        if tx.send(TrackerInput::Fix(fix)).await.is_err() {
            warn!("[fixes] Tracker gone after {} fixes", count);
            break;
        }
    }
}

/// Stand-in for the peripheral link: appends every signal byte to `path`
async fn device_loop(mut rx: mpsc::Receiver<u8>, path: PathBuf) -> Result<u64> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("opening device log {}", path.display()))?;

    let mut written = 0u64;
    while let Some(byte) = rx.recv().await {
        file.write_all(&[byte]).await?;
        written += 1;
        info!("[device] sent signal {}", byte as i8);
    }
    file.flush().await?;

    Ok(written)
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
