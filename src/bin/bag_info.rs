//! CLI tool for inspecting bag files.
//!
//! Handles both sensor replay bags and saved scan graphs.
//!
//! # Usage
//!
//! ```bash
//! bag_info recording.bag
//! bag_info --verbose recording.bag
//! bag_info map.graph
//! ```

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use ndt_slam::io::bag::{BagHeader, BagPlayer, BagRecord, GraphRecord, HEADER_SIZE, SensorMessage};

#[derive(Parser, Debug)]
#[command(author, version, about = "Display information about a bag file")]
struct Args {
    /// Bag file to inspect
    bag: PathBuf,

    /// Show a per-message breakdown (reads the entire file)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut block = [0u8; HEADER_SIZE];
    File::open(&args.bag)?.read_exact(&mut block)?;
    let header = BagHeader::from_bytes(&block)?;

    println!("Bag File Information");
    println!("====================");
    println!("File: {}", args.bag.display());
    println!();

    println!("Header Information:");
    println!("  Format version: {}", header.version);
    println!("  Flags: 0x{:04x}", header.flags);
    println!("  Record kind: {}", kind_name(header.record_kind));
    println!(
        "  Start time: {} us ({:.3} s)",
        header.start_time_us,
        header.start_time_us as f64 / 1_000_000.0
    );
    println!(
        "  End time: {} us ({:.3} s)",
        header.end_time_us,
        header.end_time_us as f64 / 1_000_000.0
    );
    println!("  Duration: {:.3} seconds", header.duration_secs());
    println!("  Message count (header): {}", header.message_count);

    if args.verbose {
        println!();
        match header.record_kind {
            SensorMessage::KIND => print_sensor_stats(args)?,
            GraphRecord::KIND => print_graph_stats(args)?,
            _ => println!("Unknown record kind, skipping message scan"),
        }
    }

    let file_size = std::fs::metadata(&args.bag)?.len();
    println!();
    println!("File Size:");
    println!(
        "  {} bytes ({:.2} KB, {:.2} MB)",
        file_size,
        file_size as f64 / 1024.0,
        file_size as f64 / 1_048_576.0
    );
    if header.message_count > 0 {
        println!(
            "  Average per message: {:.1} bytes",
            file_size as f64 / header.message_count as f64
        );
    }

    Ok(())
}

fn kind_name(kind: u16) -> &'static str {
    match kind {
        SensorMessage::KIND => "sensor messages",
        GraphRecord::KIND => "scan graph",
        _ => "unknown",
    }
}

fn percent(count: u64, total: u64) -> f64 {
    100.0 * count as f64 / total.max(1) as f64
}

fn print_sensor_stats(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = BagPlayer::<SensorMessage>::open(&args.bag)?;

    let mut laser_count = 0u64;
    let mut odometry_count = 0u64;
    let mut first_timestamp: Option<u64> = None;
    let mut last_timestamp = 0u64;
    let mut first_laser = None;

    while let Some(msg) = player.next_immediate()? {
        let ts = msg.timestamp();
        first_timestamp.get_or_insert(ts);
        last_timestamp = ts;

        match msg {
            SensorMessage::Laser(laser) => {
                laser_count += 1;
                if first_laser.is_none() {
                    first_laser = Some(laser);
                }
            }
            SensorMessage::Odometry(_) => odometry_count += 1,
        }
    }

    let total = laser_count + odometry_count;
    println!("Message Statistics:");
    println!("  Total messages: {}", total);
    println!(
        "  LiDAR scans: {} ({:.1}%)",
        laser_count,
        percent(laser_count, total)
    );
    println!(
        "  Odometry: {} ({:.1}%)",
        odometry_count,
        percent(odometry_count, total)
    );

    let duration_secs =
        last_timestamp.saturating_sub(first_timestamp.unwrap_or(0)) as f64 / 1_000_000.0;
    if duration_secs > 0.0 {
        println!();
        println!("Rates:");
        println!("  Overall: {:.1} Hz", total as f64 / duration_secs);
        println!("  LiDAR: {:.1} Hz", laser_count as f64 / duration_secs);
        println!("  Odometry: {:.1} Hz", odometry_count as f64 / duration_secs);
    }

    if let Some(laser) = first_laser {
        let scan = &laser.data;
        println!();
        println!("First LiDAR scan:");
        println!("  Timestamp: {} us", laser.timestamp_us);
        println!("  Readings: {}", scan.len());
        let (min_range, max_range) = scan
            .ranges
            .iter()
            .filter(|r| r.is_finite())
            .fold((f64::MAX, f64::MIN), |(min, max), &r| (min.min(r), max.max(r)));
        if min_range <= max_range {
            println!("  Range: {:.3} - {:.3} m", min_range, max_range);
        }
    }

    Ok(())
}

fn print_graph_stats(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = BagPlayer::<GraphRecord>::open(&args.bag)?;

    let mut scans = 0u64;
    let mut points = 0u64;
    let mut odom = 0u64;
    let mut loops = 0u64;
    while let Some(record) = player.next_immediate()? {
        match record {
            GraphRecord::Scan(scan) => {
                scans += 1;
                points += scan.len() as u64;
            }
            GraphRecord::OdomConstraint(_) => odom += 1,
            GraphRecord::LoopConstraint(_) => loops += 1,
        }
    }

    println!("Graph Statistics:");
    println!("  Scans: {}", scans);
    println!("  Points: {} ({:.1} per scan)", points, points as f64 / scans.max(1) as f64);
    println!("  Odometry constraints: {}", odom);
    println!("  Loop constraints: {}", loops);
    Ok(())
}
