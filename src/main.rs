//! ndt-slam: builds an NDT scan graph and occupancy map from a sensor bag.
//!
//! # Usage
//!
//! ```bash
//! ndt-slam --bag drive.bag --graph-out drive.graph --map-out drive.pgm
//! ndt-slam --config ndt-slam.toml --bag drive.bag --speed 0
//! ndt-slam --bag more.bag --resume drive.graph --graph-out drive.graph
//! ```
//!
//! The mapper thread replays the bag while the publisher thread rebuilds the
//! map in the background. Ctrl-C stops playback early; outputs are still
//! written for everything mapped so far.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use ndt_slam::algorithms::mapping::OccupancyGrid;
use ndt_slam::algorithms::matching::{NdtScanMatcher, ScanMatcher};
use ndt_slam::config::NdtSlamConfig;
use ndt_slam::engine::graph::Graph;
use ndt_slam::engine::slam::Mapper;
use ndt_slam::io::graph_store;
use ndt_slam::state::{MapHistory, create_shared_state};
use ndt_slam::threads::{MapPublisher, MapperThread, MessageSource, PublisherThread};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sensor bag to replay
    #[arg(short, long)]
    bag: PathBuf,

    /// Playback speed factor (0 = as fast as possible)
    #[arg(short, long, default_value_t = 1.0)]
    speed: f64,

    /// Continue mapping on top of a saved graph
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write the scan graph here
    #[arg(long)]
    graph_out: Option<PathBuf>,

    /// Write the occupancy map here (PGM)
    #[arg(long)]
    map_out: Option<PathBuf>,

    /// Write graph markers here (JSON)
    #[arg(long)]
    markers_out: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let config = NdtSlamConfig::load_or_default(args.config.as_deref());

    log::info!("ndt-slam starting");
    log::info!("  Input: {} ({}x)", args.bag.display(), args.speed);
    log::info!(
        "  Matcher: {:.2}m cells, {} candidates per scan",
        config.matcher.resolution,
        config.matcher.search_space_size()
    );
    log::info!("  Renderer: {:?}", config.publisher.renderer);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    }) {
        log::warn!("Ctrl-C handler not installed: {}", e);
    }

    if let Err(e) = run_threaded_mode(&args, &config, running) {
        log::error!("ndt-slam error: {}", e);
        std::process::exit(1);
    }

    log::info!("ndt-slam shutdown complete");
}

fn run_threaded_mode(
    args: &Args,
    config: &NdtSlamConfig,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn Error>> {
    let mut matcher = NdtScanMatcher::new(config.matcher.clone());
    matcher.set_range_max(config.sensor.range_max);

    let mapper = match &args.resume {
        Some(path) => {
            let graph = graph_store::load(path)?;
            log::info!("Resuming from {} ({} scans)", path.display(), graph.len());
            Mapper::from_graph(config.mapper.clone(), matcher, graph)
        }
        None => Mapper::new(config.mapper.clone(), matcher),
    };

    let ndt_config = config.matcher.ndt_config();
    let shared_state = create_shared_state(ndt_config);
    if !mapper.is_empty() {
        shared_state.replace_history(MapHistory {
            graph: mapper.graph().clone(),
            odom_poses: mapper.odom_poses().to_vec(),
        });
    }

    let publisher = MapPublisher::new(
        config.publisher.renderer,
        ndt_config,
        config.sensor.range_max,
        config.render.clone(),
        config.occupancy.clone(),
    );
    let publisher_thread = PublisherThread::spawn(
        config.publisher.clone(),
        publisher,
        shared_state.clone(),
        running.clone(),
    )?;

    let source = MessageSource::Bag {
        path: args.bag.clone(),
        speed: args.speed,
    };
    let mapper_thread =
        MapperThread::spawn(mapper, source, shared_state.clone(), running.clone())?;

    let graph = mapper_thread
        .join()
        .map_err(|_| "mapper thread panicked")?;

    // Playback finished or was interrupted; let the publisher drain
    running.store(false, Ordering::Relaxed);
    publisher_thread
        .join()
        .map_err(|_| "publisher thread panicked")?;

    log::info!(
        "Mapped {} scans, {} odometry constraints",
        graph.len(),
        graph.odom_constraints().len()
    );

    write_outputs(args, &graph, shared_state.occupancy().as_deref())
}

fn write_outputs(
    args: &Args,
    graph: &Graph,
    occupancy: Option<&OccupancyGrid>,
) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &args.graph_out {
        let info = graph_store::save(graph, path)?;
        log::info!(
            "Saved graph to {} ({} records, {} bytes)",
            path.display(),
            info.message_count,
            info.file_size_bytes
        );
    }

    if let Some(path) = &args.map_out {
        match occupancy {
            Some(map) => {
                map.write_pgm(path)?;
                let (free, unknown, occupied) = map.count_cells();
                log::info!(
                    "Saved map to {} ({}x{}, {} occupied, {} free, {} unknown)",
                    path.display(),
                    map.width(),
                    map.height(),
                    occupied,
                    free,
                    unknown
                );
            }
            None => log::warn!("No map was published, skipping {}", path.display()),
        }
    }

    if let Some(path) = &args.markers_out {
        write_markers(graph, path)?;
    }

    Ok(())
}

fn write_markers(graph: &Graph, path: &Path) -> Result<(), Box<dyn Error>> {
    let markers = graph.markers();
    std::fs::write(path, markers.to_json()?)?;
    log::info!("Saved {} markers to {}", markers.len(), path.display());
    Ok(())
}
