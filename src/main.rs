// Replays a directory of captured frames through one touch pipeline at the
// configured host rate and logs every touch point.
//
// Usage: ripple_floor <frames_dir> [config.json] [mask_output_dir]

use anyhow::{Context, Result};
use ripple_floor::TouchPipeline;
use ripple_floor::config::FloorConfig;
use ripple_floor::runner::{LogSink, Stream, StreamRunner};
use ripple_floor::sources::{FrameSource, ImageSequenceSource};
use std::env;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: ripple_floor <frames_dir> [config.json] [mask_output_dir]");
        return Ok(());
    }
    let frames_dir = Path::new(&args[1]);
    let config = match args.get(2) {
        Some(path) => FloorConfig::load(Path::new(path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => FloorConfig::default(),
    };
    let mask_dir = args.get(3).map(PathBuf::from);

    // --- 2. Source & Pipeline ---
    let source = ImageSequenceSource::open(frames_dir)
        .with_context(|| format!("opening frame directory {}", frames_dir.display()))?;
    let ticks = source.len() as u64;
    let (width, height) = source.dimensions();
    let detector_config = config.detector_config();
    log::info!("{:?} stream, detector {detector_config:?}", config.stream);
    let detector = TouchPipeline::new(detector_config, width, height)?;

    let name = format!("{:?}", config.stream).to_lowercase();
    let mut stream = Stream::new(name, detector, Box::new(source), Box::new(LogSink));
    if let Some(dir) = mask_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating mask directory {}", dir.display()))?;
        stream = stream.with_mask_dir(dir);
    }

    // --- 3. Host Loop ---
    let summary = StreamRunner::new(config.tick_hz).run_stream(stream, ticks).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
