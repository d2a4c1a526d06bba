// src/main.rs
mod app;
mod cli;
mod config;
mod data;
mod error;
mod landmarks;
mod mediapipe_bridge;
mod tracking;
mod ui;
mod video;

use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::Pipeline;
use crate::cli::Cli;
use crate::config::PipelineConfig;
use crate::data::CsvSink;
use crate::mediapipe_bridge::{DetectorCommand, HandLandmarker, ReplayLandmarker, SubprocessLandmarker};
use crate::ui::OverlayWriter;
use crate::video::{FrameSource, ImageSequence, VideoFileReader};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let config = cli.apply(base);

    let source = open_source(cli)?;

    let landmarker: Box<dyn HandLandmarker> = match &cli.detections {
        Some(path) => Box::new(ReplayLandmarker::open(path)?),
        None => Box::new(SubprocessLandmarker::spawn(&DetectorCommand {
            program: config.detector_program.clone(),
            args: config.detector_args.clone(),
            min_detection_confidence: config.min_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
        })?),
    };

    let output = config.output.clone().unwrap_or_else(data::default_output_path);
    let sink = CsvSink::create(&output)?;

    let overlay = match &config.overlay_dir {
        Some(dir) => Some(OverlayWriter::new(dir, config.mirror)?),
        None => None,
    };

    let mut pipeline = Pipeline::new(source, landmarker, sink)
        .with_mirror(config.mirror)
        .with_overlay(overlay);
    watch_for_quit(pipeline.abort_handle());

    let summary = pipeline.run()?;
    if summary.aborted {
        info!("Stopped early at operator request");
    }
    println!("{}", summary.output.display());
    Ok(())
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>> {
    match (&cli.video, &cli.frames_dir) {
        (Some(video), _) => {
            let reader = VideoFileReader::open(video)?;
            info!("{} frames to analyze", reader.total_frames());
            Ok(Box::new(reader))
        }
        (None, Some(dir)) => {
            let seq = ImageSequence::open(dir)?;
            info!("{} frames to analyze", seq.total_frames());
            Ok(Box::new(seq))
        }
        (None, None) => anyhow::bail!("either --video or --frames-dir is required"),
    }
}

/// `q` + Enter on stdin stops the run after the current frame.
fn watch_for_quit(abort: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                abort.store(true, Ordering::SeqCst);
                break;
            }
        }
    });
}
