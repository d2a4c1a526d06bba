// src/cli.rs
use crate::config::PipelineConfig;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "finger_tracker",
    version,
    about = "Log fingertip coordinates of both hands, frame by frame, to CSV"
)]
#[command(group(ArgGroup::new("input").required(true).args(["video", "frames_dir"])))]
pub struct Cli {
    #[arg(long, help = "Video file to analyze (decoded with ffmpeg)")]
    pub video: Option<PathBuf>,

    #[arg(long, help = "Directory of still frames, processed in file-name order")]
    pub frames_dir: Option<PathBuf>,

    #[arg(long, short, help = "CSV output path [default: output_logs/coords_<timestamp>.csv]")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Replay detections from a JSON Lines file instead of running the detector")]
    pub detections: Option<PathBuf>,

    #[arg(long, help = "Detector program")]
    pub detector: Option<String>,

    #[arg(long = "detector-arg", allow_hyphen_values = true, help = "Argument passed to the detector (repeatable)")]
    pub detector_args: Vec<String>,

    #[arg(long)]
    pub min_detection_confidence: Option<f64>,

    #[arg(long)]
    pub min_tracking_confidence: Option<f64>,

    #[arg(long, help = "Do not mirror frames before detection")]
    pub no_mirror: bool,

    #[arg(long, help = "Write annotated frames to this directory")]
    pub overlay_dir: Option<PathBuf>,

    #[arg(long, help = "JSON config file; command line flags take precedence")]
    pub config: Option<PathBuf>,

    #[arg(long, short, help = "Debug logging")]
    pub verbose: bool,
}

impl Cli {
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(detector) = &self.detector {
            config.detector_program = detector.clone();
            config.detector_args = self.detector_args.clone();
        } else if !self.detector_args.is_empty() {
            config.detector_args = self.detector_args.clone();
        }
        if let Some(v) = self.min_detection_confidence {
            config.min_detection_confidence = v;
        }
        if let Some(v) = self.min_tracking_confidence {
            config.min_tracking_confidence = v;
        }
        if self.no_mirror {
            config.mirror = false;
        }
        if let Some(dir) = &self.overlay_dir {
            config.overlay_dir = Some(dir.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["finger_tracker"]).is_err());
        assert!(Cli::try_parse_from(["finger_tracker", "--video", "a.mov", "--frames-dir", "d"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "finger_tracker",
            "--video",
            "clip.mov",
            "--detector",
            "/opt/detect",
            "--detector-arg",
            "--model=full",
            "--no-mirror",
            "--min-detection-confidence",
            "0.7",
        ])
        .unwrap();
        let cfg = cli.apply(PipelineConfig::default());
        assert_eq!(cfg.detector_program, "/opt/detect");
        assert_eq!(cfg.detector_args, vec!["--model=full".to_string()]);
        assert!(!cfg.mirror);
        assert_eq!(cfg.min_detection_confidence, 0.7);
        assert_eq!(cfg.min_tracking_confidence, 0.5);
        assert!(cfg.output.is_none());
    }
}
