// src/mediapipe_bridge.rs - Hand landmark detectors
//
// The live detector talks to a MediaPipe helper process: per frame it sends a
// 12-byte header (width, height, channels as little-endian u32) plus raw RGB
// bytes, and reads back one JSON line:
//
//   {"hands":[{"handedness":"Left","landmarks":[{"x":..,"y":..,"z":..}, ...]}],"error":null}
//
// The replay detector reads the same JSON shape from a file, one line per frame.
use crate::error::TrackerError;
use crate::landmarks::RawHand;
use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

pub trait HandLandmarker {
    /// Detect every hand in one frame.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawHand>>;
}

impl<T: HandLandmarker + ?Sized> HandLandmarker for Box<T> {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawHand>> {
        (**self).detect(image)
    }
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

impl DetectionJson {
    fn into_hands(self) -> Result<Vec<RawHand>, TrackerError> {
        if let Some(error) = self.error {
            return Err(TrackerError::MalformedDetection(format!("detector reported: {}", error)));
        }
        Ok(self
            .hands
            .into_iter()
            .map(|hand| RawHand {
                handedness: hand.handedness,
                landmarks: hand.landmarks.iter().map(|lm| [lm.x, lm.y, lm.z]).collect(),
            })
            .collect())
    }
}

fn parse_line(line: &str) -> Result<Vec<RawHand>> {
    let parsed: DetectionJson = serde_json::from_str(line.trim())
        .map_err(|e| TrackerError::MalformedDetection(format!("unparseable detector output: {}", e)))?;
    Ok(parsed.into_hands()?)
}

#[derive(Debug, Clone)]
pub struct DetectorCommand {
    pub program: String,
    pub args: Vec<String>,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

/// MediaPipe hand landmarker running in a child process.
pub struct SubprocessLandmarker {
    process: Child,
    stdin: ChildStdin,
    stdout_reader: BufReader<ChildStdout>,
}

impl SubprocessLandmarker {
    pub fn spawn(cmd: &DetectorCommand) -> Result<Self> {
        info!("Starting hand detector: {} {}", cmd.program, cmd.args.join(" "));

        let mut process = Command::new(&cmd.program)
            .args(&cmd.args)
            .arg("--min-detection-confidence")
            .arg(cmd.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(cmd.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start hand detector {:?}", cmd.program))?;

        let stdin = process.stdin.take().context("Failed to get detector stdin")?;
        let stdout = process.stdout.take().context("Failed to get detector stdout")?;
        let mut stdout_reader = BufReader::new(stdout);

        let mut ready_line = String::new();
        stdout_reader
            .read_line(&mut ready_line)
            .context("Failed to read detector handshake")?;
        if ready_line.trim() != "READY" {
            let _ = process.kill();
            return Err(TrackerError::Oracle(format!(
                "detector did not signal ready, got: {:?}",
                ready_line.trim()
            ))
            .into());
        }

        info!("Hand detector ready");
        Ok(Self {
            process,
            stdin,
            stdout_reader,
        })
    }
}

impl HandLandmarker for SubprocessLandmarker {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawHand>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let send = |stdin: &mut ChildStdin| -> std::io::Result<()> {
            stdin.write_all(&width.to_le_bytes())?;
            stdin.write_all(&height.to_le_bytes())?;
            stdin.write_all(&3u32.to_le_bytes())?;
            stdin.write_all(rgb.as_raw())?;
            stdin.flush()
        };
        send(&mut self.stdin)
            .map_err(|e| TrackerError::Oracle(format!("failed to send frame: {}", e)))?;

        let mut response = String::new();
        let read = self
            .stdout_reader
            .read_line(&mut response)
            .map_err(|e| TrackerError::Oracle(format!("failed to read detections: {}", e)))?;
        if read == 0 {
            return Err(TrackerError::Oracle("detector exited unexpectedly".to_string()).into());
        }

        let hands = parse_line(&response)?;
        debug!("Detector returned {} hand(s)", hands.len());
        Ok(hands)
    }
}

impl Drop for SubprocessLandmarker {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Pre-recorded detections, one JSON line per frame.
pub struct ReplayLandmarker {
    path: PathBuf,
    reader: BufReader<File>,
    line_no: usize,
    exhausted: bool,
}

impl ReplayLandmarker {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Cannot open detections file {}", path.display()))?;
        info!("Replaying detections from {}", path.display());
        Ok(Self {
            path,
            reader: BufReader::new(file),
            line_no: 0,
            exhausted: false,
        })
    }
}

impl HandLandmarker for ReplayLandmarker {
    fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<RawHand>> {
        let mut buf = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if read == 0 {
            if !self.exhausted {
                warn!(
                    "{} ran out after {} frames, remaining frames have no hands",
                    self.path.display(),
                    self.line_no
                );
                self.exhausted = true;
            }
            return Ok(Vec::new());
        }
        self.line_no += 1;

        // Bad bytes only spoil this frame, not the rest of the file.
        let line = String::from_utf8(buf).map_err(|_| {
            anyhow::Error::from(TrackerError::MalformedDetection(
                "line is not valid UTF-8".to_string(),
            ))
            .context(format!("{}:{}", self.path.display(), self.line_no))
        })?;
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_line(&line).with_context(|| format!("{}:{}", self.path.display(), self.line_no))
    }
}
