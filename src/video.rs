// src/video.rs - Frame sources: video files via ffmpeg, or a directory of stills
use crate::error::TrackerError;
use anyhow::{Context, Result};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A sequential stream of decoded frames. `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;

    fn describe(&self) -> String;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

fn parse_frame_rate(raw: &str) -> f64 {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().unwrap_or(30.0);
            let den = den.parse::<f64>().unwrap_or(1.0);
            if den == 0.0 { 30.0 } else { num / den }
        }
        None => raw.parse().unwrap_or(30.0),
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read directory {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decodes a stored video with ffmpeg into a scratch directory, then hands
/// frames out one at a time.
pub struct VideoFileReader {
    info: VideoInfo,
    temp_dir: PathBuf,
    frames: Vec<PathBuf>,
    current_frame: usize,
}

impl VideoFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(TrackerError::Source(format!("Video file does not exist: {}", path.display())).into());
        }
        fs::File::open(&path)
            .with_context(|| format!("Cannot read video file {}", path.display()))?;

        if Command::new("ffprobe").arg("-version").output().is_err() {
            return Err(TrackerError::Source(
                "FFmpeg is not installed or not in PATH. Please install FFmpeg to process videos.".to_string(),
            )
            .into());
        }

        let info = Self::probe(&path)?;
        info!(
            "Video {}: {}x{} @ {:.2} fps",
            info.path.display(),
            info.width,
            info.height,
            info.fps
        );

        let temp_dir = std::env::temp_dir().join(format!("finger_tracker_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("Cannot create temporary directory {}", temp_dir.display()))?;

        let mut reader = Self {
            info,
            temp_dir,
            frames: Vec::new(),
            current_frame: 0,
        };
        reader.extract_frames()?;
        Ok(reader)
    }

    fn probe(path: &Path) -> Result<VideoInfo> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate"])
            .args(["-of", "csv=p=0"])
            .arg(path)
            .output()
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            return Err(TrackerError::Source(format!(
                "ffprobe rejected {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let parts: Vec<&str> = text.trim().split(',').collect();
        if parts.len() < 3 {
            return Err(TrackerError::Source(format!("No video stream in {}", path.display())).into());
        }

        let width: u32 = parts[0]
            .parse()
            .map_err(|_| TrackerError::Source(format!("Invalid video width {:?}", parts[0])))?;
        let height: u32 = parts[1]
            .parse()
            .map_err(|_| TrackerError::Source(format!("Invalid video height {:?}", parts[1])))?;

        Ok(VideoInfo {
            path: path.to_path_buf(),
            fps: parse_frame_rate(parts[2]),
            width,
            height,
        })
    }

    fn extract_frames(&mut self) -> Result<()> {
        let pattern = self.temp_dir.join("frame_%06d.png");
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.path)
            .args(["-vsync", "0"])
            .arg(&pattern)
            .status()
            .context("Failed to extract frames with ffmpeg")?;

        if !status.success() {
            return Err(TrackerError::Source(
                "FFmpeg frame extraction failed. The video format may be unsupported.".to_string(),
            )
            .into());
        }

        self.frames = list_images(&self.temp_dir)?;
        if self.frames.is_empty() {
            warn!("{} decoded to zero frames", self.info.path.display());
        }
        debug!("Extracted {} frames to {}", self.frames.len(), self.temp_dir.display());
        Ok(())
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VideoFileReader {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.frames.get(self.current_frame) else {
            return Ok(None);
        };
        let img = image::open(path)
            .with_context(|| format!("Failed to decode extracted frame {}", path.display()))?;
        self.current_frame += 1;
        Ok(Some(img))
    }

    fn describe(&self) -> String {
        self.info.path.display().to_string()
    }
}

impl Drop for VideoFileReader {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

/// Still images in a directory, in file-name order.
pub struct ImageSequence {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    current_frame: usize,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(TrackerError::Source(format!("Not a directory: {}", dir.display())).into());
        }
        let frames = list_images(&dir)?;
        info!("Image sequence {}: {} frames", dir.display(), frames.len());
        Ok(Self {
            dir,
            frames,
            current_frame: 0,
        })
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.frames.get(self.current_frame) else {
            return Ok(None);
        };
        let img = image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
        self.current_frame += 1;
        Ok(Some(img))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
