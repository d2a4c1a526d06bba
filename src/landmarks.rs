// src/landmarks.rs - Hand keypoint layout and fingertip extraction
use crate::error::TrackerError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MediaPipe hand landmark indices.
#[allow(dead_code)]
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

pub const NUM_LANDMARKS: usize = 21;

/// Scalars per hand: 5 fingertips x (x, y, z).
pub const HAND_SCALARS: usize = 15;

/// Bones drawn by the overlay renderer.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = {
    use self::index::*;
    [
        (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
        (WRIST, INDEX_FINGER_MCP), (INDEX_FINGER_MCP, INDEX_FINGER_PIP),
        (INDEX_FINGER_PIP, INDEX_FINGER_DIP), (INDEX_FINGER_DIP, INDEX_FINGER_TIP),
        (INDEX_FINGER_MCP, MIDDLE_FINGER_MCP), (MIDDLE_FINGER_MCP, MIDDLE_FINGER_PIP),
        (MIDDLE_FINGER_PIP, MIDDLE_FINGER_DIP), (MIDDLE_FINGER_DIP, MIDDLE_FINGER_TIP),
        (MIDDLE_FINGER_MCP, RING_FINGER_MCP), (RING_FINGER_MCP, RING_FINGER_PIP),
        (RING_FINGER_PIP, RING_FINGER_DIP), (RING_FINGER_DIP, RING_FINGER_TIP),
        (RING_FINGER_MCP, PINKY_MCP), (WRIST, PINKY_MCP),
        (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    ]
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub const ALL: [Handedness; 2] = [Handedness::Left, Handedness::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handedness {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Left" => Ok(Handedness::Left),
            "Right" => Ok(Handedness::Right),
            other => Err(TrackerError::MalformedDetection(format!(
                "unknown handedness label {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Column order for every hand slot.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip_index(&self) -> usize {
        match self {
            Finger::Thumb => index::THUMB_TIP,
            Finger::Index => index::INDEX_FINGER_TIP,
            Finger::Middle => index::MIDDLE_FINGER_TIP,
            Finger::Ring => index::RING_FINGER_TIP,
            Finger::Pinky => index::PINKY_TIP,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Finger::Thumb => "Thumb",
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Pinky => "Pinky",
        }
    }
}

/// One hand as reported by the detector, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHand {
    pub handedness: String,
    pub landmarks: Vec<[f64; 3]>,
}

/// A validated hand reduced to its five fingertips.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    pub handedness: Handedness,
    pub fingertips: [Vector3<f64>; 5],
}

impl DetectedHand {
    pub fn from_raw(raw: &RawHand) -> Result<Self, TrackerError> {
        let handedness: Handedness = raw.handedness.parse()?;

        if raw.landmarks.len() < NUM_LANDMARKS {
            return Err(TrackerError::MalformedDetection(format!(
                "{} hand has {} landmarks, expected {}",
                handedness,
                raw.landmarks.len(),
                NUM_LANDMARKS
            )));
        }

        let mut fingertips = [Vector3::zeros(); 5];
        for (slot, finger) in fingertips.iter_mut().zip(Finger::ALL.iter()) {
            let lm = raw.landmarks[finger.tip_index()];
            *slot = Vector3::new(lm[0], lm[1], lm[2]);
        }

        Ok(Self { handedness, fingertips })
    }

    /// Thumb..Pinky, x/y/z within each finger.
    pub fn flatten(&self) -> [f64; HAND_SCALARS] {
        let mut out = [0.0; HAND_SCALARS];
        for (i, tip) in self.fingertips.iter().enumerate() {
            out[i * 3] = tip.x;
            out[i * 3 + 1] = tip.y;
            out[i * 3 + 2] = tip.z;
        }
        out
    }
}

/// Validate every hand of one frame. Any bad hand rejects the whole frame.
pub fn validate_frame(raw: &[RawHand]) -> Result<Vec<DetectedHand>, TrackerError> {
    raw.iter().map(DetectedHand::from_raw).collect()
}

#[cfg(test)]
pub(crate) fn synthetic_hand(handedness: &str, base: f64) -> RawHand {
    // Landmark i sits at (base + i, base + i + 0.1, base + i + 0.2) / 100
    let landmarks = (0..NUM_LANDMARKS)
        .map(|i| {
            let v = base + i as f64;
            [v / 100.0, (v + 0.1) / 100.0, (v + 0.2) / 100.0]
        })
        .collect();
    RawHand {
        handedness: handedness.to_string(),
        landmarks,
    }
}
