// src/tracking.rs - Per-frame hand slot resolution
use crate::landmarks::{DetectedHand, Handedness, HAND_SCALARS};
use std::fmt;
use tracing::{debug, error};

pub type SlotValues = [f64; HAND_SCALARS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Both,
    Left,
    Right,
    NoHands,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Both => "Both",
            Presence::Left => "Left",
            Presence::Right => "Right",
            Presence::NoHands => "NoHands",
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one Left and one Right slot. `None` is the null fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandSlots {
    pub left: Option<SlotValues>,
    pub right: Option<SlotValues>,
}

impl HandSlots {
    pub fn get(&self, side: Handedness) -> Option<&SlotValues> {
        match side {
            Handedness::Left => self.left.as_ref(),
            Handedness::Right => self.right.as_ref(),
        }
    }

    fn slot_mut(&mut self, side: Handedness) -> &mut Option<SlotValues> {
        match side {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        }
    }
}

/// Merge the hands of one frame into the two slots.
///
/// Two hands carrying the same label is a known detector failure; the later
/// one wins its slot and the other slot stays null.
pub fn resolve(hands: &[DetectedHand]) -> (HandSlots, Presence) {
    if hands.is_empty() {
        return (HandSlots::default(), Presence::NoHands);
    }

    let mut slots = HandSlots::default();
    for (i, hand) in hands.iter().enumerate() {
        let slot = slots.slot_mut(hand.handedness);
        if slot.is_some() {
            debug!("Duplicate {} hand at detection {}, keeping the later one", hand.handedness, i);
        }
        *slot = Some(hand.flatten());
    }

    let presence = match (slots.left.is_some(), slots.right.is_some()) {
        (true, true) => Presence::Both,
        (true, false) => Presence::Left,
        (false, true) => Presence::Right,
        (false, false) => {
            error!("{} detections but no hand slot populated", hands.len());
            Presence::NoHands
        }
    };

    (slots, presence)
}
