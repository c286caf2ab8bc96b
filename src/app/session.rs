use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::Serialize;

use crate::vision::ColourDefinition;

#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    Active,
    Inactive,
}

impl From<bool> for DetectionStatus {
    fn from(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}

#[derive(Clone, Serialize, Debug)]
pub struct ToggleResponse {
    pub status: DetectionStatus,
}

// Counts from the latest processed frame, plus how many frames were processed
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct DetectionStats {
    #[serde(flatten)]
    pub counts: BTreeMap<String, u32>,
    pub total_frames: u64,
}

/// State shared between the capture thread and the API handlers.
pub struct Session {
    active: AtomicBool,
    stats: Mutex<DetectionStats>,
}

impl Session {
    pub fn new(colours: &[ColourDefinition]) -> Self {
        let counts = colours.iter().map(|c| (c.name.clone(), 0)).collect();
        Self {
            active: AtomicBool::new(true),
            stats: Mutex::new(DetectionStats {
                counts,
                total_frames: 0,
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flip detection on/off, returning the new status
    pub fn toggle(&self) -> DetectionStatus {
        let was_active = self.active.fetch_xor(true, Ordering::SeqCst);
        (!was_active).into()
    }

    pub fn record(&self, counts: &BTreeMap<String, u32>) {
        if let Ok(mut stats) = self.stats.lock() {
            for (name, count) in counts {
                stats.counts.insert(name.clone(), *count);
            }
            stats.total_frames += 1;
        } else {
            log::error!("Stats lock poisoned, dropping frame counts");
        }
    }

    pub fn stats(&self) -> DetectionStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
