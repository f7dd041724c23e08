use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::navigator::Suggestion;
use crate::notifier::DispatchStats;
use crate::types::Coordinate;

/// Snapshot for the display collaborator, rewritten after every input
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NavStatus {
    pub timestamp: f64,
    pub active: bool,
    pub arrived: bool,
    pub current_index: usize,
    pub instruction_count: usize,
    // Latest progress
    pub next_instruction_text: Option<String>,
    pub next_sign: Option<i32>,
    pub remaining_distance_m: Option<f64>,
    pub suggestion: Suggestion,
    pub last_fix: Option<Coordinate>,
    // Counters
    pub fixes_processed: u64,
    pub fixes_rejected: u64,
    pub signals_sent: u64,
    pub signals_failed: u64,
}

impl NavStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            active: false,
            arrived: false,
            current_index: 0,
            instruction_count: 0,
            next_instruction_text: None,
            next_sign: None,
            remaining_distance_m: None,
            suggestion: Suggestion::None,
            last_fix: None,
            fixes_processed: 0,
            fixes_rejected: 0,
            signals_sent: 0,
            signals_failed: 0,
        }
    }

    pub fn apply_dispatch_stats(&mut self, stats: DispatchStats) {
        self.signals_sent = stats.sent;
        self.signals_failed = stats.failed;
    }

    /// Clear per-route fields for a fresh or cancelled route
    pub fn reset_progress(&mut self) {
        self.arrived = false;
        self.current_index = 0;
        self.next_instruction_text = None;
        self.next_sign = None;
        self.remaining_distance_m = None;
        self.suggestion = Suggestion::None;
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for NavStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
