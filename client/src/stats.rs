//! Usage telemetry decoding and display helpers.

use log::debug;
use shared::{StatsMessage, UsageSnapshot};

/// Decodes the periodic `stats` stream into the latest [`UsageSnapshot`].
///
/// Telemetry is advisory and high-frequency, so a payload that fails to
/// parse is simply dropped: the previous snapshot stays in place and no
/// error propagates. The snapshot is replaced wholesale on success; readers
/// never observe a partial merge.
pub struct StatsTracker {
    snapshot: UsageSnapshot,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            snapshot: UsageSnapshot::default(),
        }
    }

    /// Processes one raw `stats` payload.
    pub fn on_message(&mut self, raw: &str) {
        match serde_json::from_str::<StatsMessage>(raw) {
            Ok(message) => self.snapshot = message.into(),
            Err(err) => debug!("discarding malformed stats payload: {}", err),
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot
    }

    /// Human-readable uptime, or `None` while the server is not running
    /// (an uptime of zero means "not running or unknown").
    pub fn uptime_display(&self) -> Option<String> {
        if self.snapshot.uptime_millis == 0 {
            return None;
        }
        Some(format_uptime(self.snapshot.uptime_seconds()))
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a duration in whole seconds for the status panel: day-granular
/// uptimes read as "2d 4h 7m", anything shorter as "H:MM:SS".
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}
