use std::time::{Duration, Instant};

const MIB: f64 = 1024.0 * 1024.0;

/// Bytes between two UI updates.
pub const REPORT_EVERY_BYTES: u64 = 512 * 1024;

/// Cadence of the rate / ETA recomputation, independent of byte progress.
pub const RATE_INTERVAL: Duration = Duration::from_secs(2);

/// Tracks one download and decides when the UI should hear about it.
///
/// Stage percent is derived from a monotonically increasing byte count and
/// clamped, so it never regresses and never exceeds 100 even when the server
/// under-reports `Content-Length`.
#[derive(Debug)]
pub struct TransferProgress {
    content_length: Option<u64>,
    last_reported_bytes: u64,
    last_percent: u8,
    rate_window_start: Instant,
    bytes_at_window_start: u64,
    rate_text: String,
}

/// What a UI update should show.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSnapshot {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub stage_percent: u8,
    pub rate_text: String,
}

impl TransferProgress {
    pub fn new(content_length: Option<u64>, started: Instant) -> Self {
        Self {
            content_length: content_length.filter(|len| *len > 0),
            last_reported_bytes: 0,
            last_percent: 0,
            rate_window_start: started,
            bytes_at_window_start: 0,
            rate_text: String::new(),
        }
    }

    /// Record the running byte total. Returns a snapshot once at least
    /// [`REPORT_EVERY_BYTES`] arrived since the previous one.
    pub fn record(&mut self, downloaded: u64, now: Instant) -> Option<TransferSnapshot> {
        let window = now.saturating_duration_since(self.rate_window_start);
        if window >= RATE_INTERVAL {
            self.rate_text = self.describe_rate(downloaded, window);
            self.rate_window_start = now;
            self.bytes_at_window_start = downloaded;
        }

        if downloaded.saturating_sub(self.last_reported_bytes) <= REPORT_EVERY_BYTES {
            return None;
        }
        self.last_reported_bytes = downloaded;
        Some(self.snapshot(downloaded))
    }

    pub fn snapshot(&mut self, downloaded: u64) -> TransferSnapshot {
        let percent = match self.content_length {
            Some(total) => (downloaded.saturating_mul(100) / total).min(100) as u8,
            None => 0,
        };
        self.last_percent = self.last_percent.max(percent);

        TransferSnapshot {
            downloaded,
            total: self.content_length,
            stage_percent: self.last_percent,
            rate_text: self.rate_text.clone(),
        }
    }

    fn describe_rate(&self, downloaded: u64, window: Duration) -> String {
        let bytes = downloaded.saturating_sub(self.bytes_at_window_start) as f64;
        let mib_per_sec = bytes / MIB / window.as_secs_f64();

        let eta = match self.content_length {
            Some(total) if mib_per_sec > 0.1 => {
                let remaining = total.saturating_sub(downloaded) as f64 / MIB;
                let seconds = (remaining / mib_per_sec) as u64;
                if seconds < 60 {
                    format!("{seconds}s")
                } else {
                    format!("{}m", seconds / 60)
                }
            }
            _ => String::new(),
        };

        format!(" • {mib_per_sec:.1} MB/s • {eta} left")
    }
}

impl TransferSnapshot {
    /// Status line such as `Downloading JDK 11: 12/180 MB (6%) • 2.0 MB/s • 84s left`.
    pub fn describe(&self, label: &str) -> String {
        format!(
            "{}: {}/{} MB ({}%){}",
            label,
            self.downloaded / (1024 * 1024),
            self.total.unwrap_or(0) / (1024 * 1024),
            self.stage_percent,
            self.rate_text
        )
    }
}
