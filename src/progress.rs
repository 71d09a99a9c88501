use anyhow::Result;
use indicatif::ProgressBar;
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::thread;

/// Rolling completion estimate for one conversion. `update` yields a
/// formatted line only when the rounded percentage moves, so the log is
/// never flooded with repeats.
pub struct ProgressTracker {
    label: String,
    duration_seconds: f64,
    last_percent: Option<f64>,
}

impl ProgressTracker {
    pub fn new(label: String, duration_seconds: f64) -> Self {
        Self {
            label,
            duration_seconds,
            last_percent: None,
        }
    }

    pub fn update(&mut self, out_time_us: i64, speed: &str) -> Option<String> {
        if self.duration_seconds <= 0.0 {
            return None;
        }
        let seconds = out_time_us.max(0) as f64 / 1_000_000.0;
        let percent = (seconds / self.duration_seconds * 100.0).clamp(0.0, 100.0);
        let percent = (percent * 100.0).round() / 100.0;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(format!("{} [{percent:.2}% at {speed}]", self.label))
    }
}

/// Folds the encoder's key=value progress lines into chunks. A chunk ends
/// at its `progress=` line and is reported only when both `out_time_us`
/// and `speed` carried usable values; the literal N/A suppresses the chunk.
#[derive(Default)]
pub struct ChunkFolder {
    out_time_us: Option<i64>,
    speed: Option<String>,
}

pub enum ChunkEvent {
    Progress { out_time_us: i64, speed: String },
    Finished,
    Pending,
}

impl ChunkFolder {
    pub fn feed(&mut self, key: &str, value: &str) -> ChunkEvent {
        match key {
            "out_time_us" => {
                self.out_time_us = value.parse().ok();
                ChunkEvent::Pending
            }
            "speed" => {
                self.speed = (value != "N/A").then(|| value.to_string());
                ChunkEvent::Pending
            }
            "progress" => {
                let chunk = (self.out_time_us.take(), self.speed.take());
                if value == "end" {
                    return ChunkEvent::Finished;
                }
                if let (Some(out_time_us), Some(speed)) = chunk {
                    ChunkEvent::Progress { out_time_us, speed }
                } else {
                    ChunkEvent::Pending
                }
            }
            _ => ChunkEvent::Pending,
        }
    }
}

/// Drains the encoder's progress channel, surfacing each changed
/// percentage as the spinner message.
pub fn pump_progress<R: Read + Send + 'static>(
    reader: R,
    spinner: ProgressBar,
    mut tracker: ProgressTracker,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || {
        let re_kv = Regex::new(r"^(\w+)=(.*)$").unwrap();
        let reader = BufReader::new(reader);
        let mut folder = ChunkFolder::default();
        for line in reader.lines() {
            let line = line?;
            if let Some(caps) = re_kv.captures(line.trim()) {
                if let ChunkEvent::Progress { out_time_us, speed } =
                    folder.feed(&caps[1], caps[2].trim())
                    && let Some(message) = tracker.update(out_time_us, &speed)
                {
                    spinner.set_message(message);
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_chunk(folder: &mut ChunkFolder, out_time_us: &str, speed: &str) -> ChunkEvent {
        folder.feed("out_time_us", out_time_us);
        folder.feed("speed", speed);
        folder.feed("progress", "continue")
    }

    #[test]
    fn test_percent_line_format() {
        let mut tracker = ProgressTracker::new("[1 / 2] The Matrix (1999)".into(), 200.0);
        let line = tracker.update(100_000_000, "1.01x").unwrap();
        assert_eq!(line, "[1 / 2] The Matrix (1999) [50.00% at 1.01x]");
    }

    #[test]
    fn test_unchanged_percentage_logs_once() {
        let mut tracker = ProgressTracker::new("x".into(), 1000.0);
        assert!(tracker.update(500_000_000, "1.0x").is_some());
        // 10us further along rounds to the same 50.00%
        assert!(tracker.update(500_000_010, "1.1x").is_none());
        assert!(tracker.update(510_000_000, "1.1x").is_some());
    }

    #[test]
    fn test_percentage_is_clamped() {
        let mut tracker = ProgressTracker::new("x".into(), 100.0);
        let line = tracker.update(200_000_000, "9.9x").unwrap();
        assert!(line.contains("[100.00% at 9.9x]"));
        let line = tracker.update(-5, "1.0x").unwrap();
        assert!(line.contains("[0.00% at 1.0x]"));
    }

    #[test]
    fn test_not_applicable_marker_suppresses_chunk() {
        let mut folder = ChunkFolder::default();
        assert!(matches!(
            feed_chunk(&mut folder, "N/A", "1.0x"),
            ChunkEvent::Pending
        ));
        assert!(matches!(
            feed_chunk(&mut folder, "1000000", "N/A"),
            ChunkEvent::Pending
        ));
        assert!(matches!(
            feed_chunk(&mut folder, "1000000", "1.0x"),
            ChunkEvent::Progress { .. }
        ));
    }

    #[test]
    fn test_chunk_state_does_not_leak_across_chunks() {
        let mut folder = ChunkFolder::default();
        feed_chunk(&mut folder, "1000000", "1.0x");
        // next chunk carries only a speed; the stale out_time must not be reused
        folder.feed("speed", "1.2x");
        assert!(matches!(
            folder.feed("progress", "continue"),
            ChunkEvent::Pending
        ));
    }

    #[test]
    fn test_end_marker_finishes() {
        let mut folder = ChunkFolder::default();
        folder.feed("out_time_us", "1000000");
        folder.feed("speed", "1.0x");
        assert!(matches!(
            folder.feed("progress", "end"),
            ChunkEvent::Finished
        ));
    }
}
