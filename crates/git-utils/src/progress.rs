use std::io::{self, Write};
use std::time::Instant;

/// Sink for progress updates from long-running, multi-phase operations.
///
/// Producers call `begin_task` once per phase, `update` periodically inside
/// loops, and `end_task` when the phase completes. Cancellation is
/// cooperative: producers poll `is_cancelled` at loop boundaries and must
/// abort promptly, leaving no partial output behind.
pub trait ProgressSink {
    /// Start a new task with an optional expected total count.
    fn begin_task(&mut self, title: &str, total: Option<u64>);

    /// Report the number of completed work items for the current task.
    fn update(&mut self, completed: u64);

    /// Whether the consumer has requested cancellation.
    fn is_cancelled(&self) -> bool;

    /// Finish the current task.
    fn end_task(&mut self);
}

/// Discards all progress output and never requests cancellation.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin_task(&mut self, _title: &str, _total: Option<u64>) {}
    fn update(&mut self, _completed: u64) {}
    fn is_cancelled(&self) -> bool {
        false
    }
    fn end_task(&mut self) {}
}

/// Progress display on stderr, matching C git's progress.c behavior.
///
/// Renders updates like:
/// - `Finding commits: 42` (no total)
/// - `Finding commits:  50% (42/84)` (with total)
pub struct StderrProgress {
    title: String,
    total: Option<u64>,
    current: u64,
    started: bool,
    last_update: Instant,
    /// Minimum delay between display updates in milliseconds.
    delay_ms: u64,
    /// Last percentage displayed (to avoid redundant updates).
    last_percent: Option<u32>,
}

impl StderrProgress {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            total: None,
            current: 0,
            started: false,
            last_update: Instant::now(),
            delay_ms: 100,
            last_percent: None,
        }
    }

    fn display(&self) {
        let mut stderr = io::stderr();
        let line = match self.total {
            Some(total) if total > 0 => {
                let percent = (self.current as f64 / total as f64) * 100.0;
                format!("\r{}: {:3.0}% ({}/{})", self.title, percent, self.current, total)
            }
            _ => format!("\r{}: {}", self.title, self.current),
        };
        let _ = write!(stderr, "{}", line);
        let _ = stderr.flush();
    }
}

impl Default for StderrProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for StderrProgress {
    fn begin_task(&mut self, title: &str, total: Option<u64>) {
        self.title = title.to_string();
        self.total = total;
        self.current = 0;
        self.started = false;
        self.last_percent = None;
        self.last_update = Instant::now();
    }

    fn update(&mut self, completed: u64) {
        self.current = completed;

        let now = Instant::now();
        let since_last = now.duration_since(self.last_update).as_millis() as u64;

        // Rate-limit updates, but always display the final count.
        if self.started && since_last < self.delay_ms {
            match self.total {
                Some(total) if completed >= total => {}
                _ => return,
            }
        }

        // Skip redundant repaints of the same percentage.
        if let Some(total) = self.total {
            if total > 0 {
                let percent = ((completed as f64 / total as f64) * 100.0) as u32;
                if self.started && self.last_percent == Some(percent) && completed < total {
                    return;
                }
                self.last_percent = Some(percent);
            }
        }

        self.started = true;
        self.last_update = now;
        self.display();
    }

    fn is_cancelled(&self) -> bool {
        false
    }

    fn end_task(&mut self) {
        if !self.started {
            return;
        }
        let mut stderr = io::stderr();
        match self.total {
            Some(total) if total > 0 => {
                let _ = write!(stderr, "\r{}: 100% ({}/{}), done.\n", self.title, total, total);
            }
            _ => {
                let _ = write!(stderr, "\r{}: {}, done.\n", self.title, self.current);
            }
        }
        let _ = stderr.flush();
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_progress_never_cancels() {
        let mut p = NoProgress;
        p.begin_task("Counting", Some(10));
        p.update(5);
        assert!(!p.is_cancelled());
        p.end_task();
    }

    #[test]
    fn stderr_progress_tracks_count() {
        let mut p = StderrProgress::new();
        p.delay_ms = 0;
        p.begin_task("Counting", Some(100));
        p.update(50);
        assert_eq!(p.current, 50);
        assert!(p.started);
        p.end_task();
        assert!(!p.started);
    }

    #[test]
    fn stderr_progress_without_total() {
        let mut p = StderrProgress::new();
        p.delay_ms = 0;
        p.begin_task("Walking", None);
        p.update(42);
        assert_eq!(p.current, 42);
        assert!(p.started);
    }

    #[test]
    fn begin_task_resets_state() {
        let mut p = StderrProgress::new();
        p.delay_ms = 0;
        p.begin_task("First", Some(10));
        p.update(10);
        p.begin_task("Second", Some(20));
        assert_eq!(p.current, 0);
        assert!(!p.started);
    }
}
