//! Viewport size-change detection.
//!
//! Host layouts can change the grid's pixel size without any discrete
//! event. Hosts that can push a resize notification implement
//! `ResizeSignal` over their observer; hosts that cannot expose a plain
//! size query and let the low-frequency poll catch changes. Either way the
//! watcher only reports an observed change (it is a debouncing safeguard,
//! not a scheduler) and the caller re-runs the window renderer on `true`.

use std::time::{Duration, Instant};

/// Source of the viewport's current pixel size.
pub trait ResizeSignal {
    fn size_px(&mut self) -> (f32, f32);
}

#[derive(Debug)]
pub struct SizeWatcher {
    last_size: Option<(f32, f32)>,
    min_interval: Duration,
    last_check: Option<Instant>,
}

impl Default for SizeWatcher {
    fn default() -> Self {
        // Low-frequency poll, order of the original 200 ms body-size timer
        Self::new(Duration::from_millis(200))
    }
}

impl SizeWatcher {
    pub fn new(min_interval: Duration) -> Self {
        Self { last_size: None, min_interval, last_check: None }
    }

    /// Compare the signal's current size against the last observation.
    /// Returns true only when the size actually changed (the first
    /// observation counts as a change). Polls more frequent than the
    /// minimum interval are skipped.
    pub fn poll(&mut self, signal: &mut dyn ResizeSignal) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_check {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_check = Some(now);

        let size = signal.size_px();
        if self.last_size != Some(size) {
            self.last_size = Some(size);
            true
        } else {
            false
        }
    }

    pub fn last_size(&self) -> Option<(f32, f32)> {
        self.last_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSize(f32, f32);

    impl ResizeSignal for FixedSize {
        fn size_px(&mut self) -> (f32, f32) {
            (self.0, self.1)
        }
    }

    #[test]
    fn test_change_detected_by_comparison() {
        let mut watcher = SizeWatcher::new(Duration::ZERO);
        let mut signal = FixedSize(800.0, 600.0);

        // First observation counts as a change
        assert!(watcher.poll(&mut signal));
        // Stable size: no trigger
        assert!(!watcher.poll(&mut signal));

        signal.1 = 400.0;
        assert!(watcher.poll(&mut signal));
        assert_eq!(watcher.last_size(), Some((800.0, 400.0)));
    }

    #[test]
    fn test_polls_rate_limited() {
        let mut watcher = SizeWatcher::new(Duration::from_secs(3600));
        let mut signal = FixedSize(800.0, 600.0);

        assert!(watcher.poll(&mut signal));
        signal.0 = 100.0;
        // Inside the minimum interval: skipped even though the size changed
        assert!(!watcher.poll(&mut signal));
    }
}
