use std::fmt;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: usize,
    pub skipped: usize,
    pub alerts: usize,
    pub uploads_ok: usize,
    pub uploads_failed: usize,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} skipped={} alerts={} uploads_ok={} uploads_failed={}",
            self.cycles, self.skipped, self.alerts, self.uploads_ok, self.uploads_failed
        )
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_cycle(&self) {
        self.update(|m| m.cycles += 1);
    }

    pub fn record_skipped(&self) {
        self.update(|m| m.skipped += 1);
    }

    pub fn record_alert(&self) {
        self.update(|m| m.alerts += 1);
    }

    pub fn record_upload(&self, succeeded: bool) {
        self.update(|m| {
            if succeeded {
                m.uploads_ok += 1;
            } else {
                m.uploads_failed += 1;
            }
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
