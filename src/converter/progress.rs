//! Progress reporting.

/// Receives the completed share of a conversion in percent.
///
/// Called synchronously once per written tile; slow sinks stall the
/// conversion.
pub trait ProgressSink {
    fn on_progress(&mut self, percent: u32);
}

impl<F: FnMut(u32)> ProgressSink for F {
    fn on_progress(&mut self, percent: u32) {
        self(percent)
    }
}

/// Tile counter that forwards percentages to an optional sink.
pub(crate) struct ProgressCounter<'a> {
    sink: Option<&'a mut dyn ProgressSink>,
    current: usize,
    total: usize,
}

impl<'a> ProgressCounter<'a> {
    pub(crate) fn new(total: usize, sink: Option<&'a mut dyn ProgressSink>) -> Self {
        Self {
            sink,
            current: 0,
            total,
        }
    }

    /// Count one tile and report.
    pub(crate) fn tick(&mut self) {
        self.current += 1;
        if let Some(sink) = self.sink.as_mut() {
            sink.on_progress(percent(self.current, self.total));
        }
    }

    pub(crate) fn current(&self) -> usize {
        self.current
    }
}

/// `round(100 * current / total)`, clamped to 100.
pub fn percent(current: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    let value = (100.0 * current as f64 / total as f64).round();
    value.min(100.0) as u32
}
