//! Progress reporting for recycle-bin scans.
//!
//! Progress is purely observational: sinks are told how many groups have
//! been processed after each one and cannot influence the scan.

use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Status line shown while deleted items are assembled
pub const SCAN_STATUS: &str = "Adding deleted items. Please wait....";

const BAR_TEMPLATE: &str = "[{bar:60}] {percent}% ...{msg}";

/// Receives `(count, total, status)` after each processed group
pub trait ProgressSink {
    fn report(&mut self, count: usize, total: usize, status: &str);

    /// Called once when the scan has consumed every group
    fn finish(&mut self) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, &str),
{
    fn report(&mut self, count: usize, total: usize, status: &str) {
        self(count, total, status)
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Terminal bar rendering `[====----] 45% ...status`
pub struct TextProgress {
    bar: ProgressBar,
}

impl TextProgress {
    pub fn new(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    pub fn stderr() -> Self {
        Self::new(ProgressDrawTarget::stderr())
    }

    /// Tracks progress without drawing anything
    pub fn hidden() -> Self {
        Self::new(ProgressDrawTarget::hidden())
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl ProgressSink for TextProgress {
    fn report(&mut self, count: usize, total: usize, status: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(count as u64);
        self.bar.set_message(status.to_string());
    }

    fn finish(&mut self) {
        self.bar.finish();
    }
}

/// Snapshot of a [`ProgressCounter`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterState {
    /// Percent complete, 0-100
    pub value: f64,
    /// Human readable label, e.g. `45% Adding deleted items...`
    pub label: String,
}

/// Counter/label pair shared with a front end that polls it
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    state: Arc<Mutex<CounterState>>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for ProgressCounter {
    fn report(&mut self, count: usize, total: usize, status: &str) {
        let value = percent(count, total).round();
        if let Ok(mut state) = self.state.lock() {
            state.value = value;
            state.label = format!("{}% {}", value, status);
        }
    }
}

/// The two mutually exclusive ways a scan reports progress
#[derive(Debug, Clone)]
pub enum ProgressMode {
    /// Text bar on stderr
    Text,
    /// Counter/label pair for a GUI
    Counter(ProgressCounter),
}

impl ProgressMode {
    /// `gui` selects the counter, otherwise the text bar
    pub fn select(gui: bool, counter: ProgressCounter) -> Self {
        if gui {
            ProgressMode::Counter(counter)
        } else {
            ProgressMode::Text
        }
    }

    pub fn into_sink(self) -> Box<dyn ProgressSink> {
        match self {
            ProgressMode::Text => Box::new(TextProgress::stderr()),
            ProgressMode::Counter(counter) => Box::new(counter),
        }
    }
}
