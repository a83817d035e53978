//! Terminal progress bar for dispatch runs

use std::time::Duration;

use fleetcmd_core::ProgressObserver;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar over the two steps (dispatch, retrieve) of every host
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(hosts: usize) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(2 * hosts as u64),
            ProgressDrawTarget::stderr(),
        );
        let style = ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Hidden bar, used for `--json` output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for BarProgress {
    fn advance(&self, count: u64, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.inc(count);
    }
}
