//! Terminal progress for orchestration, backed by indicatif

use declarative::{ProgressCallback, Step};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const WAIT_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})";
const TICK: Duration = Duration::from_millis(100);

/// Spinner per step and a bar per wait; silent when quiet
pub struct CliProgress {
    quiet: bool,
    bar: Option<ProgressBar>,
    wait_message: String,
}

impl CliProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: None,
            wait_message: String::new(),
        }
    }

    fn start(&mut self, style: ProgressStyle, len: Option<u64>, message: String) {
        self.finish();
        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            len.map_or_else(ProgressBar::new_spinner, ProgressBar::new)
        };
        bar.set_style(style);
        bar.set_message(message);
        bar.enable_steady_tick(TICK);
        self.bar = Some(bar);
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .progress_chars("=>-")
}

impl ProgressCallback for CliProgress {
    fn on_step_start(&mut self, step: Step, target: &str) {
        self.start(style(SPINNER_TEMPLATE), None, format!("{} {target}", step.verb()));
    }

    fn on_step_complete(&mut self, step: Step, target: &str, success: bool) {
        self.finish();
        if self.quiet {
            return;
        }
        let msg = format!("{} {target}", step.verb());
        if success {
            ui::success(&msg);
        } else {
            ui::error(&msg);
        }
    }

    fn on_wait_start(&mut self, message: &str, total: usize) {
        self.wait_message = message.to_string();
        self.start(style(WAIT_TEMPLATE), Some(total as u64), message.to_string());
    }

    fn on_wait_progress(&mut self, ready: usize, total: usize) {
        if let Some(bar) = &self.bar {
            bar.set_length(total as u64);
            bar.set_position(ready as u64);
        }
    }

    fn on_wait_complete(&mut self, success: bool) {
        self.finish();
        if self.quiet {
            return;
        }
        if success {
            ui::success(&self.wait_message);
        } else {
            ui::error(&self.wait_message);
        }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
