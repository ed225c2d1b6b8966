//! Terminal feedback for the capture binaries.
//!
//! Pretty mode draws a spinner on stderr whose message tracks the active pose
//! and the live stabilized detection. Plain mode prints one line per stage
//! and one line per capture.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::capture::{CaptureStep, FrameOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = spinner();
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    last_step: Option<CaptureStep>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
            last_step: None,
        }
    }

    /// Reflect one analyzed frame.
    pub fn frame(&mut self, outcome: &FrameOutcome) {
        if let Some(direction) = outcome.captured {
            let line = format!("  captured {} pose", direction);
            match &self.spinner {
                Some(spinner) => spinner.println(line),
                None => eprintln!("{line}"),
            }
        }
        let step_changed = self.last_step != Some(outcome.step);
        self.last_step = Some(outcome.step);

        match &self.spinner {
            Some(spinner) => spinner.set_message(progress_line(outcome)),
            None if step_changed && !outcome.step.is_terminal() => {
                eprintln!("  {}: {}", outcome.step.title(), outcome.step.instruction());
            }
            None => {}
        }
    }
}

fn progress_line(outcome: &FrameOutcome) -> String {
    let s = &outcome.stabilized;
    if outcome.step.is_terminal() {
        return "all poses captured".to_string();
    }
    format!(
        "{} | {} | seen={} conf={:.2} quality={:.2} stability={:.2}",
        outcome.step.title(),
        outcome.step.instruction(),
        s.direction,
        s.confidence,
        s.quality,
        s.stability
    )
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
