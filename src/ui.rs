use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

/// How stage progress is drawn on stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UiMode {
    /// Spinner when stderr is a TTY and the JSON report is not piped.
    #[default]
    Auto,
    Plain,
    Pretty,
}

/// Stderr progress for the screening stages. Stdout carries only the report.
#[derive(Clone, Copy, Debug)]
pub struct Ui {
    spinner: bool,
}

impl Ui {
    pub fn for_terminal(mode: UiMode) -> Self {
        Self::new(
            mode,
            std::io::stderr().is_terminal(),
            !std::io::stdout().is_terminal(),
        )
    }

    fn new(mode: UiMode, stderr_tty: bool, report_piped: bool) -> Self {
        let spinner = stderr_tty
            && match mode {
                UiMode::Pretty => true,
                UiMode::Auto => !report_piped,
                UiMode::Plain => false,
            };
        Self { spinner }
    }

    pub fn stage(&self, name: &'static str) -> Stage {
        let spinner = if self.spinner {
            let bar = ProgressBar::new_spinner();
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(format!("{name}…"));
            Some(bar)
        } else {
            eprintln!("==> {name}");
            None
        };
        Stage {
            name,
            start: Instant::now(),
            spinner,
            outcome: None,
        }
    }
}

/// A running stage. Reports `✔` with the recorded outcome, or `✘` if dropped
/// before [`Stage::done`] (an error unwound past it).
pub struct Stage {
    name: &'static str,
    start: Instant,
    spinner: Option<ProgressBar>,
    outcome: Option<String>,
}

impl Stage {
    pub fn done(mut self, outcome: impl Display) {
        self.outcome = Some(outcome.to_string());
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let elapsed = format_elapsed(self.start.elapsed());
        let line = match &self.outcome {
            Some(outcome) => format!("✔ {}: {} ({})", self.name, outcome, elapsed),
            None => format!("✘ {} failed after {}", self.name, elapsed),
        };
        match &self.spinner {
            Some(bar) => bar.finish_with_message(line),
            None => eprintln!("{line}"),
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
