use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use clashguard_check::{CheckObserver, CheckPhase, Verdict};
use clashguard_core::PackageRef;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() {
        return OutputStyle::Plain;
    }
    resolve_output_style(std::io::stdout().is_terminal())
}

pub fn resolve_output_style(stdout_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

/// Verdict lines as printed at the end of `check`. Only the closing line
/// carries a status badge.
pub fn format_verdict_lines(verdict: &Verdict, style: OutputStyle) -> Vec<String> {
    let mut lines: Vec<String> = verdict.message.lines().map(str::to_string).collect();
    let Some(last) = lines.pop() else {
        return lines;
    };
    let status = if verdict.is_clear() { "ok" } else { "fail" };
    lines.push(render_status_line(style, status, &last));
    lines
}

pub fn ordinal(value: usize) -> String {
    let suffix = match (value % 10, value % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{value}{suffix}")
}

pub fn render_progress_marker(done: usize) -> String {
    format!("...on {} target...", ordinal(done))
}

#[derive(Copy, Clone, Debug)]
pub struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub fn style(self) -> OutputStyle {
        self.style
    }

    pub fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub fn print_section(self, title: &str) {
        if self.style == OutputStyle::Plain {
            return;
        }
        println!("{}", colorize(section_style(), &format!("== {title} ==")));
    }

    pub fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    fn start_progress(self, label: &str, total: u64) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<8} [{bar:20.cyan/blue}] {pos:>6}/{len:6} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            label: label.to_string(),
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

struct TerminalProgress {
    label: String,
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalProgress {
    fn set(&mut self, current: u64) {
        self.current = current.min(self.total);
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(self.current);
        }
    }

    fn finish(mut self) {
        self.set(self.total);
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };
        progress_bar.finish_and_clear();
        println!(
            "{} {}/{} complete in {}",
            colorize(progress_label_style(), &self.label),
            HumanCount(self.current),
            HumanCount(self.total),
            format_elapsed(self.started_at.elapsed())
        );
    }
}

/// Prints check progress to the terminal. Plain output gets the periodic
/// `...on Nth target...` markers, rich output a progress bar.
pub struct TerminalObserver {
    renderer: TerminalRenderer,
    phase: CheckPhase,
    staged: usize,
    progress: Option<TerminalProgress>,
}

impl TerminalObserver {
    pub fn new(renderer: TerminalRenderer) -> Self {
        Self {
            renderer,
            phase: CheckPhase::Idle,
            staged: 0,
            progress: None,
        }
    }

    pub fn current_phase(&self) -> CheckPhase {
        self.phase
    }

    fn finish_progress(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.finish();
        }
    }
}

impl CheckObserver for TerminalObserver {
    fn phase(&mut self, phase: CheckPhase) {
        self.phase = phase;
        match phase {
            CheckPhase::Idle => {}
            CheckPhase::Scanning => {
                self.renderer.print_section("collision check");
                self.renderer.print_status("info", "Checking for collisions...");
            }
            CheckPhase::Comparing => {
                if self.staged > 0 {
                    self.progress = Some(
                        self.renderer
                            .start_progress("compare", self.staged as u64),
                    );
                }
            }
            CheckPhase::Clear => self.finish_progress(),
            CheckPhase::ResolvingOwnership => {
                self.finish_progress();
                self.renderer
                    .print_status("warn", "Collisions detected, please wait...");
            }
            CheckPhase::Reported => {}
        }
    }

    fn scanned(&mut self, staged: usize, _candidates: usize) {
        self.staged = staged;
        self.renderer
            .print_status("info", &format!("{staged} files to check"));
    }

    fn replaced_version(&mut self, package: Option<&PackageRef>) {
        if let Some(package) = package {
            tracing::info!(target: "clashguard.cli", replacing = %package, "comparing against replaced version");
        }
    }

    fn compare_progress(&mut self, done: usize, _total: usize) {
        match &mut self.progress {
            Some(progress) if progress.progress_bar.is_some() => progress.set(done as u64),
            _ => println!("{}", render_progress_marker(done)),
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
