//! Terminal output: color resolution, status lines, tables, spinners and the
//! rendering of sync reports.
//!
//! Colors are off when `--no-color` is passed, `NO_COLOR` is set, `TERM=dumb`,
//! or (in `auto` mode) stdout is not a terminal.

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use crate::sync::SyncReport;

/// When to emit ANSI colors
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            _ => Err(format!("invalid color mode: {}", s)),
        }
    }
}

/// Resolved display settings, passed to every command handler
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both color and a terminal
    pub spinner_enabled: bool,
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let env_disables = std::env::var_os("NO_COLOR").is_some()
            || std::env::var("TERM").is_ok_and(|t| t == "dumb");

        let color_enabled = !force_no_color
            && !env_disables
            && match mode {
                ColorMode::Always => true,
                ColorMode::Never => false,
                ColorMode::Auto => is_tty,
            };

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled: color_enabled && is_tty,
        }
    }

    fn paint(&self, s: &str, style: Style) -> String {
        if self.color_enabled {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    fn fg(color: AnsiColor) -> Style {
        Style::new().fg_color(Some(Color::Ansi(color)))
    }

    fn label(&self, text: &str, color: AnsiColor) -> String {
        self.paint(text, Self::fg(color).bold())
    }

    // Status lines

    pub fn ok(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("OK", AnsiColor::Green), msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("WARN", AnsiColor::Yellow), msg.as_ref());
    }

    /// Errors go to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        eprintln!("{} {}", self.label("ERROR", AnsiColor::Red), msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("INFO", AnsiColor::Cyan), msg.as_ref());
    }

    // Inline styles

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), Self::fg(AnsiColor::BrightBlack))
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), Style::new().bold())
    }

    pub fn colored(&self, s: impl AsRef<str>, color: AnsiColor) -> String {
        self.paint(s.as_ref(), Self::fg(color))
    }

    // Icons, with plain-text fallbacks

    pub fn icon_ok(&self) -> &'static str {
        if self.color_enabled { "✓" } else { "[OK]" }
    }

    pub fn icon_warn(&self) -> &'static str {
        if self.color_enabled { "⚠" } else { "[!]" }
    }

    pub fn icon_err(&self) -> &'static str {
        if self.color_enabled { "✗" } else { "[X]" }
    }

    pub fn icon_info(&self) -> &'static str {
        if self.color_enabled { "•" } else { "-" }
    }

    // Tables

    /// Borderless table that wraps to the terminal width
    pub fn simple_table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(presets::NOTHING);
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    pub fn header_cell(&self, content: impl Into<String>) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.add_attribute(comfy_table::Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table so column widths stay correct
    pub fn colored_cell(&self, content: impl Into<String>, color: AnsiColor) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.fg(comfy_color(color))
        } else {
            cell
        }
    }

    pub fn toggle_cell(&self, on: bool) -> Cell {
        if on {
            self.colored_cell(self.icon_ok(), AnsiColor::Green)
        } else {
            self.colored_cell(self.icon_err(), AnsiColor::BrightBlack)
        }
    }

    // Spinners

    /// A ticking spinner, or a hidden one when spinners are disabled.
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = if self.spinner_enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("{spinner:.cyan} {msg}")
                    .expect("valid template"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message);
        pb
    }

    pub fn spinner_finish_ok(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.finish_spinner(pb, msg.into(), true);
    }

    pub fn spinner_finish_err(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.finish_spinner(pb, msg.into(), false);
    }

    fn finish_spinner(&self, pb: &ProgressBar, msg: Cow<'static, str>, success: bool) {
        if !self.spinner_enabled {
            pb.finish_and_clear();
            if success { self.ok(msg) } else { self.err(msg) }
            return;
        }
        pb.set_style(ProgressStyle::default_spinner().template("{msg}").expect("valid template"));
        let icon = if success {
            self.colored("✓", AnsiColor::Green)
        } else {
            self.colored("✗", AnsiColor::Red)
        };
        pb.finish_with_message(format!("{} {}", icon, msg));
    }

    // Plain output

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }

    // Sync reports

    /// One-line summary of a batch copy, e.g. "3 copied, 1 skipped"
    pub fn sync_summary(&self, report: &SyncReport) -> String {
        let mut parts = vec![format!("{} copied", report.copied)];
        if report.copied_back > 0 {
            parts.push(format!("{} copied back", report.copied_back));
        }
        if !report.skipped.is_empty() {
            parts.push(format!("{} skipped", report.skipped.len()));
        }
        if !report.faults.is_empty() {
            parts.push(format!("{} failed", report.faults.len()));
        }
        parts.join(", ")
    }

    /// Print skipped files (dimmed) and faults (as errors) of a batch
    pub fn sync_details(&self, report: &SyncReport) {
        for path in &report.skipped {
            self.println(self.dim(format!("  {} {} (not present)", self.icon_info(), path.display())));
        }
        for fault in &report.faults {
            self.err(format!("{}: {}", fault.path.display(), fault.reason));
        }
    }
}

fn comfy_color(color: AnsiColor) -> comfy_table::Color {
    use comfy_table::Color as C;
    match color {
        AnsiColor::Red | AnsiColor::BrightRed => C::Red,
        AnsiColor::Green | AnsiColor::BrightGreen => C::Green,
        AnsiColor::Yellow | AnsiColor::BrightYellow => C::Yellow,
        AnsiColor::Blue | AnsiColor::BrightBlue => C::Blue,
        AnsiColor::Magenta | AnsiColor::BrightMagenta => C::Magenta,
        AnsiColor::Cyan | AnsiColor::BrightCyan => C::Cyan,
        AnsiColor::BrightBlack => C::DarkGrey,
        AnsiColor::Black => C::Black,
        AnsiColor::White | AnsiColor::BrightWhite => C::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FileFault;

    #[test]
    fn test_color_mode_parse() {
        assert_eq!("always".parse::<ColorMode>().unwrap(), ColorMode::Always);
        assert_eq!("AUTO".parse::<ColorMode>().unwrap(), ColorMode::Auto);
        assert_eq!("never".parse::<ColorMode>().unwrap(), ColorMode::Never);
        assert!("sometimes".parse::<ColorMode>().is_err());
    }

    #[test]
    fn test_no_color_flag_wins() {
        let ui = Ui::new(ColorMode::Always, true);
        assert!(!ui.color_enabled);
        assert!(!ui.spinner_enabled);
    }

    #[test]
    fn test_plain_rendering() {
        let ui = Ui::new(ColorMode::Never, false);
        assert_eq!(ui.icon_ok(), "[OK]");
        assert_eq!(ui.icon_err(), "[X]");
        assert_eq!(ui.dim("x"), "x");
        assert_eq!(ui.colored("x", AnsiColor::Red), "x");
        let pb = ui.spinner("working");
        ui.spinner_finish_ok(&pb, "done");
    }

    #[test]
    fn test_sync_summary() {
        let ui = Ui::new(ColorMode::Never, false);
        let report = SyncReport {
            copied: 3,
            copied_back: 0,
            skipped: vec!["graph.json".into()],
            faults: vec![FileFault {
                path: "app.json".into(),
                reason: "denied".into(),
            }],
        };
        assert_eq!(ui.sync_summary(&report), "3 copied, 1 skipped, 1 failed");

        let merged = SyncReport {
            copied: 1,
            copied_back: 2,
            ..Default::default()
        };
        assert_eq!(ui.sync_summary(&merged), "1 copied, 2 copied back");
    }
}
