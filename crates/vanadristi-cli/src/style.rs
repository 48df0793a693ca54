//! Terminal styling: request spinners, diagnosis and sensor colors, table
//! styles and status lines.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Style as Paint};
use vanadristi_types::DiagnosisKind;

use crate::cli::StyleMode;

// ============================================================================
// Spinners
// ============================================================================

/// Growing-leaf frames; the last one is the "done" frame indicatif keeps.
const LEAF_FRAMES: &[&str] = &["·", "∙", "•", "●", "❀", "✿", "✓"];

/// Spinner shown while a request is pending.
///
/// Returns `None` when stderr is not a terminal or output is quiet, so
/// piped output stays clean.
pub fn request_spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return None;
    }
    let style = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(LEAF_FRAMES);
    let spinner = ProgressBar::new_spinner()
        .with_style(style)
        .with_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Some(spinner)
}

pub fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

// ============================================================================
// Diagnosis
// ============================================================================

/// Marker shown in front of a diagnosis.
pub fn diagnosis_icon(kind: DiagnosisKind, plain: bool) -> &'static str {
    if plain {
        return match kind {
            DiagnosisKind::Healthy => "[ok]",
            DiagnosisKind::NeedsWater | DiagnosisKind::Overwatered => "[water]",
            DiagnosisKind::EnvironmentalStress => "[env]",
            DiagnosisKind::Other => "[!]",
            DiagnosisKind::Unknown => "[?]",
        };
    }
    match kind {
        DiagnosisKind::Healthy => "♥",
        DiagnosisKind::NeedsWater | DiagnosisKind::Overwatered => "💧",
        DiagnosisKind::EnvironmentalStress => "☀",
        DiagnosisKind::Other | DiagnosisKind::Unknown => "⚠",
    }
}

/// Color a diagnosis text by its class.
pub fn format_diagnosis_colored(text: &str, no_color: bool) -> String {
    let kind = DiagnosisKind::from_diagnosis(text);
    let text = if text.trim().is_empty() { "Unknown" } else { text };
    if no_color {
        return text.to_string();
    }
    match kind {
        DiagnosisKind::Healthy => format!("{}", text.green().bold()),
        DiagnosisKind::NeedsWater => format!("{}", text.blue().bold()),
        DiagnosisKind::Overwatered => format!("{}", text.cyan().bold()),
        // Amber
        DiagnosisKind::EnvironmentalStress => format!("{}", text.truecolor(255, 191, 0).bold()),
        DiagnosisKind::Other => format!("{}", text.yellow().bold()),
        DiagnosisKind::Unknown => format!("{}", text.dimmed()),
    }
}

/// Confidence in 0..=1 as a percentage.
pub fn format_confidence(confidence: f64, no_color: bool) -> String {
    let percent = format!("{:.0}%", (confidence * 100.0).clamp(0.0, 100.0));
    if no_color {
        percent
    } else if confidence >= 0.75 {
        format!("{}", percent.green())
    } else if confidence >= 0.5 {
        format!("{}", percent.yellow())
    } else {
        format!("{}", percent.red())
    }
}

// ============================================================================
// Sensor labels
// ============================================================================

/// Color a sensor row label the way the dashboard cards do.
pub fn format_sensor_label(label: &str, no_color: bool) -> String {
    if no_color {
        return label.to_string();
    }
    match label {
        // Orange
        "Temperature" => format!("{}", label.truecolor(234, 88, 12)),
        "Humidity" => format!("{}", label.cyan()),
        "Soil Moisture" => format!("{}", label.blue()),
        "Light" => format!("{}", label.yellow()),
        _ => label.to_string(),
    }
}

// ============================================================================
// Status lines
// ============================================================================

/// Prefix `message` with a bracketed marker, painted unless `no_color`.
fn marked(marker: &str, paint: Paint, message: &str, no_color: bool) -> String {
    if no_color {
        format!("{marker} {message}")
    } else {
        format!("{} {message}", marker.style(paint))
    }
}

pub fn format_success(message: &str, no_color: bool) -> String {
    marked("[OK]", Paint::new().green(), message, no_color)
}

pub fn format_warning(message: &str, no_color: bool) -> String {
    marked("[!!]", Paint::new().yellow(), message, no_color)
}

/// Title underlined with a heavy rule of the same width.
pub fn format_title(title: &str, no_color: bool) -> String {
    let rule = "━".repeat(title.chars().count());
    if no_color {
        format!("{title}\n{rule}")
    } else {
        format!("{}\n{}", title.bold(), rule.dimmed())
    }
}

/// Columns available for tables; 80 when stdout is not a terminal.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size().map_or(80, |(width, _)| usize::from(width.0))
}

/// Shorten `text` to `max` characters, ending with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Border set for each style mode.
pub fn apply_table_style(table: &mut tabled::Table, mode: StyleMode) {
    use tabled::settings::Style;
    match mode {
        StyleMode::Rich => table.with(Style::rounded()),
        StyleMode::Minimal => table.with(Style::psql()),
        StyleMode::Plain => table.with(Style::blank()),
    };
}
