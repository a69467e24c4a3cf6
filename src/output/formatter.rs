//! Core formatting traits and implementations
//!
//! This module defines the report formatting interface and provides the
//! plain text and JSON implementations.

use crate::{
    error::{AppError, Result},
    models::Endpoint,
    pipeline::{PipelineReport, StageSummary},
};
use std::fmt::Write as _;
use std::time::Duration;

/// Renders a finished pipeline run
pub trait ReportFormatter {
    /// Format the whole report
    fn format_report(&self, report: &PipelineReport) -> Result<String>;

    /// Format one ranked line, `rank` counting from 1
    fn format_endpoint(&self, rank: usize, endpoint: &Endpoint) -> String;

    /// Format one stage summary line
    fn format_stage_summary(&self, summary: &StageSummary) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Add candidate and stage summaries
    pub verbose_mode: bool,
    /// Heading printed above the ranked list
    pub title: String,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            title: "Edge Speed Test Results".to_string(),
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

pub(crate) const RANK_WIDTH: usize = 4;
pub(crate) const ADDRESS_WIDTH: usize = 40;
pub(crate) const SPEED_WIDTH: usize = 14;
pub(crate) const LATENCY_WIDTH: usize = 9;

/// Align text within specified width
pub(crate) fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
    }
}

/// Throughput cell: `1234.56KB/s` or `failed`
pub fn speed_cell(endpoint: &Endpoint) -> String {
    if endpoint.has_throughput() {
        format!("{:.2}KB/s", endpoint.throughput_kbps)
    } else {
        "failed".to_string()
    }
}

/// Latency cell: `42ms` or `timeout`
pub fn latency_cell(endpoint: &Endpoint) -> String {
    if endpoint.has_latency() {
        format!("{}ms", endpoint.latency_ms)
    } else {
        "timeout".to_string()
    }
}

/// Format duration in human-readable format
pub(crate) fn format_duration(duration: Duration) -> String {
    let duration_ms = duration.as_secs_f64() * 1000.0;
    if duration_ms < 1000.0 {
        format!("{:.1}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.2}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u32;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

pub(crate) fn column_header() -> String {
    format!(
        "{}{}{}{}",
        align_text("#", RANK_WIDTH, Alignment::Right),
        align_text("  Address", ADDRESS_WIDTH + 2, Alignment::Left),
        align_text("Speed", SPEED_WIDTH, Alignment::Right),
        align_text("Latency", LATENCY_WIDTH + 2, Alignment::Right),
    )
}

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format report: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    fn format_header(&self) -> String {
        let title = &self.options.title;
        let border = "=".repeat(title.len() + 4);
        format!("{}\n  {}  \n{}", border, title, border)
    }
}

impl ReportFormatter for PlainFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.format_header()).map_err(fmt_err)?;

        if self.options.verbose_mode {
            writeln!(output, "Candidates: {}", report.candidates).map_err(fmt_err)?;
            for summary in report.stages() {
                writeln!(output, "{}", self.format_stage_summary(summary)).map_err(fmt_err)?;
            }
            writeln!(output, "Total: {}", format_duration(report.elapsed)).map_err(fmt_err)?;
            writeln!(output).map_err(fmt_err)?;
        }

        if report.results.is_empty() {
            writeln!(output, "No endpoints were measured.").map_err(fmt_err)?;
        } else {
            writeln!(output, "{}", column_header()).map_err(fmt_err)?;
            for (idx, endpoint) in report.results.iter().enumerate() {
                writeln!(output, "{}", self.format_endpoint(idx + 1, endpoint)).map_err(fmt_err)?;
            }
        }

        if report.interrupted {
            writeln!(output).map_err(fmt_err)?;
            writeln!(output, "Run interrupted: results are partial.").map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_endpoint(&self, rank: usize, endpoint: &Endpoint) -> String {
        format!(
            "{}  {}{}  {}",
            align_text(&rank.to_string(), RANK_WIDTH, Alignment::Right),
            align_text(&endpoint.address, ADDRESS_WIDTH, Alignment::Left),
            align_text(&speed_cell(endpoint), SPEED_WIDTH, Alignment::Right),
            align_text(&latency_cell(endpoint), LATENCY_WIDTH, Alignment::Right),
        )
    }

    fn format_stage_summary(&self, summary: &StageSummary) -> String {
        format!(
            "{:<10} {} in, {} probed, {} ok, {} kept ({})",
            format!("{}:", summary.stage.as_str()),
            summary.input,
            summary.probed,
            summary.succeeded,
            summary.kept,
            format_duration(summary.elapsed)
        )
    }
}

/// JSON formatter: the full report as one document
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String> {
        let mut json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        json.push('\n');
        Ok(json)
    }

    fn format_endpoint(&self, rank: usize, endpoint: &Endpoint) -> String {
        serde_json::json!({
            "rank": rank,
            "address": endpoint.address,
            "latency_ms": endpoint.latency_ms,
            "throughput_kbps": endpoint.throughput_kbps,
        })
        .to_string()
    }

    fn format_stage_summary(&self, summary: &StageSummary) -> String {
        serde_json::to_string(summary).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;

    fn measured(address: &str, latency_ms: u32, throughput_kbps: f64) -> Endpoint {
        let mut endpoint = Endpoint::new(address);
        endpoint.latency_ms = latency_ms;
        endpoint.throughput_kbps = throughput_kbps;
        endpoint
    }

    fn report() -> PipelineReport {
        PipelineReport {
            candidates: 3,
            latency_stage: Some(StageSummary {
                stage: Stage::Latency,
                input: 3,
                probed: 3,
                succeeded: 2,
                kept: 2,
                elapsed: Duration::from_millis(1500),
            }),
            throughput_stage: None,
            results: vec![measured("1.1.1.1", 23, 2048.5), Endpoint::new("2.2.2.2")],
            elapsed: Duration::from_secs(2),
            interrupted: false,
        }
    }

    fn plain(verbose: bool) -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: verbose,
            ..FormattingOptions::default()
        })
    }

    #[test]
    fn test_cells() {
        let endpoint = measured("1.1.1.1", 23, 2048.456);
        assert_eq!(speed_cell(&endpoint), "2048.46KB/s");
        assert_eq!(latency_cell(&endpoint), "23ms");

        let failed = Endpoint::new("2.2.2.2");
        assert_eq!(speed_cell(&failed), "failed");
        assert_eq!(latency_cell(&failed), "timeout");
    }

    #[test]
    fn test_plain_report_lists_ranked_lines() {
        let output = plain(false).format_report(&report()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[1].contains("Edge Speed Test Results"));
        let first = lines.iter().position(|l| l.contains("1.1.1.1")).unwrap();
        let second = lines.iter().position(|l| l.contains("2.2.2.2")).unwrap();
        assert!(first < second);
        assert!(lines[first].trim_start().starts_with('1'));
        assert!(lines[first].contains("2048.50KB/s"));
        assert!(lines[second].contains("failed"));
        assert!(lines[second].contains("timeout"));
        assert!(!output.contains("latency:"));
    }

    #[test]
    fn test_verbose_adds_stage_summaries() {
        let output = plain(true).format_report(&report()).unwrap();
        assert!(output.contains("Candidates: 3"));
        assert!(output.contains("latency:   3 in, 3 probed, 2 ok, 2 kept (1.50s)"));
        assert!(output.contains("Total: 2.00s"));
    }

    #[test]
    fn test_empty_and_interrupted() {
        let mut report = report();
        report.results.clear();
        report.interrupted = true;
        let output = plain(false).format_report(&report).unwrap();
        assert!(output.contains("No endpoints were measured."));
        assert!(output.contains("Run interrupted"));
    }

    #[test]
    fn test_json_report() {
        let output = JsonFormatter::new(true).format_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["candidates"], 3);
        assert_eq!(value["results"][0]["address"], "1.1.1.1");
        assert_eq!(value["latency_stage"]["stage"], "latency");
        assert!(value["throughput_stage"].is_null());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.0ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30.0s");
    }

    #[test]
    fn test_align_text() {
        assert_eq!(align_text("ab", 4, Alignment::Left), "ab  ");
        assert_eq!(align_text("ab", 4, Alignment::Right), "  ab");
        assert_eq!(align_text("abcdef", 4, Alignment::Left), "abcdef");
    }
}
