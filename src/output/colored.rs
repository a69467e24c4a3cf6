//! Colored formatter implementation with terminal color support
//!
//! Result lines are colored by throughput band; failures are dimmed.

use super::formatter::{
    align_text, column_header, format_duration, latency_cell, speed_cell, Alignment, FormattingOptions,
    ReportFormatter, ADDRESS_WIDTH, LATENCY_WIDTH, RANK_WIDTH, SPEED_WIDTH,
};
use crate::{
    error::{AppError, Result},
    models::Endpoint,
    pipeline::{PipelineReport, StageSummary},
};
use colored::*;
use std::fmt::Write as _;

/// Throughput classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThroughputBand {
    Excellent, // >= 10 MB/s
    Good,      // >= 5 MB/s
    Fair,      // >= 1 MB/s
    Poor,      // > 0
    Failed,
}

impl ThroughputBand {
    /// Classify a rate in KB/s
    pub fn from_kbps(kbps: f64) -> Self {
        if !kbps.is_finite() {
            Self::Failed
        } else if kbps >= 10240.0 {
            Self::Excellent
        } else if kbps >= 5120.0 {
            Self::Good
        } else if kbps >= 1024.0 {
            Self::Fair
        } else if kbps > 0.0 {
            Self::Poor
        } else {
            Self::Failed
        }
    }

    /// Get color for this band
    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::Failed => Color::Red,
        }
    }

    /// Get descriptive text
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Failed => "Failed",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub warning: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            warning: Color::Yellow,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self { options, color_scheme }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn emphasize(&self, text: ColoredString) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text
        }
    }

    fn format_header(&self) -> String {
        let title = &self.options.title;
        let border = "═".repeat(title.chars().count() + 4);
        format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.header),
            self.emphasize(self.colorize(title, self.color_scheme.header)),
            self.colorize(&border, self.color_scheme.header)
        )
    }
}

impl ReportFormatter for ColoredFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String> {
        let fmt_err = |e: std::fmt::Error| AppError::io(format!("Failed to format report: {}", e));
        let mut output = String::new();

        writeln!(output, "{}", self.format_header()).map_err(fmt_err)?;

        if self.options.verbose_mode {
            writeln!(
                output,
                "{} {}",
                self.colorize("Candidates:", self.color_scheme.info),
                report.candidates
            )
            .map_err(fmt_err)?;
            for summary in report.stages() {
                writeln!(output, "{}", self.format_stage_summary(summary)).map_err(fmt_err)?;
            }
            writeln!(
                output,
                "{} {}",
                self.colorize("Total:", self.color_scheme.info),
                format_duration(report.elapsed)
            )
            .map_err(fmt_err)?;
            writeln!(output).map_err(fmt_err)?;
        }

        if report.results.is_empty() {
            writeln!(
                output,
                "{}",
                self.colorize("No endpoints were measured.", self.color_scheme.warning)
            )
            .map_err(fmt_err)?;
        } else {
            writeln!(output, "{}", self.emphasize(column_header().as_str().normal())).map_err(fmt_err)?;
            for (idx, endpoint) in report.results.iter().enumerate() {
                writeln!(output, "{}", self.format_endpoint(idx + 1, endpoint)).map_err(fmt_err)?;
            }
        }

        if report.interrupted {
            writeln!(output).map_err(fmt_err)?;
            writeln!(
                output,
                "{}",
                self.emphasize(self.colorize("Run interrupted: results are partial.", self.color_scheme.warning))
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_endpoint(&self, rank: usize, endpoint: &Endpoint) -> String {
        let band = ThroughputBand::from_kbps(endpoint.throughput_kbps);
        let speed = align_text(&speed_cell(endpoint), SPEED_WIDTH, Alignment::Right);
        let latency = align_text(&latency_cell(endpoint), LATENCY_WIDTH, Alignment::Right);
        let latency = if endpoint.has_latency() {
            latency.as_str().normal()
        } else {
            self.colorize(&latency, self.color_scheme.muted)
        };

        format!(
            "{}  {}{}  {}",
            align_text(&rank.to_string(), RANK_WIDTH, Alignment::Right),
            align_text(&endpoint.address, ADDRESS_WIDTH, Alignment::Left),
            self.colorize(&speed, band.color()),
            latency,
        )
    }

    fn format_stage_summary(&self, summary: &StageSummary) -> String {
        let label = format!("{:<10}", format!("{}:", summary.stage.as_str()));
        let succeeded = if summary.succeeded == 0 && summary.input > 0 {
            self.colorize(&summary.succeeded.to_string(), self.color_scheme.warning)
        } else {
            summary.succeeded.to_string().as_str().normal()
        };
        format!(
            "{} {} in, {} probed, {} ok, {} kept ({})",
            self.colorize(&label, self.color_scheme.info),
            summary.input,
            summary.probed,
            succeeded,
            summary.kept,
            format_duration(summary.elapsed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use std::time::Duration;

    fn formatter(enable_color: bool, verbose_mode: bool) -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions {
            enable_color,
            verbose_mode,
            ..FormattingOptions::default()
        })
    }

    #[test]
    fn test_throughput_bands() {
        assert_eq!(ThroughputBand::from_kbps(20_000.0), ThroughputBand::Excellent);
        assert_eq!(ThroughputBand::from_kbps(6_000.0), ThroughputBand::Good);
        assert_eq!(ThroughputBand::from_kbps(1_024.0), ThroughputBand::Fair);
        assert_eq!(ThroughputBand::from_kbps(0.5), ThroughputBand::Poor);
        assert_eq!(ThroughputBand::from_kbps(0.0), ThroughputBand::Failed);
        assert_eq!(ThroughputBand::from_kbps(f64::INFINITY), ThroughputBand::Failed);
        assert_eq!(ThroughputBand::Failed.color(), Color::Red);
        assert_eq!(ThroughputBand::Good.description(), "Good");
    }

    #[test]
    fn test_endpoint_line_contents() {
        colored::control::set_override(false);
        let mut endpoint = Endpoint::new("104.16.0.1");
        endpoint.latency_ms = 31;
        endpoint.throughput_kbps = 7000.0;

        let line = formatter(true, false).format_endpoint(2, &endpoint);
        assert!(line.contains("104.16.0.1"));
        assert!(line.contains("7000.00KB/s"));
        assert!(line.contains("31ms"));

        let line = formatter(false, false).format_endpoint(3, &Endpoint::new("104.16.0.2"));
        assert!(line.contains("failed"));
        assert!(line.contains("timeout"));
        colored::control::unset_override();
    }

    #[test]
    fn test_verbose_report() {
        let report = PipelineReport {
            candidates: 4,
            latency_stage: Some(StageSummary {
                stage: Stage::Latency,
                input: 4,
                probed: 4,
                succeeded: 0,
                kept: 0,
                elapsed: Duration::from_millis(40),
            }),
            throughput_stage: None,
            results: Vec::new(),
            elapsed: Duration::from_millis(50),
            interrupted: true,
        };

        let output = formatter(false, true).format_report(&report).unwrap();
        assert!(output.contains("Candidates: 4"));
        assert!(output.contains("4 in, 4 probed, 0 ok, 0 kept"));
        assert!(output.contains("No endpoints were measured."));
        assert!(output.contains("Run interrupted"));
    }
}
