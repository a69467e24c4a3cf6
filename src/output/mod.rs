//! Output formatting and display system
//!
//! The ranked report goes to stdout in one of three renderings: plain text,
//! colored text (colored by throughput band) or JSON.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter, ThroughputBand};
pub use self::formatter::{
    latency_cell, speed_cell, FormattingOptions, JsonFormatter, PlainFormatter, ReportFormatter,
};

use crate::{
    error::Result,
    models::Config,
    pipeline::PipelineReport,
    types::OutputFormat,
};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a text formatter, colored when `options` asks for it
    pub fn create_formatter(options: FormattingOptions) -> Box<dyn ReportFormatter> {
        if options.enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create the formatter the configuration asks for
    pub fn from_config(config: &Config) -> Box<dyn ReportFormatter> {
        match config.output_format {
            OutputFormat::Json => Box::new(JsonFormatter::new(true)),
            OutputFormat::Text => Self::create_formatter(FormattingOptions {
                enable_color: config.enable_color,
                verbose_mode: config.verbose || config.debug,
                title: format!("Edge Speed Test Results ({})", config.host),
            }),
        }
    }
}

/// Render `report` the way `config` asks for
pub fn render_report(report: &PipelineReport, config: &Config) -> Result<String> {
    OutputFormatterFactory::from_config(config).format_report(report)
}
