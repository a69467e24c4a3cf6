//! Configuration management module
//!
//! Layering, lowest to highest: built-in defaults, `.env` file, `EST_*`
//! environment variables, command-line flags.

pub mod env;
pub mod parser;
pub mod validation;

pub use env::EnvManager;
pub use parser::{display_config_summary, load_config, ConfigParser};
pub use validation::{validate_config, ConfigValidator, ValidationLevel, ValidationWarning};

pub use crate::models::Config;
