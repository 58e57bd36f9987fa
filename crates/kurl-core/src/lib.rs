//! # kurl-core
//!
//! Shared foundation for the kURL installer spec resolver:
//! - Layered configuration (embedded defaults, config file, `KURL_*` environment)
//! - JSON Schema validation of installer specs
//! - Error types shared by the other crates

pub mod config;
pub mod error;
pub mod schema;
pub mod utils;

pub use config::{ConfigLoader, KurlConfig};
pub use error::{Error, Result};
pub use schema::{SchemaValidator, SchemaViolation};
pub use utils::get_home_dir;
