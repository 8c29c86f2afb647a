//! # Task-Mind Config
//!
//! Configuration values consumed by the automation core. The core never reads
//! a configuration file itself; an embedding loads a [`Config`] (usually via
//! [`ConfigLoader`]) and hands the relevant sections to each component.

mod error;
mod loader;
mod proxy;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use proxy::{ProxyConfig, ProxyCredentials, ProxyScheme};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
