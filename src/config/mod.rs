// src/config/mod.rs

//! TOML configuration: raw model, loading, validation and instantiation.

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::Workspace;
pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, CoreSection, DataNodeConfig, RawConfigFile, SequenceConfig, TaskConfig};
pub use validate::{parse_duration, parse_validity};
