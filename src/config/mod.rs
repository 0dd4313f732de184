//! Configuration: schemas with embedded defaults plus TOML loading
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{apply_env_overrides, load_config, load_config_from_path, parse_config, validate_config};
