//! Configuration loading for the Lansite server.
//!
//! Config files are discovered as `lansite.{toml,yaml,yml,json}` in the
//! working directory, then in `~/.config/lansite/`. `${ENV_VAR}` placeholders
//! are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_or_default_config_path,
        load_config, set_config_dir,
    },
    schema::{AuthConfig, LansiteConfig, ServerConfig, StreamConfig},
    validate::validate_startup,
};
