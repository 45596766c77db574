//! Configuration loading
//!
//! Sources, lowest priority first:
//!
//! 1. `<config dir>/cinnabar/cinnabar.toml`
//! 2. `./cinnabar.toml`, or the file given with `--config`
//! 3. `CINNABAR_*` environment variables, after `.env` is loaded
//!
//! Command line flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cinnabar_query::QueryConfig;
use config::{Config, Environment, File};

pub const ENV_PREFIX: &str = "CINNABAR";

fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cinnabar").join("cinnabar.toml"))
}

pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<QueryConfig> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let mut builder = Config::builder();
    if let Some(path) = user_config_file() {
        builder = builder.add_source(File::from(path).required(false));
    }
    builder = match explicit {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name("cinnabar").required(false)),
    };
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<QueryConfig>()
        .context("Invalid configuration")
}
