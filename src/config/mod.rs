//! Configuration management for qa-stream.
//!
//! Configuration is stored in TOML format. The search order is:
//! 1. the path given with `--config` (must exist)
//! 2. `./qa-stream.toml` (project-local)
//! 3. `~/.config/qa-stream/config.toml` (XDG config)
//!
//! Command-line flags and their environment variables (`PORT`, `DB_PATH`,
//! `LLM_PROVIDER`, `LLM_API_KEY`, `LLM_API_URL`, `LLM_MODEL`, `LOG_LEVEL`,
//! `QA_USER_HEADER`) override whatever the file says.
//!
//! # Usage
//!
//! ```rust,ignore
//! use qa_stream::config;
//!
//! let config = config::load(None)?.with_overrides(overrides);
//! config.validate()?;
//! ```

mod file;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{
    AppConfig, ConfigOverrides, IdentityConfig, LlmConfig, ServerConfig, DEFAULT_API_KEY_ENV,
};
