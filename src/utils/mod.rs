/// TOML configuration (`quorum.toml`).
pub mod toml_config;
