// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./moma.toml` > `~/.config/moma/moma.toml` > `/etc/moma/moma.toml`
//! with environment variable overrides via `MOMA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MomaConfig;

/// Config file paths in merge order (later overrides earlier).
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/moma/moma.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("moma/moma.toml"));
    }
    paths.push(PathBuf::from("moma.toml"));
    paths
}

/// Build the Figment used for config loading.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/moma/moma.toml` (system-wide)
/// 3. `~/.config/moma/moma.toml` (user XDG config)
/// 4. `./moma.toml` (local directory)
/// 5. `MOMA_*` environment variables
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(MomaConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<MomaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MomaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MomaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MomaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MomaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `MOMA_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `MOMA_BEDROCK_AGENT_ALIAS_ID` must become
/// `bedrock.agent_alias_id`, not `bedrock.agent.alias.id`.
fn env_provider() -> Env {
    Env::prefixed("MOMA_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = ["server_", "bedrock_", "forwarder_", "attachment_"]
            .iter()
            .find(|prefix| key_str.starts_with(*prefix))
            .map(|prefix| {
                let section = &prefix[..prefix.len() - 1];
                format!("{section}.{}", &key_str[prefix.len()..])
            })
            .unwrap_or(key_str);
        mapped.into()
    })
}
