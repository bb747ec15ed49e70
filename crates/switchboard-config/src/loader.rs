// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! `./switchboard.toml` > `~/.config/switchboard/switchboard.toml` >
//! `/etc/switchboard/switchboard.toml`, overridden by `SWITCHBOARD_*` env vars.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SwitchboardConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/switchboard/switchboard.toml";
pub(crate) const LOCAL_CONFIG: &str = "switchboard.toml";

/// Sections that scalar env overrides can target.
const ENV_SECTIONS: [&str; 4] = ["service", "storage", "dispatch", "messages"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("switchboard/switchboard.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/switchboard/switchboard.toml`
/// 3. `~/.config/switchboard/switchboard.toml`
/// 4. `./switchboard.toml`
/// 5. `SWITCHBOARD_*` environment variables
pub fn load_config() -> Result<SwitchboardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Env provider with explicit section mapping.
///
/// `SWITCHBOARD_DISPATCH_SWEEP_INTERVAL_SECS` maps to
/// `dispatch.sweep_interval_secs`; splitting on every `_` would not.
fn env_provider() -> Env {
    Env::prefixed("SWITCHBOARD_")
        .map(|key| env_key_to_path(&key.as_str().to_ascii_lowercase()).into())
}

fn env_key_to_path(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_first_section_only() {
        assert_eq!(
            env_key_to_path("dispatch_sweep_interval_secs"),
            "dispatch.sweep_interval_secs"
        );
        assert_eq!(env_key_to_path("storage_database_path"), "storage.database_path");
        assert_eq!(env_key_to_path("messages_all_unavailable"), "messages.all_unavailable");
        assert_eq!(env_key_to_path("service_log_level"), "service.log_level");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(env_key_to_path("bogus_key"), "bogus_key");
        assert_eq!(env_key_to_path("servicelog"), "servicelog");
    }

    #[test]
    fn uppercase_env_vars_land_in_their_section() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWITCHBOARD_DISPATCH_ADMIN_TIMEOUT_MINUTES", "9");
            jail.set_env("SWITCHBOARD_SERVICE_LOG_LEVEL", "debug");

            let config: SwitchboardConfig = Figment::new()
                .merge(Serialized::defaults(SwitchboardConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.dispatch.admin_timeout_minutes, 9);
            assert_eq!(config.service.log_level, "debug");
            Ok(())
        });
    }
}
