use crate::{
    composite_roles::CompositeRole, permissions::PermissionRules,
    reaction_roles::ReactionRoleConfig, voice_roles::VoiceRole,
};
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use std::{num::NonZeroU64, path::Path, time::Duration};

#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// The id of the guild the bot is in.
    pub guild_id: NonZeroU64,
    /// Where housekeeping notices (composite role removals) are posted.
    pub log_channel_id: Option<NonZeroU64>,
    /// The role picker. Falls back to the built in table when absent.
    ///
    /// Only read at startup.
    #[serde(default)]
    pub reaction_roles: ReactionRoleConfig,
    /// Permission key -> who holds it.
    #[serde(default)]
    pub permissions: PermissionRules,
    #[serde(default)]
    pub composite_roles: Vec<CompositeRole>,
    /// How often composite roles are swept. Only read at startup.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "get_default_composite_check_interval")]
    pub composite_check_interval: Duration,
    #[serde(default)]
    pub voice_roles: Vec<VoiceRole>,
    /// Permission key checked by `!vc`.
    #[serde(default = "get_default_vc_rename_permission")]
    pub vc_rename_permission: String,
}

impl Config {
    /// Fetches the config from the given file.
    pub fn create_from_file(config_path: impl AsRef<Path>) -> Result<Config> {
        let file = std::fs::read_to_string(config_path).wrap_err("Could not read config file")?;

        toml::from_str(&file).wrap_err("Could not parse config file")
    }

    /// Reloads the config file, keeping the current config if the new one is broken.
    pub fn reload(&mut self, config_path: impl AsRef<Path>) {
        match Config::create_from_file(config_path) {
            Ok(config) => *self = config,
            Err(e) => tracing::warn!(error = ?e, "Keeping previous config"),
        }
    }
}

/// Discord ids are never zero, every id in the config is typed that way.
pub const fn snowflake(raw: u64) -> NonZeroU64 {
    match NonZeroU64::new(raw) {
        Some(id) => id,
        None => panic!("Discord ids are never zero"),
    }
}

const fn get_default_composite_check_interval() -> Duration {
    Duration::from_secs(10)
}

fn get_default_vc_rename_permission() -> String {
    "p.dvi.vc.rename".to_owned()
}
