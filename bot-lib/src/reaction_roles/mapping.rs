use crate::config::snowflake;
use ahash::AHashMap;
use color_eyre::eyre::{Result, bail};
use poise::serenity_prelude::{ReactionType, RoleId};
use serde::Deserialize;
use std::{fmt, num::NonZeroU64};

/// A reaction reduced to what identifies it: the numeric id for custom
/// emoji, the glyph itself for unicode ones.
///
/// Trailing variation selectors are dropped, clients are inconsistent about
/// sending them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub struct EmojiKey(String);

impl EmojiKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim_end_matches('\u{fe0f}').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_custom(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|byte| byte.is_ascii_digit())
    }
}

impl From<String> for EmojiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&ReactionType> for EmojiKey {
    fn from(reaction: &ReactionType) -> Self {
        match reaction {
            ReactionType::Custom { id, .. } => Self(id.get().to_string()),
            ReactionType::Unicode(glyph) => Self::new(glyph),
            other => Self::new(other.to_string()),
        }
    }
}

impl fmt::Display for EmojiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the `[[reaction_roles.mappings]]` config table.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleMappingEntry {
    pub emoji: EmojiKey,
    pub role_id: NonZeroU64,
    /// Permission key the reacting member must hold to receive the role.
    pub permission: String,
}

/// Where a mapped reaction leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTarget {
    pub role_id: RoleId,
    pub permission: String,
}

/// Emoji to role lookup for the role picker.
#[derive(Debug, Clone, Default)]
pub struct RoleMap {
    targets: AHashMap<EmojiKey, RoleTarget>,
}

impl RoleMap {
    /// Builds the lookup, refusing tables that map one emoji twice.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a RoleMappingEntry>,
    ) -> Result<Self> {
        let mut targets = AHashMap::new();

        for RoleMappingEntry {
            emoji,
            role_id,
            permission,
        } in entries
        {
            if !emoji.is_custom() && emojis::get(emoji.as_str()).is_none() {
                tracing::warn!(emoji = %emoji, "Role picker maps an unknown emoji");
            }

            let target = RoleTarget {
                role_id: RoleId::new(role_id.get()),
                permission: permission.clone(),
            };

            if targets.insert(emoji.clone(), target).is_some() {
                bail!("Reaction {emoji} is mapped more than once");
            }
        }

        Ok(Self { targets })
    }

    pub fn lookup(&self, key: &EmojiKey) -> Option<&RoleTarget> {
        self.targets.get(key)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub const DEFAULT_WATCHED_MESSAGES: [NonZeroU64; 2] =
    [snowflake(961458053587292190), snowflake(961458668048646194)];

const DEFAULT_MAPPINGS: [(&str, NonZeroU64, &str); 3] = [
    ("944208162112802826", snowflake(944203243964207144), "p.dvi.roles.qrf"),
    ("958768926941134878", snowflake(959556988075917383), "p.dvi.roles.logi"),
    ("🥪", snowflake(944107391677521940), "p.dvi.roles.sudo"),
];

/// The built in picker table, used when the config has no `[reaction_roles]`.
pub fn default_mappings() -> Vec<RoleMappingEntry> {
    DEFAULT_MAPPINGS
        .into_iter()
        .map(|(emoji, role_id, permission)| RoleMappingEntry {
            emoji: EmojiKey::new(emoji),
            role_id,
            permission: permission.to_owned(),
        })
        .collect()
}
