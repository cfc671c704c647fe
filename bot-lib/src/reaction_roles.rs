//! Self service role picker: members react on a designated message and get
//! (or lose) the role the emoji stands for.

mod gate;
pub mod mapping;

pub use gate::{GateError, GateOutcome, ReactionRoleGate};

use crate::CloneableCtx;
use color_eyre::eyre::{Result, WrapErr};
use mapping::{DEFAULT_WATCHED_MESSAGES, EmojiKey, RoleMappingEntry, default_mappings};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Reaction, ReactionType, UserId};
use serde::Deserialize;
use std::num::NonZeroU64;

/// The `[reaction_roles]` config section.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReactionRoleConfig {
    /// Messages acting as role pickers. Reactions anywhere else are ignored.
    #[serde(default)]
    pub watched_messages: Vec<NonZeroU64>,
    #[serde(default)]
    pub mappings: Vec<RoleMappingEntry>,
}

impl Default for ReactionRoleConfig {
    fn default() -> Self {
        Self {
            watched_messages: DEFAULT_WATCHED_MESSAGES.to_vec(),
            mappings: default_mappings(),
        }
    }
}

/// A single reaction being added or removed by a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub actor_id: UserId,
    pub emoji: ReactionType,
}

impl ReactionEvent {
    /// `None` for reactions outside of guilds or without a known user.
    pub fn from_reaction(reaction: &Reaction) -> Option<Self> {
        Some(Self {
            guild_id: reaction.guild_id?,
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            actor_id: reaction.user_id?,
            emoji: reaction.emoji.clone(),
        })
    }

    pub fn emoji_key(&self) -> EmojiKey {
        EmojiKey::from(&self.emoji)
    }
}

pub trait ReactionMutation {
    /// Removes this actor's reaction only, leaving everyone else's in place.
    async fn remove_reaction(&self, event: &ReactionEvent) -> Result<()>;
}

impl ReactionMutation for CloneableCtx {
    async fn remove_reaction(&self, event: &ReactionEvent) -> Result<()> {
        self.1
            .delete_reaction(
                event.channel_id,
                event.message_id,
                event.actor_id,
                &event.emoji,
            )
            .await
            .wrap_err_with(|| format!("Couldn't remove reaction {}", event.emoji_key()))
    }
}
