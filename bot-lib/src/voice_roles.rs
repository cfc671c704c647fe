use crate::{
    guild::{GuildDirectory, RoleMutation},
    permissions::MemberContext,
};
use bot_traits::ForwardRefToTracing;
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, VoiceState};
use serde::Deserialize;
use std::num::NonZeroU64;

const AUDIT_REASON: &str = "Voice channel access";

/// Members sitting in a voice channel under `category_id` get `role_id`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceRole {
    pub category_id: NonZeroU64,
    pub role_id: NonZeroU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Grant(RoleId),
    Revoke(RoleId),
}

/// Works out which voice roles need to change for a member whose current
/// voice channel sits under `parent` (`None` when disconnected or uncategorized).
pub fn plan_voice_roles(
    rules: &[VoiceRole],
    parent: Option<ChannelId>,
    member: &MemberContext,
) -> Vec<RoleChange> {
    rules
        .iter()
        .filter_map(|rule| {
            let role_id = RoleId::new(rule.role_id.get());
            let inside = parent == Some(ChannelId::new(rule.category_id.get()));

            match (inside, member.has_role(role_id)) {
                (true, false) => Some(RoleChange::Grant(role_id)),
                (false, true) => Some(RoleChange::Revoke(role_id)),
                _ => None,
            }
        })
        .collect()
}

/// Brings a member's voice roles in line with where they currently are.
pub async fn sync_voice_roles<H>(host: &H, state: &VoiceState, rules: &[VoiceRole])
where
    H: GuildDirectory + RoleMutation,
{
    let Some(guild_id) = state.guild_id else {
        return;
    };

    let Some(member) = state
        .member
        .as_ref()
        .map(MemberContext::from)
        .or_else(|| host.member(guild_id, state.user_id))
    else {
        return;
    };

    let parent = state
        .channel_id
        .and_then(|channel_id| host.channel_parent(guild_id, channel_id));

    apply(host, guild_id, &member, &plan_voice_roles(rules, parent, &member)).await;
}

async fn apply<H>(host: &H, guild_id: GuildId, member: &MemberContext, changes: &[RoleChange])
where
    H: GuildDirectory + RoleMutation,
{
    for change in changes {
        let role_id = match change {
            RoleChange::Grant(role_id) | RoleChange::Revoke(role_id) => *role_id,
        };

        let Some(role) = host.role(guild_id, role_id) else {
            tracing::warn!(role_id = %role_id, "Unknown voice access role");
            continue;
        };

        let result = match change {
            RoleChange::Grant(_) => host.grant_role(guild_id, member, &role, AUDIT_REASON).await,
            RoleChange::Revoke(_) => host.revoke_role(guild_id, member, &role, AUDIT_REASON).await,
        };

        result.trace_warn_ok();
    }
}
