use crate::{
    CloneableCtx,
    data::State,
    guild::{GuildDirectory, RoleMutation},
    permissions::MemberContext,
};
use bot_traits::ForwardRefToTracing;
use futures::StreamExt;
use itertools::Itertools;
use poise::serenity_prelude::{ChannelId, GuildId, Mentionable, RoleId, UserId};
use serde::Deserialize;
use std::num::NonZeroU64;
use tokio::time::interval;
use tokio_stream::wrappers::IntervalStream;

/// A role that only makes sense while the member holds one of its source roles.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompositeRole {
    /// Used in log lines and notices.
    pub name: String,
    pub role_id: NonZeroU64,
    pub source_role_ids: Vec<NonZeroU64>,
}

impl CompositeRole {
    pub fn role_id(&self) -> RoleId {
        RoleId::new(self.role_id.get())
    }

    fn is_stale_for(&self, member: &MemberContext) -> bool {
        member.has_role(self.role_id())
            && !self
                .source_role_ids
                .iter()
                .any(|source| member.has_role(RoleId::new(source.get())))
    }
}

/// Members holding the composite role without any of the roles backing it.
pub fn members_to_strip<'a>(
    composite: &CompositeRole,
    members: impl IntoIterator<Item = &'a MemberContext>,
) -> Vec<&'a MemberContext> {
    members
        .into_iter()
        .filter(|member| composite.is_stale_for(member))
        .collect_vec()
}

/// Removes the composite role from everyone no longer entitled to it.
/// Returns who actually lost it; failures are logged and skipped.
pub async fn sweep<H>(host: &H, guild_id: GuildId, composite: &CompositeRole) -> Vec<UserId>
where
    H: GuildDirectory + RoleMutation,
{
    let Some(role) = host.role(guild_id, composite.role_id()) else {
        tracing::warn!(role_id = %composite.role_id(), "Unknown composite role `{}`", composite.name);
        return vec![];
    };

    let members = host.members(guild_id);
    let reason = format!("No longer holds a role backing `{}`", composite.name);
    let mut stripped = vec![];

    for member in members_to_strip(composite, &members) {
        if host
            .revoke_role(guild_id, member, &role, &reason)
            .await
            .trace_warn_ok()
            .is_some()
        {
            stripped.push(member.user_id);
        }
    }

    stripped
}

/// Periodically sweeps every configured composite role. Never returns.
pub async fn sweep_interval(ctx: CloneableCtx, data: State) {
    let period = data.config.read().await.composite_check_interval;

    IntervalStream::new(interval(period))
        .for_each(|_| sweep_all(&ctx, &data))
        .await
}

async fn sweep_all(ctx: &CloneableCtx, data: &State) {
    let (guild_id, log_channel, composites) = {
        let config = data.config.read().await;
        (
            GuildId::new(config.guild_id.get()),
            config.log_channel_id.map(|id| ChannelId::new(id.get())),
            config.composite_roles.clone(),
        )
    };

    for composite in &composites {
        let stripped = sweep(ctx, guild_id, composite).await;

        if !stripped.is_empty() {
            tracing::info!("Removed {} members from `{}`", stripped.len(), composite.name);
        }

        let Some(log_channel) = log_channel else {
            continue;
        };

        for user_id in stripped {
            log_channel
                .say(ctx, removal_notice(user_id, composite))
                .await
                .trace_warn_ok();
        }
    }
}

/// The log channel line posted for every member who lost a composite role.
pub fn removal_notice(user_id: UserId, composite: &CompositeRole) -> String {
    format!(
        "Removed {} from composite role {}.",
        user_id.mention(),
        composite.name
    )
}
