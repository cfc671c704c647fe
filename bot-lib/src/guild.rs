use crate::{CloneableCtx, permissions::MemberContext};
use color_eyre::eyre::{Result, WrapErr};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};

/// The parts of a guild role the plugins care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
}

/// Synchronous lookups against the locally cached guild.
///
/// Every lookup has its own "not found" so callers can tell a missing role
/// apart from a member that simply hasn't been fetched yet.
pub trait GuildDirectory {
    fn role(&self, guild_id: GuildId, role_id: RoleId) -> Option<GuildRole>;

    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberContext>;

    /// All members currently held in the cache.
    fn members(&self, guild_id: GuildId) -> Vec<MemberContext>;

    /// The category a channel sits in, if any.
    fn channel_parent(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelId>;
}

/// Remote role changes. Both calls are safe to repeat, discord treats
/// granting a held role (or revoking a missing one) as a no-op.
pub trait RoleMutation {
    async fn grant_role(
        &self,
        guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        reason: &str,
    ) -> Result<()>;

    async fn revoke_role(
        &self,
        guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        reason: &str,
    ) -> Result<()>;
}

impl GuildDirectory for CloneableCtx {
    fn role(&self, guild_id: GuildId, role_id: RoleId) -> Option<GuildRole> {
        let guild = self.0.guild(guild_id)?;

        guild.roles.get(&role_id).map(|role| GuildRole {
            id: role.id,
            name: role.name.clone(),
        })
    }

    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberContext> {
        let guild = self.0.guild(guild_id)?;

        guild.members.get(&user_id).map(MemberContext::from)
    }

    fn members(&self, guild_id: GuildId) -> Vec<MemberContext> {
        self.0
            .guild(guild_id)
            .map(|guild| guild.members.values().map(MemberContext::from).collect())
            .unwrap_or_default()
    }

    fn channel_parent(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelId> {
        let guild = self.0.guild(guild_id)?;

        guild.channels.get(&channel_id)?.parent_id
    }
}

impl RoleMutation for CloneableCtx {
    async fn grant_role(
        &self,
        guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        reason: &str,
    ) -> Result<()> {
        self.1
            .add_member_role(guild_id, member.user_id, role.id, Some(reason))
            .await
            .wrap_err_with(|| format!("Couldn't add role `{}` to {}", role.name, member.user_id))
    }

    async fn revoke_role(
        &self,
        guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        reason: &str,
    ) -> Result<()> {
        self.1
            .remove_member_role(guild_id, member.user_id, role.id, Some(reason))
            .await
            .wrap_err_with(|| {
                format!(
                    "Couldn't remove role `{}` from {}",
                    role.name, member.user_id
                )
            })
    }
}
