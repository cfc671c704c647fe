use super::{
    ReactionEvent, ReactionMutation, ReactionRoleConfig,
    mapping::{EmojiKey, RoleMap},
};
use crate::{
    guild::{GuildDirectory, GuildRole, RoleMutation},
    permissions::{AuthorizationPolicy, MemberContext},
};
use ahash::AHashSet;
use color_eyre::eyre::{Report, Result, WrapErr};
use poise::serenity_prelude::{MessageId, RoleId, UserId};

const AUDIT_REASON: &str = "Role picker reaction";

/// Why a reaction didn't turn into a role change.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("unknown reaction {0}")]
    UnknownReaction(EmojiKey),
    #[error("unknown role {0}")]
    UnknownRole(RoleId),
    #[error("member isn't in the guild cache")]
    MemberUnresolved,
    #[error("member lacks permission `{0}`")]
    AuthorizationDenied(String),
    #[error("{0}")]
    Unexpected(Report),
}

impl From<Report> for GateError {
    fn from(report: Report) -> Self {
        GateError::Unexpected(report)
    }
}

impl GateError {
    /// The mapping table and the live guild disagree. Operators should see these,
    /// everything else is either expected or logged separately.
    fn log_drift(&self) {
        match self {
            GateError::UnknownReaction(emoji) => {
                tracing::warn!(emoji = %emoji, "Unknown reaction on role picker");
            }
            GateError::UnknownRole(role_id) => {
                tracing::warn!(role_id = %role_id, "Unknown role for role picker");
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Not a role picker reaction, or nothing could be resolved on removal.
    Ignored,
    Granted(RoleId),
    Revoked(RoleId),
    /// The reaction was stripped instead of granting anything.
    Corrected,
    /// Something unexpected went wrong, already logged.
    Failed,
}

struct Resolved<'a> {
    role: GuildRole,
    member: MemberContext,
    permission: &'a str,
}

/// Turns reactions on the watched messages into role grants and revocations.
///
/// Built once at startup; the table and watched messages never change
/// afterwards, so concurrent invocations share nothing mutable.
#[derive(Debug)]
pub struct ReactionRoleGate {
    bot_id: UserId,
    watched: AHashSet<MessageId>,
    mapping: RoleMap,
}

impl ReactionRoleGate {
    pub fn new(bot_id: UserId, config: &ReactionRoleConfig) -> Result<Self> {
        let mapping =
            RoleMap::from_entries(&config.mappings).wrap_err("Invalid reaction role mapping")?;

        Ok(Self {
            bot_id,
            watched: config
                .watched_messages
                .iter()
                .map(|id| MessageId::new(id.get()))
                .collect(),
            mapping,
        })
    }

    fn is_relevant(&self, event: &ReactionEvent) -> bool {
        event.actor_id != self.bot_id && self.watched.contains(&event.message_id)
    }

    fn resolve<H: GuildDirectory>(
        &self,
        event: &ReactionEvent,
        host: &H,
    ) -> Result<Resolved<'_>, GateError> {
        let key = event.emoji_key();
        let Some(target) = self.mapping.lookup(&key) else {
            return Err(GateError::UnknownReaction(key));
        };

        let role = host
            .role(event.guild_id, target.role_id)
            .ok_or(GateError::UnknownRole(target.role_id))?;

        // Members we haven't fetched yet land here, that's a race and not a bug.
        let member = host
            .member(event.guild_id, event.actor_id)
            .ok_or(GateError::MemberUnresolved)?;

        Ok(Resolved {
            role,
            member,
            permission: &target.permission,
        })
    }

    async fn try_grant<H, P>(
        &self,
        event: &ReactionEvent,
        host: &H,
        policy: &P,
    ) -> Result<RoleId, GateError>
    where
        H: GuildDirectory + RoleMutation,
        P: AuthorizationPolicy,
    {
        let Resolved {
            role,
            member,
            permission,
        } = self.resolve(event, host)?;

        if !policy.evaluate(permission, &member) {
            return Err(GateError::AuthorizationDenied(permission.to_owned()));
        }

        host.grant_role(event.guild_id, &member, &role, AUDIT_REASON)
            .await?;

        Ok(role.id)
    }

    async fn try_revoke<H>(&self, event: &ReactionEvent, host: &H) -> Result<RoleId, GateError>
    where
        H: GuildDirectory + RoleMutation,
    {
        let Resolved { role, member, .. } = self.resolve(event, host)?;

        host.revoke_role(event.guild_id, &member, &role, AUDIT_REASON)
            .await?;

        Ok(role.id)
    }

    /// Grants the mapped role, or strips the reaction when that isn't possible.
    ///
    /// Issues at most one remote mutation and never fails outwards.
    #[tracing::instrument(level = "trace", skip_all, fields(message_id = %event.message_id, user_id = %event.actor_id))]
    pub async fn on_reaction_added<H, P>(
        &self,
        event: &ReactionEvent,
        host: &H,
        policy: &P,
    ) -> GateOutcome
    where
        H: GuildDirectory + RoleMutation + ReactionMutation,
        P: AuthorizationPolicy,
    {
        if !self.is_relevant(event) {
            return GateOutcome::Ignored;
        }

        match self.try_grant(event, host, policy).await {
            Ok(role_id) => GateOutcome::Granted(role_id),
            Err(GateError::Unexpected(error)) => {
                tracing::warn!(error = ?error, "Failed to process role picker reaction");
                GateOutcome::Failed
            }
            Err(rejection) => {
                rejection.log_drift();

                match host.remove_reaction(event).await {
                    Ok(()) => GateOutcome::Corrected,
                    Err(error) => {
                        tracing::warn!(error = ?error, "Failed to strip role picker reaction");
                        GateOutcome::Failed
                    }
                }
            }
        }
    }

    /// Takes the mapped role away again. Permissions aren't checked here,
    /// anyone may shed a role they picked.
    #[tracing::instrument(level = "trace", skip_all, fields(message_id = %event.message_id, user_id = %event.actor_id))]
    pub async fn on_reaction_removed<H>(&self, event: &ReactionEvent, host: &H) -> GateOutcome
    where
        H: GuildDirectory + RoleMutation,
    {
        if !self.is_relevant(event) {
            return GateOutcome::Ignored;
        }

        match self.try_revoke(event, host).await {
            Ok(role_id) => GateOutcome::Revoked(role_id),
            Err(GateError::Unexpected(error)) => {
                tracing::warn!(error = ?error, "Failed to process role picker reaction removal");
                GateOutcome::Failed
            }
            Err(rejection) => {
                rejection.log_drift();
                GateOutcome::Ignored
            }
        }
    }
}
