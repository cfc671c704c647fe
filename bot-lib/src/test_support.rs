//! In-memory stand-ins for the discord side of things.

use crate::{
    guild::{GuildDirectory, GuildRole, RoleMutation},
    permissions::{AuthorizationPolicy, MemberContext},
    reaction_roles::{ReactionEvent, ReactionMutation, mapping::EmojiKey},
};
use ahash::AHashMap;
use color_eyre::eyre::{Result, bail};
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Grant(UserId, RoleId),
    Revoke(UserId, RoleId),
    RemoveReaction(MessageId, UserId, EmojiKey),
}

/// A single guild whose mutations are recorded instead of sent anywhere.
#[derive(Default)]
pub struct FakeGuild {
    roles: AHashMap<RoleId, GuildRole>,
    members: AHashMap<UserId, MemberContext>,
    parents: AHashMap<ChannelId, ChannelId>,
    failing: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeGuild {
    pub fn with_role(mut self, id: u64, name: &str) -> Self {
        let id = RoleId::new(id);
        self.roles.insert(
            id,
            GuildRole {
                id,
                name: name.to_owned(),
            },
        );
        self
    }

    pub fn with_member(mut self, user: u64, roles: &[u64]) -> Self {
        let user_id = UserId::new(user);
        self.members.insert(
            user_id,
            MemberContext {
                user_id,
                roles: roles.iter().copied().map(RoleId::new).collect(),
            },
        );
        self
    }

    pub fn with_channel(mut self, channel: u64, parent: u64) -> Self {
        self.parents
            .insert(ChannelId::new(channel), ChannelId::new(parent));
        self
    }

    /// Every remote call gets recorded and then rejected.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn removals(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::RemoveReaction(..)))
            .count()
    }

    pub fn role_changes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Grant(..) | Call::Revoke(..)))
            .count()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().push(call);

        if self.failing {
            bail!("discord said no");
        }

        Ok(())
    }
}

impl GuildDirectory for FakeGuild {
    fn role(&self, _guild_id: GuildId, role_id: RoleId) -> Option<GuildRole> {
        self.roles.get(&role_id).cloned()
    }

    fn member(&self, _guild_id: GuildId, user_id: UserId) -> Option<MemberContext> {
        self.members.get(&user_id).cloned()
    }

    fn members(&self, _guild_id: GuildId) -> Vec<MemberContext> {
        let mut members = self.members.values().cloned().collect::<Vec<_>>();
        members.sort_by_key(|member| member.user_id);
        members
    }

    fn channel_parent(&self, _guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelId> {
        self.parents.get(&channel_id).copied()
    }
}

impl RoleMutation for FakeGuild {
    async fn grant_role(
        &self,
        _guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        _reason: &str,
    ) -> Result<()> {
        self.record(Call::Grant(member.user_id, role.id))
    }

    async fn revoke_role(
        &self,
        _guild_id: GuildId,
        member: &MemberContext,
        role: &GuildRole,
        _reason: &str,
    ) -> Result<()> {
        self.record(Call::Revoke(member.user_id, role.id))
    }
}

impl ReactionMutation for FakeGuild {
    async fn remove_reaction(&self, event: &ReactionEvent) -> Result<()> {
        self.record(Call::RemoveReaction(
            event.message_id,
            event.actor_id,
            event.emoji_key(),
        ))
    }
}

/// Answers every permission check the same way and counts how often it was asked.
pub struct FixedPolicy {
    allow: bool,
    evaluations: AtomicUsize,
}

impl FixedPolicy {
    pub fn allow() -> Self {
        Self {
            allow: true,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn deny() -> Self {
        Self {
            allow: false,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl AuthorizationPolicy for FixedPolicy {
    fn evaluate(&self, _permission: &str, _member: &MemberContext) -> bool {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.allow
    }
}

/// Counts warning level events emitted on the current thread while installed.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing_subscriber::registry()
            .with(self.clone())
            .set_default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
