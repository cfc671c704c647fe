use crate::{
    IntoCloneableCtx,
    config::Config,
    data::State,
    guild::{GuildDirectory, RoleMutation},
    permissions::PermissionTable,
    reaction_roles::{GateOutcome, ReactionEvent, ReactionMutation, ReactionRoleGate},
    voice_roles::sync_voice_roles,
};
use color_eyre::eyre::Result;
use poise::serenity_prelude as serenity;
use tokio::sync::RwLock;

/// Role picker permissions deny unless the config says otherwise.
const REACTION_ROLE_DEFAULT: bool = false;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: State,
) -> Result<()> {
    match event {
        serenity::FullEvent::ReactionAdd {
            add_reaction: reaction,
        } => {
            let Some(event) = ReactionEvent::from_reaction(reaction) else {
                return Ok(());
            };

            log_outcome(
                handle_reaction_added(&data.gate, &event, &ctx.get_cloneable_ctx(), &data.config)
                    .await,
            );
        }
        serenity::FullEvent::ReactionRemove {
            removed_reaction: reaction,
        } => {
            let Some(event) = ReactionEvent::from_reaction(reaction) else {
                return Ok(());
            };

            log_outcome(
                data.gate
                    .on_reaction_removed(&event, &ctx.get_cloneable_ctx())
                    .await,
            );
        }
        serenity::FullEvent::VoiceStateUpdate { new, .. } => {
            let rules = data.config.read().await.voice_roles.clone();

            sync_voice_roles(&ctx.get_cloneable_ctx(), new, &rules).await;
        }
        serenity::FullEvent::Ratelimit { data: info } => {
            tracing::warn!("Ratelimited: {:?}", info);
        }
        _ => {}
    };

    Ok(())
}

/// Runs the role picker against a copy of the current permission table.
///
/// The config lock is released before any remote call starts, a reload
/// never waits on discord.
pub async fn handle_reaction_added<H>(
    gate: &ReactionRoleGate,
    event: &ReactionEvent,
    host: &H,
    config: &RwLock<Config>,
) -> GateOutcome
where
    H: GuildDirectory + RoleMutation + ReactionMutation,
{
    let rules = config.read().await.permissions.clone();
    let policy = PermissionTable::new(&rules, REACTION_ROLE_DEFAULT);

    gate.on_reaction_added(event, host, &policy).await
}

fn log_outcome(outcome: GateOutcome) {
    match outcome {
        GateOutcome::Granted(role_id) => tracing::debug!(role_id = %role_id, "Role picker granted"),
        GateOutcome::Revoked(role_id) => tracing::debug!(role_id = %role_id, "Role picker revoked"),
        GateOutcome::Corrected => tracing::debug!("Role picker reaction stripped"),
        GateOutcome::Ignored | GateOutcome::Failed => {}
    }
}
