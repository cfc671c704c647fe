use crate::{
    data::{PoiseContext, State},
    permissions::{AuthorizationPolicy, MemberContext, PermissionTable},
};
use color_eyre::eyre::{Error, OptionExt, Result};
use poise::serenity_prelude::{ChannelId, EditChannel};

/// Discord refuses longer channel names.
pub const MAX_CHANNEL_NAME_CHARS: usize = 100;

#[derive(Debug, PartialEq, Eq)]
pub enum ChannelName<'a> {
    Missing,
    TooLong,
    Valid(&'a str),
}

pub fn parse_channel_name(args: &str) -> ChannelName<'_> {
    let name = args.trim();

    if name.is_empty() {
        ChannelName::Missing
    } else if name.chars().count() > MAX_CHANNEL_NAME_CHARS {
        ChannelName::TooLong
    } else {
        ChannelName::Valid(name)
    }
}

/// What `!vc` does for a given caller, checks applied in order: voice
/// channel, permission, then the name itself.
#[derive(Debug, PartialEq, Eq)]
pub enum RenamePlan<'a> {
    NotInVoice,
    Denied,
    Usage,
    TooLong,
    Rename(ChannelId, &'a str),
}

pub fn plan_rename(voice_channel: Option<ChannelId>, allowed: bool, args: &str) -> RenamePlan<'_> {
    let Some(voice_channel) = voice_channel else {
        return RenamePlan::NotInVoice;
    };

    if !allowed {
        return RenamePlan::Denied;
    }

    match parse_channel_name(args) {
        ChannelName::Missing => RenamePlan::Usage,
        ChannelName::TooLong => RenamePlan::TooLong,
        ChannelName::Valid(name) => RenamePlan::Rename(voice_channel, name),
    }
}

/// Rename the voice channel you're currently sitting in
#[poise::command(prefix_command, rename = "vc", aliases("vcr"), guild_only)]
pub async fn vc_rename(ctx: PoiseContext<'_>) -> Result<()> {
    let poise::Context::Prefix(prefix) = ctx else {
        return Ok(());
    };
    let author = ctx.author();

    let (voice_channel, member) = {
        let guild = ctx.guild().ok_or_eyre("Couldn't get guild")?;

        let voice_channel = guild
            .voice_states
            .get(&author.id)
            .and_then(|state| state.channel_id)
            .filter(|channel_id| guild.channels.contains_key(channel_id));

        let member = guild
            .members
            .get(&author.id)
            .map(MemberContext::from)
            .or_else(|| {
                prefix.msg.member.as_ref().map(|member| MemberContext {
                    user_id: author.id,
                    roles: member.roles.clone(),
                })
            })
            .unwrap_or(MemberContext {
                user_id: author.id,
                roles: vec![],
            });

        (voice_channel, member)
    };

    let allowed = {
        let config = ctx.data().config.read().await;
        PermissionTable::new(&config.permissions, true)
            .evaluate(&config.vc_rename_permission, &member)
    };

    let refusal = match plan_rename(voice_channel, allowed, prefix.args) {
        RenamePlan::Rename(voice_channel, name) => {
            return rename(ctx, prefix, voice_channel, name).await;
        }
        RenamePlan::NotInVoice => "You must be in a voice channel to use this command",
        RenamePlan::Denied => "You aren't allowed to rename voice channels.",
        RenamePlan::Usage => "Usage: `!vc New Voice Channel Name`",
        RenamePlan::TooLong => "Voice channel name must be less than 100 chars.",
    };

    prefix.msg.reply(ctx, refusal).await?;

    Ok(())
}

async fn rename(
    ctx: PoiseContext<'_>,
    prefix: poise::PrefixContext<'_, State, Error>,
    voice_channel: ChannelId,
    name: &str,
) -> Result<()> {
    let author = ctx.author();
    let reason = prefix.msg.link();

    match voice_channel
        .edit(ctx, EditChannel::new().name(name).audit_log_reason(&reason))
        .await
    {
        Ok(_) => {
            tracing::info!("{} renamed {} to `{}`", author.tag(), voice_channel, name);
            prefix.msg.react(ctx, '😤').await?;
        }
        Err(e) => {
            tracing::warn!(error = ?e, "Discord rejected voice channel name `{}`", name);
            prefix.msg.reply(ctx, "Discord rejected this name!").await?;
        }
    }

    Ok(())
}
