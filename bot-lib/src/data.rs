use crate::{config::Config, reaction_roles::ReactionRoleGate};
use color_eyre::eyre::{Error, Result, WrapErr};
use poise::serenity_prelude::UserId;
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

/// The global state of the bot
pub type State = Arc<RawAppState>;

#[derive(Debug)]
pub struct RawAppState {
    pub config: Arc<RwLock<Config>>,
    /// Config file watcher that refreshes the config if it changes
    ///
    /// Attached to the state to keep the watcher alive
    _watcher: notify::RecommendedWatcher,
    /// Role picker, built once from the startup config.
    pub gate: ReactionRoleGate,
}

impl RawAppState {
    /// `bot_id` is our own user, reactions from it are never acted on.
    pub fn new(config: Config, config_path: String, bot_id: UserId) -> Result<RawAppState> {
        let gate = ReactionRoleGate::new(bot_id, &config.reaction_roles)?;
        let config = Arc::new(RwLock::new(config));

        use notify::{
            Event, EventKind, RecursiveMode, Watcher,
            event::{AccessKind, AccessMode},
        };

        let config_clone = Arc::clone(&config);
        let reload_config_path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res| match res {
            Ok(Event {
                kind: EventKind::Access(AccessKind::Close(AccessMode::Write)),
                ..
            }) => {
                tracing::info!(path = %reload_config_path, "config changed, reloading...");

                config_clone.blocking_write().reload(&*reload_config_path);
            }
            Err(e) => tracing::error!("watch error: {:?}", e),
            _ => {}
        })
        .wrap_err("Failed to create file watcher")?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch config file")?;

        Ok(RawAppState {
            config,
            _watcher: watcher,
            gate,
        })
    }
}

// User data, which is stored and accessible in all command invocations
pub type PoiseContext<'a> = poise::Context<'a, State, Error>;
