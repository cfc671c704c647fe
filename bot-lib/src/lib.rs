use poise::serenity_prelude::{Cache, CacheHttp, Http};
use std::sync::Arc;

pub mod commands;
pub mod composite_roles;
pub mod config;
pub mod data;
pub mod event_handler;
pub mod guild;
pub mod permissions;
pub mod reaction_roles;
pub mod voice_roles;

#[cfg(test)]
mod test_support;

/// Owned handle onto the serenity cache and http client.
///
/// Background tasks outlive the `Context` they were spawned from, and the
/// guild/role traits in [`guild`] are implemented on this so the same code
/// runs from event handlers and periodic jobs alike.
pub struct CloneableCtx(Arc<Cache>, Arc<Http>);

pub trait IntoCloneableCtx {
    fn get_cloneable_ctx(self) -> CloneableCtx;
}

impl IntoCloneableCtx for &poise::serenity_prelude::Context {
    fn get_cloneable_ctx(self) -> CloneableCtx {
        CloneableCtx(Arc::clone(&self.cache), Arc::clone(&self.http))
    }
}

impl CacheHttp for CloneableCtx {
    fn http(&self) -> &Http {
        &self.1
    }

    fn cache(&self) -> Option<&Arc<Cache>> {
        Some(&self.0)
    }
}

impl Clone for CloneableCtx {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0), Arc::clone(&self.1))
    }
}
