//! Discord and storage access of the reaction-role command.

use std::collections::HashSet;
use std::slice;

use thiserror::Error;
use twilight_http::error::ErrorType;
use twilight_model::channel::message::component::Component;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

use crate::config::{GlobalSettings, ReactionRoleBinding};
use crate::utils::prelude::*;
use crate::Context;

/// Failed message send.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request may succeed if sent again.
    #[error(transparent)]
    Retryable(anyhow::Error),

    /// Sending again would fail the same way, or could post a duplicate.
    #[error(transparent)]
    Fatal(anyhow::Error),
}

impl SendError {
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Retryable(e) | Self::Fatal(e) => e,
        }
    }
}

impl From<twilight_http::Error> for SendError {
    fn from(error: twilight_http::Error) -> Self {
        if retryable(error.kind()) {
            Self::Retryable(error.into())
        } else {
            Self::Fatal(error.into())
        }
    }
}

/// Whether a failed request was surely not processed and may work later.
///
/// Timeouts are not retried, the message may have been posted anyway.
pub fn retryable(kind: &ErrorType) -> bool {
    match kind {
        ErrorType::RatelimiterTicket
        | ErrorType::RequestError
        | ErrorType::ServiceUnavailable { .. } => true,
        ErrorType::Response { status, .. } => retryable_status(status.get()),
        _ => false,
    }
}

/// Rate limits and server errors are retried, other rejections are final.
pub const fn retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status < 600)
}

/// Everything the reaction-role command reads and writes.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn guild_owner(&self, guild_id: Id<GuildMarker>) -> AnyResult<Id<UserMarker>>;

    fn bot_managers(&self, guild_id: Id<GuildMarker>) -> AnyResult<HashSet<Id<UserMarker>>>;

    fn global_settings(&self) -> AnyResult<GlobalSettings>;

    /// Single attempt to post a message with an embed and components.
    async fn send_message(
        &self,
        channel_id: Id<ChannelMarker>,
        embed: &Embed,
        components: &[Component],
    ) -> Result<Id<MessageMarker>, SendError>;

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> AnyResult<()>;

    /// Store all bindings or none of them.
    fn store_bindings(
        &self,
        guild_id: Id<GuildMarker>,
        bindings: Vec<ReactionRoleBinding>,
    ) -> AnyResult<()>;

    fn bindings(&self, guild_id: Id<GuildMarker>) -> AnyResult<Vec<ReactionRoleBinding>>;

    /// Channels of the guild the bot can see.
    async fn visible_channels(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> AnyResult<HashSet<Id<ChannelMarker>>>;
}

#[async_trait]
impl Backend for Context {
    async fn guild_owner(&self, guild_id: Id<GuildMarker>) -> AnyResult<Id<UserMarker>> {
        if let Some(guild) = self.cache.guild(guild_id) {
            return Ok(guild.owner_id());
        }

        let guild = self
            .http
            .guild(guild_id)
            .send()
            .await
            .context("Failed to get guild")?;

        Ok(guild.owner_id)
    }

    fn bot_managers(&self, guild_id: Id<GuildMarker>) -> AnyResult<HashSet<Id<UserMarker>>> {
        Ok(self.config.guild(guild_id)?.bot_managers()?.clone())
    }

    fn global_settings(&self) -> AnyResult<GlobalSettings> {
        Ok(self.config.global()?.bot_settings()?.clone())
    }

    async fn send_message(
        &self,
        channel_id: Id<ChannelMarker>,
        embed: &Embed,
        components: &[Component],
    ) -> Result<Id<MessageMarker>, SendError> {
        let request = self
            .http
            .create_message(channel_id)
            .embeds(slice::from_ref(embed))
            .and_then(|r| r.components(components))
            .map_err(|e| SendError::Fatal(e.into()))?;

        let message = request
            .await?
            .model()
            .await
            .map_err(|e| SendError::Fatal(e.into()))?;

        Ok(message.id)
    }

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> AnyResult<()> {
        self.http.delete_message(channel_id, message_id).await?;
        Ok(())
    }

    fn store_bindings(
        &self,
        guild_id: Id<GuildMarker>,
        bindings: Vec<ReactionRoleBinding>,
    ) -> AnyResult<()> {
        self.config.guild(guild_id)?.add_reaction_roles(bindings)
    }

    fn bindings(&self, guild_id: Id<GuildMarker>) -> AnyResult<Vec<ReactionRoleBinding>> {
        Ok(self.config.guild(guild_id)?.reaction_roles()?.to_vec())
    }

    async fn visible_channels(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> AnyResult<HashSet<Id<ChannelMarker>>> {
        if let Some(channels) = self.cache.guild_channels(guild_id) {
            return Ok(channels.iter().copied().collect());
        }

        let channels = self
            .http
            .guild_channels(guild_id)
            .send()
            .await
            .context("Failed to get guild channels")?;

        Ok(channels.into_iter().map(|c| c.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_retries() {
        assert!(retryable_status(429));
        assert!(retryable_status(500));
        assert!(retryable_status(503));
        assert!(!retryable_status(400));
        assert!(!retryable_status(403));
        assert!(!retryable_status(404));
    }

    #[test]
    fn error_kind_retries() {
        assert!(retryable(&ErrorType::RatelimiterTicket));
        assert!(retryable(&ErrorType::RequestError));
        assert!(!retryable(&ErrorType::RequestTimedOut));
        assert!(!retryable(&ErrorType::RequestCanceled));
        assert!(!retryable(&ErrorType::Unauthorized));
        assert!(!retryable(&ErrorType::Json));
    }
}
