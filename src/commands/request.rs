use std::sync::Arc;

use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::Interaction;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::commands::arg::Args;
use crate::commands::builder::BaseCommand;
use crate::commands::CommandError;

/// Slash command request with preprocessed arguments and interaction data.
#[derive(Debug, Clone)]
pub struct SlashRequest {
    pub command: Arc<BaseCommand>,
    pub interaction: Arc<Interaction>,
    pub data: Arc<CommandData>,
    pub args: Args,
}

impl SlashRequest {
    pub fn new(
        command: Arc<BaseCommand>,
        interaction: Arc<Interaction>,
        data: Arc<CommandData>,
        args: Args,
    ) -> Self {
        Self {
            command,
            interaction,
            data,
            args,
        }
    }

    /// Guild where the command was used.
    ///
    /// # Errors
    /// If the command was not used in a guild.
    pub fn guild_id(&self) -> Result<Id<GuildMarker>, CommandError> {
        self.interaction.guild_id.ok_or(CommandError::Disabled)
    }

    /// User who invoked the command.
    pub fn author_id(&self) -> Result<Id<UserMarker>, CommandError> {
        self.interaction
            .author_id()
            .ok_or_else(|| CommandError::Other(anyhow::anyhow!("Interaction has no author")))
    }

    /// Resolved guild permissions of the invoking member, if any.
    pub fn member_permissions(&self) -> Option<Permissions> {
        self.interaction
            .member
            .as_ref()
            .and_then(|m| m.permissions)
    }
}
