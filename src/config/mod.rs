use std::collections::HashSet;
use std::path::PathBuf;

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use twilight_model::channel::message::component::ButtonStyle;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use crate::config::storage::{Directory, Storage};
use crate::utils::prelude::*;

pub mod storage;

/// Prefix of every reaction-role button custom id.
pub const REACTION_ROLE_PREFIX: &str = "reaction_role";

/// Returns the button custom id of a reaction-role in a channel at 1-based `index`.
pub fn reaction_role_custom_id(channel_id: Id<ChannelMarker>, index: usize) -> String {
    format!("{REACTION_ROLE_PREFIX}_{channel_id}_{index}")
}

/// Global bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// How many times a failed reaction-role message send is retried.
    #[serde(default)]
    pub send_retries: u8,

    /// Delay between send retries, in milliseconds.
    #[serde(default = "GlobalSettings::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl GlobalSettings {
    const fn default_retry_delay_ms() -> u64 {
        500
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            send_retries: 0,
            retry_delay_ms: Self::default_retry_delay_ms(),
        }
    }
}

/// General guild settings.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Users allowed to manage the bot in this guild, besides the owner.
    #[serde(default)]
    pub bot_managers: HashSet<Id<UserMarker>>,
}

/// A persisted button to role binding on a published message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRoleBinding {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
    pub role_id: Id<RoleMarker>,
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

/// Reaction-role bindings of a guild, in insertion order.
#[derive(Debug, Default, Clone, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionRoles(Vec<ReactionRoleBinding>);

#[derive(Debug)]
pub struct BotConfig {
    storage: Storage,
}

impl BotConfig {
    /// Setup a new configuration in the `root` data directory.
    pub fn new(root: impl Into<PathBuf>) -> AnyResult<Self> {
        let mut storage = Storage::new(root);

        storage.bind::<GlobalSettings>("bot")?;
        storage.bind::<GuildSettings>("guild")?;
        storage.bind::<ReactionRoles>("reaction_roles")?;

        Ok(Self {
            storage: storage.validated()?,
        })
    }

    /// Return general bot configuration directory.
    pub fn global(&self) -> AnyResult<Global> {
        self.storage.global().map(Global::new)
    }

    /// Return guild configuration directory.
    pub fn guild(&self, guild_id: Id<GuildMarker>) -> AnyResult<Guild> {
        self.storage
            .by_guild_id(guild_id)
            .map(|dir| Guild::new(dir, guild_id))
    }
}

/// Global data entry guard.
#[derive(Debug)]
pub struct Global<'a> {
    dir: Directory<'a>,
}

impl<'a> Global<'a> {
    /// Create a global access with a directory.
    pub const fn new(dir: Directory<'a>) -> Self {
        Self { dir }
    }

    /// Get global bot settings.
    pub fn bot_settings(&mut self) -> AnyResult<&GlobalSettings> {
        self.dir
            .load_or_default()
            .context("Failed to load bot settings")
    }
}

/// Guild data entry guard.
#[derive(Debug)]
pub struct Guild<'a> {
    dir: Directory<'a>,
    guild_id: Id<GuildMarker>,
}

impl<'a> Guild<'a> {
    /// Create a guild access with a directory and guild id.
    pub const fn new(dir: Directory<'a>, guild_id: Id<GuildMarker>) -> Self {
        Self { dir, guild_id }
    }

    /// Get guild settings.
    pub fn settings(&mut self) -> AnyResult<&GuildSettings> {
        self.dir
            .load_or_default()
            .context("Failed to load settings")
    }

    /// Get guild bot managers.
    pub fn bot_managers(&mut self) -> AnyResult<&HashSet<Id<UserMarker>>> {
        Ok(&self.settings()?.bot_managers)
    }

    /// Get all reaction-role bindings of the guild.
    pub fn reaction_roles(&mut self) -> AnyResult<&ReactionRoles> {
        self.dir
            .load_or_default()
            .context("Failed to load reaction-roles")
    }

    /// Add a batch of reaction-role bindings.
    ///
    /// Either every binding is stored or none are.
    pub fn add_reaction_roles(&mut self, bindings: Vec<ReactionRoleBinding>) -> AnyResult<()> {
        if let Some(other) = bindings.iter().find(|b| b.guild_id != self.guild_id) {
            anyhow::bail!(
                "Reaction-role binding '{}' belongs to guild '{}', not '{}'",
                other.custom_id,
                other.guild_id,
                self.guild_id
            );
        }

        let mut roles = self.reaction_roles()?.clone();
        let count = bindings.len();
        roles.0.extend(bindings);

        self.dir
            .save(roles)
            .context("Failed to save reaction-roles")?;

        debug!(
            "Stored {count} reaction-role bindings for guild '{}'",
            self.guild_id
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(guild: u64, channel: u64, index: usize) -> ReactionRoleBinding {
        let channel_id = Id::new(channel);
        ReactionRoleBinding {
            guild_id: Id::new(guild),
            channel_id,
            message_id: Id::new(9),
            role_id: Id::new(111),
            custom_id: reaction_role_custom_id(channel_id, index),
            label: "🔥".to_string(),
            style: ButtonStyle::Secondary,
        }
    }

    #[test]
    fn custom_id_format() {
        assert_eq!(reaction_role_custom_id(Id::new(42), 3), "reaction_role_42_3");
    }

    #[test]
    fn binding_json_shape() {
        let value = serde_json::to_value(binding(1, 2, 1)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "guildId": "1",
                "channelId": "2",
                "messageId": "9",
                "roleId": "111",
                "customId": "reaction_role_2_1",
                "label": "🔥",
                "style": 2,
            })
        );
    }

    #[test]
    fn global_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = BotConfig::new(temp.path()).unwrap();

        let mut global = config.global().unwrap();
        let settings = global.bot_settings().unwrap();
        assert_eq!(settings.send_retries, 0);
        assert_eq!(settings.retry_delay_ms, 500);
    }

    #[test]
    fn partial_global_settings_file() {
        let settings: GlobalSettings = serde_json::from_str(r#"{ "send_retries": 2 }"#).unwrap();
        assert_eq!(settings.send_retries, 2);
        assert_eq!(settings.retry_delay_ms, 500);
    }

    #[test]
    fn reaction_roles_are_scoped_by_guild() {
        let temp = tempfile::tempdir().unwrap();
        let config = BotConfig::new(temp.path()).unwrap();

        config
            .guild(Id::new(1))
            .unwrap()
            .add_reaction_roles(vec![binding(1, 2, 1), binding(1, 2, 2)])
            .unwrap();
        config
            .guild(Id::new(5))
            .unwrap()
            .add_reaction_roles(vec![binding(5, 2, 1)])
            .unwrap();

        let mut guild = config.guild(Id::new(1)).unwrap();
        let roles = guild.reaction_roles().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[1].custom_id, "reaction_role_2_2");

        // Survives a restart.
        drop(guild);
        let config = BotConfig::new(temp.path()).unwrap();
        let mut guild = config.guild(Id::new(5)).unwrap();
        assert_eq!(guild.reaction_roles().unwrap().len(), 1);
    }

    #[test]
    fn foreign_binding_rejects_whole_batch() {
        let temp = tempfile::tempdir().unwrap();
        let config = BotConfig::new(temp.path()).unwrap();

        let mut guild = config.guild(Id::new(1)).unwrap();
        assert!(guild
            .add_reaction_roles(vec![binding(1, 2, 1), binding(3, 2, 2)])
            .is_err());
        assert!(guild.reaction_roles().unwrap().is_empty());
    }

    #[test]
    fn bot_managers_default_empty() {
        let temp = tempfile::tempdir().unwrap();
        let config = BotConfig::new(temp.path()).unwrap();
        let mut guild = config.guild(Id::new(1)).unwrap();
        assert!(guild.bot_managers().unwrap().is_empty());
    }
}
