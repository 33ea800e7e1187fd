use derive_more::{From, IsVariant};
use twilight_model::application::interaction::application_command::CommandOptionValue;
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use crate::commands::CommandError;
use crate::utils::impl_variant_option;

/// Result value for argument.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum ArgValue {
    String(String),
    Channel(Id<ChannelMarker>),
}

impl ArgValue {
    impl_variant_option!(
        pub fn string(&self: String(val)) -> &str { val.as_str() }
        pub fn channel(&self: Channel(val)) -> Id<ChannelMarker> { *val }
    );
}

impl TryFrom<CommandOptionValue> for ArgValue {
    type Error = &'static str;

    fn try_from(value: CommandOptionValue) -> Result<Self, Self::Error> {
        match value {
            CommandOptionValue::String(s) => Ok(Self::String(s)),
            CommandOptionValue::Channel(id) => Ok(Self::Channel(id)),
            CommandOptionValue::SubCommand(_) | CommandOptionValue::SubCommandGroup(_) => {
                Err("Cannot convert subcommand or group to argument value")
            },
            _ => Err("Unsupported argument kind"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: String,
    pub value: ArgValue,
}

/// Processed command arguments, in the order they were received.
#[derive(Debug, Default, Clone, From)]
pub struct Args(Vec<Arg>);

impl Args {
    /// Get argument value by name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Get a required string argument.
    pub fn string(&self, name: &str) -> Result<&str, CommandError> {
        self.get(name)
            .ok_or(CommandError::MissingArgs)?
            .string()
            .ok_or_else(|| CommandError::UnexpectedArgs(format!("Expected '{name}' to be a string")))
    }

    /// Get an optional string argument, if it was given and is a string.
    pub fn optional_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::string)
    }

    /// Get a required channel argument.
    pub fn channel(&self, name: &str) -> Result<Id<ChannelMarker>, CommandError> {
        self.get(name)
            .ok_or(CommandError::MissingArgs)?
            .channel()
            .ok_or_else(|| {
                CommandError::UnexpectedArgs(format!("Expected '{name}' to be a channel"))
            })
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
