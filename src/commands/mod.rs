//! Slash command framework.
//!
//! ```text
//!     ┌─────────────────┐     ┌─────────────┐     ┌─────────────────┐
//!     │Interaction Event├────►│Deferred Ack ├────►│Subcommand Lookup│
//!     └─────────────────┘     └─────────────┘     └────────┬────────┘
//!                                                          │
//!                                                          ▼
//!     ┌─────────────────────┐                 ┌──────────────────────────┐
//!     │Handle Command Result│◄────────────────┤Call Subcommand Handler   │
//!     └──────────┬──────────┘                 └──────────────────────────┘
//!                │
//!                ▼
//!     ┌─────────────────────────────┐
//!     │ Message / Embeds + Followups│
//!     └─────────────────────────────┘
//! ```
//!

use std::collections::{BTreeMap, HashSet};
use std::mem;
use std::sync::Arc;

use thiserror::Error;
use twilight_model::channel::message::Embed;

use crate::commands::builder::twilight::{CommandValidationError, TwilightCommand};
use crate::commands::builder::BaseCommand;
use crate::utils::prelude::*;

pub mod arg;
pub mod bot;
pub mod builder;
pub mod function;
pub mod handle;
pub mod request;

/// Prelude module for command things.
pub mod prelude {
    pub use crate::commands::arg::Args;
    pub use crate::commands::builder::BaseCommand;
    pub use crate::commands::request::SlashRequest;
    pub use crate::commands::{CommandError, CommandResult, Response};
    pub use crate::Context;
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// A command does not exist.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The sender must provide some arguments.
    #[error("Expected arguments missing")]
    MissingArgs,

    /// Some arguments are wrong, invalid or unexpected.
    #[error("Arguments unexpected or failed to process: {0}")]
    UnexpectedArgs(String),

    /// The command or action is not available in this context.
    #[error("Command or action disabled")]
    Disabled,

    /// Other errors that are or can be converted to `anyhow::Error`.
    #[error(transparent)]
    Other(#[from] anyhow::Error), // Source and Display delegate to `anyhow::Error`
}

impl PartialEq for CommandError {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other) // Close enough.
    }
}

impl From<twilight_http::Error> for CommandError {
    fn from(other: twilight_http::Error) -> Self {
        Self::Other(other.into())
    }
}

/// Content of the deferred interaction reply once the command is done.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Reply with a text message.
    Message(String),
    /// Reply with embeds, split over follow-ups if needed.
    Embeds(Vec<Embed>),
}

pub type CommandResult<T = Response> = Result<T, CommandError>;

/// Registered commands by name.
#[derive(Debug, Default, Clone)]
pub struct Commands(BTreeMap<&'static str, Arc<BaseCommand>>);

impl Commands {
    /// Get base command by name.
    pub fn get(&self, id: &str) -> Option<&Arc<BaseCommand>> {
        self.0.get(id)
    }

    /// Convert commands to Discord compatible list.
    pub fn twilight_commands(&self) -> Result<Vec<TwilightCommand>, CommandValidationError> {
        self.0.values().map(|b| b.twilight_command()).collect()
    }
}

impl std::fmt::Display for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.0.keys().copied().collect::<Vec<_>>();
        write!(f, "[{}]", names.join(", "))
    }
}

/// A type for creating a collection of commands and validating them.
#[derive(Debug, Default, Clone)]
pub struct CommandsBuilder {
    list: Vec<BaseCommand>,
}

impl CommandsBuilder {
    /// Create a new list of commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a command to the list.
    pub fn bind(&mut self, cmd: BaseCommand) -> &mut Self {
        self.list.push(cmd);
        self
    }

    /// Validate the list of commands.
    pub fn validate(&self) -> AnyResult<()> {
        let mut set = HashSet::with_capacity(self.list.len());

        for cmd in self.list.iter() {
            // Ensure command itself is valid.
            cmd.validate()?;

            // Ensure it doesn't overlap with other commands.
            anyhow::ensure!(
                set.insert(cmd.name),
                "Duplicate command found: {}",
                cmd.name
            );
        }

        Ok(())
    }

    /// Finalize the list of commands.
    pub fn build(self) -> Commands {
        Commands(
            self.list
                .into_iter()
                .map(|b| (b.name, Arc::new(b)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::builder::*;
    use crate::commands::function::mock;

    #[test]
    fn duplicate_commands() {
        let mut commands = CommandsBuilder::new();
        commands
            .bind(command("a", "description").sub(sub("x", "description", mock::slash)))
            .bind(command("a", "other"));

        assert!(commands.validate().is_err());
    }

    #[test]
    fn command_list() {
        let mut commands = CommandsBuilder::new();
        commands
            .bind(command("b", "description").sub(sub("x", "description", mock::slash)))
            .bind(command("a", "description"));
        commands.validate().unwrap();

        let commands = commands.build();
        assert!(commands.get("a").is_some());
        assert!(commands.get("c").is_none());
        assert_eq!(commands.to_string(), "[a, b]");
        assert_eq!(commands.twilight_commands().unwrap().len(), 2);
    }
}
