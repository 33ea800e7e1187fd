//! Slash command definitions.
//!
//! Every bot command is a named group of subcommands, each with its own handler:
//! ```text
//! command("name", "description")
//!     .permissions(Permissions::MANAGE_CHANNELS)
//!     .sub(sub("a", "description", handler).arg(string("x", "description").required()))
//!     .sub(sub("b", "description", handler))
//! ```

use std::sync::Arc;

use futures::Future;
pub use twilight_model::channel::ChannelType;
pub use twilight_model::guild::Permissions;

use crate::commands::builder::twilight::{CommandValidationError, SlashCommand, TwilightCommand};
use crate::commands::function::{Callable, SlashFunction};
use crate::commands::request::SlashRequest;
use crate::commands::CommandResult;
use crate::utils::prelude::*;
use crate::Context;

pub mod twilight;

/// Create a new command without subcommands.
pub const fn command(name: &'static str, description: &'static str) -> BaseCommand {
    BaseCommand {
        name,
        description,
        member_permissions: None,
        subs: Vec::new(),
    }
}

/// Create a subcommand that calls `handler` when used.
pub fn sub<F, Fut>(name: &'static str, description: &'static str, handler: F) -> SubCommand
where
    F: Fn(Context, SlashRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    SubCommand {
        name,
        description,
        handler: Arc::new(handler),
        args: Vec::new(),
    }
}

/// Create a text argument.
pub const fn string(name: &'static str, description: &'static str) -> ArgDesc {
    ArgDesc::new(name, description, ArgKind::String { max_length: None })
}

/// Create a channel argument.
pub const fn channel(name: &'static str, description: &'static str) -> ArgDesc {
    ArgDesc::new(name, description, ArgKind::Channel { types: Vec::new() })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    String { max_length: Option<u16> },
    Channel { types: Vec<ChannelType> },
}

/// Argument of a subcommand.
#[derive(Debug, Clone)]
pub struct ArgDesc {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

impl ArgDesc {
    const fn new(name: &'static str, description: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
        }
    }

    /// Required arguments must come before any optional ones.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Limit the length of a text argument. No effect on other kinds.
    pub fn max_length(mut self, max: u16) -> Self {
        if let ArgKind::String { max_length } = &mut self.kind {
            *max_length = Some(max);
        }
        self
    }

    /// Restrict a channel argument to some channel types. No effect on other kinds.
    pub fn types(mut self, channel_types: impl IntoIterator<Item = ChannelType>) -> Self {
        if let ArgKind::Channel { types } = &mut self.kind {
            *types = channel_types.into_iter().collect();
        }
        self
    }
}

/// Subcommand with its handler and arguments.
#[derive(Clone)]
pub struct SubCommand {
    pub name: &'static str,
    pub description: &'static str,
    handler: SlashFunction,
    pub args: Vec<ArgDesc>,
}

impl SubCommand {
    /// Append an argument.
    pub fn arg(mut self, arg: ArgDesc) -> Self {
        self.args.push(arg);
        self
    }

    /// Handler of the subcommand.
    pub fn handler(&self) -> &dyn Callable<SlashRequest> {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubCommand")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Top level guild command.
#[derive(Debug, Clone)]
pub struct BaseCommand {
    pub name: &'static str,
    pub description: &'static str,
    pub member_permissions: Option<Permissions>,
    pub subs: Vec<SubCommand>,
}

impl BaseCommand {
    /// Default guild member permissions for the command.
    pub const fn permissions(mut self, permissions: Permissions) -> Self {
        self.member_permissions = Some(permissions);
        self
    }

    /// Append a subcommand.
    pub fn sub(mut self, sub: SubCommand) -> Self {
        self.subs.push(sub);
        self
    }

    /// Find a subcommand by name.
    pub fn find_sub(&self, name: &str) -> Option<&SubCommand> {
        self.subs.iter().find(|s| s.name == name)
    }

    /// Generate the command to be registered to discord.
    pub fn twilight_command(&self) -> Result<TwilightCommand, CommandValidationError> {
        SlashCommand::try_from(self).map(Into::into)
    }

    /// Validate the command.
    pub fn validate(&self) -> AnyResult<()> {
        self.twilight_command()
            .with_context(|| format!("Failed to validate command '{}'", self.name))
            .map(|_| ())
    }
}
