use thiserror::Error;
use twilight_model::application::command::{Command, CommandOption, CommandType};
use twilight_util::builder::command::{
    ChannelBuilder, CommandBuilder, StringBuilder, SubCommandBuilder,
};

use crate::commands::builder::{ArgDesc, ArgKind, BaseCommand, SubCommand};
use crate::utils::prelude::*;

pub type TwilightCommand = Command;

#[derive(Debug, Error)]
pub enum CommandValidationError {
    /// Two options on the same level share a name.
    #[error("Duplicate option name '{0}'")]
    DuplicateName(String),

    /// Rejected by twilight's validation.
    #[error(transparent)]
    Twilight(#[from] twilight_validate::command::CommandValidationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Checks that option names are unique on every level.
fn unique_names(options: &[CommandOption]) -> Result<(), CommandValidationError> {
    for (idx, opt) in options.iter().enumerate() {
        if options[idx + 1..].iter().any(|o| o.name == opt.name) {
            return Err(CommandValidationError::DuplicateName(opt.name.to_owned()));
        }

        if let Some(nested) = &opt.options {
            unique_names(nested)?;
        }
    }

    Ok(())
}

/// Validate a converted command.
pub fn validate_command(cmd: &Command) -> Result<(), CommandValidationError> {
    use twilight_validate::command as validate;

    // Name, description and option count of the command itself.
    validate::command(cmd).context("Base command error")?;

    // Option order, limits, names and descriptions, recursively.
    validate::options(&cmd.options).context("Command options error")?;

    unique_names(&cmd.options)
}

/// A validated chat input command.
pub struct SlashCommand(Command);

impl TryFrom<&BaseCommand> for SlashCommand {
    type Error = CommandValidationError;

    fn try_from(base: &BaseCommand) -> Result<Self, Self::Error> {
        let mut builder = CommandBuilder::new(base.name, base.description, CommandType::ChatInput)
            .dm_permission(false);

        if let Some(permissions) = base.member_permissions {
            builder = builder.default_member_permissions(permissions);
        }

        let cmd = base
            .subs
            .iter()
            .map(CommandOption::from)
            .fold(builder, |b, opt| b.option(opt))
            .build();

        validate_command(&cmd).context("Failed to validate slash command")?;

        Ok(Self(cmd))
    }
}

impl From<SlashCommand> for Command {
    fn from(value: SlashCommand) -> Self {
        value.0
    }
}

impl From<&SubCommand> for CommandOption {
    fn from(sub: &SubCommand) -> Self {
        sub.args
            .iter()
            .map(CommandOption::from)
            .fold(SubCommandBuilder::new(sub.name, sub.description), |b, opt| {
                b.option(opt)
            })
            .build()
    }
}

impl From<&ArgDesc> for CommandOption {
    fn from(arg: &ArgDesc) -> Self {
        match &arg.kind {
            ArgKind::String { max_length } => {
                let builder = StringBuilder::new(arg.name, arg.description).required(arg.required);
                match max_length {
                    Some(max) => builder.max_length(*max).build(),
                    None => builder.build(),
                }
            },
            ArgKind::Channel { types } => ChannelBuilder::new(arg.name, arg.description)
                .required(arg.required)
                .channel_types(types.to_owned())
                .build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use twilight_model::application::command::CommandOptionType;
    use twilight_model::channel::ChannelType;
    use twilight_model::guild::Permissions;

    use super::*;
    use crate::commands::builder::{channel, command, string, sub};
    use crate::commands::function::mock;

    #[test]
    fn converted_command_shape() {
        let cmd = command("root", "Root command.")
            .permissions(Permissions::MANAGE_CHANNELS)
            .sub(
                sub("set", "Set it.", mock::slash)
                    .arg(string("title", "Title.").required().max_length(256))
                    .arg(
                        channel("channel", "Channel.")
                            .required()
                            .types([ChannelType::GuildText]),
                    ),
            )
            .sub(sub("view", "View it.", mock::slash))
            .twilight_command()
            .unwrap();

        assert_eq!(cmd.kind, CommandType::ChatInput);
        assert_eq!(cmd.dm_permission, Some(false));
        assert_eq!(
            cmd.default_member_permissions,
            Some(Permissions::MANAGE_CHANNELS)
        );

        let set = &cmd.options[0];
        assert_eq!(set.kind, CommandOptionType::SubCommand);

        let options = set.options.as_ref().unwrap();
        assert_eq!(options[0].name, "title");
        assert_eq!(options[0].required, Some(true));
        assert_eq!(options[0].max_length, Some(256));
        assert_eq!(options[1].kind, CommandOptionType::Channel);
        assert_eq!(
            options[1].channel_types,
            Some(vec![ChannelType::GuildText])
        );

        assert_eq!(cmd.options[1].name, "view");
    }

    #[test]
    fn nested_duplicates() {
        let options = vec![
            CommandOption::from(&sub("a", "A.", mock::slash).arg(string("x", "X."))),
            CommandOption::from(
                &sub("b", "B.", mock::slash)
                    .arg(string("x", "X."))
                    .arg(string("x", "X again.")),
            ),
        ];

        assert!(matches!(
            unique_names(&options),
            Err(CommandValidationError::DuplicateName(name)) if name == "x"
        ));
        assert!(unique_names(&options[..1]).is_ok());
    }
}
