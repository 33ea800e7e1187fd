/*!
Command template:
```ignore
pub struct Command;

impl Command {
    pub fn command() -> BaseCommand {
        use crate::commands::builder::*;

        command("cmd", "Thing.").sub(sub("do", "Do the thing.", Self::slash))
    }

    async fn slash(_ctx: Context, _req: SlashRequest) -> CommandResult {
        Ok(Response::Message("Done.".to_string()))
    }
}
```
*/
use crate::commands::{Commands, CommandsBuilder};
use crate::utils::prelude::*;

/// Administrator comands.
#[cfg(feature = "admin")]
pub mod admin;

/// Create the list of bot commands.
pub fn create_commands() -> AnyResult<Commands> {
    let mut commands = CommandsBuilder::new();

    // Moderation functionality.
    #[cfg(feature = "admin")]
    commands.bind(admin::reaction_role::ReactionRole::command());

    commands
        .validate()
        .context("Failed to validate commands list")?;

    Ok(commands.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_valid() {
        let commands = create_commands().unwrap();

        #[cfg(feature = "admin")]
        assert!(commands.get("setreactionrole").is_some());

        commands.twilight_commands().unwrap();
    }
}
