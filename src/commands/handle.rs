use std::sync::Arc;

use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::{Embed, MessageFlags};
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

use crate::commands::arg::{Arg, ArgValue, Args};
use crate::commands::builder::{BaseCommand, SubCommand};
use crate::commands::function::Callable;
use crate::commands::prelude::*;
use crate::utils;
use crate::utils::prelude::*;

/// Reply shown to the user when a command fails unexpectedly.
pub const ERROR_MESSAGE: &str = "Something went wrong while running this command.";

/// Maximum number of embeds in a single message.
pub const EMBEDS_PER_MESSAGE: usize = 10;

/// Maximum total embed text length in a single message.
pub const EMBED_TEXT_PER_MESSAGE: usize = 6000;

/// Handle interaction and execute command functions.
pub async fn application_command(
    ctx: &Context,
    inter: Interaction,
    data: CommandData,
) -> Result<(), CommandError> {
    let interaction = ctx.interaction();

    let resp = InteractionResponse {
        kind: InteractionResponseType::DeferredChannelMessageWithSource,
        data: Some(
            InteractionResponseDataBuilder::new()
                .flags(MessageFlags::EPHEMERAL)
                .build(),
        ),
    };

    // Acknowledge the interaction.
    interaction
        .create_response(inter.id, &inter.token, &resp)
        .await?;

    let inter = Arc::new(inter);
    let name = data.name.to_owned();

    // Lookup and process the command.
    let result = match ctx.commands.get(data.name.as_str()) {
        Some(base) if data.kind == CommandType::ChatInput => {
            debug!(
                "Executing '{}' by user '{:?}'",
                data.name,
                inter.author_id()
            );
            process_slash(ctx, Arc::clone(base), Arc::clone(&inter), Arc::new(data)).await
        },
        Some(_) => Err(CommandError::Disabled),
        None => Err(CommandError::NotFound(format!(
            "Command '{}' does not exist",
            data.name
        ))),
    };

    // Handle execution result.
    match result {
        Ok(response) => {
            respond(ctx, &inter, response).await?;
            debug!("Completed '{}' by user '{:?}'", name, inter.author_id());
            Ok(())
        },
        Err(e) => {
            // Replace the dangling deferred response with a generic error.
            if let Err(reply) = error_reply(ctx, &inter).await {
                warn!("Failed to send error reply: {reply:?}");
            }
            Err(e)
        },
    }
}

async fn error_reply(ctx: &Context, inter: &Interaction) -> AnyResult<()> {
    ctx.interaction()
        .update_response(&inter.token)
        .content(Some(ERROR_MESSAGE))?
        .await?;
    Ok(())
}

/// Send the command response by updating the deferred reply.
async fn respond(ctx: &Context, inter: &Interaction, response: Response) -> CommandResult<()> {
    let interaction = ctx.interaction();

    match response {
        Response::Message(text) => {
            interaction
                .update_response(&inter.token)
                .content(Some(&text))
                .context("Response message error")?
                .await
                .context("Failed to send response message")?;
        },
        Response::Embeds(embeds) => {
            let mut batches = embed_batches(embeds).into_iter();

            let Some(first) = batches.next() else {
                interaction
                    .delete_response(&inter.token)
                    .await
                    .context("Failed to clear interaction")?;
                return Ok(());
            };

            interaction
                .update_response(&inter.token)
                .embeds(Some(&first))
                .context("Response embeds error")?
                .await
                .context("Failed to send response embeds")?;

            for batch in batches {
                interaction
                    .create_followup(&inter.token)
                    .flags(MessageFlags::EPHEMERAL)
                    .embeds(&batch)
                    .context("Followup embeds error")?
                    .await
                    .context("Failed to send followup embeds")?;
            }
        },
    }

    Ok(())
}

/// Split embeds into groups that fit into a single message each, preserving order.
pub fn embed_batches(embeds: Vec<Embed>) -> Vec<Vec<Embed>> {
    let mut batches = Vec::new();
    let mut batch = Vec::new();
    let mut batch_len = 0;

    for embed in embeds {
        let len = embed_text_len(&embed);

        if !batch.is_empty()
            && (batch.len() >= EMBEDS_PER_MESSAGE || batch_len + len > EMBED_TEXT_PER_MESSAGE)
        {
            batches.push(std::mem::take(&mut batch));
            batch_len = 0;
        }

        batch_len += len;
        batch.push(embed);
    }

    if !batch.is_empty() {
        batches.push(batch);
    }

    batches
}

/// Length of all the text in an embed that counts towards the message limit.
fn embed_text_len(embed: &Embed) -> usize {
    let opt = |s: &Option<String>| s.as_deref().map_or(0, utils::text_len);

    opt(&embed.title)
        + opt(&embed.description)
        + embed.author.as_ref().map_or(0, |a| utils::text_len(&a.name))
        + embed.footer.as_ref().map_or(0, |f| utils::text_len(&f.text))
        + embed
            .fields
            .iter()
            .map(|f| utils::text_len(&f.name) + utils::text_len(&f.value))
            .sum::<usize>()
}

/// Find the used subcommand and collect its arguments.
pub fn route<'a>(
    base: &'a BaseCommand,
    options: &[CommandDataOption],
) -> CommandResult<(&'a SubCommand, Args)> {
    let [opt] = options else {
        return Err(CommandError::UnexpectedArgs(format!(
            "Expected a single subcommand, got {} options",
            options.len()
        )));
    };

    let CommandOptionValue::SubCommand(values) = &opt.value else {
        return Err(CommandError::UnexpectedArgs(format!(
            "Option '{}' is not a subcommand",
            opt.name
        )));
    };

    let sub = base.find_sub(&opt.name).ok_or_else(|| {
        CommandError::NotFound(format!(
            "Subcommand '{}' of '{}' does not exist",
            opt.name, base.name
        ))
    })?;

    let args = values
        .iter()
        .map(|o| {
            let value = ArgValue::try_from(o.value.clone()).map_err(|e| {
                CommandError::UnexpectedArgs(format!(
                    "Could not process argument '{}': {e}",
                    o.name
                ))
            })?;

            Ok(Arg {
                name: o.name.to_owned(),
                value,
            })
        })
        .collect::<CommandResult<Vec<_>>>()?;

    Ok((sub, Args::from(args)))
}

async fn process_slash(
    ctx: &Context,
    base: Arc<BaseCommand>,
    inter: Arc<Interaction>,
    data: Arc<CommandData>,
) -> CommandResult {
    let (sub, args) = route(&base, &data.options)?;
    let call = sub.handler().call(
        ctx.to_owned(),
        SlashRequest::new(Arc::clone(&base), inter, Arc::clone(&data), args),
    );

    call.await
}

#[cfg(test)]
mod tests {
    use twilight_model::application::interaction::InteractionType;
    use twilight_model::id::Id;
    use twilight_util::builder::embed::EmbedBuilder;

    use super::*;
    use crate::commands::builder::{command, string, sub};
    use crate::commands::function::mock;

    async fn echo(_ctx: Context, req: SlashRequest) -> CommandResult {
        Ok(Response::Message(req.args.string("text")?.to_owned()))
    }

    fn base() -> BaseCommand {
        command("root", "Root.")
            .sub(sub("name", "Name.", mock::slash))
            .sub(sub("echo", "Echo.", echo).arg(string("text", "Text.").required()))
    }

    fn option(name: &str, value: CommandOptionValue) -> CommandDataOption {
        CommandDataOption {
            name: name.to_string(),
            value,
        }
    }

    fn echo_options(text: &str) -> Vec<CommandDataOption> {
        vec![option(
            "echo",
            CommandOptionValue::SubCommand(vec![option(
                "text",
                CommandOptionValue::String(text.to_string()),
            )]),
        )]
    }

    #[allow(deprecated)]
    fn interaction() -> Interaction {
        Interaction {
            app_permissions: None,
            application_id: Id::new(1),
            channel: None,
            channel_id: None,
            data: None,
            guild_id: Some(Id::new(2)),
            guild_locale: None,
            id: Id::new(3),
            kind: InteractionType::ApplicationCommand,
            locale: None,
            member: None,
            message: None,
            token: "token".to_string(),
            user: None,
        }
    }

    #[test]
    fn route_to_subcommand() {
        let base = base();
        let (sub, args) = route(&base, &echo_options("hi")).unwrap();

        assert_eq!(sub.name, "echo");
        assert_eq!(args.string("text").unwrap(), "hi");
    }

    #[test]
    fn route_errors() {
        let base = base();

        assert!(matches!(
            route(&base, &[]),
            Err(CommandError::UnexpectedArgs(_))
        ));
        assert!(matches!(
            route(&base, &[option("nope", CommandOptionValue::SubCommand(Vec::new()))]),
            Err(CommandError::NotFound(_))
        ));
        assert!(matches!(
            route(&base, &[option("echo", CommandOptionValue::String("hi".to_string()))]),
            Err(CommandError::UnexpectedArgs(_))
        ));
    }

    #[tokio::test]
    async fn handler_receives_arguments() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = Context::for_tests(temp.path()).unwrap();

        let data = CommandData {
            guild_id: Some(Id::new(2)),
            id: Id::new(4),
            name: "root".to_string(),
            kind: CommandType::ChatInput,
            options: echo_options("hello"),
            resolved: None,
            target_id: None,
        };

        let result = process_slash(
            &ctx,
            Arc::new(base()),
            Arc::new(interaction()),
            Arc::new(data),
        )
        .await;

        assert_eq!(result.unwrap(), Response::Message("hello".to_string()));
    }

    fn embed(description_len: usize) -> Embed {
        EmbedBuilder::new()
            .title("Title")
            .description("x".repeat(description_len))
            .build()
    }

    #[test]
    fn small_embeds_share_a_message() {
        let batches = embed_batches(vec![embed(10), embed(10), embed(10)]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn embed_count_limit() {
        let batches = embed_batches((0..23).map(|_| embed(1)).collect());
        let lens: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![10, 10, 3]);
    }

    #[test]
    fn embed_text_limit() {
        // Each embed is 5 + 2048 long, only two fit into 6000.
        let embeds: Vec<_> = (0..5).map(|_| embed(2048)).collect();
        let batches = embed_batches(embeds.clone());
        let lens: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 2, 1]);

        // Order is preserved.
        assert_eq!(batches.concat(), embeds);
    }

    #[test]
    fn no_embeds_no_batches() {
        assert!(embed_batches(Vec::new()).is_empty());
    }
}
