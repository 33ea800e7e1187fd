use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use twilight_model::channel::message::component::Component;
use twilight_model::channel::message::Embed;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::commands::prelude::*;
use crate::config::GlobalSettings;
use crate::utils::consts::ERROR_COLOR;
use crate::utils::prelude::*;

pub mod backend;
pub mod overview;
pub mod setup;

use backend::{Backend, SendError};

use setup::MAX_PAIRS;

const ROLE_OPTIONS: [&str; MAX_PAIRS] = ["role1", "role2", "role3", "role4", "role5"];
const LABEL_OPTIONS: [&str; MAX_PAIRS] = ["label1", "label2", "label3", "label4", "label5"];

const ROLE_DESCRIPTIONS: [&str; MAX_PAIRS] = [
    "First role ID",
    "Second role ID",
    "Third role ID",
    "Fourth role ID",
    "Fifth role ID",
];

const LABEL_DESCRIPTIONS: [&str; MAX_PAIRS] = [
    "Emoji for first button",
    "Emoji for second button",
    "Emoji for third button",
    "Emoji for fourth button",
    "Emoji for fifth button",
];

const NOT_MANAGER: &str = "❌ Only the **server owner** or **bot managers** can use this command.";
const MISSING_PERMISSION: &str = "You do not have permission.";
const NO_PAIRS: &str = "You must provide at least one role and emoji.";
const CREATED: &str = "✅ Reaction role message created!";
const NO_SETUPS: &str = "No setups found.";

#[derive(Debug, Error)]
pub enum ReactionRoleError {
    /// Caller is neither the guild owner nor a bot manager.
    #[error("Caller is not the guild owner or a bot manager")]
    NotManager,

    /// Caller lacks the permission to manage channels.
    #[error("Caller cannot manage channels")]
    MissingPermission,

    /// No complete role and label pair was given.
    #[error("No role and label pairs")]
    NoPairs,

    /// A role could not be parsed.
    #[error("Invalid role: '{0}'")]
    InvalidRole(String),

    /// Discord or storage failure.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ReactionRoleError {
    /// Convert the error to a private reply, or pass transport errors on.
    pub fn into_response(self) -> CommandResult {
        match self {
            Self::NotManager => Ok(Response::Message(NOT_MANAGER.to_string())),
            Self::MissingPermission => Ok(Response::Embeds(vec![EmbedBuilder::new()
                .description(MISSING_PERMISSION)
                .color(ERROR_COLOR)
                .build()])),
            Self::NoPairs => Ok(Response::Message(NO_PAIRS.to_string())),
            Self::InvalidRole(role) => Ok(Response::Message(format!(
                "`{role}` is not a valid role. Use a role ID or mention."
            ))),
            Self::Transport(e) => Err(CommandError::Other(e)),
        }
    }
}

/// Collapse a command outcome into a framework result.
fn reply(result: Result<Response, ReactionRoleError>) -> CommandResult {
    result.or_else(|e| {
        debug!("Reaction-role command refused: {e}");
        e.into_response()
    })
}

/// Allow only the guild owner or a bot manager.
pub fn check_manager(
    caller: Id<UserMarker>,
    owner: Id<UserMarker>,
    managers: &HashSet<Id<UserMarker>>,
) -> Result<(), ReactionRoleError> {
    if caller == owner || managers.contains(&caller) {
        Ok(())
    } else {
        Err(ReactionRoleError::NotManager)
    }
}

/// Require the channel management permission.
pub fn check_permissions(permissions: Option<Permissions>) -> Result<(), ReactionRoleError> {
    match permissions {
        Some(p) if p.contains(Permissions::MANAGE_CHANNELS) => Ok(()),
        Some(p) if p.contains(Permissions::ADMINISTRATOR) => Ok(()),
        _ => Err(ReactionRoleError::MissingPermission),
    }
}

/// Command: Set up or view reaction-role messages.
pub struct ReactionRole;

impl ReactionRole {
    pub fn command() -> BaseCommand {
        use crate::commands::builder::*;

        let mut set = sub("set", "Set up a reaction role message", Set::slash)
            .arg(string("title", "Embed title").required().max_length(256))
            .arg(
                string("description", "Embed description")
                    .required()
                    .max_length(3500),
            )
            .arg(
                channel("channel", "Target channel")
                    .required()
                    .types([ChannelType::GuildText, ChannelType::GuildAnnouncement]),
            );

        let roles = ROLE_OPTIONS.into_iter().zip(ROLE_DESCRIPTIONS);
        let labels = LABEL_OPTIONS.into_iter().zip(LABEL_DESCRIPTIONS);

        for (i, ((role, role_desc), (label, label_desc))) in roles.zip(labels).enumerate() {
            let role = string(role, role_desc).max_length(32);
            let label = string(label, label_desc).max_length(64);

            // Only the first pair is required.
            set = match i {
                0 => set.arg(role.required()).arg(label.required()),
                _ => set.arg(role).arg(label),
            };
        }

        command("setreactionrole", "Set up or view a reaction role message")
            .permissions(Permissions::MANAGE_CHANNELS)
            .sub(set)
            .sub(sub(
                "view",
                "View reaction role setups for this server",
                View::slash,
            ))
    }
}

/// Check that the caller is the guild owner or a bot manager.
async fn authorize(
    host: &impl Backend,
    guild_id: Id<GuildMarker>,
    caller: Id<UserMarker>,
) -> Result<(), ReactionRoleError> {
    let owner_id = host.guild_owner(guild_id).await?;
    let managers = host.bot_managers(guild_id)?;

    check_manager(caller, owner_id, &managers).map_err(|e| {
        debug!("User '{caller}' denied reaction-roles access in guild '{guild_id}'");
        e
    })
}

/// Command: Publish a new reaction-role message.
pub struct Set;

/// Raw `set` inputs.
struct SetArgs {
    title: String,
    description: String,
    channel_id: Id<ChannelMarker>,
    slots: Vec<(Option<String>, Option<String>)>,
}

impl SetArgs {
    fn from_args(args: &Args) -> CommandResult<Self> {
        let slots = ROLE_OPTIONS
            .iter()
            .zip(LABEL_OPTIONS)
            .map(|(role, label)| {
                (
                    args.optional_string(role).map(ToOwned::to_owned),
                    args.optional_string(label).map(ToOwned::to_owned),
                )
            })
            .collect();

        Ok(Self {
            title: args.string("title")?.to_owned(),
            description: args.string("description")?.to_owned(),
            channel_id: args.channel("channel")?,
            slots,
        })
    }
}

impl Set {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let guild_id = req.guild_id()?;
        let caller = req.author_id()?;
        let args = SetArgs::from_args(&req.args)?;

        reply(Self::run(&ctx, guild_id, caller, req.member_permissions(), args).await)
    }

    async fn run(
        host: &impl Backend,
        guild_id: Id<GuildMarker>,
        caller: Id<UserMarker>,
        permissions: Option<Permissions>,
        args: SetArgs,
    ) -> Result<Response, ReactionRoleError> {
        authorize(host, guild_id, caller).await?;
        check_permissions(permissions)?;

        let slots = args
            .slots
            .iter()
            .map(|(role, label)| (role.as_deref(), label.as_deref()));
        let pairs = setup::parse_pairs(args.channel_id, slots)?;

        let embed = setup::setup_embed(&args.title, &args.description, &pairs);
        let components = setup::setup_components(&pairs);
        let settings = host.global_settings()?;

        let message_id = publish(host, args.channel_id, &embed, &components, &settings)
            .await
            .context("Failed to send reaction-role message")?;

        let bindings = setup::bindings(guild_id, args.channel_id, message_id, &pairs);
        let count = bindings.len();

        if let Err(e) = host.store_bindings(guild_id, bindings) {
            // Nothing was stored, so take the message down too.
            if let Err(delete) = host.delete_message(args.channel_id, message_id).await {
                error!("Failed to delete unbound reaction-role message '{message_id}': {delete}");
            }
            return Err(e.into());
        }

        info!(
            "Published reaction-role message '{message_id}' in channel '{}' with {count} bindings",
            args.channel_id
        );

        Ok(Response::Message(CREATED.to_string()))
    }
}

/// Send the reaction-role message, retrying failures that allow it as configured.
async fn publish(
    host: &impl Backend,
    channel_id: Id<ChannelMarker>,
    embed: &Embed,
    components: &[Component],
    settings: &GlobalSettings,
) -> AnyResult<Id<MessageMarker>> {
    let mut attempt = 0;

    loop {
        match host.send_message(channel_id, embed, components).await {
            Ok(message_id) => return Ok(message_id),
            Err(SendError::Retryable(e)) if attempt < settings.send_retries => {
                attempt += 1;
                warn!("Failed to send reaction-role message (attempt {attempt}): {e:?}");
                tokio::time::sleep(Duration::from_millis(settings.retry_delay_ms)).await;
            },
            Err(e) => return Err(e.into_inner()),
        }
    }
}

/// Command: List reaction-role messages of the guild.
pub struct View;

impl View {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let guild_id = req.guild_id()?;
        let caller = req.author_id()?;

        reply(Self::run(&ctx, guild_id, caller).await)
    }

    async fn run(
        host: &impl Backend,
        guild_id: Id<GuildMarker>,
        caller: Id<UserMarker>,
    ) -> Result<Response, ReactionRoleError> {
        authorize(host, guild_id, caller).await?;

        let bindings = host.bindings(guild_id)?;
        let visible = host.visible_channels(guild_id).await?;
        let embeds = overview::overview_embeds(&bindings, &visible);

        if embeds.is_empty() {
            return Ok(Response::Message(NO_SETUPS.to_string()));
        }

        Ok(Response::Embeds(embeds))
    }
}
