use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::{env, fs};

use tracing_subscriber::EnvFilter;
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::{CloseFrame, Event, Intents, Shard, ShardId};
use twilight_http::client::InteractionClient;
use twilight_http::Client;
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::gateway::payload::incoming::Ready;
use twilight_model::guild::Guild;
use twilight_model::oauth::Application;

use crate::commands::Commands;
use crate::config::BotConfig;
use crate::utils::prelude::*;

mod commands;
mod config;
mod utils;

/// Default data directory, if `BOT_DATA_DIR` is not set.
const DEFAULT_DATA_DIR: &str = "./data/";

#[derive(Debug, Clone)]
pub struct Context {
    /// Bot configuration.
    config: Arc<BotConfig>,
    /// Bot commands list.
    commands: Arc<Commands>,
    /// Application http client.
    http: Arc<Client>,
    /// Application information.
    application: Arc<Application>,
    /// Caching of events.
    cache: Arc<InMemoryCache>,
}

impl Context {
    /// Returns the interaction client of the application.
    fn interaction(&self) -> InteractionClient<'_> {
        self.http.interaction(self.application.id)
    }

    /// Offline context with storage in `data_dir`.
    #[cfg(test)]
    fn for_tests(data_dir: &std::path::Path) -> AnyResult<Self> {
        let application = Application {
            bot_public: false,
            bot_require_code_grant: false,
            cover_image: None,
            custom_install_url: None,
            description: String::new(),
            guild_id: None,
            flags: None,
            icon: None,
            id: twilight_model::id::Id::new(1),
            install_params: None,
            name: "test".to_string(),
            owner: None,
            primary_sku_id: None,
            privacy_policy_url: None,
            rpc_origins: Vec::new(),
            slug: None,
            tags: None,
            team: None,
            terms_of_service_url: None,
            verify_key: String::new(),
        };

        Ok(Self {
            config: Arc::new(BotConfig::new(data_dir)?),
            commands: Arc::new(Commands::default()),
            http: Arc::new(Client::new(String::new())),
            application: Arc::new(application),
            cache: Arc::new(InMemoryCache::new()),
        })
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    // Load environment variables from `./.env` file, if any exists.
    simple_env_load::load_env_from(&[".env"]);

    let data_dir = env::var("BOT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

    // Create data folder if it doesn't exist yet.
    fs::create_dir_all(&data_dir).context("Failed to create data folder")?;

    // Create a log file or truncate an existing one.
    let logfile = fs::File::create(data_dir.join("log.log")).context("Failed to create log file")?;

    // Initialize the logger to use `RUST_LOG` environment variable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(logfile))
        .compact()
        .init();

    info!("Using data folder '{}'", data_dir.display());

    // Load bot configuration.
    let config = Arc::new(BotConfig::new(&data_dir)?);

    // Get discord bot token from environment variable.
    let token = env::var("DISCORD_TOKEN").context("Expected a token in the environment")?;

    // Create an http client.
    let http = Arc::new(Client::new(token.to_owned()));

    // Get the application info, such as its id and owner.
    let application = Arc::new(
        http.current_user_application()
            .await?
            .model()
            .await
            .context("Failed to get application info")?,
    );

    // Create a cache.
    let cache = Arc::new(InMemoryCache::new());

    // Initialize commands.
    let commands = Arc::new(commands::bot::create_commands()?);

    let ctx = Context {
        config,
        commands,
        http,
        application,
        cache,
    };

    // Register commands to discord.
    let twilight_commands = ctx.commands.twilight_commands()?;
    ctx.interaction()
        .set_global_commands(&twilight_commands)
        .await
        .context("Failed to set global commands")?;

    info!("Registered commands: {}", ctx.commands);

    // Start a gateway connection, a single shard is plenty.
    let mut shard = Shard::new(ShardId::ONE, token, intents());

    // Process each event as they come in.
    loop {
        let next = tokio::select! {
            event = shard.next_event() => Some(event),
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(event) = next else {
            info!("Shutting down by ctrl-c");
            shard.close(CloseFrame::NORMAL).await?;
            break;
        };

        let event = match event {
            Ok(event) => event,
            Err(source) => {
                if source.is_fatal() {
                    error!("Fatal error receiving event: {source:?}");
                    break;
                }
                warn!("Error receiving event: {source:?}");
                continue;
            },
        };

        // Update the cache with the event.
        ctx.cache.update(&event);

        tokio::spawn(handle_event(ctx.clone(), event));
    }

    Ok(())
}

/// Main events handler.
async fn handle_event(ctx: Context, event: Event) {
    let result = match event {
        Event::Ready(r) => handle_ready(&ctx, *r).await,
        Event::GuildCreate(g) => handle_guild_create(&ctx, g.0).await,
        Event::InteractionCreate(i) => handle_interaction_create(&ctx, i.0).await,

        // Other events here...
        event => {
            debug!("Event: {:?}", event.kind());
            Ok(())
        },
    };

    if let Err(e) = result {
        error!("Failed to handle event: {e:?}");
    }
}

async fn handle_ready(_ctx: &Context, ready: Ready) -> AnyResult<()> {
    info!("Ready: '{}'", ready.user.name);

    Ok(())
}

async fn handle_guild_create(_ctx: &Context, guild: Guild) -> AnyResult<()> {
    info!("Guild: '{}'", guild.name);

    Ok(())
}

async fn handle_interaction_create(ctx: &Context, mut inter: Interaction) -> AnyResult<()> {
    match inter.data.take() {
        Some(InteractionData::ApplicationCommand(data)) => {
            commands::handle::application_command(ctx, inter, *data)
                .await
                .context("Failed to handle application command")?;
        },
        other => {
            debug!("Unhandled interaction '{:?}': {other:?}", inter.kind);
        },
    }

    Ok(())
}

fn intents() -> Intents {
    #[cfg(feature = "all-intents")]
    return Intents::all();

    #[cfg(not(feature = "all-intents"))]
    Intents::GUILDS
}
