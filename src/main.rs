mod antinuke;
mod commands;
mod config;
mod db;
mod error;
mod events;
mod locks;
mod paginator;
mod reply;
mod tasks;
mod template;
mod voicemaster;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tracing_subscriber::EnvFilter;

use antinuke::Antinuke;
use config::Config;
use events::event_handler;
use locks::KeyedLocks;
use tasks::{presence::PresenceTask, voice_sweep::VoiceSweepTask, TaskManager};

#[derive(Clone)]
pub struct Data {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub antinuke: Arc<Antinuke>,
    pub voice_locks: Arc<KeyedLocks<serenity::GuildId>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {error:?}"),
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                "Command `{}` failed: {error}",
                ctx.command().qualified_name
            );
            let _ = reply::alert(ctx, format!("Something went wrong: {error}")).await;
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            let message = error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "You cannot use this command".to_string());
            let _ = reply::alert(ctx, message).await;
        }
        poise::FrameworkError::ArgumentParse { input, ctx, .. } => {
            let message = match input {
                Some(input) => format!("Could not parse `{input}`"),
                None => "Missing or invalid arguments".to_string(),
            };
            let _ = reply::alert(ctx, message).await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Arc::new(Config::load()?);
    let pool = db::connect(&config.database_url).await?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let data = Data {
        db: pool,
        config: config.clone(),
        antinuke: Arc::new(Antinuke::new()),
        voice_locks: Arc::new(KeyedLocks::new()),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.default_prefix.clone()),
                dynamic_prefix: Some(|ctx| {
                    Box::pin(async move {
                        let Some(guild_id) = ctx.guild_id else {
                            return Ok(None);
                        };
                        let row: Option<(String,)> =
                            sqlx::query_as("SELECT prefix FROM prefixes WHERE guild_id = $1")
                                .bind(db::encode_id(guild_id.get()))
                                .fetch_optional(&ctx.data.db)
                                .await?;
                        Ok(row.map(|(prefix,)| prefix))
                    })
                }),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let mut task_manager = TaskManager::new();
                task_manager.register_task(PresenceTask::new());
                task_manager.register_task(VoiceSweepTask::new());
                task_manager.run_all(ctx, data.clone());

                Ok(data)
            })
        })
        .build();

    serenity::ClientBuilder::new(config.token.clone(), intents)
        .framework(framework)
        .await?
        .start()
        .await?;

    Ok(())
}
