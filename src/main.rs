use pingcord::commands::{activity, help, pings, reactions};
use pingcord::store::Stores;
use pingcord::{config::Config, ingest, retention, Data};
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                help::help(),
                pings::rolecounts(),
                pings::leaderboard(),
                pings::mycounts(),
                pings::resetcounts(),
                pings::resetmycounts(),
                pings::cleanup(),
                activity::activitychart(),
                activity::heatmap(),
                activity::topchannels(),
                activity::topusers(),
                activity::distribution(),
                activity::pingratio(),
                activity::inactive(),
                reactions::setrankroles(),
                reactions::rankroles(),
                reactions::resetreactions(),
            ],
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    match event {
                        serenity::FullEvent::Message { new_message } => {
                            let event = ingest::message_event(ctx, new_message);
                            ingest::record_message(&data.stores, &event);
                        }
                        serenity::FullEvent::ReactionAdd { add_reaction } => {
                            match ingest::reaction_event(ctx, add_reaction).await {
                                Ok(event) => ingest::record_reaction(&data.stores, &event),
                                Err(e) => warn!("Failed to resolve reaction event: {}", e),
                            }
                        }
                        _ => {}
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                let stores = Stores::from_config(&config);
                stores.ensure_shared()?;

                // First sweep runs immediately, then every 24 hours
                tokio::spawn(retention::start_retention_task(
                    stores.clone(),
                    config.retention_days,
                ));

                Ok(Data { config, stores })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
