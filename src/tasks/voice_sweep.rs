use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use super::TaskHandler;
use crate::db::decode_id;
use crate::voicemaster::{save_channels, OwnerMap};
use crate::{Data, Error};

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Reaps temporary voice channels that were left empty while the bot was
/// offline, which the voice state handler could not observe.
#[derive(Debug, Default)]
pub struct VoiceSweepTask;

impl VoiceSweepTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskHandler for VoiceSweepTask {
    fn name(&self) -> &'static str {
        "voice_sweep"
    }

    async fn run(&mut self, ctx: &serenity::Context, data: Data) -> Result<(), Error> {
        let mut interval = time::interval(SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let rows: Vec<(i64, sqlx::types::Json<OwnerMap>)> =
                sqlx::query_as("SELECT guild_id, voice_channels FROM voicemaster")
                    .fetch_all(&data.db)
                    .await?;

            for (guild_raw, channels) in rows {
                let guild_id = serenity::GuildId::new(decode_id(guild_raw));

                let lock = data.voice_locks.get(guild_id);
                let _guard = lock.lock().await;

                let mut channels = channels.0;
                let mut doomed: Vec<serenity::ChannelId> = Vec::new();
                {
                    let Some(guild) = ctx.cache.guild(guild_id) else {
                        continue;
                    };
                    for key in channels.keys() {
                        let Ok(id) = key.parse::<u64>() else {
                            continue;
                        };
                        let channel_id = serenity::ChannelId::new(id);
                        let occupied = guild
                            .voice_states
                            .values()
                            .any(|state| state.channel_id == Some(channel_id));
                        if !occupied {
                            doomed.push(channel_id);
                        }
                    }
                }

                if doomed.is_empty() {
                    continue;
                }
                info!("sweeping {} empty temp channels in {guild_id}", doomed.len());
                for channel_id in doomed {
                    channels.remove(&channel_id.to_string());
                    let _ = channel_id.delete(&ctx.http).await;
                }
                save_channels(&data.db, guild_id, &channels).await?;
            }
        }
    }
}
