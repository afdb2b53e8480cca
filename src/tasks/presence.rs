use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ActivityData, OnlineStatus};
use tokio::time::{self, MissedTickBehavior};

use super::TaskHandler;
use crate::{Data, Error};

const ROTATE_INTERVAL: Duration = Duration::from_secs(120);

/// Rotates the bot's presence between a few status lines.
#[derive(Debug, Default)]
pub struct PresenceTask {
    index: usize,
}

impl PresenceTask {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskHandler for PresenceTask {
    fn name(&self) -> &'static str {
        "presence"
    }

    async fn run(&mut self, ctx: &serenity::Context, data: Data) -> Result<(), Error> {
        let mut interval = time::interval(ROTATE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let guilds = ctx.cache.guilds().len();
            let activity = match self.index % 2 {
                0 => ActivityData::watching(format!("{guilds} servers")),
                _ => ActivityData::listening(format!(
                    "{}help",
                    data.config.default_prefix
                )),
            };
            ctx.set_presence(Some(activity), OnlineStatus::Idle);
            self.index = self.index.wrapping_add(1);
        }
    }
}
