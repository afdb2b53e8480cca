//! Join-to-create temporary voice channels.
//!
//! One hub channel per guild; joining it clones a personal channel into the
//! hub's category and moves the member over. The temp-channel → owner map
//! lives in a JSONB column. Voice state churn is serialized per guild so
//! two joins cannot both pass the category-size check.

use std::collections::HashMap;

use poise::serenity_prelude as serenity;
use sqlx::PgPool;
use tracing::warn;

use crate::db::{decode_id, encode_id};
use crate::error::Result;
use crate::Data;

const MAX_CATEGORY_CHANNELS: usize = 50;

pub type OwnerMap = HashMap<String, i64>;

#[derive(Debug, sqlx::FromRow)]
pub struct VoicemasterRow {
    #[allow(dead_code)]
    pub guild_id: i64,
    pub channel_id: i64,
    pub voice_channels: sqlx::types::Json<OwnerMap>,
}

impl VoicemasterRow {
    pub async fn fetch(db: &PgPool, guild_id: serenity::GuildId) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, Self>("SELECT * FROM voicemaster WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub fn hub(&self) -> serenity::ChannelId {
        serenity::ChannelId::new(decode_id(self.channel_id))
    }

    pub fn owner_of(&self, channel: serenity::ChannelId) -> Option<serenity::UserId> {
        self.voice_channels
            .0
            .get(&channel.to_string())
            .map(|id| serenity::UserId::new(decode_id(*id)))
    }
}

pub async fn save_channels(
    db: &PgPool,
    guild_id: serenity::GuildId,
    channels: &OwnerMap,
) -> Result<()> {
    sqlx::query("UPDATE voicemaster SET voice_channels = $1 WHERE guild_id = $2")
        .bind(sqlx::types::Json(channels))
        .bind(encode_id(guild_id.get()))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_owner(
    db: &PgPool,
    guild_id: serenity::GuildId,
    channel: serenity::ChannelId,
    owner: serenity::UserId,
) -> Result<()> {
    let Some(row) = VoicemasterRow::fetch(db, guild_id).await? else {
        return Ok(());
    };
    let mut channels = row.voice_channels.0;
    channels.insert(channel.to_string(), encode_id(owner.get()));
    save_channels(db, guild_id, &channels).await
}

/// React to a voice state change: spawn a personal channel on hub joins,
/// reap empty temp channels on leaves.
pub async fn handle_voice_update(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) -> Result<()> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let before = old.and_then(|state| state.channel_id);
    if before == new.channel_id {
        return Ok(());
    }

    let db = &data.db;
    // Cheap probe so unconfigured guilds never allocate a lock.
    if VoicemasterRow::fetch(db, guild_id).await?.is_none() {
        return Ok(());
    }

    let lock = data.voice_locks.get(guild_id);
    let _guard = lock.lock().await;

    let Some(row) = VoicemasterRow::fetch(db, guild_id).await? else {
        return Ok(());
    };
    let hub = row.hub();
    let mut channels = row.voice_channels.0;

    if new.channel_id == Some(hub) {
        create_personal_channel(ctx, db, guild_id, hub, new, &mut channels).await?;
    }

    if let Some(before) = before {
        if before != hub && channels.contains_key(&before.to_string()) {
            let empty = {
                let Some(guild) = ctx.cache.guild(guild_id) else {
                    return Ok(());
                };
                !guild
                    .voice_states
                    .values()
                    .any(|state| state.channel_id == Some(before))
            };
            if empty {
                channels.remove(&before.to_string());
                save_channels(db, guild_id, &channels).await?;
                if let Err(e) = before.delete(&ctx.http).await {
                    warn!("failed to delete temporary channel {before} in {guild_id}: {e}");
                }
            }
        }
    }

    Ok(())
}

async fn create_personal_channel(
    ctx: &serenity::Context,
    db: &PgPool,
    guild_id: serenity::GuildId,
    hub: serenity::ChannelId,
    state: &serenity::VoiceState,
    channels: &mut OwnerMap,
) -> Result<()> {
    let user_id = state.user_id;

    let (parent, category_full, display_name) = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Ok(());
        };
        let parent = guild.channels.get(&hub).and_then(|c| c.parent_id);
        let category_full = parent
            .map(|p| {
                guild
                    .channels
                    .values()
                    .filter(|c| c.parent_id == Some(p))
                    .count()
                    >= MAX_CATEGORY_CHANNELS
            })
            .unwrap_or(false);
        let display_name = guild
            .members
            .get(&user_id)
            .map(|m| m.display_name().to_string());
        (parent, category_full, display_name)
    };

    if category_full {
        let _ = guild_id.disconnect_member(&ctx.http, user_id).await;
        return Ok(());
    }

    let display_name = match display_name.or_else(|| {
        state
            .member
            .as_ref()
            .map(|m| m.display_name().to_string())
    }) {
        Some(name) => name,
        None => return Ok(()),
    };

    let mut builder = serenity::CreateChannel::new(format!("{display_name}'s channel"))
        .kind(serenity::ChannelType::Voice)
        .audit_log_reason("Creating a temporary channel");
    if let Some(parent) = parent {
        builder = builder.category(parent);
    }
    let channel = guild_id.create_channel(&ctx.http, builder).await?;

    channels.insert(channel.id.to_string(), encode_id(user_id.get()));
    save_channels(db, guild_id, channels).await?;

    if guild_id
        .move_member(&ctx.http, user_id, channel.id)
        .await
        .is_err()
    {
        channels.remove(&channel.id.to_string());
        save_channels(db, guild_id, channels).await?;
        let _ = channel.delete(&ctx.http).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(channels: OwnerMap) -> VoicemasterRow {
        VoicemasterRow {
            guild_id: 1,
            channel_id: 100,
            voice_channels: sqlx::types::Json(channels),
        }
    }

    #[test]
    fn owner_lookup_uses_string_keys() {
        let mut channels = OwnerMap::new();
        channels.insert("555".into(), 42);
        let row = row(channels);

        assert_eq!(
            row.owner_of(serenity::ChannelId::new(555)),
            Some(serenity::UserId::new(42))
        );
        assert_eq!(row.owner_of(serenity::ChannelId::new(556)), None);
    }

    #[test]
    fn hub_round_trips_snowflake() {
        let row = row(OwnerMap::new());
        assert_eq!(row.hub(), serenity::ChannelId::new(100));
    }

    #[test]
    fn owner_map_serializes_as_json_object() {
        let mut channels = OwnerMap::new();
        channels.insert("123".into(), 456);
        let json = serde_json::to_value(&channels).unwrap();
        assert_eq!(json["123"], 456);
    }
}
