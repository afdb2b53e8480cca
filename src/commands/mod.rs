use poise::serenity_prelude as serenity;

use crate::db::encode_id;
use crate::{Context, Data, Error};

pub mod antinuke;
pub mod configuration;
pub mod moderation;
pub mod voicemaster;

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        antinuke::antinuke(),
        configuration::prefix(),
        configuration::fakepermissions(),
        configuration::welcome(),
        configuration::goodbye(),
        moderation::ban(),
        moderation::unban(),
        moderation::kick(),
        moderation::mute(),
        moderation::unmute(),
        moderation::warn(),
        moderation::warns(),
        moderation::clearwarns(),
        moderation::lock(),
        moderation::unlock(),
        moderation::nickname(),
        moderation::forcenickname(),
        moderation::jail(),
        moderation::unjail(),
        moderation::setup(),
        moderation::reset(),
        moderation::role(),
        moderation::purge(),
        voicemaster::voicemaster(),
        voicemaster::voice(),
        voicemaster::interface(),
    ]
}

/// Guild permissions of the command author, computed from the cache.
fn real_permissions(ctx: &Context<'_>, member: &serenity::Member) -> serenity::Permissions {
    ctx.guild()
        .map(|guild| guild.member_permissions(member))
        .unwrap_or_default()
}

/// True when the author holds `required`, either for real or through a
/// fake-permission grant on one of their roles.
pub async fn author_has(
    ctx: Context<'_>,
    required: serenity::Permissions,
) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };

    let owner_id = ctx.guild().map(|guild| guild.owner_id);
    if owner_id == Some(member.user.id) {
        return Ok(true);
    }

    let real = real_permissions(&ctx, &member);
    if real.administrator() || real.contains(required) {
        return Ok(true);
    }

    let role_ids: Vec<i64> = member.roles.iter().map(|r| encode_id(r.get())).collect();
    if role_ids.is_empty() {
        return Ok(false);
    }

    let rows: Vec<(Vec<String>,)> = sqlx::query_as(
        "SELECT permissions FROM fakeperms WHERE guild_id = $1 AND role_id = ANY($2)",
    )
    .bind(encode_id(guild_id.get()))
    .bind(&role_ids)
    .fetch_all(&ctx.data().db)
    .await?;

    let mut fake = serenity::Permissions::empty();
    for (names,) in rows {
        for name in names {
            if let Some(permission) = serenity::Permissions::from_name(&name.to_uppercase()) {
                fake |= permission;
            }
        }
    }
    Ok(fake.administrator() || fake.contains(required))
}

macro_rules! permission_check {
    ($name:ident, $permission:ident) => {
        pub async fn $name(ctx: Context<'_>) -> Result<bool, Error> {
            author_has(ctx, serenity::Permissions::$permission).await
        }
    };
}

permission_check!(is_admin, ADMINISTRATOR);
permission_check!(can_ban, BAN_MEMBERS);
permission_check!(can_kick, KICK_MEMBERS);
permission_check!(can_moderate, MODERATE_MEMBERS);
permission_check!(can_manage_messages, MANAGE_MESSAGES);
permission_check!(can_manage_channels, MANAGE_CHANNELS);
permission_check!(can_manage_roles, MANAGE_ROLES);
permission_check!(can_manage_guild, MANAGE_GUILD);
permission_check!(can_manage_nicknames, MANAGE_NICKNAMES);

/// Only the actual guild owner passes.
pub async fn server_owner_check(ctx: Context<'_>) -> Result<bool, Error> {
    let owner_id = ctx.guild().map(|guild| guild.owner_id);
    if owner_id == Some(ctx.author().id) {
        Ok(true)
    } else {
        Err("Only the **server owner** can use this command".into())
    }
}

/// Guild owner, or anyone promoted with `antinuke owner`.
pub async fn antinuke_owner_check(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let owner_id = ctx.guild().map(|guild| guild.owner_id);
    if owner_id == Some(ctx.author().id) {
        return Ok(true);
    }

    let row: Option<(Vec<i64>,)> = sqlx::query_as("SELECT owners FROM antinuke WHERE guild_id = $1")
        .bind(encode_id(guild_id.get()))
        .fetch_optional(&ctx.data().db)
        .await?;
    let allowed = row
        .map(|(owners,)| owners.contains(&encode_id(ctx.author().id.get())))
        .unwrap_or(false);
    if allowed {
        Ok(true)
    } else {
        Err("Only **antinuke owners** can use this command".into())
    }
}
