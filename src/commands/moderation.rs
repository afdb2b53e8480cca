use std::time::Duration;

use poise::serenity_prelude::{self as serenity, Mentionable};

use crate::db::{decode_id, encode_id};
use crate::paginator;
use crate::reply;
use crate::{Context, Error};

const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 3600);
const NOT_SETUP: &str = "You don't have moderation configured yet!";

#[derive(Debug, sqlx::FromRow)]
struct ModerationRow {
    #[allow(dead_code)]
    guild_id: i64,
    role_id: i64,
    channel_id: i64,
    jail_id: i64,
    category_id: i64,
}

async fn fetch_moderation(
    db: &sqlx::PgPool,
    guild_id: serenity::GuildId,
) -> Result<Option<ModerationRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM moderation WHERE guild_id = $1")
        .bind(encode_id(guild_id.get()))
        .fetch_optional(db)
        .await
}

/// Whether the bot outranks `member` and the member is not the guild owner.
fn punishable(ctx: &Context<'_>, member: &serenity::Member) -> bool {
    let bot_id = ctx.cache().current_user().id;
    let Some(guild) = ctx.guild() else {
        return false;
    };
    if member.user.id == guild.owner_id {
        return false;
    }
    let bot_top = guild
        .members
        .get(&bot_id)
        .and_then(|m| guild.member_highest_role(m))
        .map(|r| r.position)
        .unwrap_or_default();
    let member_top = guild
        .member_highest_role(member)
        .map(|r| r.position)
        .unwrap_or_default();
    member_top < bot_top
}

/// Split a member's roles into the ones the bot can reassign later and the
/// ones it must leave alone (managed, or at/above the bot's top role).
fn partition_roles(
    ctx: &Context<'_>,
    member: &serenity::Member,
) -> (Vec<serenity::RoleId>, Vec<serenity::RoleId>) {
    let bot_id = ctx.cache().current_user().id;
    let Some(guild) = ctx.guild() else {
        return (Vec::new(), member.roles.clone());
    };
    let bot_top = guild
        .members
        .get(&bot_id)
        .and_then(|m| guild.member_highest_role(m))
        .map(|r| r.position)
        .unwrap_or_default();

    member.roles.iter().copied().partition(|id| {
        guild
            .roles
            .get(id)
            .map(|r| !r.managed && r.position < bot_top)
            .unwrap_or(false)
    })
}

fn role_assignable(ctx: &Context<'_>, role: &serenity::Role) -> bool {
    let bot_id = ctx.cache().current_user().id;
    let Some(guild) = ctx.guild() else {
        return false;
    };
    let bot_top = guild
        .members
        .get(&bot_id)
        .and_then(|m| guild.member_highest_role(m))
        .map(|r| r.position)
        .unwrap_or_default();
    !role.managed && role.position < bot_top
}

/// DM the punished member. Failure degrades to a suffix on the reply.
async fn notify_dm(
    ctx: &Context<'_>,
    action: &str,
    user: &serenity::User,
    reason: &str,
) -> Option<&'static str> {
    let guild_info = ctx
        .guild()
        .map(|guild| (guild.name.clone(), guild.icon_url()));
    let (guild_name, guild_icon) = guild_info?;

    let mut title = action.to_string();
    if let Some(first) = title.get_mut(..1) {
        first.make_ascii_uppercase();
    }

    let mut embed = serenity::CreateEmbed::new()
        .color(0xed4245)
        .title(title)
        .description(format!(
            "You have been {action} by **{}** in **{guild_name}**",
            ctx.author().name
        ))
        .field("Reason", reason, false)
        .footer(serenity::CreateEmbedFooter::new(
            "for more about this punishment, please contact a staff member",
        ))
        .timestamp(serenity::Timestamp::now());
    if let Some(icon) = guild_icon {
        embed = embed.thumbnail(icon);
    }

    match user
        .direct_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await
    {
        Ok(_) => None,
        Err(_) => Some("Couldn't DM member"),
    }
}

/// Append a numbered case to the guild's moderation log channel. The
/// counter increments atomically in SQL; failures only log.
pub async fn log_case(ctx: &Context<'_>, target: String, action: &str, reason: &str) {
    let Some(guild_id) = ctx.guild_id() else {
        return;
    };
    let db = &ctx.data().db;

    let channel: Option<(i64,)> =
        match sqlx::query_as("SELECT channel_id FROM moderation WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("failed to look up moderation logs for {guild_id}: {e}");
                return;
            }
        };
    let Some((channel_id,)) = channel else {
        return;
    };

    let case: i64 = match sqlx::query_scalar(
        "INSERT INTO cases (guild_id, count) VALUES ($1, 1) \
         ON CONFLICT (guild_id) DO UPDATE SET count = cases.count + 1 \
         RETURNING count",
    )
    .bind(encode_id(guild_id.get()))
    .fetch_one(db)
    .await
    {
        Ok(case) => case,
        Err(e) => {
            tracing::warn!("failed to bump case counter for {guild_id}: {e}");
            return;
        }
    };

    let embed = serenity::CreateEmbed::new()
        .color(reply::MAIN_COLOR)
        .description(format!(
            "## Case #{case} - {action}\n### Target: {target}\n### Moderator: {} (`{}`)",
            ctx.author().name,
            ctx.author().id
        ))
        .author(
            serenity::CreateEmbedAuthor::new("Logged Entry").icon_url(ctx.author().face()),
        )
        .footer(serenity::CreateEmbedFooter::new(format!("Reason: {reason}")))
        .timestamp(serenity::Timestamp::now());

    if let Err(e) = serenity::ChannelId::new(decode_id(channel_id))
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!("failed to send case log for {guild_id}: {e}");
    }
}

fn target_label(user: &serenity::User) -> String {
    format!("{} (`{}`)", user.name, user.id)
}

/// Ban a member from your guild
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("banish"),
    check = "crate::commands::can_ban"
)]
pub async fn ban(
    ctx: Context<'_>,
    user: serenity::User,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let full_reason = format!("{} - {reason}", ctx.author().name);

    let mut notify = None;
    if let Ok(member) = guild_id.member(ctx.http(), user.id).await {
        if !punishable(&ctx, &member) {
            return reply::alert(ctx, "I cannot punish this member").await;
        }
        if member.premium_since.is_some()
            && !reply::confirm_prompt(
                ctx,
                "This member is a **server booster**. Are you sure you want to **ban** them?",
            )
            .await?
        {
            return Ok(());
        }
        notify = notify_dm(&ctx, "banned", &user, &reason).await;
    }

    guild_id
        .ban_with_reason(ctx.http(), user.id, 0, &full_reason)
        .await?;
    log_case(&ctx, target_label(&user), "Ban", &reason).await;

    match notify {
        Some(note) => ctx.say(format!("👍 - {note}")).await?,
        None => ctx.say("👍").await?,
    };
    Ok(())
}

/// Unban a user
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_ban"
)]
pub async fn unban(ctx: Context<'_>, user: serenity::User) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    guild_id.unban(ctx.http(), user.id).await?;
    log_case(&ctx, target_label(&user), "Unban", "N/A").await;
    reply::confirm(ctx, format!("Unbanned **{}**", user.name)).await
}

/// Kick a member from your guild
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_kick"
)]
pub async fn kick(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let full_reason = format!("{} - {reason}", ctx.author().name);

    if !punishable(&ctx, &member) {
        return reply::alert(ctx, "I cannot punish this member").await;
    }
    if member.premium_since.is_some()
        && !reply::confirm_prompt(
            ctx,
            "This member is a **server booster**. Are you sure you want to **kick** them?",
        )
        .await?
    {
        return Ok(());
    }

    let notify = notify_dm(&ctx, "kicked", &member.user, &reason).await;
    guild_id
        .kick_with_reason(ctx.http(), member.user.id, &full_reason)
        .await?;
    log_case(&ctx, target_label(&member.user), "Kick", &reason).await;

    match notify {
        Some(note) => ctx.say(format!("👍 - {note}")).await?,
        None => ctx.say("👍").await?,
    };
    Ok(())
}

/// Timeout a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("timeout", "tm"),
    check = "crate::commands::can_moderate"
)]
pub async fn mute(
    ctx: Context<'_>,
    mut member: serenity::Member,
    #[description = "For example 5m or 1h"] duration: Option<String>,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let duration = match humantime::parse_duration(duration.as_deref().unwrap_or("5m")) {
        Ok(duration) => duration,
        Err(_) => return reply::alert(ctx, "Invalid duration, try something like `5m` or `1h`").await,
    };
    if duration > MAX_TIMEOUT {
        return reply::alert(ctx, "Timeouts cannot be longer than **28 days**").await;
    }

    let now = chrono::Utc::now().timestamp();
    if member
        .communication_disabled_until
        .is_some_and(|until| until.unix_timestamp() > now)
    {
        return reply::alert(ctx, "This member is already timed out").await;
    }

    let until = serenity::Timestamp::from_unix_timestamp(now + duration.as_secs() as i64)?;
    member
        .disable_communication_until_datetime(ctx.http(), until)
        .await?;

    log_case(&ctx, target_label(&member.user), "Timeout", &reason).await;
    ctx.say("👍").await?;
    Ok(())
}

/// Remove a member's timeout
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("untimeout", "unt"),
    check = "crate::commands::can_moderate"
)]
pub async fn unmute(
    ctx: Context<'_>,
    mut member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let now = chrono::Utc::now().timestamp();
    if !member
        .communication_disabled_until
        .is_some_and(|until| until.unix_timestamp() > now)
    {
        return reply::alert(ctx, "This member is not timed out").await;
    }

    member.enable_communication(ctx.http()).await?;
    log_case(&ctx, target_label(&member.user), "Untimeout", &reason).await;
    ctx.say("👍").await?;
    Ok(())
}

/// Warn a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_manage_messages"
)]
pub async fn warn(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason.unwrap_or_else(|| "N/A".to_string());

    sqlx::query("INSERT INTO warns (guild_id, user_id, reason, created_at) VALUES ($1, $2, $3, NOW())")
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(member.user.id.get()))
        .bind(&reason)
        .execute(&ctx.data().db)
        .await?;

    reply::confirm(
        ctx,
        format!("{} has been warned - **{reason}**", member.mention()),
    )
    .await
}

/// Check a member's warns
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_manage_messages"
)]
pub async fn warns(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let rows: Vec<(String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        "SELECT reason, created_at FROM warns WHERE guild_id = $1 AND user_id = $2 ORDER BY created_at DESC",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(member.user.id.get()))
    .fetch_all(&ctx.data().db)
    .await?;

    if rows.is_empty() {
        return reply::alert(ctx, "This member has no warns").await;
    }

    let lines: Vec<String> = rows
        .iter()
        .map(|(reason, at)| format!("{reason} - <t:{}:R>", at.timestamp()))
        .collect();
    let pages = paginator::chunked_pages(
        &format!("Warns for {} ({})", member.user.name, rows.len()),
        &lines,
        10,
    );
    paginator::paginate(ctx, pages).await
}

/// Clear someone's warns
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_manage_messages"
)]
pub async fn clearwarns(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let deleted = sqlx::query("DELETE FROM warns WHERE guild_id = $1 AND user_id = $2")
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(member.user.id.get()))
        .execute(&ctx.data().db)
        .await?;

    if deleted.rows_affected() == 0 {
        return reply::alert(ctx, "This member has no warns").await;
    }
    reply::confirm(ctx, "Cleared all warns").await
}

fn everyone_overwrite(
    channel: &serenity::GuildChannel,
    everyone: serenity::RoleId,
) -> (serenity::Permissions, serenity::Permissions) {
    channel
        .permission_overwrites
        .iter()
        .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone))
        .map(|o| (o.allow, o.deny))
        .unwrap_or((serenity::Permissions::empty(), serenity::Permissions::empty()))
}

/// Lock a channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_manage_channels"
)]
pub async fn lock(
    ctx: Context<'_>,
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel = match channel {
        Some(channel) => channel,
        None => ctx
            .guild_channel()
            .await
            .ok_or("This command must be used in a server channel")?,
    };

    let everyone = serenity::RoleId::new(guild_id.get());
    let (mut allow, mut deny) = everyone_overwrite(&channel, everyone);
    if deny.contains(serenity::Permissions::SEND_MESSAGES) {
        return reply::alert(ctx, "Channel is already locked").await;
    }
    allow.remove(serenity::Permissions::SEND_MESSAGES);
    deny.insert(serenity::Permissions::SEND_MESSAGES);

    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;
    ctx.say("👍").await?;
    Ok(())
}

/// Unlock a channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_manage_channels"
)]
pub async fn unlock(
    ctx: Context<'_>,
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel = match channel {
        Some(channel) => channel,
        None => ctx
            .guild_channel()
            .await
            .ok_or("This command must be used in a server channel")?,
    };

    let everyone = serenity::RoleId::new(guild_id.get());
    let (mut allow, mut deny) = everyone_overwrite(&channel, everyone);
    if !deny.contains(serenity::Permissions::SEND_MESSAGES) {
        return reply::alert(ctx, "This channel is not locked").await;
    }
    deny.remove(serenity::Permissions::SEND_MESSAGES);
    allow.insert(serenity::Permissions::SEND_MESSAGES);

    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;
    ctx.say("👍").await?;
    Ok(())
}

/// Change a member's nickname
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("nick"),
    check = "crate::commands::can_manage_nicknames"
)]
pub async fn nickname(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] nickname: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    if nickname == "none" {
        guild_id
            .edit_member(
                ctx.http(),
                member.user.id,
                serenity::EditMember::new().nickname(String::new()),
            )
            .await?;
        reply::confirm(ctx, format!("Removed **{}'s** nickname", member.user.name)).await
    } else {
        guild_id
            .edit_member(
                ctx.http(),
                member.user.id,
                serenity::EditMember::new().nickname(nickname.as_str()),
            )
            .await?;
        reply::confirm(
            ctx,
            format!("Changed **{}'s** nickname to {nickname}", member.user.name),
        )
        .await
    }
}

/// Force a nickname on a member, reapplied whenever they change it
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("fn", "forcenick"),
    check = "crate::commands::can_manage_nicknames"
)]
pub async fn forcenickname(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] nickname: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    match nickname {
        Some(nickname) => {
            sqlx::query(
                "INSERT INTO forcenick (guild_id, user_id, nickname) VALUES ($1, $2, $3) \
                 ON CONFLICT (guild_id, user_id) DO UPDATE SET nickname = $3",
            )
            .bind(encode_id(guild_id.get()))
            .bind(encode_id(member.user.id.get()))
            .bind(&nickname)
            .execute(db)
            .await?;

            guild_id
                .edit_member(
                    ctx.http(),
                    member.user.id,
                    serenity::EditMember::new()
                        .nickname(nickname.as_str())
                        .audit_log_reason("Force nickname"),
                )
                .await?;
            reply::confirm(
                ctx,
                format!("Force nicknamed {} to `{nickname}`", member.mention()),
            )
            .await
        }
        None => {
            let deleted = sqlx::query("DELETE FROM forcenick WHERE guild_id = $1 AND user_id = $2")
                .bind(encode_id(guild_id.get()))
                .bind(encode_id(member.user.id.get()))
                .execute(db)
                .await?;
            if deleted.rows_affected() == 0 {
                return reply::alert(ctx, "This member has no forced nickname").await;
            }
            guild_id
                .edit_member(
                    ctx.http(),
                    member.user.id,
                    serenity::EditMember::new().nickname(String::new()),
                )
                .await?;
            reply::confirm(
                ctx,
                format!("Removed the forced nickname from {}", member.mention()),
            )
            .await
        }
    }
}

/// Setup moderation
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::is_admin"
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    if fetch_moderation(db, guild_id).await?.is_some() {
        return reply::alert(ctx, "You already have moderation setup!").await;
    }

    let role = guild_id
        .create_role(
            ctx.http(),
            serenity::EditRole::new().name("jail").audit_log_reason("mod setup"),
        )
        .await?;

    let channels = guild_id.channels(ctx.http()).await?;
    for channel in channels.values() {
        let _ = channel
            .create_permission(
                ctx.http(),
                serenity::PermissionOverwrite {
                    allow: serenity::Permissions::empty(),
                    deny: serenity::Permissions::VIEW_CHANNEL,
                    kind: serenity::PermissionOverwriteType::Role(role.id),
                },
            )
            .await;
    }

    let everyone = serenity::RoleId::new(guild_id.get());
    let category = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("moderation").kind(serenity::ChannelType::Category),
        )
        .await?;
    let jail = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("jail")
                .category(category.id)
                .permissions(vec![
                    serenity::PermissionOverwrite {
                        allow: serenity::Permissions::VIEW_CHANNEL,
                        deny: serenity::Permissions::empty(),
                        kind: serenity::PermissionOverwriteType::Role(role.id),
                    },
                    serenity::PermissionOverwrite {
                        allow: serenity::Permissions::empty(),
                        deny: serenity::Permissions::VIEW_CHANNEL,
                        kind: serenity::PermissionOverwriteType::Role(everyone),
                    },
                ]),
        )
        .await?;
    let logs = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("logs")
                .category(category.id)
                .permissions(vec![
                    serenity::PermissionOverwrite {
                        allow: serenity::Permissions::empty(),
                        deny: serenity::Permissions::VIEW_CHANNEL,
                        kind: serenity::PermissionOverwriteType::Role(role.id),
                    },
                    serenity::PermissionOverwrite {
                        allow: serenity::Permissions::empty(),
                        deny: serenity::Permissions::VIEW_CHANNEL,
                        kind: serenity::PermissionOverwriteType::Role(everyone),
                    },
                ]),
        )
        .await?;

    sqlx::query(
        "INSERT INTO moderation (guild_id, role_id, channel_id, jail_id, category_id) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(role.id.get()))
    .bind(encode_id(logs.id.get()))
    .bind(encode_id(jail.id.get()))
    .bind(encode_id(category.id.get()))
    .execute(db)
    .await?;

    ctx.say("👍").await?;
    Ok(())
}

/// Reset moderation
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("unsetup"),
    check = "crate::commands::is_admin"
)]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<ModerationRow> =
        sqlx::query_as("DELETE FROM moderation WHERE guild_id = $1 RETURNING *")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(&ctx.data().db)
            .await?;
    let Some(row) = row else {
        return reply::alert(ctx, "Moderation hasn't been setup yet!").await;
    };

    for channel_id in [row.channel_id, row.jail_id, row.category_id] {
        let _ = serenity::ChannelId::new(decode_id(channel_id))
            .delete(ctx.http())
            .await;
    }
    let _ = guild_id
        .delete_role(ctx.http(), serenity::RoleId::new(decode_id(row.role_id)))
        .await;

    ctx.say("👍").await?;
    Ok(())
}

/// Jail a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_moderate"
)]
pub async fn jail(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let Some(config) = fetch_moderation(db, guild_id).await? else {
        return reply::alert(ctx, NOT_SETUP).await;
    };
    if !punishable(&ctx, &member) {
        return reply::alert(ctx, format!("Unable to jail {}!", member.mention())).await;
    }

    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let full_reason = format!("{} - {reason}", ctx.author().name);
    let (assignable, kept) = partition_roles(&ctx, &member);

    let stored: Vec<i64> = assignable.iter().map(|r| encode_id(r.get())).collect();
    let inserted = sqlx::query(
        "INSERT INTO jail (guild_id, user_id, roles) VALUES ($1, $2, $3) \
         ON CONFLICT (guild_id, user_id) DO NOTHING",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(member.user.id.get()))
    .bind(&stored)
    .execute(db)
    .await?;
    if inserted.rows_affected() == 0 {
        return reply::alert(ctx, "This member is **already** jailed").await;
    }

    let mut roles = kept;
    roles.push(serenity::RoleId::new(decode_id(config.role_id)));
    if guild_id
        .edit_member(
            ctx.http(),
            member.user.id,
            serenity::EditMember::new()
                .roles(roles)
                .audit_log_reason(&full_reason),
        )
        .await
        .is_err()
    {
        sqlx::query("DELETE FROM jail WHERE guild_id = $1 AND user_id = $2")
            .bind(encode_id(guild_id.get()))
            .bind(encode_id(member.user.id.get()))
            .execute(db)
            .await?;
        return reply::alert(ctx, format!("Unable to jail {}!", member.mention())).await;
    }

    let notify = notify_dm(&ctx, "jailed", &member.user, &reason).await;
    log_case(&ctx, target_label(&member.user), "Jail", &reason).await;

    if let Ok(channel) = serenity::ChannelId::new(decode_id(config.jail_id))
        .to_channel(ctx.http())
        .await
    {
        if let Some(channel) = channel.guild() {
            let _ = channel
                .send_message(
                    ctx.http(),
                    serenity::CreateMessage::new().content(format!(
                        "{} you have been jailed by {}. Contact the staff members for any \
                         disputes about the punishment",
                        member.mention(),
                        ctx.author().mention()
                    )),
                )
                .await;
        }
    }

    match notify {
        Some(note) => ctx.say(format!("👍 - {note}")).await?,
        None => ctx.say("👍").await?,
    };
    Ok(())
}

/// Unjail a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::can_moderate"
)]
pub async fn unjail(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    if fetch_moderation(db, guild_id).await?.is_none() {
        return reply::alert(ctx, NOT_SETUP).await;
    }

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT roles FROM jail WHERE guild_id = $1 AND user_id = $2")
            .bind(encode_id(guild_id.get()))
            .bind(encode_id(member.user.id.get()))
            .fetch_optional(db)
            .await?;
    let Some((stored,)) = row else {
        return reply::alert(ctx, "This member is **not** jailed").await;
    };

    let reason = reason.unwrap_or_else(|| "N/A".to_string());
    let full_reason = format!("{} - {reason}", ctx.author().name);

    // Whatever the member holds that the bot cannot manage stays; the
    // snapshot roles that still exist and are assignable come back.
    let (_, mut roles) = partition_roles(&ctx, &member);
    {
        let bot_id = ctx.cache().current_user().id;
        let Some(guild) = ctx.guild() else {
            return reply::alert(ctx, format!("Unable to unjail {}!", member.mention())).await;
        };
        let bot_top = guild
            .members
            .get(&bot_id)
            .and_then(|m| guild.member_highest_role(m))
            .map(|r| r.position)
            .unwrap_or_default();
        roles.extend(
            stored
                .iter()
                .map(|id| serenity::RoleId::new(decode_id(*id)))
                .filter(|id| {
                    guild
                        .roles
                        .get(id)
                        .map(|r| !r.managed && r.position < bot_top)
                        .unwrap_or(false)
                }),
        );
    }

    if guild_id
        .edit_member(
            ctx.http(),
            member.user.id,
            serenity::EditMember::new()
                .roles(roles)
                .audit_log_reason(&full_reason),
        )
        .await
        .is_err()
    {
        return reply::alert(ctx, format!("Unable to unjail {}!", member.mention())).await;
    }

    sqlx::query("DELETE FROM jail WHERE guild_id = $1 AND user_id = $2")
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(member.user.id.get()))
        .execute(db)
        .await?;

    log_case(&ctx, target_label(&member.user), "Unjail", &reason).await;
    ctx.say("👍").await?;
    Ok(())
}

/// Manage roles
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("r"),
    subcommands("role_add", "role_remove", "role_restore", "role_create", "role_delete"),
    check = "crate::commands::can_manage_roles"
)]
pub async fn role(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("role"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Give a role to a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "add",
    check = "crate::commands::can_manage_roles"
)]
pub async fn role_add(
    ctx: Context<'_>,
    member: serenity::Member,
    role: serenity::Role,
) -> Result<(), Error> {
    if !role_assignable(&ctx, &role) {
        return reply::alert(ctx, format!("I cannot manage {}", role.mention())).await;
    }
    if member.roles.contains(&role.id) {
        return reply::alert(ctx, "This member already has that role").await;
    }
    member.add_roles(ctx.http(), &[role.id]).await?;
    reply::confirm(
        ctx,
        format!("Added {} to {}", role.mention(), member.mention()),
    )
    .await
}

/// Remove a role from a member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "remove",
    check = "crate::commands::can_manage_roles"
)]
pub async fn role_remove(
    ctx: Context<'_>,
    member: serenity::Member,
    role: serenity::Role,
) -> Result<(), Error> {
    if !role_assignable(&ctx, &role) {
        return reply::alert(ctx, format!("I cannot manage {}", role.mention())).await;
    }
    if !member.roles.contains(&role.id) {
        return reply::alert(ctx, "This member does not have that role").await;
    }
    member.remove_roles(ctx.http(), &[role.id]).await?;
    reply::confirm(
        ctx,
        format!("Removed {} from {}", role.mention(), member.mention()),
    )
    .await
}

/// Restore a member's roles
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "restore",
    check = "crate::commands::can_manage_roles"
)]
pub async fn role_restore(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT roles FROM role_restore WHERE guild_id = $1 AND user_id = $2")
            .bind(encode_id(guild_id.get()))
            .bind(encode_id(member.user.id.get()))
            .fetch_optional(&ctx.data().db)
            .await?;
    let Some((stored,)) = row else {
        return reply::alert(ctx, "There are no roles to restore").await;
    };

    let missing: Vec<serenity::RoleId> = {
        let bot_id = ctx.cache().current_user().id;
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        let bot_top = guild
            .members
            .get(&bot_id)
            .and_then(|m| guild.member_highest_role(m))
            .map(|r| r.position)
            .unwrap_or_default();
        stored
            .iter()
            .map(|id| serenity::RoleId::new(decode_id(*id)))
            .filter(|id| !member.roles.contains(id))
            .filter(|id| {
                guild
                    .roles
                    .get(id)
                    .map(|r| !r.managed && r.position < bot_top)
                    .unwrap_or(false)
            })
            .collect()
    };

    if missing.is_empty() {
        return reply::alert(ctx, "There are no roles to restore").await;
    }

    member.add_roles(ctx.http(), &missing).await?;
    reply::confirm(ctx, format!("Restored {}'s roles", member.mention())).await
}

/// Creates a role
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "create",
    aliases("make"),
    check = "crate::commands::can_manage_roles"
)]
pub async fn role_create(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if name.len() < 2 {
        return reply::alert(ctx, "The role name must be at least 2 characters long!").await;
    }

    let role = guild_id
        .create_role(
            ctx.http(),
            serenity::EditRole::new()
                .name(&name)
                .audit_log_reason(&ctx.author().name),
        )
        .await?;
    reply::confirm(ctx, format!("Successfully created {}!", role.mention())).await
}

/// Deletes a role
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "delete",
    check = "crate::commands::can_manage_roles"
)]
pub async fn role_delete(ctx: Context<'_>, role: serenity::Role) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if role.id.get() == guild_id.get() {
        return reply::alert(ctx, "Unable to delete the default role").await;
    }
    if !role_assignable(&ctx, &role) {
        return reply::alert(ctx, format!("I cannot manage {}", role.mention())).await;
    }

    let mention = role.mention().to_string();
    guild_id.delete_role(ctx.http(), role.id).await?;
    reply::confirm(ctx, format!("Successfully deleted {mention}!")).await
}

fn invoking_message_id(ctx: &Context<'_>) -> Option<serenity::MessageId> {
    match ctx {
        poise::Context::Prefix(prefix) => Some(prefix.msg.id),
        poise::Context::Application(_) => None,
    }
}

async fn purge_where(
    ctx: Context<'_>,
    amount: u8,
    filter: impl Fn(&serenity::Message) -> bool,
) -> Result<(), Error> {
    let channel_id = ctx.channel_id();
    let invoking = invoking_message_id(&ctx);

    let messages = channel_id
        .messages(ctx.http(), serenity::GetMessages::new().limit(100))
        .await?;

    // Bulk deletion rejects messages older than two weeks.
    let cutoff = chrono::Utc::now().timestamp() - 13 * 24 * 3600;
    let targets: Vec<serenity::MessageId> = messages
        .iter()
        .filter(|m| Some(m.id) != invoking)
        .filter(|m| m.timestamp.unix_timestamp() > cutoff)
        .filter(|m| filter(m))
        .take(amount as usize)
        .map(|m| m.id)
        .collect();

    let deleted = targets.len();
    match deleted {
        0 => return reply::alert(ctx, "No matching messages to delete").await,
        1 => channel_id.delete_message(ctx.http(), targets[0]).await?,
        _ => channel_id.delete_messages(ctx.http(), targets).await?,
    }

    if let Some(invoking) = invoking {
        let _ = channel_id.delete_message(ctx.http(), invoking).await;
    }
    reply::confirm(ctx, format!("Purged {deleted} messages")).await
}

/// Clear messages from the channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("clear"),
    subcommands("purge_any", "purge_bots", "purge_humans", "purge_contains"),
    check = "crate::commands::can_manage_messages"
)]
pub async fn purge(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("purge"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Clear the most recent messages
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "messages",
    check = "crate::commands::can_manage_messages"
)]
pub async fn purge_any(ctx: Context<'_>, amount: Option<u8>) -> Result<(), Error> {
    purge_where(ctx, amount.unwrap_or(15), |_| true).await
}

/// Clear messages from bots
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "bots",
    aliases("botclear"),
    check = "crate::commands::can_manage_messages"
)]
pub async fn purge_bots(ctx: Context<'_>, amount: Option<u8>) -> Result<(), Error> {
    purge_where(ctx, amount.unwrap_or(15), |m| m.author.bot).await
}

/// Clear messages from humans
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "humans",
    check = "crate::commands::can_manage_messages"
)]
pub async fn purge_humans(ctx: Context<'_>, amount: Option<u8>) -> Result<(), Error> {
    purge_where(ctx, amount.unwrap_or(15), |m| !m.author.bot).await
}

/// Clear messages containing a substring
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "contains",
    check = "crate::commands::can_manage_messages"
)]
pub async fn purge_contains(
    ctx: Context<'_>,
    text: String,
    amount: Option<u8>,
) -> Result<(), Error> {
    let needle = text.to_lowercase();
    purge_where(ctx, amount.unwrap_or(15), move |m| {
        m.content.to_lowercase().contains(&needle)
    })
    .await
}

/// Persist a member's roles so `role restore` can bring them back.
pub async fn snapshot_roles(
    db: &sqlx::PgPool,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    roles: &[serenity::RoleId],
) {
    let stored: Vec<i64> = roles.iter().map(|r| encode_id(r.get())).collect();
    if let Err(e) = sqlx::query(
        "INSERT INTO role_restore (guild_id, user_id, roles) VALUES ($1, $2, $3) \
         ON CONFLICT (guild_id, user_id) DO UPDATE SET roles = $3",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(user_id.get()))
    .bind(&stored)
    .execute(db)
    .await
    {
        tracing::warn!("failed to snapshot roles for {user_id} in {guild_id}: {e}");
    }
}

/// A jailed member rejoining gets the jail role straight back.
pub async fn reapply_jail(
    ctx: &serenity::Context,
    db: &sqlx::PgPool,
    member: &serenity::Member,
) {
    let guild_id = member.guild_id;
    let jailed: Option<(i64,)> =
        match sqlx::query_as("SELECT user_id FROM jail WHERE guild_id = $1 AND user_id = $2")
            .bind(encode_id(guild_id.get()))
            .bind(encode_id(member.user.id.get()))
            .fetch_optional(db)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("failed to check jail for {guild_id}: {e}");
                return;
            }
        };
    if jailed.is_none() {
        return;
    }

    let role: Option<(i64,)> =
        match sqlx::query_as("SELECT role_id FROM moderation WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("failed to fetch jail role for {guild_id}: {e}");
                return;
            }
        };
    let Some((role_id,)) = role else {
        return;
    };

    let _ = member
        .add_roles(&ctx.http, &[serenity::RoleId::new(decode_id(role_id))])
        .await;
}

/// Reapply a forced nickname after a member update changed it.
pub async fn reapply_forcenick(
    ctx: &serenity::Context,
    db: &sqlx::PgPool,
    event: &serenity::GuildMemberUpdateEvent,
) {
    let row: Option<(String,)> =
        match sqlx::query_as("SELECT nickname FROM forcenick WHERE guild_id = $1 AND user_id = $2")
            .bind(encode_id(event.guild_id.get()))
            .bind(encode_id(event.user.id.get()))
            .fetch_optional(db)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("failed to fetch forced nickname: {e}");
                return;
            }
        };
    let Some((nickname,)) = row else {
        return;
    };
    if event.nick.as_deref() == Some(nickname.as_str()) {
        return;
    }

    let _ = event
        .guild_id
        .edit_member(
            &ctx.http,
            event.user.id,
            serenity::EditMember::new()
                .nickname(nickname.as_str())
                .audit_log_reason("Force nickname"),
        )
        .await;
}
