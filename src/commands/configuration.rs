use poise::serenity_prelude::{self as serenity, Mentionable};

use crate::db::{decode_id, encode_id};
use crate::paginator;
use crate::reply;
use crate::template::{self, TemplateContext};
use crate::{Context, Error};

const MAX_PREFIX_LEN: usize = 5;

/// Check or change the server's prefix
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "New prefix, omit to show the current one"] new_prefix: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let Some(new_prefix) = new_prefix else {
        let row: Option<(String,)> = sqlx::query_as("SELECT prefix FROM prefixes WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
        let current = row
            .map(|(prefix,)| prefix)
            .unwrap_or_else(|| ctx.data().config.default_prefix.clone());
        return reply::neutral(ctx, format!("my current prefix is `{current}`")).await;
    };

    if !crate::commands::author_has(ctx, serenity::Permissions::MANAGE_GUILD).await? {
        return reply::alert(ctx, "You need **manage guild** to change the prefix").await;
    }
    if new_prefix.len() > MAX_PREFIX_LEN {
        return reply::alert(ctx, "The prefix cannot be longer than **5** characters").await;
    }

    sqlx::query(
        "INSERT INTO prefixes (guild_id, prefix) VALUES ($1, $2) \
         ON CONFLICT (guild_id) DO UPDATE SET prefix = $2",
    )
    .bind(encode_id(guild_id.get()))
    .bind(&new_prefix)
    .execute(db)
    .await?;

    reply::confirm(ctx, format!("Updated the server's prefix to `{new_prefix}`")).await
}

/// Grant command permissions to roles without giving real Discord ones
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("fakeperms", "fp"),
    subcommands("fakeperms_add", "fakeperms_remove", "fakeperms_list", "fakeperms_valid")
)]
pub async fn fakepermissions(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("fakepermissions"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

fn normalize_permission(name: &str) -> Option<(String, serenity::Permissions)> {
    let canonical = name.trim().to_uppercase();
    serenity::Permissions::from_name(&canonical).map(|p| (canonical.to_lowercase(), p))
}

/// Add a permission to a role's fake permissions
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "add",
    check = "crate::commands::is_admin"
)]
pub async fn fakeperms_add(
    ctx: Context<'_>,
    role: serenity::Role,
    permission: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some((name, _)) = normalize_permission(&permission) else {
        return reply::alert(
            ctx,
            "That is not a valid permission. Use `fakepermissions valid` for the full list",
        )
        .await;
    };

    let row: Option<(Vec<String>,)> = sqlx::query_as(
        "SELECT permissions FROM fakeperms WHERE guild_id = $1 AND role_id = $2",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(role.id.get()))
    .fetch_optional(&ctx.data().db)
    .await?;

    let mut permissions = row.map(|(p,)| p).unwrap_or_default();
    if permissions.contains(&name) {
        return reply::alert(
            ctx,
            format!("{} already has the `{name}` fake permission", role.mention()),
        )
        .await;
    }
    permissions.push(name.clone());

    sqlx::query(
        "INSERT INTO fakeperms (guild_id, role_id, permissions) VALUES ($1, $2, $3) \
         ON CONFLICT (guild_id, role_id) DO UPDATE SET permissions = $3",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(role.id.get()))
    .bind(&permissions)
    .execute(&ctx.data().db)
    .await?;

    reply::confirm(
        ctx,
        format!("Added `{name}` to {}'s fake permissions", role.mention()),
    )
    .await
}

/// Remove a permission from a role's fake permissions
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "remove",
    check = "crate::commands::is_admin"
)]
pub async fn fakeperms_remove(
    ctx: Context<'_>,
    role: serenity::Role,
    permission: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some((name, _)) = normalize_permission(&permission) else {
        return reply::alert(
            ctx,
            "That is not a valid permission. Use `fakepermissions valid` for the full list",
        )
        .await;
    };

    let row: Option<(Vec<String>,)> = sqlx::query_as(
        "SELECT permissions FROM fakeperms WHERE guild_id = $1 AND role_id = $2",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(role.id.get()))
    .fetch_optional(&ctx.data().db)
    .await?;

    let mut permissions = row.map(|(p,)| p).unwrap_or_default();
    let Some(pos) = permissions.iter().position(|p| p == &name) else {
        return reply::alert(
            ctx,
            format!("{} does not have the `{name}` fake permission", role.mention()),
        )
        .await;
    };
    permissions.remove(pos);

    sqlx::query("UPDATE fakeperms SET permissions = $1 WHERE guild_id = $2 AND role_id = $3")
        .bind(&permissions)
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(role.id.get()))
        .execute(&ctx.data().db)
        .await?;

    reply::confirm(
        ctx,
        format!("Removed `{name}` from {}'s fake permissions", role.mention()),
    )
    .await
}

/// List a role's fake permissions
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "list",
    check = "crate::commands::is_admin"
)]
pub async fn fakeperms_list(ctx: Context<'_>, role: serenity::Role) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<(Vec<String>,)> = sqlx::query_as(
        "SELECT permissions FROM fakeperms WHERE guild_id = $1 AND role_id = $2",
    )
    .bind(encode_id(guild_id.get()))
    .bind(encode_id(role.id.get()))
    .fetch_optional(&ctx.data().db)
    .await?;

    let permissions = row.map(|(p,)| p).unwrap_or_default();
    if permissions.is_empty() {
        return reply::alert(ctx, "This role has no fake permissions").await;
    }

    let lines: Vec<String> = permissions.iter().map(|p| format!("`{p}`")).collect();
    let pages = paginator::chunked_pages(
        &format!("Fake permissions for @{}", role.name),
        &lines,
        10,
    );
    paginator::paginate(ctx, pages).await
}

/// Get all valid permissions that can be used for fakepermissions
#[poise::command(slash_command, prefix_command, guild_only, rename = "valid")]
pub async fn fakeperms_valid(ctx: Context<'_>) -> Result<(), Error> {
    let lines: Vec<String> = serenity::Permissions::all()
        .iter_names()
        .map(|(name, _)| format!("`{}`", name.to_lowercase()))
        .collect();
    let pages = paginator::chunked_pages("Valid permissions", &lines, 15);
    paginator::paginate(ctx, pages).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Welcome,
    Goodbye,
}

impl Greeting {
    fn label(self) -> &'static str {
        match self {
            Greeting::Welcome => "welcome",
            Greeting::Goodbye => "goodbye",
        }
    }

    fn select_sql(self) -> &'static str {
        match self {
            Greeting::Welcome => "SELECT channel_id, message FROM welcome WHERE guild_id = $1",
            Greeting::Goodbye => "SELECT channel_id, message FROM goodbye WHERE guild_id = $1",
        }
    }

    fn upsert_sql(self) -> &'static str {
        match self {
            Greeting::Welcome => {
                "INSERT INTO welcome (guild_id, channel_id, message) VALUES ($1, $2, $3) \
                 ON CONFLICT (guild_id) DO UPDATE SET channel_id = $2, message = $3"
            }
            Greeting::Goodbye => {
                "INSERT INTO goodbye (guild_id, channel_id, message) VALUES ($1, $2, $3) \
                 ON CONFLICT (guild_id) DO UPDATE SET channel_id = $2, message = $3"
            }
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            Greeting::Welcome => "DELETE FROM welcome WHERE guild_id = $1",
            Greeting::Goodbye => "DELETE FROM goodbye WHERE guild_id = $1",
        }
    }
}

async fn greeting_set(
    ctx: Context<'_>,
    kind: Greeting,
    channel: serenity::GuildChannel,
    script: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    sqlx::query(kind.upsert_sql())
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(channel.id.get()))
        .bind(&script)
        .execute(&ctx.data().db)
        .await?;

    reply::confirm(
        ctx,
        format!(
            "Set the {} message for {}. Use `{} test` to preview it",
            kind.label(),
            channel.mention(),
            kind.label()
        ),
    )
    .await
}

async fn greeting_remove(ctx: Context<'_>, kind: Greeting) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let deleted = sqlx::query(kind.delete_sql())
        .bind(encode_id(guild_id.get()))
        .execute(&ctx.data().db)
        .await?;
    if deleted.rows_affected() == 0 {
        return reply::alert(ctx, format!("There is no {} message set", kind.label())).await;
    }
    reply::confirm(ctx, format!("Removed the {} message", kind.label())).await
}

async fn greeting_test(ctx: Context<'_>, kind: Greeting) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<(i64, String)> = sqlx::query_as(kind.select_sql())
        .bind(encode_id(guild_id.get()))
        .fetch_optional(&ctx.data().db)
        .await?;
    let Some((channel_id, script)) = row else {
        return reply::alert(ctx, format!("There is no {} message set", kind.label())).await;
    };

    let member = ctx
        .author_member()
        .await
        .ok_or("This command must be used in a server")?;
    let template_ctx = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        TemplateContext::for_member(&member.user, member.joined_at, &guild)
    };
    let parsed = template::parse(&script, &template_ctx);

    let channel = serenity::ChannelId::new(decode_id(channel_id));
    let sent = channel
        .send_message(ctx.http(), parsed.to_message())
        .await?;
    schedule_delete(ctx.serenity_context(), sent, parsed.delete_after);

    reply::confirm(ctx, format!("Sent a {} test to <#{channel}>", kind.label())).await
}

/// Greet members when they join
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("welcome_set", "welcome_remove", "welcome_test")
)]
pub async fn welcome(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("welcome"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Set the welcome channel and message script
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "set",
    check = "crate::commands::can_manage_guild"
)]
pub async fn welcome_set(
    ctx: Context<'_>,
    channel: serenity::GuildChannel,
    #[rest] script: String,
) -> Result<(), Error> {
    greeting_set(ctx, Greeting::Welcome, channel, script).await
}

/// Remove the welcome message
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "remove",
    check = "crate::commands::can_manage_guild"
)]
pub async fn welcome_remove(ctx: Context<'_>) -> Result<(), Error> {
    greeting_remove(ctx, Greeting::Welcome).await
}

/// Preview the welcome message with yourself as the member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "test",
    check = "crate::commands::can_manage_guild"
)]
pub async fn welcome_test(ctx: Context<'_>) -> Result<(), Error> {
    greeting_test(ctx, Greeting::Welcome).await
}

/// Say goodbye to members when they leave
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("goodbye_set", "goodbye_remove", "goodbye_test")
)]
pub async fn goodbye(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("goodbye"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Set the goodbye channel and message script
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "set",
    check = "crate::commands::can_manage_guild"
)]
pub async fn goodbye_set(
    ctx: Context<'_>,
    channel: serenity::GuildChannel,
    #[rest] script: String,
) -> Result<(), Error> {
    greeting_set(ctx, Greeting::Goodbye, channel, script).await
}

/// Remove the goodbye message
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "remove",
    check = "crate::commands::can_manage_guild"
)]
pub async fn goodbye_remove(ctx: Context<'_>) -> Result<(), Error> {
    greeting_remove(ctx, Greeting::Goodbye).await
}

/// Preview the goodbye message with yourself as the member
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "test",
    check = "crate::commands::can_manage_guild"
)]
pub async fn goodbye_test(ctx: Context<'_>) -> Result<(), Error> {
    greeting_test(ctx, Greeting::Goodbye).await
}

fn schedule_delete(
    ctx: &serenity::Context,
    message: serenity::Message,
    delete_after: Option<u64>,
) {
    let Some(seconds) = delete_after else {
        return;
    };
    let http = ctx.http.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
        let _ = message.delete(&http).await;
    });
}

/// Render and send the configured greeting for a joining/leaving member.
pub async fn send_greeting(
    ctx: &serenity::Context,
    db: &sqlx::PgPool,
    kind: Greeting,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    joined_at: Option<serenity::Timestamp>,
) {
    let row: Option<(i64, String)> = match sqlx::query_as(kind.select_sql())
        .bind(encode_id(guild_id.get()))
        .fetch_optional(db)
        .await
    {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!("failed to fetch {} config for {guild_id}: {e}", kind.label());
            return;
        }
    };
    let Some((channel_id, script)) = row else {
        return;
    };

    let template_ctx = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return;
        };
        TemplateContext::for_member(user, joined_at, &guild)
    };
    let parsed = template::parse(&script, &template_ctx);

    match serenity::ChannelId::new(decode_id(channel_id))
        .send_message(&ctx.http, parsed.to_message())
        .await
    {
        Ok(sent) => schedule_delete(ctx, sent, parsed.delete_after),
        Err(e) => tracing::warn!("failed to send {} message in {guild_id}: {e}", kind.label()),
    }
}
