use poise::serenity_prelude::{self as serenity, Mentionable};

use crate::antinuke::{self, AntinukeConfig, ModuleConfig, ProtectedAction, Punishment};
use crate::db::{decode_id, encode_id};
use crate::paginator;
use crate::reply;
use crate::{Context, Error};

const NOT_CONFIGURED: &str =
    "Antinuke has **not** been configured. Please use the `antinuke setup` command";

/// Protect your server against nuking
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("an"),
    subcommands(
        "setup",
        "disable",
        "logs",
        "owner",
        "owners",
        "whitelist",
        "whitelisted",
        "settings",
        "ban",
        "kick",
        "botadd",
        "channel",
        "role",
        "webhook",
        "emoji",
        "sticker"
    )
)]
pub async fn antinuke(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Configure the antinuke
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::server_owner_check"
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    sqlx::query("INSERT INTO antinuke (guild_id) VALUES ($1) ON CONFLICT (guild_id) DO NOTHING")
        .bind(encode_id(guild_id.get()))
        .execute(&ctx.data().db)
        .await?;
    reply::confirm(ctx, "Antinuke has been configured succesfully").await
}

/// Disable the antinuke feature
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::server_owner_check"
)]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    sqlx::query("DELETE FROM antinuke WHERE guild_id = $1")
        .bind(encode_id(guild_id.get()))
        .execute(&ctx.data().db)
        .await?;
    reply::confirm(ctx, "Antinuke has been disabled succesfully").await
}

/// Configure your antinuke logs
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "Log channel, omit to remove"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    match channel {
        Some(channel) => {
            let updated =
                sqlx::query("UPDATE antinuke SET logs = $1 WHERE guild_id = $2")
                    .bind(encode_id(channel.id.get()))
                    .bind(encode_id(guild_id.get()))
                    .execute(db)
                    .await?;
            if updated.rows_affected() == 0 {
                return reply::alert(ctx, NOT_CONFIGURED).await;
            }
            reply::confirm(
                ctx,
                format!(
                    "Antinuke log channel was configured succesfully to {}",
                    channel.mention()
                ),
            )
            .await
        }
        None => {
            sqlx::query("UPDATE antinuke SET logs = NULL WHERE guild_id = $1")
                .bind(encode_id(guild_id.get()))
                .execute(db)
                .await?;
            reply::confirm(ctx, "Removed antinuke logs").await
        }
    }
}

/// Add or remove an antinuke owner (they can manage all antinuke commands)
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::server_owner_check"
)]
pub async fn owner(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT owners FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
    let Some((mut owners,)) = row else {
        return reply::alert(ctx, NOT_CONFIGURED).await;
    };

    let id = encode_id(member.user.id.get());
    let message = if let Some(pos) = owners.iter().position(|&o| o == id) {
        owners.remove(pos);
        format!("**{}** is **not** an antinuke owner anymore", member.user.name)
    } else {
        owners.push(id);
        format!("**{}** became an antinuke owner", member.user.name)
    };

    sqlx::query("UPDATE antinuke SET owners = $1 WHERE guild_id = $2")
        .bind(&owners)
        .bind(encode_id(guild_id.get()))
        .execute(db)
        .await?;
    reply::confirm(ctx, message).await
}

/// Get a list of all antinuke owners
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn owners(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT owners FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(&ctx.data().db)
            .await?;
    let mut owners = row.map(|(owners,)| owners).unwrap_or_default();

    let guild_owner = ctx.guild().map(|guild| guild.owner_id);
    if let Some(guild_owner) = guild_owner {
        owners.push(encode_id(guild_owner.get()));
    }

    let lines: Vec<String> = owners
        .iter()
        .rev()
        .map(|id| format!("<@{}> (`{}`)", decode_id(*id), decode_id(*id)))
        .collect();
    let pages = paginator::chunked_pages(
        &format!("Antinuke owners ({})", owners.len()),
        &lines,
        10,
    );
    paginator::paginate(ctx, pages).await
}

/// Whitelist someone from the antinuke
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("wl"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn whitelist(ctx: Context<'_>, user: serenity::User) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT whitelisted FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
    let Some((mut whitelisted,)) = row else {
        return reply::alert(ctx, NOT_CONFIGURED).await;
    };

    let id = encode_id(user.id.get());
    let message = if let Some(pos) = whitelisted.iter().position(|&w| w == id) {
        whitelisted.remove(pos);
        format!("**{}** is **not** antinuke whitelisted anymore", user.name)
    } else {
        whitelisted.push(id);
        format!("**{}** is whitelisted from antinuke", user.name)
    };

    sqlx::query("UPDATE antinuke SET whitelisted = $1 WHERE guild_id = $2")
        .bind(&whitelisted)
        .bind(encode_id(guild_id.get()))
        .execute(db)
        .await?;
    reply::confirm(ctx, message).await
}

/// Get a list of all whitelisted people
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn whitelisted(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let row: Option<(Vec<i64>,)> =
        sqlx::query_as("SELECT whitelisted FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(&ctx.data().db)
            .await?;
    let whitelisted = row.map(|(w,)| w).unwrap_or_default();

    if whitelisted.is_empty() {
        return reply::alert(ctx, "There are no whitelisted members!").await;
    }

    let lines: Vec<String> = whitelisted
        .iter()
        .map(|id| format!("<@{}> (`{}`)", decode_id(*id), decode_id(*id)))
        .collect();
    let pages = paginator::chunked_pages(
        &format!("Antinuke whitelisted ({})", whitelisted.len()),
        &lines,
        10,
    );
    paginator::paginate(ctx, pages).await
}

/// Check the antinuke feature settings
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(config) = AntinukeConfig::fetch(&ctx.data().db, guild_id).await? else {
        return reply::alert(ctx, NOT_CONFIGURED).await;
    };

    if config.modules.0.is_empty() && config.logs.is_none() {
        return reply::alert(ctx, "There are no antinuke settings that are enabled").await;
    }

    let mut lines: Vec<String> = Vec::new();
    for action in ProtectedAction::ALL {
        if let Some(module) = config.module(*action) {
            lines.push(format!("✅ {} - {}", action.title(), module.punishment));
        }
    }

    let guild_info = ctx
        .guild()
        .map(|guild| (guild.name.clone(), guild.icon_url()));
    let mut embed = serenity::CreateEmbed::new()
        .color(reply::MAIN_COLOR)
        .title("Antinuke Settings")
        .description(lines.join("\n"));
    if let Some((name, icon)) = guild_info {
        let mut author = serenity::CreateEmbedAuthor::new(name);
        if let Some(icon) = icon {
            author = author.icon_url(icon);
        }
        embed = embed.author(author);
    }
    if let Some(channel) = config.log_channel() {
        embed = embed.field("Logs channel", format!("<#{channel}> (`{channel}`)"), false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shared toggle for the per-action protection modules. `None` disables.
async fn toggle_module(
    ctx: Context<'_>,
    action: ProtectedAction,
    punishment: Option<Punishment>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let Some(mut modules) = antinuke::fetch_modules(db, guild_id).await? else {
        return reply::alert(ctx, NOT_CONFIGURED).await;
    };

    match punishment {
        Some(punishment) => {
            modules.insert(action.key().to_string(), ModuleConfig { punishment });
            antinuke::save_modules(db, guild_id, &modules).await?;
            reply::confirm(
                ctx,
                format!(
                    "Antinuke **{}** is now enabled - `{punishment}`",
                    action.name()
                ),
            )
            .await
        }
        None => {
            if modules.remove(action.key()).is_none() {
                return reply::alert(
                    ctx,
                    format!("Antinuke **{}** has not been enabled", action.name()),
                )
                .await;
            }
            antinuke::save_modules(db, guild_id, &modules).await?;
            reply::confirm(ctx, format!("Antinuke **{}** is now disabled", action.name())).await
        }
    }
}

macro_rules! module_toggle {
    ($fn_name:ident, $rename:literal, $action:ident, $doc:literal) => {
        #[doc = $doc]
        #[poise::command(
            slash_command,
            prefix_command,
            guild_only,
            rename = $rename,
            check = "crate::commands::antinuke_owner_check"
        )]
        pub async fn $fn_name(
            ctx: Context<'_>,
            #[description = "Punishment, omit to disable"] punishment: Option<Punishment>,
        ) -> Result<(), Error> {
            toggle_module(ctx, ProtectedAction::$action, punishment).await
        }
    };
}

/// Protect your server against bans
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("ban_enable", "ban_disable")
)]
pub async fn ban(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke ban"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Enable the protection against bans
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "enable",
    aliases("e"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn ban_enable(ctx: Context<'_>, punishment: Punishment) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::Ban, Some(punishment)).await
}

/// Disable the protection against bans
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "disable",
    aliases("dis"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn ban_disable(ctx: Context<'_>) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::Ban, None).await
}

/// Protect your server against kicks
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("kick_enable", "kick_disable")
)]
pub async fn kick(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke kick"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Enable the protection against kicks
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "enable",
    aliases("e"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn kick_enable(ctx: Context<'_>, punishment: Punishment) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::Kick, Some(punishment)).await
}

/// Disable the protection against kicks
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "disable",
    aliases("dis"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn kick_disable(ctx: Context<'_>) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::Kick, None).await
}

/// Protect your server against unknown bots
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("botadd_enable", "botadd_disable")
)]
pub async fn botadd(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke botadd"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Enable the protection against bots
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "enable",
    aliases("e"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn botadd_enable(ctx: Context<'_>, punishment: Punishment) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::BotAdd, Some(punishment)).await
}

/// Disable the protection against bots
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "disable",
    aliases("dis"),
    check = "crate::commands::antinuke_owner_check"
)]
pub async fn botadd_disable(ctx: Context<'_>) -> Result<(), Error> {
    toggle_module(ctx, ProtectedAction::BotAdd, None).await
}

/// Protect your server against channel changes
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("channel_create", "channel_delete")
)]
pub async fn channel(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke channel"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

module_toggle!(
    channel_create,
    "create",
    ChannelCreate,
    "Toggle the protection against channel creations"
);
module_toggle!(
    channel_delete,
    "delete",
    ChannelDelete,
    "Toggle the protection against channel deletions"
);

/// Protect your server against role changes
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("role_give", "role_edit", "role_create", "role_delete")
)]
pub async fn role(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke role"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

module_toggle!(
    role_give,
    "give",
    MemberRoleUpdate,
    "Toggle the protection against malicious role giving"
);
module_toggle!(
    role_edit,
    "edit",
    RoleUpdate,
    "Toggle the protection against malicious role editing"
);
module_toggle!(
    role_create,
    "create",
    RoleCreate,
    "Toggle the protection against role creations"
);
module_toggle!(
    role_delete,
    "delete",
    RoleDelete,
    "Toggle the protection against role deletions"
);

/// Protect your server against webhooks
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("webhook_create", "webhook_delete")
)]
pub async fn webhook(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke webhook"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

module_toggle!(
    webhook_create,
    "create",
    WebhookCreate,
    "Toggle the protection against webhook creations"
);
module_toggle!(
    webhook_delete,
    "delete",
    WebhookDelete,
    "Toggle the protection against webhook deletions"
);

/// Protect your server against emoji creations/deletions
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("emojis"),
    subcommands("emoji_create", "emoji_delete")
)]
pub async fn emoji(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke emoji"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

module_toggle!(
    emoji_create,
    "create",
    EmojiCreate,
    "Toggle the protection against emoji creations"
);
module_toggle!(
    emoji_delete,
    "delete",
    EmojiDelete,
    "Toggle the protection against emoji deletions"
);

/// Protect your server against sticker creations/deletions
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("stickers"),
    subcommands("sticker_create", "sticker_delete")
)]
pub async fn sticker(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("antinuke sticker"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

module_toggle!(
    sticker_create,
    "create",
    StickerCreate,
    "Toggle the protection against sticker creations"
);
module_toggle!(
    sticker_delete,
    "delete",
    StickerDelete,
    "Toggle the protection against sticker deletions"
);
