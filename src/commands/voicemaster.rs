use poise::serenity_prelude::{self as serenity, Mentionable};

use crate::db::encode_id;
use crate::reply;
use crate::voicemaster::{self, VoicemasterRow};
use crate::{Context, Data, Error};

/// Voice channel the author is currently connected to, from the cache.
fn author_voice_channel(ctx: &Context<'_>) -> Option<serenity::ChannelId> {
    let guild = ctx.guild()?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|state| state.channel_id)
}

fn cached_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
) -> Option<serenity::GuildChannel> {
    ctx.cache
        .guild(guild_id)
        .and_then(|guild| guild.channels.get(&channel_id).cloned())
}

/// The author must be in a temp channel they own.
pub async fn vc_owner_check(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let Some(channel) = author_voice_channel(&ctx) else {
        return Err("You are **not** in a voice channel".into());
    };
    let Some(row) = VoicemasterRow::fetch(&ctx.data().db, guild_id).await? else {
        return Err("The voicemaster feature is not configured in this server".into());
    };
    match row.owner_of(channel) {
        None => Err("You are **not** in a voice channel created by me".into()),
        Some(owner) if owner != ctx.author().id => {
            Err("You do **not** own this voice channel".into())
        }
        Some(_) => Ok(true),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelAction {
    Lock,
    Unlock,
    Hide,
    Reveal,
}

impl PanelAction {
    fn flag(self) -> serenity::Permissions {
        match self {
            PanelAction::Lock | PanelAction::Unlock => serenity::Permissions::CONNECT,
            PanelAction::Hide | PanelAction::Reveal => serenity::Permissions::VIEW_CHANNEL,
        }
    }

    fn denies(self) -> bool {
        matches!(self, PanelAction::Lock | PanelAction::Hide)
    }
}

/// Flip an @everyone overwrite on the channel. Returns the user-facing
/// outcome, or None when the channel was already in the requested state.
async fn apply_panel_action(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
    action: PanelAction,
) -> Result<Option<String>, Error> {
    let everyone = serenity::RoleId::new(guild_id.get());
    let Some(channel) = cached_channel(ctx, guild_id, channel_id) else {
        return Ok(None);
    };

    let (mut allow, mut deny) = channel
        .permission_overwrites
        .iter()
        .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone))
        .map(|o| (o.allow, o.deny))
        .unwrap_or((serenity::Permissions::empty(), serenity::Permissions::empty()));

    let flag = action.flag();
    if action.denies() {
        if deny.contains(flag) {
            return Ok(None);
        }
        allow.remove(flag);
        deny.insert(flag);
    } else {
        if !deny.contains(flag) {
            return Ok(None);
        }
        deny.remove(flag);
        allow.insert(flag);
    }

    channel
        .create_permission(
            &ctx.http,
            serenity::PermissionOverwrite {
                allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;

    let outcome = match action {
        PanelAction::Lock => format!("Locked {}", channel_id.mention()),
        PanelAction::Unlock => format!("Unlocked {}", channel_id.mention()),
        PanelAction::Hide => format!("Hidden {}", channel_id.mention()),
        PanelAction::Reveal => format!("Revealed {}", channel_id.mention()),
    };
    Ok(Some(outcome))
}

fn interface_embed(hub: serenity::ChannelId, guild_name: &str, guild_icon: Option<String>) -> serenity::CreateEmbed {
    let mut author = serenity::CreateEmbedAuthor::new(guild_name.to_string());
    if let Some(icon) = guild_icon {
        author = author.icon_url(icon);
    }
    serenity::CreateEmbed::new()
        .color(reply::MAIN_COLOR)
        .title("Voicemaster Interface")
        .description(format!(
            "Manage your custom voice channel.\nYou can create one by joining {}",
            hub.mention()
        ))
        .author(author)
}

fn interface_components() -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("vm:lock")
            .label("Lock")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new("vm:unlock")
            .label("Unlock")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new("vm:hide")
            .label("Hide")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new("vm:reveal")
            .label("Reveal")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new("vm:claim")
            .label("Claim")
            .style(serenity::ButtonStyle::Primary),
    ])]
}

/// Configure custom temporary voice channels in your server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("vm"),
    subcommands("vm_setup", "vm_disable")
)]
pub async fn voicemaster(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("voicemaster"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Setup the voicemaster feature
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "setup",
    aliases("enable", "e"),
    check = "crate::commands::can_manage_guild"
)]
pub async fn vm_setup(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    if VoicemasterRow::fetch(db, guild_id).await?.is_some() {
        return reply::alert(ctx, "The VoiceMaster feature is **already** configured").await;
    }

    let everyone = serenity::RoleId::new(guild_id.get());
    let category = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("Voice Channels")
                .kind(serenity::ChannelType::Category),
        )
        .await?;
    let interface = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("interface")
                .category(category.id)
                .permissions(vec![serenity::PermissionOverwrite {
                    allow: serenity::Permissions::empty(),
                    deny: serenity::Permissions::SEND_MESSAGES,
                    kind: serenity::PermissionOverwriteType::Role(everyone),
                }]),
        )
        .await?;
    let hub = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new("Join To Create")
                .kind(serenity::ChannelType::Voice)
                .category(category.id),
        )
        .await?;

    sqlx::query("INSERT INTO voicemaster (guild_id, channel_id) VALUES ($1, $2)")
        .bind(encode_id(guild_id.get()))
        .bind(encode_id(hub.id.get()))
        .execute(db)
        .await?;

    let guild_info = ctx
        .guild()
        .map(|guild| (guild.name.clone(), guild.icon_url()));
    if let Some((name, icon)) = guild_info {
        interface
            .send_message(
                ctx.http(),
                serenity::CreateMessage::new()
                    .embed(interface_embed(hub.id, &name, icon))
                    .components(interface_components()),
            )
            .await?;
    }

    reply::confirm(ctx, "Configured the VoiceMaster feature").await
}

/// Disable the voicemaster feature
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "disable",
    aliases("delete", "del", "remove", "rem"),
    check = "crate::commands::can_manage_guild"
)]
pub async fn vm_disable(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let Some(row) = VoicemasterRow::fetch(db, guild_id).await? else {
        return reply::alert(ctx, "VoiceMaster feature is **not** enabled").await;
    };

    let hub = row.hub();
    let category = cached_channel(ctx.serenity_context(), guild_id, hub)
        .and_then(|channel| channel.parent_id);

    let mut doomed: Vec<serenity::ChannelId> = row
        .voice_channels
        .0
        .keys()
        .filter_map(|id| id.parse::<u64>().ok())
        .map(serenity::ChannelId::new)
        .collect();
    doomed.push(hub);
    if let Some(category) = category {
        let siblings: Vec<serenity::ChannelId> = ctx
            .guild()
            .map(|guild| {
                guild
                    .channels
                    .values()
                    .filter(|c| c.parent_id == Some(category))
                    .map(|c| c.id)
                    .collect()
            })
            .unwrap_or_default();
        doomed.extend(siblings);
        doomed.push(category);
    }
    doomed.sort_unstable();
    doomed.dedup();

    for channel in doomed {
        let _ = channel.delete(ctx.http()).await;
    }

    sqlx::query("DELETE FROM voicemaster WHERE guild_id = $1")
        .bind(encode_id(guild_id.get()))
        .execute(db)
        .await?;

    reply::confirm(ctx, "Disabled the VoiceMaster feature").await
}

/// Send the voicemaster interface to this channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::is_admin"
)]
pub async fn interface(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(row) = VoicemasterRow::fetch(&ctx.data().db, guild_id).await? else {
        return reply::alert(ctx, "The voicemaster feature is **not** configured").await;
    };

    let guild_info = ctx
        .guild()
        .map(|guild| (guild.name.clone(), guild.icon_url()));
    let Some((name, icon)) = guild_info else {
        return Ok(());
    };

    ctx.send(
        poise::CreateReply::default()
            .embed(interface_embed(row.hub(), &name, icon))
            .components(interface_components()),
    )
    .await?;
    Ok(())
}

/// Control your custom temporary voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("vc"),
    subcommands(
        "vc_rename",
        "vc_lock",
        "vc_unlock",
        "vc_hide",
        "vc_reveal",
        "vc_allow",
        "vc_restrict",
        "vc_disconnect",
        "vc_claim"
    )
)]
pub async fn voice(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        Some("voice"),
        poise::builtins::HelpConfiguration::default(),
    )
    .await?;
    Ok(())
}

/// Rename your temporary custom voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "rename",
    check = "vc_owner_check"
)]
pub async fn vc_rename(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let Some(channel) = author_voice_channel(&ctx) else {
        return Ok(());
    };
    channel
        .edit(ctx.http(), serenity::EditChannel::new().name(&name))
        .await?;
    reply::confirm(ctx, format!("Changed the channel's name to: {name}")).await
}

async fn run_panel_command(ctx: Context<'_>, action: PanelAction, already: &str) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(channel) = author_voice_channel(&ctx) else {
        return Ok(());
    };
    match apply_panel_action(ctx.serenity_context(), guild_id, channel, action).await? {
        Some(outcome) => reply::confirm(ctx, outcome).await,
        None => reply::alert(ctx, format!("{} is **already** {already}", channel.mention())).await,
    }
}

/// Lock your temporary custom voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "lock",
    check = "vc_owner_check"
)]
pub async fn vc_lock(ctx: Context<'_>) -> Result<(), Error> {
    run_panel_command(ctx, PanelAction::Lock, "locked").await
}

/// Unlock your temporary custom voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "unlock",
    check = "vc_owner_check"
)]
pub async fn vc_unlock(ctx: Context<'_>) -> Result<(), Error> {
    run_panel_command(ctx, PanelAction::Unlock, "unlocked").await
}

/// Hide your custom temporary voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "hide",
    aliases("ghost"),
    check = "vc_owner_check"
)]
pub async fn vc_hide(ctx: Context<'_>) -> Result<(), Error> {
    run_panel_command(ctx, PanelAction::Hide, "hidden").await
}

/// Reveal your custom temporary voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "reveal",
    aliases("unghost"),
    check = "vc_owner_check"
)]
pub async fn vc_reveal(ctx: Context<'_>) -> Result<(), Error> {
    run_panel_command(ctx, PanelAction::Reveal, "revealed").await
}

/// Allow a member to join your temporary custom voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "allow",
    aliases("permit"),
    check = "vc_owner_check"
)]
pub async fn vc_allow(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(channel_id) = author_voice_channel(&ctx) else {
        return Ok(());
    };
    let Some(channel) = cached_channel(ctx.serenity_context(), guild_id, channel_id) else {
        return Ok(());
    };

    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow: serenity::Permissions::CONNECT | serenity::Permissions::VIEW_CHANNEL,
                deny: serenity::Permissions::empty(),
                kind: serenity::PermissionOverwriteType::Member(member.user.id),
            },
        )
        .await?;

    reply::confirm(
        ctx,
        format!(
            "{} is **allowed** to join {}",
            member.mention(),
            channel_id.mention()
        ),
    )
    .await
}

/// Kick someone from the voice channel and restrict their access
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "restrict",
    aliases("ban"),
    check = "vc_owner_check"
)]
pub async fn vc_restrict(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if member.user.id == ctx.author().id {
        return reply::alert(ctx, "This can't be you").await;
    }
    let Some(channel_id) = author_voice_channel(&ctx) else {
        return Ok(());
    };
    let Some(channel) = cached_channel(ctx.serenity_context(), guild_id, channel_id) else {
        return Ok(());
    };

    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow: serenity::Permissions::empty(),
                deny: serenity::Permissions::CONNECT | serenity::Permissions::VIEW_CHANNEL,
                kind: serenity::PermissionOverwriteType::Member(member.user.id),
            },
        )
        .await?;

    let in_channel = ctx
        .guild()
        .map(|guild| {
            guild
                .voice_states
                .get(&member.user.id)
                .and_then(|state| state.channel_id)
                == Some(channel_id)
        })
        .unwrap_or(false);
    if in_channel {
        let _ = guild_id.disconnect_member(ctx.http(), member.user.id).await;
    }

    reply::confirm(
        ctx,
        format!("Restricted access for {} to this voice channel", member.mention()),
    )
    .await
}

/// Disconnect a member from your custom temporary voice channel
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "disconnect",
    aliases("kick"),
    check = "vc_owner_check"
)]
pub async fn vc_disconnect(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if member.user.id == ctx.author().id {
        return reply::alert(ctx, "You cannot kick yourself").await;
    }
    let Some(channel_id) = author_voice_channel(&ctx) else {
        return Ok(());
    };

    let in_channel = ctx
        .guild()
        .map(|guild| {
            guild
                .voice_states
                .get(&member.user.id)
                .and_then(|state| state.channel_id)
                == Some(channel_id)
        })
        .unwrap_or(false);
    if !in_channel {
        return reply::alert(ctx, "This member is **not** in your voice channel").await;
    }

    guild_id
        .disconnect_member(ctx.http(), member.user.id)
        .await?;
    reply::confirm(
        ctx,
        format!("Kicked {} from your voice channel", member.mention()),
    )
    .await
}

/// Claim the ownership of the voice channel you are in
#[poise::command(slash_command, prefix_command, guild_only, rename = "claim")]
pub async fn vc_claim(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(channel_id) = author_voice_channel(&ctx) else {
        return reply::alert(ctx, "You are **not** in a voice channel").await;
    };

    let db = &ctx.data().db;
    let Some(row) = VoicemasterRow::fetch(db, guild_id).await? else {
        return reply::alert(ctx, "The voicemaster feature is not configured in this server").await;
    };
    let Some(owner) = row.owner_of(channel_id) else {
        return reply::alert(ctx, "You are **not** in a voice channel created by me").await;
    };

    let owner_present = ctx
        .guild()
        .map(|guild| {
            guild
                .voice_states
                .get(&owner)
                .and_then(|state| state.channel_id)
                == Some(channel_id)
        })
        .unwrap_or(false);
    if owner_present {
        return reply::alert(ctx, "The owner is still in the voice channel").await;
    }

    voicemaster::set_owner(db, guild_id, channel_id, ctx.author().id).await?;
    reply::confirm(ctx, "You have claimed the ownership of this voice channel").await
}

/// Interface button presses, dispatched from the gateway event handler.
pub async fn handle_panel(
    ctx: &serenity::Context,
    data: &Data,
    component: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let custom_id = component.data.custom_id.as_str();
    if !custom_id.starts_with("vm:") {
        return Ok(());
    }

    let respond = |content: String| {
        serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true),
        )
    };

    let user_id = component.user.id;
    let channel_id = {
        ctx.cache.guild(guild_id).and_then(|guild| {
            guild
                .voice_states
                .get(&user_id)
                .and_then(|state| state.channel_id)
        })
    };
    let Some(channel_id) = channel_id else {
        component
            .create_response(&ctx.http, respond("You are **not** in a voice channel".into()))
            .await?;
        return Ok(());
    };

    let Some(row) = VoicemasterRow::fetch(&data.db, guild_id).await? else {
        component
            .create_response(
                &ctx.http,
                respond("The voicemaster feature is not configured in this server".into()),
            )
            .await?;
        return Ok(());
    };
    let owner = row.owner_of(channel_id);

    if custom_id == "vm:claim" {
        let Some(owner) = owner else {
            component
                .create_response(
                    &ctx.http,
                    respond("You are **not** in a voice channel created by me".into()),
                )
                .await?;
            return Ok(());
        };
        let owner_present = {
            ctx.cache
                .guild(guild_id)
                .map(|guild| {
                    guild
                        .voice_states
                        .get(&owner)
                        .and_then(|state| state.channel_id)
                        == Some(channel_id)
                })
                .unwrap_or(false)
        };
        if owner_present {
            component
                .create_response(
                    &ctx.http,
                    respond("The owner is still in the voice channel".into()),
                )
                .await?;
            return Ok(());
        }
        voicemaster::set_owner(&data.db, guild_id, channel_id, user_id).await?;
        component
            .create_response(
                &ctx.http,
                respond("You have claimed the ownership of this voice channel".into()),
            )
            .await?;
        return Ok(());
    }

    if owner != Some(user_id) {
        component
            .create_response(&ctx.http, respond("You do **not** own this voice channel".into()))
            .await?;
        return Ok(());
    }

    let action = match custom_id {
        "vm:lock" => PanelAction::Lock,
        "vm:unlock" => PanelAction::Unlock,
        "vm:hide" => PanelAction::Hide,
        "vm:reveal" => PanelAction::Reveal,
        _ => return Ok(()),
    };

    let content = match apply_panel_action(ctx, guild_id, channel_id, action).await? {
        Some(outcome) => outcome,
        None => format!("{} is already in that state", channel_id.mention()),
    };
    component
        .create_response(&ctx.http, respond(content))
        .await?;
    Ok(())
}
