use poise::serenity_prelude::{self as serenity, ActivityData, Interaction, OnlineStatus};
use tracing::{error, info};

use crate::commands::{configuration, configuration::Greeting, moderation, voicemaster as vm_commands};
use crate::{voicemaster, Data, Error};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
            ctx.set_presence(
                Some(ActivityData::watching("the audit log")),
                OnlineStatus::Idle,
            );
        }
        serenity::FullEvent::GuildAuditLogEntryCreate { entry, guild_id } => {
            if let Err(e) = data.antinuke.handle(ctx, &data.db, *guild_id, entry).await {
                error!("antinuke pipeline failed in {guild_id}: {e}");
            }
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            if let Err(e) =
                voicemaster::handle_voice_update(ctx, data, old.as_ref(), new).await
            {
                error!("voicemaster update failed: {e}");
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            moderation::reapply_jail(ctx, &data.db, new_member).await;
            configuration::send_greeting(
                ctx,
                &data.db,
                Greeting::Welcome,
                new_member.guild_id,
                &new_member.user,
                new_member.joined_at,
            )
            .await;
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            if let Some(member) = member_data_if_available {
                moderation::snapshot_roles(&data.db, *guild_id, user.id, &member.roles).await;
            }
            configuration::send_greeting(ctx, &data.db, Greeting::Goodbye, *guild_id, user, None)
                .await;
        }
        serenity::FullEvent::GuildMemberUpdate { event, .. } => {
            moderation::snapshot_roles(&data.db, event.guild_id, event.user.id, &event.roles)
                .await;
            moderation::reapply_forcenick(ctx, &data.db, event).await;
        }
        serenity::FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            if let Err(e) = vm_commands::handle_panel(ctx, data, component).await {
                error!("voicemaster panel interaction failed: {e}");
            }
        }
        _ => {}
    }
    Ok(())
}
