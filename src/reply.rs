use std::time::Duration;

use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseMessage,
};

use crate::{Context, Error};

pub const MAIN_COLOR: u32 = 0x2f3136;
pub const ALERT_COLOR: u32 = 0xe6bf63;

const PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

async fn send_embed(ctx: Context<'_>, description: String, color: u32) -> Result<(), Error> {
    let embed = CreateEmbed::new().color(color).description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Green-path confirmation, the equivalent of the bot's `ctx.confirm`.
pub async fn confirm(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    send_embed(ctx, format!("✅ {}", text.into()), MAIN_COLOR).await
}

/// User-facing warning for a refused or failed command.
pub async fn alert(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    send_embed(ctx, format!("⚠️ {}", text.into()), ALERT_COLOR).await
}

pub async fn neutral(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    send_embed(ctx, text.into(), MAIN_COLOR).await
}

/// Yes/No button prompt gated to the invoking user. Returns false on
/// timeout or an explicit "No".
pub async fn confirm_prompt(ctx: Context<'_>, text: impl Into<String>) -> Result<bool, Error> {
    let ctx_id = ctx.id();
    let yes_id = format!("{ctx_id}yes");
    let no_id = format!("{ctx_id}no");

    let components = CreateActionRow::Buttons(vec![
        CreateButton::new(&yes_id)
            .label("Yes")
            .style(ButtonStyle::Danger),
        CreateButton::new(&no_id)
            .label("No")
            .style(ButtonStyle::Primary),
    ]);

    let embed = CreateEmbed::new().color(MAIN_COLOR).description(text.into());
    let msg = ctx
        .send(
            poise::CreateReply::default()
                .embed(embed)
                .components(vec![components]),
        )
        .await?;

    while let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
        .filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
        .timeout(PROMPT_TIMEOUT)
        .await
    {
        if press.user.id != ctx.author().id {
            press
                .create_response(ctx.serenity_context(), CreateInteractionResponse::Acknowledge)
                .await?;
            continue;
        }

        let confirmed = press.data.custom_id == yes_id;
        press
            .create_response(
                ctx.serenity_context(),
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().components(vec![]),
                ),
            )
            .await?;
        return Ok(confirmed);
    }

    msg.edit(
        ctx,
        poise::CreateReply::default()
            .content("Timed out waiting for response.")
            .components(vec![]),
    )
    .await?;
    Ok(false)
}
