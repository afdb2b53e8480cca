use std::time::Duration;

use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseMessage,
};

use crate::reply::MAIN_COLOR;
use crate::{Context, Error};

const PAGE_TIMEOUT: Duration = Duration::from_secs(180);

/// Build numbered list pages from individual lines.
pub fn chunked_pages(title: &str, lines: &[String], per_page: usize) -> Vec<CreateEmbed> {
    let total = lines.len();
    let page_count = total.div_ceil(per_page).max(1);

    if lines.is_empty() {
        return vec![CreateEmbed::new()
            .color(MAIN_COLOR)
            .title(title.to_string())
            .description("*nothing here*")];
    }

    lines
        .chunks(per_page)
        .enumerate()
        .map(|(page, chunk)| {
            let body = chunk
                .iter()
                .enumerate()
                .map(|(i, line)| format!("`{}.` {line}", page * per_page + i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            CreateEmbed::new()
                .color(MAIN_COLOR)
                .title(title.to_string())
                .description(body)
                .footer(CreateEmbedFooter::new(format!(
                    "Page {}/{page_count} ({total} entries)",
                    page + 1
                )))
        })
        .collect()
}

/// Send embeds behind previous/next/cancel buttons gated to the invoker.
/// A single page is sent without components.
pub async fn paginate(ctx: Context<'_>, pages: Vec<CreateEmbed>) -> Result<(), Error> {
    let Some(first) = pages.first() else {
        return Ok(());
    };
    if pages.len() == 1 {
        ctx.send(poise::CreateReply::default().embed(first.clone()))
            .await?;
        return Ok(());
    }

    let ctx_id = ctx.id();
    let prev_id = format!("{ctx_id}prev");
    let next_id = format!("{ctx_id}next");
    let cancel_id = format!("{ctx_id}cancel");

    let components = CreateActionRow::Buttons(vec![
        CreateButton::new(&prev_id)
            .emoji('◀')
            .style(ButtonStyle::Primary),
        CreateButton::new(&next_id)
            .emoji('▶')
            .style(ButtonStyle::Primary),
        CreateButton::new(&cancel_id)
            .emoji('🗑')
            .style(ButtonStyle::Danger),
    ]);

    let msg = ctx
        .send(
            poise::CreateReply::default()
                .embed(first.clone())
                .components(vec![components]),
        )
        .await?;

    let mut current = 0usize;
    while let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
        .filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
        .timeout(PAGE_TIMEOUT)
        .await
    {
        if press.user.id != ctx.author().id {
            press
                .create_response(ctx.serenity_context(), CreateInteractionResponse::Acknowledge)
                .await?;
            continue;
        }

        if press.data.custom_id == next_id {
            current = (current + 1) % pages.len();
        } else if press.data.custom_id == prev_id {
            current = current.checked_sub(1).unwrap_or(pages.len() - 1);
        } else if press.data.custom_id == cancel_id {
            press
                .create_response(ctx.serenity_context(), CreateInteractionResponse::Acknowledge)
                .await?;
            msg.delete(ctx).await?;
            return Ok(());
        } else {
            continue;
        }

        press
            .create_response(
                ctx.serenity_context(),
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().embed(pages[current].clone()),
                ),
            )
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn empty_input_still_produces_a_page() {
        let pages = chunked_pages("title", &[], 10);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn pages_split_on_the_chunk_boundary() {
        assert_eq!(chunked_pages("t", &lines(10), 10).len(), 1);
        assert_eq!(chunked_pages("t", &lines(11), 10).len(), 2);
        assert_eq!(chunked_pages("t", &lines(25), 10).len(), 3);
    }
}
