//! Renderer for user-configurable message scripts.
//!
//! A script is either plain text, or a sequence of `{key: value}` segments
//! describing an embed (`{title: hi} {description: welcome {user.name}}`).
//! Values may reference `{user.*}` / `{guild.*}` placeholders, which are
//! substituted from a [`TemplateContext`] built off the triggering member.

use std::sync::OnceLock;

use poise::serenity_prelude as serenity;
use regex::Regex;

use crate::reply::MAIN_COLOR;

fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // One nested brace level is allowed inside a value, for placeholders.
    RE.get_or_init(|| {
        Regex::new(r"\{([^{}]+?):\s*((?:[^{}]|\{[^{}]*?\})+)\}").expect("valid script regex")
    })
}

#[derive(Debug, Default, Clone)]
pub struct TemplateContext {
    values: Vec<(String, String)>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.push((key.to_string(), value.into()));
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Substitute every known `{placeholder}` occurrence in `text`.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, value) in &self.values {
            let token = format!("{{{key}}}");
            if out.contains(&token) {
                out = out.replace(&token, value);
            }
        }
        out
    }

    /// Build the standard placeholder set for a member of a cached guild.
    pub fn for_member(user: &serenity::User, joined_at: Option<serenity::Timestamp>, guild: &serenity::Guild) -> Self {
        let mut ctx = Self::new();
        ctx.set("user.mention", format!("<@{}>", user.id));
        ctx.set("user.id", user.id.to_string());
        ctx.set("user.name", user.name.clone());
        ctx.set(
            "user.global_name",
            user.global_name.clone().unwrap_or_else(|| user.name.clone()),
        );
        ctx.set("user.avatar", user.face());
        ctx.set("user.created_at", user.id.created_at().to_string());
        if let Some(joined_at) = joined_at {
            ctx.set("user.joined_at", joined_at.to_string());
        }

        ctx.set("guild.name", guild.name.clone());
        ctx.set("guild.id", guild.id.to_string());
        ctx.set("guild.icon", guild.icon_url().unwrap_or_default());
        ctx.set("guild.banner", guild.banner_url().unwrap_or_default());
        ctx.set("guild.created_at", guild.id.created_at().to_string());
        ctx.set("guild.member_count", guild.member_count.to_string());
        ctx.set(
            "guild.boosts",
            guild.premium_subscription_count.unwrap_or(0).to_string(),
        );
        ctx.set("guild.boost_level", boost_level(guild.premium_tier).to_string());

        ctx.set("guild.owner.mention", format!("<@{}>", guild.owner_id));
        ctx.set("guild.owner.id", guild.owner_id.to_string());
        if let Some(owner) = guild.members.get(&guild.owner_id) {
            ctx.set("guild.owner.name", owner.user.name.clone());
        }

        ctx
    }
}

fn boost_level(tier: serenity::PremiumTier) -> u8 {
    match tier {
        serenity::PremiumTier::Tier0 => 0,
        serenity::PremiumTier::Tier1 => 1,
        serenity::PremiumTier::Tier2 => 2,
        serenity::PremiumTier::Tier3 => 3,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptButton {
    pub label: String,
    pub url: Option<String>,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedScript {
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub author: Option<EmbedAuthor>,
    pub footer: Option<EmbedFooter>,
    pub fields: Vec<(String, String, bool)>,
    pub timestamp: Option<String>,
    pub delete_after: Option<u64>,
    pub buttons: Vec<ScriptButton>,
}

fn split_parts(raw: &str) -> Vec<&str> {
    raw.split(" && ").map(str::trim).collect()
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn parse_color(raw: &str) -> u32 {
    u32::from_str_radix(raw.trim().trim_start_matches('#'), 16).unwrap_or(MAIN_COLOR)
}

/// Parse a script and substitute placeholders. Unknown keys are ignored,
/// malformed segments are skipped; this never fails.
pub fn parse(script: &str, ctx: &TemplateContext) -> ParsedScript {
    let params: Vec<(String, String)> = param_regex()
        .captures_iter(script)
        .map(|c| (c[1].trim().to_string(), c[2].to_string()))
        .collect();

    if params.is_empty() {
        return ParsedScript {
            content: Some(ctx.apply(script)),
            ..Default::default()
        };
    }

    let mut parsed = ParsedScript::default();
    for (key, raw) in params {
        match key.as_str() {
            "title" => parsed.title = Some(ctx.apply(&raw)),
            "description" => parsed.description = Some(ctx.apply(&raw)),
            "content" => parsed.content = Some(ctx.apply(&raw)),
            "thumbnail" => parsed.thumbnail = Some(ctx.apply(raw.trim())),
            "image" => parsed.image = Some(ctx.apply(raw.trim())),
            "color" => parsed.color = Some(parse_color(&raw)),
            "timestamp" => {
                parsed.timestamp = match raw.trim() {
                    "now" => Some(chrono::Utc::now().to_rfc3339()),
                    "joined_at" => ctx.value("user.joined_at"),
                    "created_at" => ctx.value("user.created_at"),
                    _ => None,
                }
            }
            "delete" => parsed.delete_after = raw.trim().parse().ok(),
            "author" => {
                let parts = split_parts(&raw);
                parsed.author = Some(EmbedAuthor {
                    name: ctx.apply(parts[0]),
                    icon_url: parts.get(1).map(|p| ctx.apply(p)),
                    url: parts.get(2).map(|p| ctx.apply(p)),
                });
            }
            "footer" => {
                let parts = split_parts(&raw);
                parsed.footer = Some(EmbedFooter {
                    text: ctx.apply(parts[0]),
                    icon_url: parts.get(1).map(|p| ctx.apply(p)),
                });
            }
            "field" => {
                let parts = split_parts(&raw);
                if parts.len() >= 2 {
                    parsed.fields.push((
                        ctx.apply(parts[0]),
                        ctx.apply(parts[1]),
                        parts.get(2).is_some_and(|p| p.eq_ignore_ascii_case("true")),
                    ));
                }
            }
            "button" => {
                let parts = split_parts(&raw);
                let label = ctx.apply(parts[0]);
                let mut url = None;
                let mut emoji = None;
                for extra in parts.iter().skip(1) {
                    let extra = ctx.apply(extra);
                    if extra.is_empty() {
                        continue;
                    }
                    if looks_like_url(&extra) {
                        url = Some(extra);
                    } else {
                        emoji = Some(extra);
                    }
                }
                parsed.buttons.push(ScriptButton { label, url, emoji });
            }
            _ => {}
        }
    }

    parsed
}

impl ParsedScript {
    pub fn has_embed(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.thumbnail.is_some()
            || self.image.is_some()
            || self.author.is_some()
            || self.footer.is_some()
            || self.timestamp.is_some()
            || !self.fields.is_empty()
    }

    pub fn embed(&self) -> Option<serenity::CreateEmbed> {
        if !self.has_embed() {
            return None;
        }

        let mut embed = serenity::CreateEmbed::new().color(self.color.unwrap_or(MAIN_COLOR));
        if let Some(title) = &self.title {
            embed = embed.title(title);
        }
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        if let Some(thumbnail) = &self.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        if let Some(image) = &self.image {
            embed = embed.image(image);
        }
        if let Some(author) = &self.author {
            let mut builder = serenity::CreateEmbedAuthor::new(&author.name);
            if let Some(icon_url) = author.icon_url.as_deref().filter(|s| !s.is_empty()) {
                builder = builder.icon_url(icon_url);
            }
            if let Some(url) = author.url.as_deref().filter(|s| !s.is_empty()) {
                builder = builder.url(url);
            }
            embed = embed.author(builder);
        }
        if let Some(footer) = &self.footer {
            let mut builder = serenity::CreateEmbedFooter::new(&footer.text);
            if let Some(icon_url) = footer.icon_url.as_deref().filter(|s| !s.is_empty()) {
                builder = builder.icon_url(icon_url);
            }
            embed = embed.footer(builder);
        }
        for (name, value, inline) in &self.fields {
            embed = embed.field(name, value, *inline);
        }
        if let Some(raw) = &self.timestamp {
            if let Ok(timestamp) = serenity::Timestamp::parse(raw) {
                embed = embed.timestamp(timestamp);
            }
        }
        Some(embed)
    }

    fn action_rows(&self) -> Vec<serenity::CreateActionRow> {
        if self.buttons.is_empty() {
            return Vec::new();
        }
        let buttons = self
            .buttons
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let mut button = match &spec.url {
                    Some(url) => serenity::CreateButton::new_link(url),
                    None => serenity::CreateButton::new(format!("script-button-{i}")).disabled(true),
                }
                .label(&spec.label);
                if let Some(raw) = &spec.emoji {
                    if let Ok(emoji) = serenity::ReactionType::try_from(raw.as_str()) {
                        button = button.emoji(emoji);
                    }
                }
                button
            })
            .collect();
        vec![serenity::CreateActionRow::Buttons(buttons)]
    }

    pub fn to_reply(&self) -> poise::CreateReply {
        let mut reply = poise::CreateReply::default();
        if let Some(content) = &self.content {
            reply = reply.content(content);
        }
        if let Some(embed) = self.embed() {
            reply = reply.embed(embed);
        }
        let rows = self.action_rows();
        if !rows.is_empty() {
            reply = reply.components(rows);
        }
        reply
    }

    pub fn to_message(&self) -> serenity::CreateMessage {
        let mut message = serenity::CreateMessage::new();
        if let Some(content) = &self.content {
            message = message.content(content);
        }
        if let Some(embed) = self.embed() {
            message = message.embed(embed);
        }
        let rows = self.action_rows();
        if !rows.is_empty() {
            message = message.components(rows);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        let mut ctx = TemplateContext::new();
        ctx.set("user.name", "milo");
        ctx.set("user.mention", "<@123>");
        ctx.set("user.joined_at", "2024-03-01T12:00:00Z");
        ctx.set("user.created_at", "2020-01-01T00:00:00Z");
        ctx.set("guild.name", "testing grounds");
        ctx
    }

    #[test]
    fn plain_text_is_content_with_substitution() {
        let parsed = parse("welcome {user.mention} to {guild.name}", &ctx());
        assert_eq!(
            parsed.content.as_deref(),
            Some("welcome <@123> to testing grounds")
        );
        assert!(!parsed.has_embed());
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let parsed = parse("hello {user.nonsense}", &ctx());
        assert_eq!(parsed.content.as_deref(), Some("hello {user.nonsense}"));
    }

    #[test]
    fn basic_embed_script() {
        let parsed = parse(
            "{title: Welcome} {description: hi {user.name}} {color: #ff0000}",
            &ctx(),
        );
        assert_eq!(parsed.title.as_deref(), Some("Welcome"));
        assert_eq!(parsed.description.as_deref(), Some("hi milo"));
        assert_eq!(parsed.color, Some(0xff0000));
        assert!(parsed.has_embed());
        assert!(parsed.embed().is_some());
    }

    #[test]
    fn invalid_color_falls_back_to_default() {
        let parsed = parse("{title: x} {color: #zzzzzz}", &ctx());
        assert_eq!(parsed.color, Some(MAIN_COLOR));
    }

    #[test]
    fn author_and_footer_split_on_double_ampersand() {
        let parsed = parse(
            "{author: {guild.name} && https://cdn.example/icon.png && https://example.com} \
             {footer: bye && https://cdn.example/f.png}",
            &ctx(),
        );
        assert_eq!(
            parsed.author,
            Some(EmbedAuthor {
                name: "testing grounds".into(),
                icon_url: Some("https://cdn.example/icon.png".into()),
                url: Some("https://example.com".into()),
            })
        );
        assert_eq!(
            parsed.footer,
            Some(EmbedFooter {
                text: "bye".into(),
                icon_url: Some("https://cdn.example/f.png".into()),
            })
        );
    }

    #[test]
    fn fields_require_name_and_value() {
        let parsed = parse(
            "{field: a && b && true} {field: c && d} {field: missing}",
            &ctx(),
        );
        assert_eq!(
            parsed.fields,
            vec![
                ("a".to_string(), "b".to_string(), true),
                ("c".to_string(), "d".to_string(), false),
            ]
        );
    }

    #[test]
    fn timestamp_sources() {
        let parsed = parse("{title: x} {timestamp: joined_at}", &ctx());
        assert_eq!(parsed.timestamp.as_deref(), Some("2024-03-01T12:00:00Z"));

        let parsed = parse("{title: x} {timestamp: now}", &ctx());
        assert!(parsed.timestamp.is_some());

        let parsed = parse("{title: x} {timestamp: whenever}", &ctx());
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn buttons_detect_url_and_emoji() {
        let parsed = parse(
            "{title: x} {button: click me && https://example.com && 🎉}",
            &ctx(),
        );
        assert_eq!(
            parsed.buttons,
            vec![ScriptButton {
                label: "click me".into(),
                url: Some("https://example.com".into()),
                emoji: Some("🎉".into()),
            }]
        );
    }

    #[test]
    fn delete_after_parses_seconds() {
        let parsed = parse("{content: bye} {delete: 10}", &ctx());
        assert_eq!(parsed.delete_after, Some(10));
        let parsed = parse("{content: bye} {delete: soon}", &ctx());
        assert_eq!(parsed.delete_after, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let parsed = parse("{title: x} {frobnicate: y}", &ctx());
        assert_eq!(parsed.title.as_deref(), Some("x"));
        assert!(parsed.description.is_none());
    }
}
