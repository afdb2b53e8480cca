//! Guild-protection pipeline driven by audit log entries.
//!
//! An attacker with a dangerous role can fire many destructive actions
//! before the first punishment lands, so processing is serialized per
//! (guild, actor) and the actor's live permission state is re-checked under
//! the lock before anything irreversible happens.

use std::collections::HashMap;
use std::time::Duration;

use poise::serenity_prelude::{
    self as serenity,
    audit_log::{Action, Change},
    ChannelAction, EmojiAction, MemberAction, RoleAction, StickerAction, WebhookAction,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db::{decode_id, encode_id};
use crate::error::Result;
use crate::locks::KeyedLocks;

/// Permissions that make a member capable of escalating or nuking.
pub const DANGEROUS_MEMBER: serenity::Permissions = serenity::Permissions::ADMINISTRATOR
    .union(serenity::Permissions::MANAGE_CHANNELS)
    .union(serenity::Permissions::MANAGE_ROLES)
    .union(serenity::Permissions::MANAGE_GUILD_EXPRESSIONS)
    .union(serenity::Permissions::KICK_MEMBERS)
    .union(serenity::Permissions::BAN_MEMBERS)
    .union(serenity::Permissions::MANAGE_WEBHOOKS)
    .union(serenity::Permissions::MANAGE_GUILD);

/// Permissions that make a *role* dangerous to hand out or edit in. Wider
/// than the member set: these also cover disruption rather than takeover.
pub const DANGEROUS_ROLE: serenity::Permissions = DANGEROUS_MEMBER
    .union(serenity::Permissions::MANAGE_EVENTS)
    .union(serenity::Permissions::MANAGE_MESSAGES)
    .union(serenity::Permissions::MANAGE_NICKNAMES)
    .union(serenity::Permissions::MANAGE_THREADS)
    .union(serenity::Permissions::CREATE_GUILD_EXPRESSIONS)
    .union(serenity::Permissions::MENTION_EVERYONE)
    .union(serenity::Permissions::MOVE_MEMBERS)
    .union(serenity::Permissions::MUTE_MEMBERS)
    .union(serenity::Permissions::DEAFEN_MEMBERS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum Punishment {
    #[name = "ban"]
    Ban,
    #[name = "kick"]
    Kick,
    #[name = "strip"]
    Strip,
}

impl std::fmt::Display for Punishment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Punishment::Ban => "ban",
            Punishment::Kick => "kick",
            Punishment::Strip => "strip",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub punishment: Punishment,
}

/// The audit log actions the feature can guard, keyed by the strings stored
/// in the `modules` JSONB map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectedAction {
    Ban,
    Kick,
    BotAdd,
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    MemberRoleUpdate,
    ChannelCreate,
    ChannelDelete,
    WebhookCreate,
    WebhookDelete,
    EmojiCreate,
    EmojiDelete,
    StickerCreate,
    StickerDelete,
}

impl ProtectedAction {
    pub const ALL: &'static [ProtectedAction] = &[
        ProtectedAction::Ban,
        ProtectedAction::Kick,
        ProtectedAction::BotAdd,
        ProtectedAction::RoleCreate,
        ProtectedAction::RoleUpdate,
        ProtectedAction::RoleDelete,
        ProtectedAction::MemberRoleUpdate,
        ProtectedAction::ChannelCreate,
        ProtectedAction::ChannelDelete,
        ProtectedAction::WebhookCreate,
        ProtectedAction::WebhookDelete,
        ProtectedAction::EmojiCreate,
        ProtectedAction::EmojiDelete,
        ProtectedAction::StickerCreate,
        ProtectedAction::StickerDelete,
    ];

    pub fn classify(action: &Action) -> Option<Self> {
        match action {
            Action::Member(MemberAction::BanAdd) => Some(Self::Ban),
            Action::Member(MemberAction::Kick) => Some(Self::Kick),
            Action::Member(MemberAction::BotAdd) => Some(Self::BotAdd),
            Action::Member(MemberAction::RoleUpdate) => Some(Self::MemberRoleUpdate),
            Action::Role(RoleAction::Create) => Some(Self::RoleCreate),
            Action::Role(RoleAction::Update) => Some(Self::RoleUpdate),
            Action::Role(RoleAction::Delete) => Some(Self::RoleDelete),
            Action::Channel(ChannelAction::Create) => Some(Self::ChannelCreate),
            Action::Channel(ChannelAction::Delete) => Some(Self::ChannelDelete),
            Action::Webhook(WebhookAction::Create) => Some(Self::WebhookCreate),
            Action::Webhook(WebhookAction::Delete) => Some(Self::WebhookDelete),
            Action::Emoji(EmojiAction::Create) => Some(Self::EmojiCreate),
            Action::Emoji(EmojiAction::Delete) => Some(Self::EmojiDelete),
            Action::Sticker(StickerAction::Create) => Some(Self::StickerCreate),
            Action::Sticker(StickerAction::Delete) => Some(Self::StickerDelete),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::BotAdd => "botadd",
            Self::RoleCreate => "role_create",
            Self::RoleUpdate => "role_update",
            Self::RoleDelete => "role_delete",
            Self::MemberRoleUpdate => "member_role_update",
            Self::ChannelCreate => "channel_create",
            Self::ChannelDelete => "channel_delete",
            Self::WebhookCreate => "webhook_create",
            Self::WebhookDelete => "webhook_delete",
            Self::EmojiCreate => "emoji_create",
            Self::EmojiDelete => "emoji_delete",
            Self::StickerCreate => "sticker_create",
            Self::StickerDelete => "sticker_delete",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.key() == key)
    }

    /// "Role Create", "Member Role Update", ... for embeds and reasons.
    pub fn title(self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// "role create", ... for command confirmations.
    pub fn name(self) -> String {
        self.key().replace('_', " ")
    }

    pub fn is_create(self) -> bool {
        matches!(
            self,
            Self::RoleCreate
                | Self::ChannelCreate
                | Self::WebhookCreate
                | Self::EmojiCreate
                | Self::StickerCreate
        )
    }
}

impl std::fmt::Display for ProtectedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

pub type ModuleMap = HashMap<String, ModuleConfig>;

#[derive(Debug, sqlx::FromRow)]
pub struct AntinukeConfig {
    pub guild_id: i64,
    pub logs: Option<i64>,
    pub owners: Vec<i64>,
    pub whitelisted: Vec<i64>,
    pub modules: sqlx::types::Json<ModuleMap>,
}

impl AntinukeConfig {
    pub async fn fetch(db: &PgPool, guild_id: serenity::GuildId) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, Self>("SELECT * FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub fn module(&self, action: ProtectedAction) -> Option<ModuleConfig> {
        self.modules.0.get(action.key()).copied()
    }

    pub fn is_exempt(&self, user_id: serenity::UserId) -> bool {
        let id = encode_id(user_id.get());
        self.owners.contains(&id) || self.whitelisted.contains(&id)
    }

    pub fn log_channel(&self) -> Option<serenity::ChannelId> {
        self.logs.map(|id| serenity::ChannelId::new(decode_id(id)))
    }
}

pub async fn fetch_modules(
    db: &PgPool,
    guild_id: serenity::GuildId,
) -> Result<Option<ModuleMap>> {
    let row: Option<(sqlx::types::Json<ModuleMap>,)> =
        sqlx::query_as("SELECT modules FROM antinuke WHERE guild_id = $1")
            .bind(encode_id(guild_id.get()))
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(modules,)| modules.0))
}

pub async fn save_modules(
    db: &PgPool,
    guild_id: serenity::GuildId,
    modules: &ModuleMap,
) -> Result<()> {
    sqlx::query("UPDATE antinuke SET modules = $1 WHERE guild_id = $2")
        .bind(sqlx::types::Json(modules))
        .bind(encode_id(guild_id.get()))
        .execute(db)
        .await?;
    Ok(())
}

/// Live state of a member, read from the gateway cache in one borrow.
struct LiveMember {
    dangerous: bool,
    punishable: bool,
    /// Roles the bot could not remove anyway; these survive a strip.
    keep_roles: Vec<serenity::RoleId>,
}

fn live_member(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    member: &serenity::Member,
) -> Option<LiveMember> {
    let bot_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;

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
    let permissions = guild.member_permissions(member);

    let keep_roles = member
        .roles
        .iter()
        .copied()
        .filter(|id| {
            guild
                .roles
                .get(id)
                .map(|r| r.managed || r.position >= bot_top)
                .unwrap_or(false)
        })
        .collect();

    Some(LiveMember {
        dangerous: permissions.intersects(DANGEROUS_MEMBER),
        punishable: member.user.id != guild.owner_id && member_top < bot_top,
        keep_roles,
    })
}

#[derive(Debug, Default)]
pub struct Antinuke {
    locks: KeyedLocks<(serenity::GuildId, serenity::UserId)>,
}

impl Antinuke {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn handle(
        &self,
        ctx: &serenity::Context,
        db: &PgPool,
        guild_id: serenity::GuildId,
        entry: &serenity::AuditLogEntry,
    ) -> Result<()> {
        let Some(action) = ProtectedAction::classify(&entry.action) else {
            return Ok(());
        };

        let bot_id = ctx.cache.current_user().id;
        if entry.user_id == bot_id {
            return Ok(());
        }

        let Some(config) = AntinukeConfig::fetch(db, guild_id).await? else {
            return Ok(());
        };
        let Some(module) = config.module(action) else {
            return Ok(());
        };
        if config.is_exempt(entry.user_id) {
            return Ok(());
        }

        let (owner_id, bot_can_punish) = {
            let Some(guild) = ctx.cache.guild(guild_id) else {
                return Ok(());
            };
            let permissions = guild
                .members
                .get(&bot_id)
                .map(|m| guild.member_permissions(m))
                .unwrap_or_default();
            let required = serenity::Permissions::KICK_MEMBERS
                | serenity::Permissions::BAN_MEMBERS
                | serenity::Permissions::MANAGE_ROLES;
            (guild.owner_id, permissions.contains(required))
        };
        if entry.user_id == owner_id || !bot_can_punish {
            return Ok(());
        }

        // Undo the damage before queueing on the lock; every subsequent
        // event from the same actor still gets its creation reverted even
        // while the first punishment is in flight.
        if action.is_create() {
            self.undo_create(ctx, guild_id, action, entry).await;
        }

        let lock = self.locks.get((guild_id, entry.user_id));
        let _guard = lock.lock().await;

        // Re-validate under the lock: a previous entry may already have
        // banned or stripped this actor.
        let actor = match guild_id.member(&ctx.http, entry.user_id).await {
            Ok(member) => member,
            Err(_) => return Ok(()),
        };
        let Some(live) = live_member(ctx, guild_id, &actor) else {
            return Ok(());
        };
        if !live.dangerous || !live.punishable {
            return Ok(());
        }

        match action {
            ProtectedAction::RoleUpdate => {
                self.revert_role_update(ctx, guild_id, entry).await;
            }
            ProtectedAction::MemberRoleUpdate => {
                let granted = dangerous_granted_roles(ctx, guild_id, entry);
                if granted.is_empty() {
                    return Ok(());
                }
                self.revoke_granted_roles(ctx, guild_id, entry, &granted).await;
            }
            _ => {}
        }

        let reason = format!("Antinuke: {}", action.title());
        self.punish(ctx, guild_id, &actor, module.punishment, &reason, live.keep_roles)
            .await?;
        info!(
            "antinuke punished {} ({}) in {guild_id} for {action}",
            actor.user.name, actor.user.id
        );

        let elapsed = elapsed_since(entry.id.created_at());
        self.report(ctx, guild_id, &config, &actor.user, action, elapsed)
            .await;
        Ok(())
    }

    async fn undo_create(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        action: ProtectedAction,
        entry: &serenity::AuditLogEntry,
    ) {
        let Some(target) = entry.target_id else {
            return;
        };
        let result = match action {
            ProtectedAction::ChannelCreate => serenity::ChannelId::new(target.get())
                .delete(&ctx.http)
                .await
                .map(|_| ()),
            ProtectedAction::RoleCreate => {
                guild_id
                    .delete_role(&ctx.http, serenity::RoleId::new(target.get()))
                    .await
            }
            ProtectedAction::WebhookCreate => {
                ctx.http
                    .delete_webhook(serenity::WebhookId::new(target.get()), Some("Antinuke"))
                    .await
            }
            ProtectedAction::EmojiCreate => {
                guild_id
                    .delete_emoji(&ctx.http, serenity::EmojiId::new(target.get()))
                    .await
            }
            ProtectedAction::StickerCreate => {
                guild_id
                    .delete_sticker(&ctx.http, serenity::StickerId::new(target.get()))
                    .await
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!("failed to undo {action} in {guild_id}: {e}");
        }
    }

    /// Restore a role that was edited to be dangerous or mass-mentionable.
    async fn revert_role_update(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        entry: &serenity::AuditLogEntry,
    ) {
        let Some(target) = entry.target_id else {
            return;
        };
        let role_id = serenity::RoleId::new(target.get());

        let mut edit = serenity::EditRole::new();
        let mut dirty = false;
        for change in entry.changes.iter().flatten() {
            match change {
                Change::Permissions {
                    old: Some(old),
                    new: Some(new),
                } => {
                    if !old.intersects(DANGEROUS_ROLE) && new.intersects(DANGEROUS_ROLE) {
                        edit = edit.permissions(*old);
                        dirty = true;
                    }
                }
                Change::Mentionable { old, new } => {
                    if *old != Some(true) && *new == Some(true) {
                        edit = edit.mentionable(false);
                        dirty = true;
                    }
                }
                _ => {}
            }
        }

        if dirty {
            if let Err(e) = guild_id
                .edit_role(&ctx.http, role_id, edit.audit_log_reason("Restoring role"))
                .await
            {
                warn!("failed to restore role {role_id} in {guild_id}: {e}");
            }
        }
    }

    async fn revoke_granted_roles(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        entry: &serenity::AuditLogEntry,
        granted: &[serenity::RoleId],
    ) {
        let Some(target) = entry.target_id else {
            return;
        };
        let target_id = serenity::UserId::new(target.get());
        match guild_id.member(&ctx.http, target_id).await {
            Ok(member) => {
                if let Err(e) = member.remove_roles(&ctx.http, granted).await {
                    warn!("failed to revoke granted roles in {guild_id}: {e}");
                }
            }
            Err(e) => warn!("failed to fetch role grant target in {guild_id}: {e}"),
        }
    }

    async fn punish(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        actor: &serenity::Member,
        punishment: Punishment,
        reason: &str,
        keep_roles: Vec<serenity::RoleId>,
    ) -> Result<()> {
        // A compromised or malicious bot is always removed, whatever the
        // configured punishment.
        if actor.user.bot {
            actor.kick_with_reason(&ctx.http, reason).await?;
            return Ok(());
        }

        match punishment {
            Punishment::Ban => {
                guild_id
                    .ban_with_reason(&ctx.http, actor.user.id, 0, reason)
                    .await?;
            }
            Punishment::Kick => {
                guild_id
                    .kick_with_reason(&ctx.http, actor.user.id, reason)
                    .await?;
            }
            Punishment::Strip => {
                guild_id
                    .edit_member(
                        &ctx.http,
                        actor.user.id,
                        serenity::EditMember::new()
                            .roles(keep_roles)
                            .audit_log_reason(reason),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Log channel first, guild owner DM as the fallback. Failures are not
    /// propagated; the punishment already happened.
    async fn report(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        config: &AntinukeConfig,
        actor: &serenity::User,
        action: ProtectedAction,
        elapsed: Duration,
    ) {
        let guild_info = ctx
            .cache
            .guild(guild_id)
            .map(|g| (g.name.clone(), g.icon_url(), g.owner_id));
        let Some((guild_name, guild_icon, owner_id)) = guild_info else {
            return;
        };

        let mut author = serenity::CreateEmbedAuthor::new(guild_name);
        if let Some(icon) = guild_icon {
            author = author.icon_url(icon);
        }
        let embed = serenity::CreateEmbed::new()
            .color(crate::reply::MAIN_COLOR)
            .title(action.title())
            .author(author)
            .field("User", format!("**{}** (`{}`)", actor.name, actor.id), false)
            .field("Reason", action.title(), false)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "User was punished in {}",
                humantime::format_duration(elapsed)
            )))
            .timestamp(serenity::Timestamp::now());
        let message = serenity::CreateMessage::new().embed(embed);

        if let Some(channel) = config.log_channel() {
            if channel.send_message(&ctx.http, message.clone()).await.is_ok() {
                return;
            }
        }
        if let Ok(owner) = owner_id.to_user(&ctx.http).await {
            let _ = owner.direct_message(&ctx.http, message).await;
        }
    }
}

/// Roles granted in a member-role-update entry that are both dangerous and
/// ones the bot can take back.
fn dangerous_granted_roles(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    entry: &serenity::AuditLogEntry,
) -> Vec<serenity::RoleId> {
    let granted: Vec<serenity::RoleId> = entry
        .changes
        .iter()
        .flatten()
        .filter_map(|change| match change {
            Change::RolesAdded { new, .. } => new.clone(),
            _ => None,
        })
        .flatten()
        .map(|role| role.id)
        .collect();
    if granted.is_empty() {
        return Vec::new();
    }

    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return Vec::new();
    };
    let bot_top = guild
        .members
        .get(&bot_id)
        .and_then(|m| guild.member_highest_role(m))
        .map(|r| r.position)
        .unwrap_or_default();

    granted
        .into_iter()
        .filter(|id| {
            guild
                .roles
                .get(id)
                .map(|r| r.permissions.intersects(DANGEROUS_ROLE) && !r.managed && r.position < bot_top)
                .unwrap_or(false)
        })
        .collect()
}

fn elapsed_since(created: serenity::Timestamp) -> Duration {
    let ms = chrono::Utc::now().timestamp_millis() - created.unix_timestamp() * 1000;
    Duration::from_millis(ms.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_guarded_action() {
        let cases = [
            (Action::Member(MemberAction::BanAdd), ProtectedAction::Ban),
            (Action::Member(MemberAction::Kick), ProtectedAction::Kick),
            (Action::Member(MemberAction::BotAdd), ProtectedAction::BotAdd),
            (
                Action::Member(MemberAction::RoleUpdate),
                ProtectedAction::MemberRoleUpdate,
            ),
            (Action::Role(RoleAction::Create), ProtectedAction::RoleCreate),
            (Action::Role(RoleAction::Update), ProtectedAction::RoleUpdate),
            (Action::Role(RoleAction::Delete), ProtectedAction::RoleDelete),
            (
                Action::Channel(ChannelAction::Create),
                ProtectedAction::ChannelCreate,
            ),
            (
                Action::Channel(ChannelAction::Delete),
                ProtectedAction::ChannelDelete,
            ),
            (
                Action::Webhook(WebhookAction::Create),
                ProtectedAction::WebhookCreate,
            ),
            (
                Action::Webhook(WebhookAction::Delete),
                ProtectedAction::WebhookDelete,
            ),
            (Action::Emoji(EmojiAction::Create), ProtectedAction::EmojiCreate),
            (Action::Emoji(EmojiAction::Delete), ProtectedAction::EmojiDelete),
            (
                Action::Sticker(StickerAction::Create),
                ProtectedAction::StickerCreate,
            ),
            (
                Action::Sticker(StickerAction::Delete),
                ProtectedAction::StickerDelete,
            ),
        ];
        for (action, expected) in cases {
            assert_eq!(ProtectedAction::classify(&action), Some(expected));
        }
    }

    #[test]
    fn unguarded_actions_are_ignored() {
        assert_eq!(ProtectedAction::classify(&Action::GuildUpdate), None);
        assert_eq!(
            ProtectedAction::classify(&Action::Member(MemberAction::Update)),
            None
        );
        assert_eq!(
            ProtectedAction::classify(&Action::Channel(ChannelAction::Update)),
            None
        );
    }

    #[test]
    fn keys_round_trip() {
        for action in ProtectedAction::ALL {
            assert_eq!(ProtectedAction::from_key(action.key()), Some(*action));
        }
        assert_eq!(ProtectedAction::from_key("vanity"), None);
    }

    #[test]
    fn titles_read_like_audit_actions() {
        assert_eq!(ProtectedAction::ChannelDelete.title(), "Channel Delete");
        assert_eq!(
            ProtectedAction::MemberRoleUpdate.title(),
            "Member Role Update"
        );
        assert_eq!(ProtectedAction::Ban.title(), "Ban");
        assert_eq!(ProtectedAction::ChannelDelete.name(), "channel delete");
    }

    #[test]
    fn module_map_round_trips_through_json() {
        let mut modules = ModuleMap::new();
        modules.insert(
            "ban".into(),
            ModuleConfig {
                punishment: Punishment::Strip,
            },
        );
        let json = serde_json::to_string(&modules).unwrap();
        assert!(json.contains("\"strip\""));
        let back: ModuleMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, modules);
    }

    #[test]
    fn legacy_module_json_deserializes() {
        // Shape written by earlier deployments.
        let json = r#"{"channel_delete": {"punishment": "ban"}, "kick": {"punishment": "kick"}}"#;
        let modules: ModuleMap = serde_json::from_str(json).unwrap();
        assert_eq!(
            modules.get("channel_delete").unwrap().punishment,
            Punishment::Ban
        );
    }

    #[test]
    fn exemptions_cover_owners_and_whitelist() {
        let config = AntinukeConfig {
            guild_id: 1,
            logs: None,
            owners: vec![10],
            whitelisted: vec![20],
            modules: sqlx::types::Json(ModuleMap::new()),
        };
        assert!(config.is_exempt(serenity::UserId::new(10)));
        assert!(config.is_exempt(serenity::UserId::new(20)));
        assert!(!config.is_exempt(serenity::UserId::new(30)));
    }

    #[test]
    fn dangerous_sets_are_nested() {
        assert!(DANGEROUS_ROLE.contains(DANGEROUS_MEMBER));
        assert!(!DANGEROUS_MEMBER.contains(serenity::Permissions::MENTION_EVERYONE));
        assert!(DANGEROUS_ROLE.contains(serenity::Permissions::MENTION_EVERYONE));
    }
}
