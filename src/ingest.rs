use crate::store::ledger::{ActivityRecord, PingRecord};
use crate::store::reactions::ReactionRecord;
use crate::store::Stores;
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

/// Discord marks spoilered uploads by prefixing the stored filename.
pub const SPOILER_ATTACHMENT_PREFIX: &str = "SPOILER_";

#[derive(Debug, Clone)]
pub struct RoleMentionInfo {
    pub role_id: String,
    pub mentionable: bool,
}

/// What the ingestion filter needs to know about an inbound message,
/// extracted from the SDK type at the event boundary.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub author_id: String,
    pub author_is_bot: bool,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub role_mentions: Vec<RoleMentionInfo>,
}

/// A reaction-added event plus the parent message's spoiler signals.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub reactor_id: String,
    pub reactor_is_bot: bool,
    pub guild_id: Option<String>,
    pub message_id: String,
    pub emoji: String,
    pub attachment_names: Vec<String>,
    pub message_body: String,
}

pub fn message_event(ctx: &serenity::Context, message: &serenity::Message) -> MessageEvent {
    let role_mentions = message
        .guild(&ctx.cache)
        .map(|guild| {
            message
                .mention_roles
                .iter()
                .filter_map(|role_id| guild.roles.get(role_id))
                .map(|role| RoleMentionInfo {
                    role_id: role.id.to_string(),
                    mentionable: role.mentionable,
                })
                .collect()
        })
        .unwrap_or_default();

    MessageEvent {
        author_id: message.author.id.to_string(),
        author_is_bot: message.author.bot,
        guild_id: message.guild_id.map(|id| id.to_string()),
        channel_id: message.channel_id.to_string(),
        role_mentions,
    }
}

pub async fn reaction_event(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
) -> Result<ReactionEvent, serenity::Error> {
    let user = reaction.user(&ctx.http).await?;
    let message = reaction.message(&ctx.http).await?;
    Ok(ReactionEvent {
        reactor_id: user.id.to_string(),
        reactor_is_bot: user.bot,
        guild_id: reaction.guild_id.map(|id| id.to_string()),
        message_id: reaction.message_id.to_string(),
        emoji: reaction.emoji.to_string(),
        attachment_names: message
            .attachments
            .iter()
            .map(|attachment| attachment.filename.clone())
            .collect(),
        message_body: message.content.clone(),
    })
}

/// A message counts as spoiler content if any attachment filename carries
/// the spoiler prefix or the body contains a `||...||` delimiter pair.
pub fn is_spoiler(body: &str, attachment_names: &[String]) -> bool {
    if attachment_names
        .iter()
        .any(|name| name.starts_with(SPOILER_ATTACHMENT_PREFIX))
    {
        return true;
    }
    body.find("||")
        .map_or(false, |start| body[start + 2..].contains("||"))
}

/// Record one activity event and one ping per mentionable role mention.
/// Bots and DMs are ignored. Appends are best-effort: a storage failure
/// is logged and the event handler keeps going.
pub fn record_message(stores: &Stores, event: &MessageEvent) {
    if event.author_is_bot {
        return;
    }
    let Some(guild_id) = &event.guild_id else {
        return;
    };

    if let Err(e) = stores.activity.append(&ActivityRecord::new(
        guild_id,
        &event.author_id,
        &event.channel_id,
    )) {
        warn!("Failed to record message activity: {}", e);
    }

    for mention in &event.role_mentions {
        // Non-mentionable roles stay out of the ping economy
        if !mention.mentionable {
            continue;
        }
        debug!(
            "Recording ping of role {} by user {} in guild {}",
            mention.role_id, event.author_id, guild_id
        );
        if let Err(e) = stores.pings.append(&PingRecord::new(
            guild_id,
            &mention.role_id,
            &event.author_id,
            &event.channel_id,
        )) {
            warn!("Failed to record role ping: {}", e);
        }
    }
}

/// Record a reaction if the reactor is human and the parent message is
/// spoiler content. Best-effort like [`record_message`].
pub fn record_reaction(stores: &Stores, event: &ReactionEvent) {
    if event.reactor_is_bot {
        return;
    }
    let Some(guild_id) = &event.guild_id else {
        return;
    };
    if !is_spoiler(&event.message_body, &event.attachment_names) {
        return;
    }
    if let Err(e) = stores.reactions.append(
        guild_id,
        &ReactionRecord::new(&event.message_id, &event.reactor_id, &event.emoji),
    ) {
        warn!("Failed to record spoiler reaction: {}", e);
    }
}
