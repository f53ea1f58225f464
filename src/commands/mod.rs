pub mod activity;
pub mod help;
pub mod pings;
pub mod reactions;

use crate::Context;
use poise::serenity_prelude as serenity;

/// Blurple, the accent color used across embeds.
pub const EMBED_COLOR: u32 = 0x5865F2;

/// Display name for a member, or a placeholder when they have left.
pub fn member_name(ctx: Context<'_>, user_id: &str) -> String {
    let resolved = user_id.parse::<u64>().ok().and_then(|id| {
        ctx.guild().and_then(|guild| {
            guild
                .members
                .get(&serenity::UserId::new(id))
                .map(|member| member.display_name().to_string())
        })
    });
    resolved.unwrap_or_else(|| format!("<User {user_id}>"))
}

/// Name of a role that still exists in the guild.
pub fn role_name(ctx: Context<'_>, role_id: &str) -> Option<String> {
    let id = role_id.parse::<u64>().ok()?;
    ctx.guild()
        .and_then(|guild| guild.roles.get(&serenity::RoleId::new(id)).map(|r| r.name.clone()))
}
