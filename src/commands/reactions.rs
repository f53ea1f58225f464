use super::{role_name, EMBED_COLOR};
use crate::stats::rank;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::{HashMap, HashSet};

/// Configure which roles compete in the reaction ranking (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setrankroles(
    ctx: Context<'_>,
    #[description = "First role"] role1: serenity::Role,
    #[description = "Second role"] role2: Option<serenity::Role>,
    #[description = "Third role"] role3: Option<serenity::Role>,
    #[description = "Fourth role"] role4: Option<serenity::Role>,
    #[description = "Fifth role"] role5: Option<serenity::Role>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;

    let roles: Vec<serenity::Role> = [Some(role1), role2, role3, role4, role5]
        .into_iter()
        .flatten()
        .collect();
    let role_ids: Vec<String> = roles.iter().map(|role| role.id.to_string()).collect();
    ctx.data()
        .stores
        .reactions
        .save_rank_roles(&guild_id.to_string(), &role_ids)?;

    let names: Vec<String> = roles.iter().map(|role| format!("**{}**", role.name)).collect();
    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Rank roles set: {}.", names.join(", ")))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show reaction totals per configured rank role
#[poise::command(slash_command, guild_only)]
pub async fn rankroles(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let store = &ctx.data().stores.reactions;

    let rank_roles = store.load_rank_roles(&guild_id.to_string())?;
    if rank_roles.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No rank roles configured. An admin can set them with `/setrankroles`.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let reactions = store.read_all(&guild_id.to_string())?;
    if reactions.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No reactions recorded for this server yet.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    // Current memberships, resolved at query time from the guild cache
    let memberships: HashMap<String, HashSet<String>> = {
        let guild = ctx.guild().ok_or("Must be run in a guild")?;
        guild
            .members
            .values()
            .map(|member| {
                (
                    member.user.id.to_string(),
                    member.roles.iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect()
    };

    let totals = rank::rank_role_totals(&reactions, &rank_roles, &memberships);
    let lines: Vec<String> = totals
        .iter()
        .filter_map(|(role_id, total)| {
            // Roles deleted since configuration are skipped silently
            role_name(ctx, role_id).map(|name| (name, total))
        })
        .enumerate()
        .map(|(idx, (name, total))| format!("{}. **{}** — {} reactions", idx + 1, name, total))
        .collect();

    if lines.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("None of the configured rank roles exist anymore.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("🥇 Reaction Rank Roles")
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Drop this server's reaction data (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn resetreactions(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let existed = ctx
        .data()
        .stores
        .reactions
        .reset(&guild_id.to_string())?;
    let content = if existed {
        "✅ Reaction data for this server has been reset."
    } else {
        "Nothing to reset — no reaction data for this server."
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
