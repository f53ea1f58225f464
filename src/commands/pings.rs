use super::{member_name, role_name, EMBED_COLOR};
use crate::retention::{self, RetentionError};
use crate::stats;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show top users who pinged a specific role
#[poise::command(slash_command, guild_only)]
pub async fn rolecounts(
    ctx: Context<'_>,
    #[description = "Role to view stats for"] role: serenity::Role,
) -> Result<(), Error> {
    show_role_counts(ctx, &role).await
}

async fn show_role_counts(ctx: Context<'_>, role: &serenity::Role) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let rows = ctx.data().stores.pings.read_all()?;
    let top = stats::top_for_role(&rows, &guild_id.to_string(), &role.id.to_string(), Some(10));

    if top.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("No data yet for **{}**.", role.name))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = top
        .iter()
        .map(|(user_id, count)| format!("**{}x** — {}", count, member_name(ctx, user_id)))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("🏆 Top Role Pingers — {}", role.name))
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the role ping leaderboard
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "Role to view stats for (all roles if omitted)"] role: Option<serenity::Role>,
) -> Result<(), Error> {
    if let Some(role) = role {
        return show_role_counts(ctx, &role).await;
    }

    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let rows = ctx.data().stores.pings.read_all()?;
    let boards = stats::role_leaderboard(&rows, &guild_id.to_string(), 3);

    if boards.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No data found for this server yet.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("🌍 Server Leaderboard — All Roles")
        .color(0xFFD700);
    let mut shown = 0;
    for board in &boards {
        if shown == 5 {
            break;
        }
        // Deleted roles are skipped, not surfaced as errors
        let Some(name) = role_name(ctx, &board.role_id) else {
            continue;
        };
        shown += 1;
        let user_lines: Vec<String> = board
            .top_users
            .iter()
            .map(|(user_id, count)| format!("• **{}x**: *{}*", count, member_name(ctx, user_id)))
            .collect();
        embed = embed.field(
            format!("{}. {} — {} total pings", shown, name, board.total),
            user_lines.join("\n"),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show your personal ping stats
#[poise::command(slash_command, guild_only)]
pub async fn mycounts(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let rows = ctx.data().stores.pings.read_all()?;
    let counts =
        stats::counts_for_user(&rows, &guild_id.to_string(), &ctx.author().id.to_string());

    if counts.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("You haven't pinged any roles yet.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = counts
        .iter()
        .map(|(role_id, count)| {
            let name =
                role_name(ctx, role_id).unwrap_or_else(|| format!("<Deleted Role {role_id}>"));
            format!("**{count}x** — {name}")
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("📊 Your Ping Stats — {}", ctx.author().name))
        .description(lines.join("\n"))
        .color(0x57F287);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Reset all counts for a role (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn resetcounts(
    ctx: Context<'_>,
    #[description = "Role to reset counts for"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let removed = ctx
        .data()
        .stores
        .pings
        .reset_role(&guild_id.to_string(), &role.id.to_string())?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "✅ Counts for **{}** have been reset ({} records removed).",
                role.name, removed
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Reset your personal counts
#[poise::command(slash_command, guild_only)]
pub async fn resetmycounts(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    ctx.data()
        .stores
        .pings
        .reset_user(&guild_id.to_string(), &ctx.author().id.to_string())?;
    ctx.send(
        poise::CreateReply::default()
            .content("✅ Your counts have been reset.")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Clean up old records (Manage Server only)
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn cleanup(
    ctx: Context<'_>,
    #[description = "Delete entries older than this many days (default: 30)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(ctx.data().config.retention_days);

    let stores = &ctx.data().stores;
    let pings = match retention::cleanup_ledger(&stores.pings, days) {
        Ok(report) => report,
        Err(RetentionError::InvalidHorizon(d)) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("❌ `{d}` is not a valid number of days."))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let activity = retention::cleanup_ledger(&stores.activity, days)?;
    let reactions = retention::cleanup_reactions(&stores.reactions, &guild_id.to_string(), days)?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "🧹 Removed entries older than {} days — pings: {} removed, {} remain; \
                 activity: {} removed, {} remain; reactions: {} removed, {} remain.",
                days,
                pings.removed,
                pings.remaining,
                activity.removed,
                activity.remaining,
                reactions.removed,
                reactions.remaining
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
