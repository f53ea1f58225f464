use super::{member_name, EMBED_COLOR};
use crate::stats::activity as agg;
use crate::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

const BAR_WIDTH: usize = 20;

/// Show messages per day
#[poise::command(slash_command, guild_only)]
pub async fn activitychart(
    ctx: Context<'_>,
    #[description = "Trailing window in days (default: 30)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(30);
    let rows = ctx.data().stores.activity.read_all()?;
    let series = agg::daily_counts(&rows, &guild_id.to_string(), days, Utc::now());

    if series.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No messages recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let max = series.iter().map(|(_, count)| *count).max().unwrap_or(1);
    let lines: Vec<String> = series
        .iter()
        .map(|(date, count)| format!("{date}  {}  {count}", bar(*count, max)))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("📈 Messages per day — last {days} days"))
        .description(format!("```\n{}\n```", lines.join("\n")))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show messages per hour of day (UTC)
#[poise::command(slash_command, guild_only)]
pub async fn heatmap(
    ctx: Context<'_>,
    #[description = "Trailing window in days (default: 7)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(7);
    let rows = ctx.data().stores.activity.read_all()?;
    let buckets = agg::hourly_histogram(&rows, &guild_id.to_string(), days, Utc::now());

    let max = buckets.iter().copied().max().unwrap_or(0);
    if max == 0 {
        ctx.send(
            poise::CreateReply::default()
                .content("No messages recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = buckets
        .iter()
        .enumerate()
        .map(|(hour, count)| format!("{hour:02}:00  {}  {count}", bar(*count, max)))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("🕐 Hourly activity (UTC) — last {days} days"))
        .description(format!("```\n{}\n```", lines.join("\n")))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the most active channels
#[poise::command(slash_command, guild_only)]
pub async fn topchannels(
    ctx: Context<'_>,
    #[description = "Trailing window in days (default: 7)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(7);
    let rows = ctx.data().stores.activity.read_all()?;
    let top = agg::top_channels(&rows, &guild_id.to_string(), days, Utc::now(), Some(10));

    if top.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No messages recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = top
        .iter()
        .map(|(channel_id, count)| format!("**{count}x** — <#{channel_id}>"))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("📣 Most active channels — last {days} days"))
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the most active users
#[poise::command(slash_command, guild_only)]
pub async fn topusers(
    ctx: Context<'_>,
    #[description = "Only count members holding this role"] role: Option<serenity::Role>,
    #[description = "Trailing window in days (default: 7)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(7);
    let rows = ctx.data().stores.activity.read_all()?;
    let top = match &role {
        Some(role) => {
            // Current holders of the role, resolved at query time
            let members: std::collections::HashSet<String> = {
                let guild = ctx.guild().ok_or("Must be run in a guild")?;
                guild
                    .members
                    .values()
                    .filter(|member| member.roles.contains(&role.id))
                    .map(|member| member.user.id.to_string())
                    .collect()
            };
            agg::role_activity(&rows, &guild_id.to_string(), days, Utc::now(), &members, Some(10))
        }
        None => agg::top_users(&rows, &guild_id.to_string(), days, Utc::now(), Some(10)),
    };

    if top.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No messages recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = top
        .iter()
        .map(|(user_id, count)| format!("**{count}x** — {}", member_name(ctx, user_id)))
        .collect();

    let title = match &role {
        Some(role) => format!("💬 Most active {} members — last {days} days", role.name),
        None => format!("💬 Most active users — last {days} days"),
    };
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show what share of traffic the most active users produce
#[poise::command(slash_command, guild_only)]
pub async fn distribution(
    ctx: Context<'_>,
    #[description = "Top percentage of users to measure (default: 10)"]
    #[min = 1]
    #[max = 100]
    percent: Option<u32>,
    #[description = "Trailing window in days (default: 30)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let percent = percent.unwrap_or(10);
    let days = days.unwrap_or(30);
    let rows = ctx.data().stores.activity.read_all()?;
    let share = agg::top_share(
        &rows,
        &guild_id.to_string(),
        days,
        Utc::now(),
        f64::from(percent) / 100.0,
    );

    let Some(share) = share else {
        ctx.send(
            poise::CreateReply::default()
                .content("No messages recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.say(format!(
        "📊 The top {percent}% of users ({} of {}) wrote **{:.1}%** of all messages \
         ({} of {}) over the last {days} days.",
        share.top_users,
        share.total_users,
        share.share() * 100.0,
        share.top_volume,
        share.total_volume
    ))
    .await?;
    Ok(())
}

/// Show who pings the most relative to how much they talk
#[poise::command(slash_command, guild_only)]
pub async fn pingratio(
    ctx: Context<'_>,
    #[description = "Trailing window in days (default: 30)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(30);
    let pings = ctx.data().stores.pings.read_all()?;
    let messages = ctx.data().stores.activity.read_all()?;
    let ratios = agg::ping_ratios(&pings, &messages, &guild_id.to_string(), days, Utc::now());

    if ratios.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No activity recorded in that window.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = ratios
        .iter()
        .take(10)
        .map(|r| {
            format!(
                "**{:.0}%** — {} ({} pings, {} messages)",
                r.ratio() * 100.0,
                member_name(ctx, &r.user_id),
                r.pings,
                r.messages
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("🔔 Ping ratio — last {days} days"))
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show members with no recent messages
#[poise::command(slash_command, guild_only)]
pub async fn inactive(
    ctx: Context<'_>,
    #[description = "Only check members holding this role"] role: Option<serenity::Role>,
    #[description = "Inactivity threshold in days (default: 30)"]
    #[min = 1]
    #[max = 365]
    days: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let days = days.unwrap_or(30);

    // Resolve the member set up front; the cache guard must not cross an await
    let member_ids: Vec<String> = {
        let guild = ctx.guild().ok_or("Must be run in a guild")?;
        guild
            .members
            .values()
            .filter(|member| !member.user.bot)
            .filter(|member| {
                role.as_ref()
                    .map_or(true, |role| member.roles.contains(&role.id))
            })
            .map(|member| member.user.id.to_string())
            .collect()
    };

    let rows = ctx.data().stores.activity.read_all()?;
    let inactive = agg::inactive_users(&rows, &guild_id.to_string(), days, Utc::now(), &member_ids);

    if inactive.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("Everyone has been active in the last {days} days. 🎉"))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let lines: Vec<String> = inactive
        .iter()
        .take(20)
        .map(|(user_id, last_seen)| match last_seen {
            Some(ts) => format!(
                "**{}** — last seen {}",
                member_name(ctx, user_id),
                ts.format("%Y-%m-%d")
            ),
            None => format!("**{}** — never seen", member_name(ctx, user_id)),
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("💤 Inactive members — {days}+ days"))
        .description(lines.join("\n"))
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn bar(count: u64, max: u64) -> String {
    let width = if max == 0 {
        0
    } else {
        ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
    };
    "█".repeat(width)
}
