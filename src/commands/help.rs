use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show available commands
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("📘 Ping Counter — Help")
        .description(
            "/rolecounts @Role — Top users who pinged that role.\n\
             /leaderboard [@Role] — Role leaderboard (all roles if none given).\n\
             /mycounts — Your personal role ping stats.\n\
             /resetcounts @Role — Reset counts for that role (Admin only).\n\
             /resetmycounts — Delete all your counts.\n\
             /cleanup [days] — Remove old records (Manage Server only).\n\
             /activitychart [days] — Messages per day.\n\
             /heatmap [days] — Messages per hour of day.\n\
             /topchannels [days] — Most active channels.\n\
             /topusers [days] — Most active users.\n\
             /distribution [percent] — Share of traffic from the top users.\n\
             /pingratio [days] — Who pings the most relative to their messages.\n\
             /inactive [@Role] [days] — Members with no recent messages.\n\
             /setrankroles — Configure reaction rank roles (Admin only).\n\
             /rankroles — Reaction totals per configured role.\n\
             /resetreactions — Drop this server's reaction data (Admin only).",
        )
        .color(super::EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
