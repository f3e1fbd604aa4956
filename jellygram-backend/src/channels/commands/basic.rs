//! /start and /help.

use teloxide::prelude::*;

use super::{HandlerResult, reply_html};

const START_TEXT: &str = "👋 Welcome to Jellygram!\n\n\
You can use me to request media for your Jellyfin server.\n\
To get started, you must link your account using the /link command.\n\n\
Type /help to see all available commands.";

const HELP_TEXT: &str = "<b>Jellygram Help</b>\n\n\
<b>User Commands:</b>\n\
• /help: Shows this help message.\n\
• /link &lt;username&gt; &lt;password&gt;: Link your Telegram account to your Jellyfin/Jellyseerr account.\n\
• /unlink: Remove the link between your accounts.\n\
• /request &lt;name&gt;: Search for a movie or TV show to request.\n\
• /discover: Browse popular and trending media.\n\
• /requests: View the status of your past requests.\n\
• /watch: See your personal watch statistics from Jellyfin.\n\n\
<b>Direct Link Support:</b>\n\
You can also send TMDB links directly to request media:\n\
• <code>https://themoviedb.org/movie/550-fight-club</code>\n\
• <code>https://tmdb.org/tv/1399-breaking-bad</code>\n\n\
<b>Admin Commands:</b>\n\
• /invite (reply to a user): Create a permanent account for the user.\n\
• /trial (reply to a user): Create a 7-day trial account for the user.\n\
• /vip (reply to a user): Create a 30-day VIP account for the user.\n\
• /listusers: List all users on the Jellyfin server.\n\
• /deleteuser &lt;username&gt;: Delete a user from Jellyfin, Jellyseerr, and the bot.";

pub async fn start(bot: &Bot, msg: &Message) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    reply_html(bot, msg, START_TEXT).await?;
    Ok(())
}

pub async fn help(bot: &Bot, msg: &Message) -> HandlerResult {
    reply_html(bot, msg, HELP_TEXT).await?;
    Ok(())
}
