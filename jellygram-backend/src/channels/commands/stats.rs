//! /watch: personal watch statistics from Jellyfin.

use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::AppState;
use crate::helpers::formatting::format_watch_stats;

use super::{HandlerResult, edit_html, reply_html, sender_id};

pub async fn watch(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    let Some(user_id) = sender_id(msg) else {
        return Ok(());
    };

    let sent = reply_html(bot, msg, "Fetching your watch stats...").await?;

    let media_user_id = state
        .store
        .get(&user_id.to_string())
        .ok()
        .flatten()
        .and_then(|a| a.media_user_id);
    let Some(media_user_id) = media_user_id else {
        edit_html(
            bot,
            msg.chat.id,
            sent.id,
            "⚠️ You haven't linked your account yet. Use <code>/link</code> to get started.",
        )
        .await?;
        return Ok(());
    };

    match state.jellyfin.played_items(&media_user_id).await {
        Ok(items) => {
            let first_name = msg
                .from()
                .map(|u| u.first_name.clone())
                .unwrap_or_default();
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format_watch_stats(&first_name, &items),
            )
            .await?;
        }
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "❌ Failed to fetch watch data from Jellyfin: {}",
                    escape(&e.to_string())
                ),
            )
            .await?;
        }
    }
    Ok(())
}
