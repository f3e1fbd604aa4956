//! Media search, discovery, pagination, and request buttons.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::payloads::{
    AnswerCallbackQuerySetters, EditMessageReplyMarkupSetters, EditMessageTextSetters,
};
use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::AppState;
use crate::error::Error;
use crate::helpers::formatting::format_media_item;
use crate::helpers::markup::{media_pagination_markup, requested_markup};
use crate::integrations::jellyseerr::MediaResult;

use super::{HandlerResult, edit_card, parse_nav, reply_html, send_card};

static TMDB_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?(?:themoviedb\.org|tmdb\.org)/(movie|tv)/(\d+)(?:-[^\s/]+)?/?")
        .expect("TMDB URL pattern must compile")
});

/// Extract (media type, TMDB id) from a pasted TMDB link.
pub fn extract_tmdb_info(text: &str) -> Option<(String, i64)> {
    let caps = TMDB_URL_PATTERN.captures(text)?;
    Some((caps[1].to_lowercase(), caps[2].parse().ok()?))
}

async fn cached_search(state: &AppState, query: &str) -> Result<Arc<Vec<MediaResult>>, Error> {
    if let Some(hit) = state.cache.get_search(query) {
        log::debug!("[MEDIA] Returning cached search results for: {}", query);
        return Ok(hit);
    }
    let results: Vec<MediaResult> = state
        .jellyseerr
        .search(query)
        .await?
        .into_iter()
        .filter(|r| matches!(r.media_type.as_deref(), Some("movie") | Some("tv")))
        .collect();
    let results = Arc::new(results);
    state.cache.set_search(query, results.clone());
    Ok(results)
}

async fn cached_discover(state: &AppState) -> Result<Arc<Vec<MediaResult>>, Error> {
    if let Some(hit) = state.cache.get_discover() {
        log::debug!("[MEDIA] Returning cached discover results");
        return Ok(hit);
    }
    let mut results = state.jellyseerr.discover_movies().await?;
    results.extend(state.jellyseerr.discover_tv().await?);
    let results = Arc::new(results);
    state.cache.set_discover(results.clone());
    Ok(results)
}

/// Render the first card of a result set, replacing the placeholder message.
async fn show_first_result(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    placeholder: &Message,
    query: &str,
    results: &[MediaResult],
) -> HandlerResult {
    let item = &results[0];
    let media_type = item.media_type.clone().unwrap_or_default();
    let card = format_media_item(item, 0, results.len());
    let markup = media_pagination_markup(
        query,
        0,
        results.len(),
        &media_type,
        item.id,
        state.cache.is_requested(&media_type, item.id),
    );

    if card.photo_url.is_some() {
        send_card(bot, msg.chat.id, &card, markup).await?;
        let _ = bot.delete_message(msg.chat.id, placeholder.id).await;
    } else {
        bot.edit_message_text(msg.chat.id, placeholder.id, card.text)
            .parse_mode(teloxide::types::ParseMode::Html)
            .reply_markup(markup)
            .await?;
    }
    Ok(())
}

pub async fn request(bot: &Bot, msg: &Message, state: &AppState, query: &str) -> HandlerResult {
    let query = query.trim();
    if query.is_empty() {
        reply_html(
            bot,
            msg,
            "Please provide a search query. Usage: <code>/request movie/show name</code>",
        )
        .await?;
        return Ok(());
    }

    let sent = reply_html(bot, msg, "Searching...").await?;
    let results = match cached_search(state, query).await {
        Ok(results) => results,
        Err(e) => {
            super::edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!("❌ Search failed: {}", escape(&e.to_string())),
            )
            .await?;
            return Ok(());
        }
    };
    if results.is_empty() {
        super::edit_html(bot, msg.chat.id, sent.id, "No results found for your query.").await?;
        return Ok(());
    }
    show_first_result(bot, msg, state, &sent, query, &results).await
}

pub async fn discover(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    let sent = reply_html(bot, msg, "Discovering popular items...").await?;
    let results = match cached_discover(state).await {
        Ok(results) => results,
        Err(e) => {
            super::edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!("❌ Discover failed: {}", escape(&e.to_string())),
            )
            .await?;
            return Ok(());
        }
    };
    if results.is_empty() {
        super::edit_html(bot, msg.chat.id, sent.id, "No popular items found to discover.").await?;
        return Ok(());
    }
    show_first_result(bot, msg, state, &sent, "discover", &results).await
}

pub async fn navigate(bot: &Bot, q: &CallbackQuery, state: &AppState, rest: &str) -> HandlerResult {
    let Some((forward, current_index, query)) = parse_nav(rest) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if query == "url_lookup" {
        bot.answer_callback_query(q.id.clone())
            .text("No more results to navigate.")
            .await?;
        return Ok(());
    }

    let results = if query == "discover" {
        cached_discover(state).await
    } else {
        cached_search(state, &query).await
    };
    let results = results.unwrap_or_default();
    if results.is_empty() {
        bot.answer_callback_query(q.id.clone())
            .text("Error: Search results expired or not found. Please try searching again.")
            .show_alert(true)
            .await?;
        if let Some(message) = &q.message {
            let _ = bot.delete_message(message.chat.id, message.id).await;
        }
        return Ok(());
    }

    let new_index = if forward {
        current_index as i64 + 1
    } else {
        current_index as i64 - 1
    };
    if new_index < 0 || new_index as usize >= results.len() {
        bot.answer_callback_query(q.id.clone())
            .text("You are at the end of the list.")
            .await?;
        return Ok(());
    }
    let new_index = new_index as usize;

    let item = &results[new_index];
    let media_type = item.media_type.clone().unwrap_or_default();
    let card = format_media_item(item, new_index, results.len());
    let markup = media_pagination_markup(
        &query,
        new_index,
        results.len(),
        &media_type,
        item.id,
        state.cache.is_requested(&media_type, item.id),
    );

    if let Some(message) = &q.message {
        if let Err(e) = edit_card(bot, message, &card, markup).await {
            log::error!("[MEDIA] Error updating card during pagination: {}", e);
        }
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

pub async fn request_item(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
    rest: &str,
) -> HandlerResult {
    let Some((media_type, tmdb_id)) = rest
        .split_once(':')
        .and_then(|(t, id)| Some((t.to_string(), id.parse::<i64>().ok()?)))
    else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let chat_user_id = q.from.id.0.to_string();
    let request_user_id = state
        .store
        .get(&chat_user_id)
        .ok()
        .flatten()
        .and_then(|a| a.request_user_id)
        .and_then(|id| id.parse::<i64>().ok());
    let Some(request_user_id) = request_user_id else {
        bot.answer_callback_query(q.id.clone())
            .text("⚠️ You must link your account first using /link")
            .show_alert(true)
            .await?;
        return Ok(());
    };

    match state
        .jellyseerr
        .create_request(&media_type, tmdb_id, request_user_id)
        .await
    {
        Ok(()) => {
            state.cache.mark_requested(&media_type, tmdb_id);
            mark_button_requested(bot, q, &media_type, tmdb_id).await;
            bot.answer_callback_query(q.id.clone())
                .text("✅ Request successful!")
                .show_alert(true)
                .await?;
        }
        Err(Error::UpstreamHttp { status: 409, .. }) => {
            state.cache.mark_requested(&media_type, tmdb_id);
            mark_button_requested(bot, q, &media_type, tmdb_id).await;
            bot.answer_callback_query(q.id.clone())
                .text("⚠️ Already available or requested.")
                .show_alert(true)
                .await?;
        }
        Err(Error::UpstreamHttp { status, .. }) => {
            bot.answer_callback_query(q.id.clone())
                .text(format!("❌ Error: {}", status))
                .show_alert(true)
                .await?;
        }
        Err(e) => {
            log::error!("[MEDIA] Request for {}:{} failed: {}", media_type, tmdb_id, e);
            bot.answer_callback_query(q.id.clone())
                .text("❌ Network error while requesting.")
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

async fn mark_button_requested(bot: &Bot, q: &CallbackQuery, media_type: &str, tmdb_id: i64) {
    let Some(message) = &q.message else { return };
    if let Err(e) = bot
        .edit_message_reply_markup(message.chat.id, message.id)
        .reply_markup(requested_markup(media_type, tmdb_id))
        .await
    {
        log::error!("[MEDIA] Error updating request button: {}", e);
    }
}

pub async fn already_requested(bot: &Bot, q: &CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone())
        .text("⚠️ This item has already been requested.")
        .show_alert(true)
        .await?;
    Ok(())
}

/// Fallback handler for plain messages: recognize pasted TMDB links.
pub async fn handle_tmdb_link(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(text) = msg.text().or_else(|| msg.caption()) else {
        return Ok(());
    };
    let Some((media_type, tmdb_id)) = extract_tmdb_info(text) else {
        return Ok(());
    };
    log::info!("[MEDIA] Found TMDB {} id {} in message", media_type, tmdb_id);

    let looking = reply_html(&bot, &msg, "🔍 Looking up TMDB link...").await?;
    match state.jellyseerr.media_details(&media_type, tmdb_id).await {
        Ok(mut details) => {
            // Direct lookups come back with mediaType "unknown"; the URL
            // already told us which it is.
            if details
                .media_type
                .as_deref()
                .is_none_or(|t| t == "unknown")
            {
                details.media_type = Some(media_type.clone());
            }
            let card = format_media_item(&details, 0, 1);
            let markup = media_pagination_markup(
                "url_lookup",
                0,
                1,
                &media_type,
                details.id,
                state.cache.is_requested(&media_type, details.id),
            );
            send_card(&bot, msg.chat.id, &card, markup).await?;
        }
        Err(e) => {
            log::error!("[MEDIA] TMDB lookup for {} {} failed: {}", media_type, tmdb_id, e);
        }
    }
    let _ = bot.delete_message(msg.chat.id, looking.id).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tmdb_info() {
        assert_eq!(
            extract_tmdb_info("check out https://www.themoviedb.org/movie/550-fight-club"),
            Some(("movie".to_string(), 550))
        );
        assert_eq!(
            extract_tmdb_info("https://tmdb.org/tv/1399-breaking-bad/"),
            Some(("tv".to_string(), 1399))
        );
        assert_eq!(
            extract_tmdb_info("HTTPS://THEMOVIEDB.ORG/TV/1399"),
            Some(("tv".to_string(), 1399))
        );
        assert_eq!(extract_tmdb_info("no links here"), None);
        assert_eq!(
            extract_tmdb_info("https://themoviedb.org/person/819-edward"),
            None
        );
    }
}
