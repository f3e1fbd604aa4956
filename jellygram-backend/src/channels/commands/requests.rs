//! /requests: the caller's request history with pagination.

use std::sync::Arc;

use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters};
use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::AppState;
use crate::error::Error;
use crate::helpers::formatting::{MediaCard, format_request_item};
use crate::helpers::markup::requests_pagination_markup;
use crate::integrations::jellyseerr::MediaRequest;

use super::{HandlerResult, edit_card, edit_html, parse_nav, reply_html, send_card, sender_id};

const REQUEST_PAGE_SIZE: u32 = 100;

async fn fetch_requests(
    state: &AppState,
    chat_user_id: &str,
    request_user_id: &str,
) -> Result<Arc<Vec<MediaRequest>>, Error> {
    let mut requests = state
        .jellyseerr
        .list_requests(request_user_id, REQUEST_PAGE_SIZE)
        .await?;
    // Newest first.
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let requests = Arc::new(requests);
    state.cache.set_requests(chat_user_id, requests.clone());
    Ok(requests)
}

/// Render one request, fetching the media details behind it.
async fn request_card(
    state: &AppState,
    request: &MediaRequest,
    index: usize,
    total: usize,
) -> MediaCard {
    let media = request.media.as_ref();
    let Some(tmdb_id) = media.and_then(|m| m.tmdb_id) else {
        return MediaCard {
            text: "<b>Error</b>: Request is missing a TMDB ID.".to_string(),
            photo_url: None,
        };
    };
    let media_type = media.and_then(|m| m.media_type.as_deref()).unwrap_or("movie");
    let endpoint = if media_type == "tv" { "tv" } else { "movie" };

    match state.jellyseerr.media_details(endpoint, tmdb_id).await {
        Ok(details) => format_request_item(request, &details, index, total),
        Err(e) => {
            log::error!("[REQUESTS] Error fetching media details: {}", e);
            MediaCard {
                text: "<b>Error</b>: Could not fetch details for this request.".to_string(),
                photo_url: None,
            }
        }
    }
}

pub async fn my_requests(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    let Some(user_id) = sender_id(msg) else {
        return Ok(());
    };
    let chat_user_id = user_id.to_string();

    let sent = reply_html(bot, msg, "Fetching your requests...").await?;

    let request_user_id = state
        .store
        .get(&chat_user_id)
        .ok()
        .flatten()
        .and_then(|a| a.request_user_id);
    let Some(request_user_id) = request_user_id else {
        edit_html(
            bot,
            msg.chat.id,
            sent.id,
            "⚠️ You need to link your account first using <code>/link</code>.",
        )
        .await?;
        return Ok(());
    };

    let requests = match fetch_requests(state, &chat_user_id, &request_user_id).await {
        Ok(requests) => requests,
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "❌ An error occurred while fetching your requests: {}",
                    escape(&e.to_string())
                ),
            )
            .await?;
            return Ok(());
        }
    };
    if requests.is_empty() {
        edit_html(
            bot,
            msg.chat.id,
            sent.id,
            "You have no pending or completed requests.",
        )
        .await?;
        return Ok(());
    }

    let card = request_card(state, &requests[0], 0, requests.len()).await;
    let markup = requests_pagination_markup(&chat_user_id, 0, requests.len());

    if card.photo_url.is_some() {
        send_card(bot, msg.chat.id, &card, markup).await?;
        let _ = bot.delete_message(msg.chat.id, sent.id).await;
    } else {
        bot.edit_message_text(msg.chat.id, sent.id, card.text)
            .parse_mode(teloxide::types::ParseMode::Html)
            .reply_markup(markup)
            .await?;
    }
    Ok(())
}

pub async fn navigate(bot: &Bot, q: &CallbackQuery, state: &AppState, rest: &str) -> HandlerResult {
    let Some((forward, current_index, owner_id)) = parse_nav(rest) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if q.from.id.0.to_string() != owner_id {
        bot.answer_callback_query(q.id.clone())
            .text("This is not for you.")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let requests = match state.cache.get_requests(&owner_id) {
        Some(cached) => cached,
        None => {
            // Cache expired; re-fetch from the linked account.
            let request_user_id = state
                .store
                .get(&owner_id)
                .ok()
                .flatten()
                .and_then(|a| a.request_user_id);
            let Some(request_user_id) = request_user_id else {
                bot.answer_callback_query(q.id.clone())
                    .text("Error: Could not find your linked account.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };
            match fetch_requests(state, &owner_id, &request_user_id).await {
                Ok(requests) => requests,
                Err(e) => {
                    log::error!("[REQUESTS] Error re-fetching requests: {}", e);
                    bot.answer_callback_query(q.id.clone())
                        .text("Error re-fetching requests.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
            }
        }
    };
    if requests.is_empty() {
        bot.answer_callback_query(q.id.clone())
            .text("You have no requests.")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let new_index = if forward {
        current_index as i64 + 1
    } else {
        current_index as i64 - 1
    };
    if new_index < 0 || new_index as usize >= requests.len() {
        bot.answer_callback_query(q.id.clone())
            .text("You are at the end of the list.")
            .await?;
        return Ok(());
    }
    let new_index = new_index as usize;

    let card = request_card(state, &requests[new_index], new_index, requests.len()).await;
    let markup = requests_pagination_markup(&owner_id, new_index, requests.len());
    if let Some(message) = &q.message {
        if let Err(e) = edit_card(bot, message, &card, markup).await {
            log::error!("[REQUESTS] Error updating card during pagination: {}", e);
        }
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}
