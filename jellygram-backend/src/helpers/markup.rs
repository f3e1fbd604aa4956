//! Inline keyboards for pagination and request buttons.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Navigation plus a Request button for a media card. Callback data formats:
/// `media_nav:{prev|next}:{index}:{query}`, `media_req:{type}:{tmdb_id}`.
pub fn media_pagination_markup(
    query: &str,
    current_index: usize,
    total_results: usize,
    media_type: &str,
    tmdb_id: i64,
    is_requested: bool,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    if total_results > 1 {
        let prev = if current_index > 0 {
            InlineKeyboardButton::callback(
                "⬅️ Previous",
                format!("media_nav:prev:{}:{}", current_index, query),
            )
        } else {
            InlineKeyboardButton::callback(" ", "noop")
        };
        let next = if current_index + 1 < total_results {
            InlineKeyboardButton::callback(
                "Next ➡️",
                format!("media_nav:next:{}:{}", current_index, query),
            )
        } else {
            InlineKeyboardButton::callback(" ", "noop")
        };
        rows.push(vec![prev, next]);
    }

    let request_button = if is_requested {
        InlineKeyboardButton::callback("✅ Requested", format!("requested:{}:{}", media_type, tmdb_id))
    } else {
        InlineKeyboardButton::callback("Request", format!("media_req:{}:{}", media_type, tmdb_id))
    };
    rows.push(vec![request_button]);

    InlineKeyboardMarkup::new(rows)
}

/// Marker keyboard shown once an item has been requested.
pub fn requested_markup(media_type: &str, tmdb_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Requested",
        format!("requested:{}:{}", media_type, tmdb_id),
    )]])
}

/// Navigation for the `/requests` listing. Callback data:
/// `req_nav:{prev|next}:{index}:{chat_user_id}`.
pub fn requests_pagination_markup(
    chat_user_id: &str,
    current_index: usize,
    total_results: usize,
) -> InlineKeyboardMarkup {
    let prev = if current_index > 0 {
        InlineKeyboardButton::callback(
            "⬅️ Previous",
            format!("req_nav:prev:{}:{}", current_index, chat_user_id),
        )
    } else {
        InlineKeyboardButton::callback(" ", "noop")
    };
    let next = if current_index + 1 < total_results {
        InlineKeyboardButton::callback(
            "Next ➡️",
            format!("req_nav:next:{}:{}", current_index, chat_user_id),
        )
    } else {
        InlineKeyboardButton::callback(" ", "noop")
    };
    InlineKeyboardMarkup::new(vec![vec![prev, next]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_data(markup: &InlineKeyboardMarkup, row: usize, col: usize) -> String {
        match &markup.inline_keyboard[row][col].kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
            other => panic!("unexpected button kind: {:?}", other),
        }
    }

    #[test]
    fn test_media_markup_middle_of_results() {
        let markup = media_pagination_markup("dune", 1, 3, "movie", 438631, false);
        assert_eq!(button_data(&markup, 0, 0), "media_nav:prev:1:dune");
        assert_eq!(button_data(&markup, 0, 1), "media_nav:next:1:dune");
        assert_eq!(button_data(&markup, 1, 0), "media_req:movie:438631");
    }

    #[test]
    fn test_media_markup_edges_are_noops() {
        let markup = media_pagination_markup("dune", 0, 2, "movie", 1, false);
        assert_eq!(button_data(&markup, 0, 0), "noop");
        assert_eq!(button_data(&markup, 0, 1), "media_nav:next:0:dune");

        let markup = media_pagination_markup("dune", 1, 2, "movie", 1, false);
        assert_eq!(button_data(&markup, 0, 1), "noop");
    }

    #[test]
    fn test_media_markup_single_result_has_no_nav_row() {
        let markup = media_pagination_markup("dune", 0, 1, "movie", 1, false);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(button_data(&markup, 0, 0), "media_req:movie:1");
    }

    #[test]
    fn test_requested_state_changes_button() {
        let markup = media_pagination_markup("dune", 0, 1, "tv", 1399, true);
        assert_eq!(button_data(&markup, 0, 0), "requested:tv:1399");
    }

    #[test]
    fn test_requests_markup() {
        let markup = requests_pagination_markup("123", 0, 5);
        assert_eq!(button_data(&markup, 0, 0), "noop");
        assert_eq!(button_data(&markup, 0, 1), "req_nav:next:0:123");
    }
}
