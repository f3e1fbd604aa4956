//! Command and callback handlers. Each module covers one command group and
//! renders operator/user-facing messages from the typed results underneath.

pub mod admin;
pub mod basic;
pub mod link;
pub mod media;
pub mod requests;
pub mod stats;

use teloxide::payloads::{
    EditMessageCaptionSetters, EditMessageMediaSetters, EditMessageTextSetters,
    SendMessageSetters, SendPhotoSetters,
};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, MessageId, ParseMode,
};

use crate::helpers::formatting::MediaCard;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub(crate) fn sender_id(msg: &Message) -> Option<u64> {
    msg.from().map(|u| u.id.0)
}

pub(crate) async fn reply_html(
    bot: &Bot,
    msg: &Message,
    text: &str,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await
}

pub(crate) async fn edit_html(
    bot: &Bot,
    chat: ChatId,
    message_id: MessageId,
    text: &str,
) -> Result<(), teloxide::RequestError> {
    bot.edit_message_text(chat, message_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Send a media card as a photo message when a poster is available, else as
/// plain text.
pub(crate) async fn send_card(
    bot: &Bot,
    chat: ChatId,
    card: &MediaCard,
    markup: InlineKeyboardMarkup,
) -> Result<(), teloxide::RequestError> {
    match &card.photo_url {
        Some(url) => {
            bot.send_photo(chat, InputFile::url(url.clone()))
                .caption(card.text.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?;
        }
        None => {
            bot.send_message(chat, card.text.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?;
        }
    }
    Ok(())
}

/// Rewrite an existing card in place during pagination. Photo messages get
/// their media swapped (falling back to a caption edit when Telegram rejects
/// the swap); text messages are edited directly.
pub(crate) async fn edit_card(
    bot: &Bot,
    message: &Message,
    card: &MediaCard,
    markup: InlineKeyboardMarkup,
) -> Result<(), teloxide::RequestError> {
    let chat = message.chat.id;
    if message.photo().is_some() {
        if let Some(url) = &card.photo_url {
            let media = InputMedia::Photo(
                InputMediaPhoto::new(InputFile::url(url.clone()))
                    .caption(card.text.clone())
                    .parse_mode(ParseMode::Html),
            );
            if bot
                .edit_message_media(chat, message.id, media)
                .reply_markup(markup.clone())
                .await
                .is_ok()
            {
                return Ok(());
            }
        }
        bot.edit_message_caption(chat, message.id)
            .caption(card.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
    } else {
        bot.edit_message_text(chat, message.id, card.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
    }
    Ok(())
}

/// Parse a `{prev|next}:{index}:{key}` pagination payload.
pub(crate) fn parse_nav(rest: &str) -> Option<(bool, usize, String)> {
    let mut parts = rest.splitn(3, ':');
    let forward = match parts.next()? {
        "next" => true,
        "prev" => false,
        _ => return None,
    };
    let index: usize = parts.next()?.parse().ok()?;
    let key = parts.next()?.to_string();
    Some((forward, index, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nav() {
        assert_eq!(parse_nav("next:0:dune"), Some((true, 0, "dune".to_string())));
        assert_eq!(parse_nav("prev:4:discover"), Some((false, 4, "discover".to_string())));
        // Queries containing colons survive intact.
        assert_eq!(
            parse_nav("next:1:dune: part two"),
            Some((true, 1, "dune: part two".to_string()))
        );
        assert_eq!(parse_nav("sideways:1:x"), None);
        assert_eq!(parse_nav("next:abc:x"), None);
        assert_eq!(parse_nav("next:1"), None);
    }
}
