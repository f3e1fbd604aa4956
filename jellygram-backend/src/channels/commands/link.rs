//! Self-service account linking: /link and /unlink.

use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::AppState;
use crate::models::LinkedAccount;

use super::{HandlerResult, edit_html, reply_html, sender_id};

pub async fn link(bot: &Bot, msg: &Message, state: &AppState, args: &str) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user_id) = sender_id(msg) else {
        return Ok(());
    };

    let mut parts = args.split_whitespace();
    let (Some(username), Some(password)) = (parts.next(), parts.next()) else {
        reply_html(
            bot,
            msg,
            "Usage: <code>/link &lt;jellyfin_username&gt; &lt;password&gt;</code>",
        )
        .await?;
        return Ok(());
    };

    let sent = reply_html(bot, msg, "Linking your account...").await?;

    let media_user = match state.jellyfin.authenticate_by_name(username, password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                "❌ <b>Authentication Failed:</b> Invalid Jellyfin username or password.",
            )
            .await?;
            return Ok(());
        }
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "❌ An error occurred while authenticating with Jellyfin: {}",
                    escape(&e.to_string())
                ),
            )
            .await?;
            return Ok(());
        }
    };

    let identity = match state.resolver.reconcile(&media_user.id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "⚠️ <b>Account Not Found in Jellyseerr.</b>\n\
                     Your Jellyfin login is correct, but your account ('{}') is not in \
                     Jellyseerr. Please contact an admin.",
                    escape(username)
                ),
            )
            .await?;
            return Ok(());
        }
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "❌ Failed to fetch users from Jellyseerr: {}",
                    escape(&e.to_string())
                ),
            )
            .await?;
            return Ok(());
        }
    };

    let linked_name = if identity.username.is_empty() {
        media_user.name.clone()
    } else {
        identity.username.clone()
    };
    let account = LinkedAccount {
        chat_user_id: user_id.to_string(),
        request_user_id: identity.request_user_id,
        media_user_id: Some(media_user.id),
        username: linked_name.clone(),
        created_at: None,
        expires_at: None,
        guild_id: None,
        role_name: None,
    };
    if let Err(e) = state.store.upsert(&account) {
        edit_html(
            bot,
            msg.chat.id,
            sent.id,
            &format!("❌ Could not save the link: {}", escape(&e.to_string())),
        )
        .await?;
        return Ok(());
    }

    edit_html(
        bot,
        msg.chat.id,
        sent.id,
        &format!(
            "✅ <b>Success!</b> Your account is now linked to '{}'.",
            escape(&linked_name)
        ),
    )
    .await?;

    // The command message contains a password; get rid of it.
    let _ = bot.delete_message(msg.chat.id, msg.id).await;
    Ok(())
}

pub async fn unlink(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user_id) = sender_id(msg) else {
        return Ok(());
    };

    match state.store.get(&user_id.to_string())? {
        Some(_) => {
            state.store.delete(&user_id.to_string())?;
            reply_html(bot, msg, "✅ Unlinked your account successfully.").await?;
        }
        None => {
            reply_html(bot, msg, "⚠️ You haven't linked your account yet.").await?;
        }
    }
    Ok(())
}
