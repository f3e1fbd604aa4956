//! Admin commands: account provisioning (/invite, /trial, /vip), the user
//! list, and cross-service deletion.

use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::AppState;
use crate::accounts::DeprovisionTarget;
use crate::models::ProvisioningRequest;

use super::{HandlerResult, edit_html, reply_html, sender_id};

async fn ensure_admin(bot: &Bot, msg: &Message, state: &AppState) -> Result<bool, teloxide::RequestError> {
    let authorized = sender_id(msg).is_some_and(|id| state.config.is_admin(id));
    if !authorized {
        reply_html(bot, msg, "❌ You are not authorized to use this command.").await?;
    }
    Ok(authorized)
}

pub async fn invite(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    provision_for_reply(bot, msg, state, None, None, "permanent invite").await
}

pub async fn trial(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    provision_for_reply(bot, msg, state, Some(7), Some("Trial"), "7-day trial").await
}

pub async fn vip(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    provision_for_reply(bot, msg, state, Some(30), Some("VIP"), "30-day VIP invite").await
}

async fn provision_for_reply(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    duration_days: Option<i64>,
    role_name: Option<&str>,
    label: &str,
) -> HandlerResult {
    if !ensure_admin(bot, msg, state).await? {
        return Ok(());
    }
    let Some(target) = msg.reply_to_message().and_then(|m| m.from()) else {
        reply_html(
            bot,
            msg,
            &format!("Please reply to a user's message to give them a {}.", label),
        )
        .await?;
        return Ok(());
    };

    let display_name = target
        .username
        .clone()
        .unwrap_or_else(|| format!("tg_user_{}", target.id.0));
    let sent = reply_html(
        bot,
        msg,
        &format!("Processing {} for {}...", label, escape(&display_name)),
    )
    .await?;

    let request = ProvisioningRequest {
        chat_user_id: target.id.0.to_string(),
        display_name,
        duration_days,
        role_name: role_name.map(str::to_string),
    };
    let text = match state.provisioner.provision(&request).await {
        Ok(outcome) if outcome.notified => format!(
            "✅ Successfully created account for <code>{}</code> and sent them a DM.",
            outcome.username
        ),
        Ok(outcome) => format!(
            "✅ Account for {} created, but I could not DM them.\nPassword: <code>{}</code>",
            outcome.username, outcome.password
        ),
        Err(e) => format!("❌ {}", escape(&e.to_string())),
    };
    edit_html(bot, msg.chat.id, sent.id, &text).await?;
    Ok(())
}

pub async fn list_users(bot: &Bot, msg: &Message, state: &AppState) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    if !ensure_admin(bot, msg, state).await? {
        return Ok(());
    }

    let sent = reply_html(bot, msg, "Fetching users from Jellyfin API...").await?;

    let users = match state.jellyfin.list_users().await {
        Ok(users) => users,
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "❌ An error occurred while fetching users from Jellyfin: {}",
                    escape(&e.to_string())
                ),
            )
            .await?;
            return Ok(());
        }
    };

    if users.is_empty() {
        edit_html(bot, msg.chat.id, sent.id, "No users found on the Jellyfin server.").await?;
        return Ok(());
    }

    let mut text = "<b>Jellyfin Server User List:</b>\n\n".to_string();
    for user in &users {
        let admin_tag = if user.policy.as_ref().is_some_and(|p| p.is_administrator) {
            " (Admin)"
        } else {
            ""
        };
        text.push_str(&format!("• <code>{}</code>{}\n", escape(&user.name), admin_tag));
    }
    edit_html(bot, msg.chat.id, sent.id, &text).await?;
    Ok(())
}

pub async fn delete_user(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    username: &str,
) -> HandlerResult {
    if !msg.chat.is_private() {
        return Ok(());
    }
    if !ensure_admin(bot, msg, state).await? {
        return Ok(());
    }

    let username = username.trim();
    if username.is_empty() {
        reply_html(bot, msg, "Usage: <code>/deleteuser &lt;username&gt;</code>").await?;
        return Ok(());
    }

    let sent = reply_html(
        bot,
        msg,
        &format!("Finding user '{}' in services...", escape(username)),
    )
    .await?;

    // Prefer the ledger; fall back to resolving both upstream directories.
    let target = match state.store.get_by_username(username) {
        Ok(Some(account)) => DeprovisionTarget::from(&account),
        Ok(None) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!(
                    "User '{}' not in bot DB. Trying to find on Jellyfin...",
                    escape(username)
                ),
            )
            .await?;
            match state.resolver.resolve_username(username).await {
                Ok(Some(identity)) => DeprovisionTarget {
                    chat_user_id: None,
                    media_user_id: Some(identity.media_user_id),
                    request_user_id: identity.request_user_id,
                },
                Ok(None) => {
                    edit_html(
                        bot,
                        msg.chat.id,
                        sent.id,
                        &format!(
                            "❌ User '{}' not found on Jellyfin either.",
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
                            "❌ Error finding user on Jellyfin/Jellyseerr: {}",
                            escape(&e.to_string())
                        ),
                    )
                    .await?;
                    return Ok(());
                }
            }
        }
        Err(e) => {
            edit_html(
                bot,
                msg.chat.id,
                sent.id,
                &format!("❌ {}", escape(&e.to_string())),
            )
            .await?;
            return Ok(());
        }
    };

    edit_html(
        bot,
        msg.chat.id,
        sent.id,
        &format!(
            "Deleting user '{}' (JF ID: {}, JS ID: {}) from all services...",
            escape(username),
            escape(target.media_user_id.as_deref().unwrap_or("unknown")),
            escape(target.request_user_id.as_deref().unwrap_or("unknown")),
        ),
    )
    .await?;

    let text = match state.deprovisioner.deprovision(&target).await {
        Ok(report) => {
            let mut text = format!(
                "✅ Successfully deleted user '{}' from Jellyfin and the bot database.",
                escape(username)
            );
            if !report.request_deleted {
                text.push_str("\n(No Jellyseerr account was deleted.)");
            }
            text
        }
        Err(e) => format!("❌ {}", escape(&e.to_string())),
    };
    edit_html(bot, msg.chat.id, sent.id, &text).await?;
    Ok(())
}
