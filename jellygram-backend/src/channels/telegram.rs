//! Telegram wiring: the transport implementation, the command table, and the
//! dptree dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use teloxide::dptree;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use crate::AppState;
use crate::channels::Transport;
use crate::channels::commands::{self, HandlerResult};
use crate::error::Error;

pub struct TelegramTransport {
    bot: Bot,
    connected: AtomicBool,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            connected: AtomicBool::new(false),
        }
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_direct_message(&self, chat_user_id: &str, text: &str) -> Result<(), Error> {
        let chat_id: i64 = chat_user_id.parse().map_err(|_| Error::Notification {
            chat_user_id: chat_user_id.to_string(),
            message: "chat user id is not numeric".to_string(),
        })?;
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| Error::Notification {
                chat_user_id: chat_user_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show all available commands")]
    Help,
    #[command(description = "link your Jellyfin account: /link <username> <password>")]
    Link(String),
    #[command(description = "remove the link between your accounts")]
    Unlink,
    #[command(description = "search for a movie or TV show to request")]
    Request(String),
    #[command(description = "browse popular and trending media")]
    Discover,
    #[command(description = "view the status of your past requests")]
    Requests,
    #[command(description = "see your personal watch statistics")]
    Watch,
    #[command(description = "create a permanent account (reply to a user)")]
    Invite,
    #[command(description = "create a 7-day trial account (reply to a user)")]
    Trial,
    #[command(description = "create a 30-day VIP account (reply to a user)")]
    Vip,
    #[command(description = "list all users on the Jellyfin server")]
    ListUsers,
    #[command(description = "delete a user everywhere: /deleteuser <username>")]
    DeleteUser(String),
}

async fn dispatch_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> HandlerResult {
    match cmd {
        Command::Start => commands::basic::start(&bot, &msg).await,
        Command::Help => commands::basic::help(&bot, &msg).await,
        Command::Link(args) => commands::link::link(&bot, &msg, &state, &args).await,
        Command::Unlink => commands::link::unlink(&bot, &msg, &state).await,
        Command::Request(query) => commands::media::request(&bot, &msg, &state, &query).await,
        Command::Discover => commands::media::discover(&bot, &msg, &state).await,
        Command::Requests => commands::requests::my_requests(&bot, &msg, &state).await,
        Command::Watch => commands::stats::watch(&bot, &msg, &state).await,
        Command::Invite => commands::admin::invite(&bot, &msg, &state).await,
        Command::Trial => commands::admin::trial(&bot, &msg, &state).await,
        Command::Vip => commands::admin::vip(&bot, &msg, &state).await,
        Command::ListUsers => commands::admin::list_users(&bot, &msg, &state).await,
        Command::DeleteUser(username) => {
            commands::admin::delete_user(&bot, &msg, &state, &username).await
        }
    }
}

async fn dispatch_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> HandlerResult {
    let data = q.data.clone().unwrap_or_default();
    if let Some(rest) = data.strip_prefix("media_nav:") {
        commands::media::navigate(&bot, &q, &state, rest).await
    } else if let Some(rest) = data.strip_prefix("media_req:") {
        commands::media::request_item(&bot, &q, &state, rest).await
    } else if data.starts_with("requested:") {
        commands::media::already_requested(&bot, &q).await
    } else if let Some(rest) = data.strip_prefix("req_nav:") {
        commands::requests::navigate(&bot, &q, &state, rest).await
    } else {
        // "noop" placeholders still need their spinner dismissed.
        bot.answer_callback_query(q.id.clone()).await?;
        Ok(())
    }
}

/// Verify the connection, mark the transport ready, and run the dispatcher
/// until shutdown.
pub async fn run(bot: Bot, transport: Arc<TelegramTransport>, state: Arc<AppState>) {
    match bot.get_me().await {
        Ok(me) => {
            log::info!("[TELEGRAM] Connected as @{}", me.username());
            transport.mark_connected();
        }
        Err(e) => log::error!("[TELEGRAM] Could not verify connection: {}", e),
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(dispatch_command),
        )
        .branch(Update::filter_message().endpoint(commands::media::handle_tmdb_link))
        .branch(Update::filter_callback_query().endpoint(dispatch_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
