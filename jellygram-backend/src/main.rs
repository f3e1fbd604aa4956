use dotenv::dotenv;
use std::sync::Arc;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;

mod accounts;
mod cache;
mod channels;
mod config;
mod db;
mod error;
mod helpers;
mod http;
mod integrations;
mod models;

use accounts::provisioner::ServiceUrls;
use accounts::{
    AccountDeprovisioner, AccountProvisioner, ExpirySweeper, IdentityResolver, LinkedAccountStore,
};
use cache::MediaCache;
use channels::telegram::{self, TelegramTransport};
use config::Config;
use db::Database;
use integrations::{JellyfinClient, JellyseerrClient, MediaServerApi, RequestServiceApi};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn LinkedAccountStore>,
    pub jellyfin: Arc<dyn MediaServerApi>,
    pub jellyseerr: Arc<dyn RequestServiceApi>,
    pub resolver: Arc<IdentityResolver>,
    pub provisioner: AccountProvisioner,
    pub deprovisioner: Arc<AccountDeprovisioner>,
    pub cache: MediaCache,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    log::info!("Initializing database at {}", config.database_path);
    let db = Arc::new(Database::new(&config.database_path).expect("Failed to initialize database"));
    let store: Arc<dyn LinkedAccountStore> = db;

    let http_client = http::build_client();
    let jellyfin: Arc<dyn MediaServerApi> = Arc::new(JellyfinClient::new(
        http_client.clone(),
        &config.jellyfin_url,
        &config.jellyfin_api_key,
    ));
    let jellyseerr: Arc<dyn RequestServiceApi> = Arc::new(JellyseerrClient::new(
        http_client,
        &config.jellyseerr_url,
        &config.jellyseerr_api_key,
    ));

    let bot = Bot::new(config.telegram_bot_token.clone());
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let resolver = Arc::new(IdentityResolver::new(jellyfin.clone(), jellyseerr.clone()));
    let deprovisioner = Arc::new(AccountDeprovisioner::new(
        jellyfin.clone(),
        jellyseerr.clone(),
        store.clone(),
    ));
    let provisioner = AccountProvisioner::new(
        resolver.clone(),
        jellyfin.clone(),
        jellyseerr.clone(),
        store.clone(),
        transport.clone(),
        ServiceUrls {
            jellyfin: config.jellyfin_url.clone(),
            jellyseerr: config.jellyseerr_url.clone(),
        },
    );

    // The sweep runs for the life of the process; the token lets shutdown
    // stop it deterministically.
    let sweeper = ExpirySweeper::new(store.clone(), deprovisioner.clone(), transport.clone());
    let cancel = CancellationToken::new();
    let sweep_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { sweeper.run(cancel).await })
    };

    let state = Arc::new(AppState {
        config,
        store,
        jellyfin,
        jellyseerr,
        resolver,
        provisioner,
        deprovisioner,
        cache: MediaCache::new(),
    });

    log::info!("Starting Telegram dispatcher");
    telegram::run(bot, transport, state).await;

    cancel.cancel();
    let _ = sweep_handle.await;
    log::info!("Shutdown complete");
}
