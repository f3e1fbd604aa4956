use std::env;

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub jellyfin_url: String,
    pub jellyfin_api_key: String,
    pub jellyseerr_url: String,
    pub jellyseerr_api_key: String,
    pub database_path: String,
    pub admin_user_ids: Vec<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .expect("TELEGRAM_BOT_TOKEN must be set"),
            jellyfin_url: trim_base_url(
                &env::var("JELLYFIN_URL").expect("JELLYFIN_URL must be set"),
            ),
            jellyfin_api_key: env::var("JELLYFIN_API_KEY").expect("JELLYFIN_API_KEY must be set"),
            jellyseerr_url: trim_base_url(
                &env::var("JELLYSEERR_URL").expect("JELLYSEERR_URL must be set"),
            ),
            jellyseerr_api_key: env::var("JELLYSEERR_API_KEY")
                .expect("JELLYSEERR_API_KEY must be set"),
            database_path: env::var("DB_PATH").unwrap_or_else(|_| "./jellygram.db".to_string()),
            admin_user_ids: parse_admin_ids(
                &env::var("ADMIN_USER_IDS").expect("ADMIN_USER_IDS must be set"),
            ),
        }
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Comma-separated numeric Telegram user ids. Entries that do not parse are
/// ignored with a warning rather than taking the whole process down.
fn parse_admin_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                log::warn!("[CONFIG] Ignoring invalid admin user id: {}", s);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("1, 22,333"), vec![1, 22, 333]);
        assert_eq!(parse_admin_ids(""), Vec::<u64>::new());
        assert_eq!(parse_admin_ids("42,abc, 7"), vec![42, 7]);
    }

    #[test]
    fn test_trim_base_url() {
        assert_eq!(trim_base_url("http://jf.local/"), "http://jf.local");
        assert_eq!(trim_base_url("http://jf.local"), "http://jf.local");
    }
}
