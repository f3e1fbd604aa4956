//! HTML card rendering for media items, requests, and watch statistics.

use teloxide::utils::html::escape;
use url::Url;

use crate::integrations::jellyfin::PlayedItem;
use crate::integrations::jellyseerr::{MediaRequest, MediaResult};

const TMDB_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// One Jellyfin runtime tick is 100 ns.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Rendered message plus optional poster.
pub struct MediaCard {
    pub text: String,
    pub photo_url: Option<Url>,
}

pub fn poster_url(poster_path: Option<&str>) -> Option<Url> {
    let path = poster_path?;
    Url::parse(&format!("{}{}", TMDB_IMAGE_BASE_URL, path)).ok()
}

fn year_of(date: Option<&str>) -> &str {
    match date.and_then(|d| d.split('-').next()) {
        Some(year) if !year.is_empty() => year,
        _ => "N/A",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn format_media_item(item: &MediaResult, index: usize, total: usize) -> MediaCard {
    let title = item
        .title
        .as_deref()
        .or(item.name.as_deref())
        .unwrap_or("Unknown Title");
    let year = year_of(item.release_date.as_deref().or(item.first_air_date.as_deref()));
    let media_type = capitalize(item.media_type.as_deref().unwrap_or("N/A"));
    let overview = item.overview.as_deref().unwrap_or("No overview available.");

    let text = format!(
        "<b>{} ({})</b>\n<i>{}</i>\n\n{}\n\nResult {} of {}",
        escape(title),
        year,
        escape(&media_type),
        escape(overview),
        index + 1,
        total
    );
    MediaCard {
        text,
        photo_url: poster_url(item.poster_path.as_deref()),
    }
}

pub fn status_label(status: Option<i64>) -> &'static str {
    match status {
        Some(1) => "⏳ Pending",
        Some(2) => "✅ Approved",
        Some(3) => "⚙️ Processing",
        Some(4) => "🗂️ Partially Available",
        Some(5) => "🎬 Available",
        _ => "❓ Unknown",
    }
}

/// Render one request. `details` is the media lookup for the request's TMDB
/// id; the caller fetches it so this stays pure.
pub fn format_request_item(
    request: &MediaRequest,
    details: &MediaResult,
    index: usize,
    total: usize,
) -> MediaCard {
    let media_type = request
        .media
        .as_ref()
        .and_then(|m| m.media_type.as_deref())
        .unwrap_or("unknown");
    let (title, date) = if media_type == "tv" {
        (details.name.as_deref(), details.first_air_date.as_deref())
    } else {
        (details.title.as_deref(), details.release_date.as_deref())
    };
    let requested_on = request
        .created_at
        .as_deref()
        .and_then(|d| d.split('T').next())
        .unwrap_or("N/A");

    let text = format!(
        "<b>{} ({})</b>\n\n<b>Status:</b> {}\n<b>Type:</b> {}\n<b>Requested On:</b> {}\n\nRequest {} of {}",
        escape(title.unwrap_or("Unknown Title")),
        year_of(date),
        status_label(request.status),
        escape(&capitalize(media_type)),
        requested_on,
        index + 1,
        total
    );
    MediaCard {
        text,
        photo_url: poster_url(details.poster_path.as_deref()),
    }
}

pub fn format_watch_stats(first_name: &str, items: &[PlayedItem]) -> String {
    let watched_count = items.len();
    let total_seconds: i64 = items
        .iter()
        .filter_map(|i| i.run_time_ticks)
        .sum::<i64>()
        / TICKS_PER_SECOND;

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    let last_watched = items
        .iter()
        .filter(|i| {
            i.user_data
                .as_ref()
                .and_then(|u| u.last_played_date.as_ref())
                .is_some()
        })
        .max_by_key(|i| {
            i.user_data
                .as_ref()
                .and_then(|u| u.last_played_date.clone())
                .unwrap_or_default()
        })
        .map(|item| {
            let name = item.name.as_deref().unwrap_or("Unknown Title");
            match (&item.item_type, &item.series_name) {
                (Some(t), Some(series)) if t == "Episode" => format!("{} - {}", series, name),
                _ => name.to_string(),
            }
        })
        .unwrap_or_else(|| "No specific last watched item found.".to_string());

    format!(
        "📊 <b>{}'s Watch Statistics</b>\n\n\
         <b>📺 Total Watched Items:</b> {}\n\
         <b>⏱️ Total Watch Time:</b> {}d {}h {}m\n\
         <b>👀 Last Watched:</b> {}",
        escape(first_name),
        watched_count,
        days,
        hours,
        minutes,
        escape(&last_watched)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::jellyfin::PlayedItemUserData;

    fn media(title: Option<&str>, name: Option<&str>) -> MediaResult {
        MediaResult {
            id: 1,
            media_type: Some("movie".to_string()),
            title: title.map(str::to_string),
            name: name.map(str::to_string),
            release_date: Some("1999-10-15".to_string()),
            first_air_date: None,
            overview: Some("An office worker <spirals>.".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
        }
    }

    #[test]
    fn test_format_media_item_escapes_and_numbers() {
        let card = format_media_item(&media(Some("Fight Club"), None), 0, 3);
        assert!(card.text.contains("<b>Fight Club (1999)</b>"));
        assert!(card.text.contains("&lt;spirals&gt;"));
        assert!(card.text.contains("Result 1 of 3"));
        assert_eq!(
            card.photo_url.unwrap().as_str(),
            "https://image.tmdb.org/t/p/w500/poster.jpg"
        );
    }

    #[test]
    fn test_format_media_item_falls_back_to_name() {
        let card = format_media_item(&media(None, Some("Breaking Bad")), 0, 1);
        assert!(card.text.contains("Breaking Bad"));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(Some(5)), "🎬 Available");
        assert_eq!(status_label(Some(99)), "❓ Unknown");
        assert_eq!(status_label(None), "❓ Unknown");
    }

    #[test]
    fn test_watch_stats_totals_and_last_watched() {
        let items = vec![
            PlayedItem {
                name: Some("Pilot".to_string()),
                item_type: Some("Episode".to_string()),
                series_name: Some("Severance".to_string()),
                run_time_ticks: Some(3600 * TICKS_PER_SECOND),
                user_data: Some(PlayedItemUserData {
                    last_played_date: Some("2026-02-01T00:00:00Z".to_string()),
                }),
            },
            PlayedItem {
                name: Some("Heat".to_string()),
                item_type: Some("Movie".to_string()),
                series_name: None,
                run_time_ticks: Some(2 * 3600 * TICKS_PER_SECOND),
                user_data: Some(PlayedItemUserData {
                    last_played_date: Some("2026-01-01T00:00:00Z".to_string()),
                }),
            },
        ];
        let text = format_watch_stats("Ana", &items);
        assert!(text.contains("Total Watched Items:</b> 2"));
        assert!(text.contains("0d 3h 0m"));
        assert!(text.contains("Severance - Pilot"));
    }

    #[test]
    fn test_watch_stats_with_no_items() {
        let text = format_watch_stats("Ana", &[]);
        assert!(text.contains("Total Watched Items:</b> 0"));
        assert!(text.contains("No specific last watched item found."));
    }
}
