use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::ArticleSummary;
use crate::transport::Transport;

#[derive(Deserialize)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    contents: Vec<Value>,
    /// Anything other than a literal `false` counts as the last page.
    #[serde(rename = "isLastPage", default)]
    is_last_page: Option<Value>,
}

/// Per-article fields. Parsed one item at a time so a bad item only skips itself.
#[derive(Deserialize)]
struct RawNote {
    key: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "publishAt", default)]
    publish_at: Option<String>,
}

/// One decoded listing page.
#[derive(Debug)]
pub struct Page {
    pub number: u32,
    pub articles: Vec<ArticleSummary>,
    /// Items the API returned, including ones skipped as malformed.
    pub listed: usize,
    pub is_last: bool,
}

/// Cursor over the paginated listing endpoint for one author.
///
/// Pages are requested one at a time starting at 1. The cursor finishes on
/// the first page that is flagged last, comes back empty, or cannot be used.
pub struct Paginator<'a, T> {
    transport: &'a T,
    base_url: &'a str,
    author_id: &'a str,
    delay: Duration,
    next: u32,
    done: bool,
}

impl<'a, T: Transport> Paginator<'a, T> {
    pub fn new(transport: &'a T, base_url: &'a str, author_id: &'a str, delay: Duration) -> Self {
        Paginator {
            transport,
            base_url,
            author_id,
            delay,
            next: 1,
            done: false,
        }
    }

    pub fn pages_requested(&self) -> u32 {
        self.next - 1
    }

    /// Fetch the next page, or `None` once pagination has stopped.
    pub async fn next_page(&mut self) -> Option<Page> {
        if self.done {
            return None;
        }

        // Politeness delay between consecutive requests, not before the first.
        if self.next > 1 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let number = self.next;
        self.next += 1;
        info!("Fetching listing page {}", number);

        let url = listing_url(self.base_url, self.author_id, number);
        let page = match self.transport.get_text(&url).await {
            Ok(body) => parse_page(&body, number, self.base_url, self.author_id),
            Err(e) => Err(e),
        };

        match page {
            Ok(page) if page.listed == 0 => {
                self.done = true;
                None
            }
            Ok(page) => {
                self.done = page.is_last;
                Some(page)
            }
            Err(e) => {
                warn!("Stopping pagination: {}", e);
                self.done = true;
                None
            }
        }
    }
}

/// Walk every listing page and collect the summaries in API order.
pub async fn list_articles<T: Transport>(
    transport: &T,
    base_url: &str,
    author_id: &str,
    delay: Duration,
) -> Vec<ArticleSummary> {
    let mut paginator = Paginator::new(transport, base_url, author_id, delay);
    let mut all = Vec::new();
    while let Some(page) = paginator.next_page().await {
        debug!("Page {}: {} articles", page.number, page.articles.len());
        all.extend(page.articles);
    }
    info!(
        "Listed {} articles over {} pages",
        all.len(),
        paginator.pages_requested()
    );
    all
}

pub fn listing_url(base_url: &str, author_id: &str, page: u32) -> String {
    format!(
        "{}/api/v2/creators/{}/contents?kind=note&page={}",
        base_url, author_id, page
    )
}

pub fn article_url(base_url: &str, author_id: &str, key: &str) -> String {
    format!("{}/{}/n/{}", base_url, author_id, key)
}

fn parse_page(body: &str, number: u32, base_url: &str, author_id: &str) -> Result<Page, FetchError> {
    let response: ListingResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedListing {
            page: number,
            reason: e.to_string(),
        })?;

    let listed = response.data.contents.len();
    let articles = response
        .data
        .contents
        .into_iter()
        .filter_map(|item| match summary_from_item(item, base_url, author_id) {
            Ok(summary) => Some(summary),
            Err(reason) => {
                warn!("Skipping article on page {}: {}", number, reason);
                None
            }
        })
        .collect();

    Ok(Page {
        number,
        articles,
        listed,
        is_last: !matches!(response.data.is_last_page, Some(Value::Bool(false))),
    })
}

fn summary_from_item(item: Value, base_url: &str, author_id: &str) -> Result<ArticleSummary, String> {
    let raw: RawNote = serde_json::from_value(item).map_err(|e| e.to_string())?;
    let published_at = match raw.publish_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(parse_timestamp(s).ok_or_else(|| format!("bad publishAt {:?}", s))?),
    };

    Ok(ArticleSummary {
        published_at,
        title: raw.name.unwrap_or_default(),
        url: article_url(base_url, author_id, &raw.key),
    })
}

/// ISO-8601 timestamp; a trailing `Z` means `+00:00`, any other offset is kept.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = match s.strip_suffix('Z') {
        Some(rest) => format!("{}+00:00", rest),
        None => s.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%:z"))
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    const BASE: &str = "https://note.test";

    fn page_json(keys: &[&str], is_last: bool) -> String {
        let contents: Vec<Value> = keys
            .iter()
            .map(|k| {
                serde_json::json!({
                    "key": k,
                    "name": format!("Title {}", k),
                    "publishAt": "2024-05-01T12:00:00+09:00",
                })
            })
            .collect();
        serde_json::json!({ "data": { "contents": contents, "isLastPage": is_last } }).to_string()
    }

    #[test]
    fn timestamps() {
        let z = parse_timestamp("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(z.offset().local_minus_utc(), 0);
        assert_eq!(z.to_rfc3339(), "2024-01-02T03:04:05+00:00");

        let jst = parse_timestamp("2024-01-02T03:04:05+09:00").unwrap();
        assert_eq!(jst.offset().local_minus_utc(), 9 * 3600);

        let frac = parse_timestamp("2024-01-02T03:04:05.123Z").unwrap();
        assert_eq!(frac.timestamp_subsec_millis(), 123);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn urls() {
        assert_eq!(
            listing_url(BASE, "alice", 3),
            "https://note.test/api/v2/creators/alice/contents?kind=note&page=3"
        );
        assert_eq!(article_url(BASE, "alice", "n123"), "https://note.test/alice/n/n123");
    }

    #[test]
    fn bad_item_skips_only_itself() {
        let body = serde_json::json!({
            "data": {
                "contents": [
                    { "key": "n1", "name": "ok", "publishAt": "2024-01-01T00:00:00Z" },
                    { "name": "no key" },
                    { "key": "n3", "name": "bad date", "publishAt": "not a date" },
                    { "key": "n4", "publishAt": "" }
                ],
                "isLastPage": false
            }
        })
        .to_string();

        let page = parse_page(&body, 1, BASE, "alice").unwrap();
        assert!(!page.is_last);
        assert_eq!(page.listed, 4);
        assert_eq!(page.articles.len(), 2);
        assert_eq!(page.articles[0].title, "ok");
        assert_eq!(page.articles[1].url, "https://note.test/alice/n/n4");
        assert_eq!(page.articles[1].title, "");
        assert!(page.articles[1].published_at.is_none());
    }

    #[test]
    fn missing_keys_is_malformed() {
        assert!(matches!(
            parse_page(r#"{"data":{}}"#, 2, BASE, "alice"),
            Err(FetchError::MalformedListing { page: 2, .. })
        ));
        assert!(parse_page(r#"{"error":"nope"}"#, 1, BASE, "alice").is_err());
        assert!(parse_page("<html>", 1, BASE, "alice").is_err());
    }

    #[test]
    fn absent_last_flag_means_last() {
        let page = parse_page(r#"{"data":{"contents":[{"key":"n1"}]}}"#, 1, BASE, "a").unwrap();
        assert!(page.is_last);
    }

    #[test]
    fn odd_last_flag_keeps_items_and_stops() {
        for flag in [r#""false""#, "0", "null", "true"] {
            let body = format!(
                r#"{{"data":{{"contents":[{{"key":"n1"}},{{"key":"n2"}}],"isLastPage":{}}}}}"#,
                flag
            );
            let page = parse_page(&body, 1, BASE, "a").unwrap();
            assert_eq!(page.articles.len(), 2, "isLastPage={}", flag);
            assert!(page.is_last, "isLastPage={}", flag);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pages_only() {
        let delay = Duration::from_millis(1500);
        let transport = MockTransport::default()
            .with(listing_url(BASE, "alice", 1), page_json(&["a"], false))
            .with(listing_url(BASE, "alice", 2), page_json(&["b"], false))
            .with(listing_url(BASE, "alice", 3), page_json(&["c"], true));
        let start = tokio::time::Instant::now();

        let articles = list_articles(&transport, BASE, "alice", delay).await;

        assert_eq!(articles.len(), 3);
        let offsets: Vec<Duration> = transport
            .request_times()
            .iter()
            .map(|t| t.duration_since(start))
            .collect();
        assert_eq!(offsets, [Duration::ZERO, delay, delay * 2]);
        // No trailing sleep after the last page.
        assert_eq!(start.elapsed(), delay * 2);
    }

    #[tokio::test]
    async fn stops_after_last_page() {
        let transport = MockTransport::default()
            .with(listing_url(BASE, "alice", 1), page_json(&["a", "b"], false))
            .with(listing_url(BASE, "alice", 2), page_json(&["c"], false))
            .with(listing_url(BASE, "alice", 3), page_json(&["d"], true))
            .with(listing_url(BASE, "alice", 4), page_json(&["e"], true));

        let articles = list_articles(&transport, BASE, "alice", Duration::ZERO).await;

        assert_eq!(articles.len(), 4);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.count(&listing_url(BASE, "alice", 4)), 0);
    }

    #[tokio::test]
    async fn failed_page_truncates() {
        let transport = MockTransport::default()
            .with(listing_url(BASE, "alice", 1), page_json(&["a"], false))
            .failing(listing_url(BASE, "alice", 2), 503)
            .with(listing_url(BASE, "alice", 3), page_json(&["c"], true));

        let articles = list_articles(&transport, BASE, "alice", Duration::ZERO).await;

        assert_eq!(articles.len(), 1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn empty_page_stops() {
        let transport = MockTransport::default()
            .with(listing_url(BASE, "alice", 1), page_json(&["a"], false))
            .with(listing_url(BASE, "alice", 2), page_json(&[], false));

        let mut paginator = Paginator::new(&transport, BASE, "alice", Duration::ZERO);
        let first = paginator.next_page().await.unwrap();
        assert_eq!(first.number, 1);
        assert!(paginator.next_page().await.is_none());
        assert!(paginator.next_page().await.is_none());
        assert_eq!(paginator.pages_requested(), 2);
    }
}
