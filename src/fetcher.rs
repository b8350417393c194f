use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::error::FetchError;
use crate::listing;
use crate::model::{ArticleCollection, ArticleFailure, ArticleRecord, ArticleSummary};
use crate::parser;
use crate::transport::Transport;

/// Body text of one article and whether the raw page came from the cache.
pub struct Fetched {
    pub content: String,
    pub from_cache: bool,
}

/// Listing → per-article fetch (cache first) → normalize → sort.
pub struct Fetcher<T> {
    transport: T,
    cache: CacheStore,
    base_url: String,
    page_delay: Duration,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, cache: CacheStore, base_url: impl Into<String>, page_delay: Duration) -> Self {
        Fetcher {
            transport,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_delay,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn list(&self, author_id: &str) -> Vec<ArticleSummary> {
        listing::list_articles(&self.transport, &self.base_url, author_id, self.page_delay).await
    }

    /// Fetch every article of `author_id`. Per-article failures leave that
    /// article's content empty and are reported in `failures`; the run itself
    /// always completes.
    pub async fn run(&self, author_id: &str, force_refresh: bool) -> ArticleCollection {
        if force_refresh {
            let removed = self.cache.clear_all();
            info!("Force refresh: removed {} cached pages", removed);
        }

        let summaries = self.list(author_id).await;
        let total = summaries.len();

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut cache_hits = 0;

        for summary in summaries {
            pb.set_message(summary.title.clone());
            let content = match self.article_content(&summary.url, !force_refresh).await {
                Ok(fetched) => {
                    if fetched.from_cache {
                        cache_hits += 1;
                    }
                    fetched.content
                }
                Err(error) => {
                    warn!("No content for {}: {}", summary.url, error);
                    failures.push(ArticleFailure {
                        url: summary.url.clone(),
                        error,
                    });
                    String::new()
                }
            };
            records.push(ArticleRecord::new(summary, content));
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "Fetched {} articles ({} from cache, {} failed)",
            total,
            cache_hits,
            failures.len()
        );

        let mut collection = ArticleCollection::new(records);
        collection.failures = failures;
        collection.cache_hits = cache_hits;
        collection
    }

    /// Raw page from cache or network (written through to the cache), then normalized.
    pub async fn article_content(&self, url: &str, use_cache: bool) -> Result<Fetched, FetchError> {
        let cached = if use_cache {
            self.cache.get(url).filter(|html| !html.is_empty())
        } else {
            None
        };

        let (html, from_cache) = match cached {
            Some(html) => (html, true),
            None => {
                let html = self.transport.get_text(url).await?;
                self.cache.put(url, &html);
                (html, false)
            }
        };

        let content = parser::normalize_article(url, &html)?;
        Ok(Fetched {
            content,
            from_cache,
        })
    }
}
