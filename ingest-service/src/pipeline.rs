use embedsync_core::{
    AppConfig, CoreError, ErrorReporter, FeedSource, LinkChecker, MetadataFetcher, PostStore,
    RawFeedEntry, SessionProvider,
};
use patreon_client::normalize;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::enrich::enrich;
use crate::filter::{filter, FilterOptions};
use crate::persist::persist;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub filter: FilterOptions,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            filter: FilterOptions {
                max_concurrent_probes: config.max_concurrent_probes,
                probe_failure_policy: config.probe_failure_policy,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub posts_imported: u64,
}

/// Walks the feed from its first page to its last, importing each page in
/// turn. Pages are processed strictly one after another.
pub struct Pipeline<P, F, M, L, S> {
    session: P,
    feed: F,
    fetcher: M,
    checker: L,
    store: S,
    config: PipelineConfig,
    reporter: ErrorReporter,
}

impl<P, F, M, L, S> Pipeline<P, F, M, L, S>
where
    P: SessionProvider,
    F: FeedSource,
    M: MetadataFetcher,
    L: LinkChecker,
    S: PostStore,
{
    pub fn new(
        session: P,
        feed: F,
        fetcher: M,
        checker: L,
        store: S,
        config: PipelineConfig,
    ) -> Self {
        Self {
            session,
            feed,
            fetcher,
            checker,
            store,
            config,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn fetcher(&self) -> &M {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs to the end of the feed. Session and page-fetch failures end the
    /// run; a page that fails to import is logged and skipped.
    pub async fn run(&self) -> Result<RunSummary, CoreError> {
        let session = self.session.acquire_session().await?;
        let mut summary = RunSummary::default();
        let mut cursor = self.feed.first_cursor();

        loop {
            let page = self
                .feed
                .fetch_page(&cursor, &session)
                .await
                .map_err(|e| {
                    error!("Failed to fetch page {}: {}", cursor, e);
                    e
                })?;

            match self.process_page(&cursor, page.entries).await {
                Ok(imported) => {
                    info!("Imported {} post(s) for {}", imported, cursor);
                    summary.pages_processed += 1;
                    summary.posts_imported += imported;
                }
                Err(e) => {
                    self.reporter.report_warning(&e);
                    summary.pages_failed += 1;
                }
            }

            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        info!(
            "Run complete: {} page(s) imported, {} failed, {} post(s) written",
            summary.pages_processed, summary.pages_failed, summary.posts_imported
        );
        Ok(summary)
    }

    async fn process_page(&self, cursor: &str, entries: Vec<RawFeedEntry>) -> Result<u64, CoreError> {
        let mut posts = normalize(entries);
        debug!("{} usable post(s) on {}", posts.len(), cursor);

        enrich(&self.fetcher, &mut posts).await;

        let result = match filter(&self.store, &self.checker, posts.clone(), &self.config.filter).await
        {
            Ok(kept) => persist(&self.store, &kept).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            let batch = serde_json::to_string(&posts)
                .unwrap_or_else(|err| format!("<unserializable: {}>", err));
            error!("Failed to import page {}: {}\nposts: {}", cursor, e, batch);
        }
        result
    }
}
