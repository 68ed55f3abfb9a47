//! In-process article service
//!
//! Stands in for the encyclopedia's "random page summary" endpoint: every
//! call waits for the configured latency and returns the next article from a
//! fixed catalogue, failing every `fail_every`-th call when configured.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::state::Article;

const CATALOGUE: &[(&str, &str, Option<&str>)] = &[
    (
        "Ferris the crab",
        "Ferris is the unofficial mascot of the Rust programming language.",
        Some("https://rustacean.net/assets/rustacean-flat-happy.png"),
    ),
    (
        "Unidirectional data flow",
        "A design where data has one, and only one, way to be transferred to other parts of the application.",
        None,
    ),
    (
        "Reducer (functional programming)",
        "A pure function that takes a state and an action and returns the next state.",
        None,
    ),
    (
        "Tokio (software)",
        "An asynchronous runtime for the Rust programming language.",
        Some("https://tokio.rs/img/tokio-horizontal.svg"),
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service unavailable (call #{0})")]
    Unavailable(u32),
}

/// Settings for the fake service.
#[derive(Clone, Copy, Debug)]
pub struct ServiceConfig {
    pub latency: Duration,
    /// Fail every n-th call; `0` never fails
    pub fail_every: u32,
}

#[derive(Clone, Debug)]
pub struct ArticleService {
    config: ServiceConfig,
    calls: Arc<AtomicU32>,
}

impl ArticleService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fetch the next random article.
    pub async fn random_article(&self) -> Result<Article, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.config.latency).await;

        if self.config.fail_every > 0 && call % self.config.fail_every == 0 {
            tracing::warn!(call, "Article service failed");
            return Err(ServiceError::Unavailable(call));
        }

        let (title, extract, image) = CATALOGUE[(call as usize - 1) % CATALOGUE.len()];
        tracing::debug!(call, title, "Article service responded");
        Ok(Article {
            title: title.to_string(),
            extract: extract.to_string(),
            image: image.map(str::to_string),
        })
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
