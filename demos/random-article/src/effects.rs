//! Side effects for the reader
//!
//! The fetch effect switches to the latest request: asking for a new article
//! while one is loading drops the older response.

use uni_dispatch::{effect, ActionStream, SideEffect};

use crate::action::WikiAction;
use crate::service::ArticleService;

pub fn fetch_articles(service: ArticleService) -> impl SideEffect<WikiAction> {
    move |actions: ActionStream<WikiAction>| {
        effect::switch_latest(actions, move |action| match action {
            WikiAction::FetchRandomArticle => {
                let service = service.clone();
                Some(async move {
                    match service.random_article().await {
                        Ok(article) => WikiAction::ArticleDidLoad(article),
                        Err(e) => WikiAction::ArticleDidFail(e.to_string()),
                    }
                })
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uni_dispatch::testing::EffectHarness;
    use uni_dispatch::{assert_emitted, count_emitted};

    use crate::service::ServiceConfig;

    fn service(fail_every: u32) -> ArticleService {
        ArticleService::new(ServiceConfig {
            latency: Duration::from_millis(100),
            fail_every,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_emits_loaded_article() {
        let mut harness = EffectHarness::new(fetch_articles(service(0)));

        harness.send(WikiAction::FetchRandomArticle);
        let emitted = harness.drain(Duration::from_millis(500)).await;

        assert_eq!(emitted.len(), 1);
        assert_emitted!(
            emitted,
            WikiAction::ArticleDidLoad(article) if article.title == "Ferris the crab"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_become_actions() {
        let mut harness = EffectHarness::new(fetch_articles(service(1)));

        harness.send(WikiAction::FetchRandomArticle);
        let emitted = harness.drain(Duration::from_millis(500)).await;

        assert_emitted!(emitted, WikiAction::ArticleDidFail(_));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_wins() {
        let articles = service(0);
        let mut harness = EffectHarness::new(fetch_articles(articles.clone()));

        harness.send(WikiAction::FetchRandomArticle);
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.send(WikiAction::FetchRandomArticle);
        let emitted = harness.drain(Duration::from_millis(500)).await;

        assert_eq!(articles.calls(), 2);
        assert_eq!(count_emitted!(emitted, WikiAction::ArticleDidLoad(_)), 1);
        assert_emitted!(
            emitted,
            WikiAction::ArticleDidLoad(article) if article.title == "Unidirectional data flow"
        );
    }
}
