//! Identification Coordinator
//!
//! Fans a scanned code out to every configured [`SourceFetcher`], waits for all
//! of them, then picks the first usable answer in priority order. Arrival order
//! never affects the choice: a slow high-priority source still beats a fast
//! lower-priority one unless it fails.
//!
//! When nothing usable comes back a placeholder is synthesized so the pipeline
//! can continue.

use crate::types::{ProductFacts, SourceError, SourceFetcher};
use futures::future::join_all;
use scanval_common::ResponseCache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Completed lookup from one source
#[derive(Debug)]
pub struct SourceOutcome {
    /// Source name
    pub source: &'static str,
    pub result: Result<ProductFacts, SourceError>,
    pub elapsed_ms: u64,
}

/// Facts chosen for one run, with provenance
#[derive(Debug, Clone)]
pub struct Identification {
    pub facts: ProductFacts,
    /// Sources queried (0 on a cache hit)
    pub attempted: usize,
    /// Sources that failed or returned unusable facts
    pub failed: usize,
    pub from_cache: bool,
    /// Winning source, `None` when the placeholder was used
    pub source_used: Option<String>,
}

pub struct IdentificationCoordinator {
    /// Priority order
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    fetch_timeout: Duration,
    cache: Option<Arc<ResponseCache<String, ProductFacts>>>,
}

impl IdentificationCoordinator {
    pub fn new(fetchers: Vec<Arc<dyn SourceFetcher>>, fetch_timeout: Duration) -> Self {
        Self {
            fetchers,
            fetch_timeout,
            cache: None,
        }
    }

    /// Attach a shared response cache
    pub fn with_cache(mut self, cache: Arc<ResponseCache<String, ProductFacts>>) -> Self {
        // Capacity 0 means caching is off
        if cache.capacity() > 0 {
            self.cache = Some(cache);
        }
        self
    }

    /// Number of configured sources
    pub fn count(&self) -> usize {
        self.fetchers.len()
    }

    /// Identify a scanned code
    ///
    /// Always returns facts; total failure yields the placeholder.
    pub async fn identify(&self, identifier_code: &str) -> Identification {
        if let Some(cache) = &self.cache {
            if let Some(facts) = cache.get(&identifier_code.to_string()).await {
                debug!(code = %identifier_code, source = %facts.source_name, "Identification cache hit");
                let source_used = Some(facts.source_name.clone());
                return Identification {
                    facts,
                    attempted: 0,
                    failed: 0,
                    from_cache: true,
                    source_used,
                };
            }
        }

        let outcomes = self.fetch_all(identifier_code).await;
        let attempted = outcomes.len();
        let failed = outcomes.iter().filter(|o| !is_usable(o)).count();

        match select(&outcomes, identifier_code) {
            Some(facts) => {
                let source_used = Some(facts.source_name.clone());
                if let Some(cache) = &self.cache {
                    cache.insert(identifier_code.to_string(), facts.clone()).await;
                }
                Identification {
                    facts,
                    attempted,
                    failed,
                    from_cache: false,
                    source_used,
                }
            }
            None => {
                info!(
                    code = %identifier_code,
                    attempted,
                    "No identification source answered, using placeholder"
                );
                Identification {
                    facts: ProductFacts::placeholder(identifier_code),
                    attempted,
                    failed,
                    from_cache: false,
                    source_used: None,
                }
            }
        }
    }

    /// Run every fetcher concurrently under the hard timeout
    ///
    /// Outcomes come back in priority order regardless of completion order.
    pub async fn fetch_all(&self, identifier_code: &str) -> Vec<SourceOutcome> {
        let timeout = self.fetch_timeout;
        let futures = self.fetchers.iter().map(|fetcher| {
            let fetcher = Arc::clone(fetcher);
            async move {
                let source = fetcher.name();
                let start = Instant::now();
                let result = match tokio::time::timeout(timeout, fetcher.fetch(identifier_code)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout),
                };
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(facts) => debug!(
                        source,
                        code = %identifier_code,
                        title = %facts.title,
                        elapsed_ms,
                        "Identification source answered"
                    ),
                    Err(e) => warn!(
                        source,
                        code = %identifier_code,
                        error = %e,
                        elapsed_ms,
                        "Identification source failed"
                    ),
                }

                SourceOutcome {
                    source,
                    result,
                    elapsed_ms,
                }
            }
        });

        join_all(futures).await
    }
}

fn is_usable(outcome: &SourceOutcome) -> bool {
    matches!(&outcome.result, Ok(facts) if facts.is_usable())
}

/// Pick the first usable facts in priority order
///
/// The returned facts always carry the caller's code. Pure over the
/// completed outcome set.
pub fn select(outcomes: &[SourceOutcome], identifier_code: &str) -> Option<ProductFacts> {
    let winner = outcomes.iter().position(is_usable)?;

    for later in outcomes[winner + 1..].iter().filter(|o| is_usable(o)) {
        debug!(source = later.source, "Usable lower-priority answer not selected");
    }

    let mut facts = match &outcomes[winner].result {
        Ok(facts) => facts.clone(),
        Err(_) => return None,
    };
    facts.identifier_code = identifier_code.to_string();
    if facts.source_name.is_empty() {
        facts.source_name = outcomes[winner].source.to_string();
    }
    Some(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        name: &'static str,
        title: Option<&'static str>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl StubFetcher {
        fn new(name: &'static str, title: Option<&'static str>, delay_ms: u64) -> Self {
            Self {
                name,
                title,
                delay: Duration::from_millis(delay_ms),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for StubFetcher {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, code: &str) -> Result<ProductFacts, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.title {
                // Sources may echo a normalized code; the coordinator restores the caller's
                Some(title) => Ok(ProductFacts::new(title, &format!("0{}", code), self.name)),
                None => Err(SourceError::NotFound(code.to_string())),
            }
        }
    }

    fn outcome(source: &'static str, title: Option<&str>) -> SourceOutcome {
        SourceOutcome {
            source,
            result: match title {
                Some(t) => Ok(ProductFacts::new(t, "x", source)),
                None => Err(SourceError::Network("down".to_string())),
            },
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_select_follows_priority_not_arrival() {
        let outcomes = vec![
            outcome("first", None),
            outcome("second", Some("Second")),
            outcome("third", Some("Third")),
        ];
        let facts = select(&outcomes, "123").unwrap();
        assert_eq!(facts.source_name, "second");
        assert_eq!(facts.identifier_code, "123");
    }

    #[test]
    fn test_select_skips_blank_titles() {
        let outcomes = vec![outcome("first", Some("  ")), outcome("second", Some("Lamp"))];
        assert_eq!(select(&outcomes, "1").unwrap().title, "Lamp");
        assert!(select(&[outcome("only", None)], "1").is_none());
    }

    #[tokio::test]
    async fn test_slow_high_priority_source_still_wins() {
        let coordinator = IdentificationCoordinator::new(
            vec![
                Arc::new(StubFetcher::new("slow", Some("Slow answer"), 80)),
                Arc::new(StubFetcher::new("fast", Some("Fast answer"), 0)),
            ],
            Duration::from_secs(2),
        );

        let identification = coordinator.identify("42").await;
        assert_eq!(identification.facts.title, "Slow answer");
        assert_eq!(identification.facts.identifier_code, "42");
        assert_eq!(identification.source_used.as_deref(), Some("slow"));
        assert_eq!(identification.failed, 0);
    }

    #[tokio::test]
    async fn test_timeout_falls_through_to_next_source() {
        let coordinator = IdentificationCoordinator::new(
            vec![
                Arc::new(StubFetcher::new("hung", Some("Never"), 5_000)),
                Arc::new(StubFetcher::new("backup", Some("Backup answer"), 0)),
            ],
            Duration::from_millis(50),
        );

        let identification = coordinator.identify("42").await;
        assert_eq!(identification.facts.title, "Backup answer");
        assert_eq!(identification.attempted, 2);
        assert_eq!(identification.failed, 1);
    }

    #[tokio::test]
    async fn test_total_failure_yields_placeholder() {
        let coordinator = IdentificationCoordinator::new(
            vec![Arc::new(StubFetcher::new("a", None, 0)), Arc::new(StubFetcher::new("b", None, 0))],
            Duration::from_secs(1),
        );

        let identification = coordinator.identify("012345678905").await;
        assert_eq!(identification.facts.title, "Product 012345678905");
        assert!(identification.facts.is_placeholder());
        assert_eq!(identification.source_used, None);
        assert_eq!(identification.failed, 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_sources_and_placeholder_not_cached() {
        let answering = StubFetcher::new("answering", Some("Cached lamp"), 0);
        let calls = Arc::clone(&answering.calls);
        let cache = Arc::new(ResponseCache::new(8));
        let coordinator = IdentificationCoordinator::new(vec![Arc::new(answering)], Duration::from_secs(1))
            .with_cache(Arc::clone(&cache));

        coordinator.identify("7").await;
        let second = coordinator.identify("7").await;
        assert!(second.from_cache);
        assert_eq!(second.facts.title, "Cached lamp");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let failing = IdentificationCoordinator::new(
            vec![Arc::new(StubFetcher::new("none", None, 0))],
            Duration::from_secs(1),
        )
        .with_cache(Arc::clone(&cache));
        failing.identify("8").await;
        assert!(cache.get(&"8".to_string()).await.is_none());
    }
}
