// tests/generator_cache.rs
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clause_risk_engine::capability::{CachingGenerator, TextGenerator};
use clause_risk_engine::ExternalError;

/// Echoes the prompt and counts real calls.
#[derive(Clone, Default)]
struct CountingGenerator {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prompt}/{max_tokens}"))
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn cache_hits_skip_the_provider_and_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let inner = CountingGenerator::default();
    let calls = inner.calls.clone();
    let g = CachingGenerator::new(inner, dir.path().to_path_buf(), 1);

    assert_eq!(g.generate("assess", 100).await.unwrap(), "assess/100");
    assert_eq!(g.generate("assess", 100).await.unwrap(), "assess/100");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(g.calls_today(), 1);

    // Same prompt, different budget is a different entry; the limit is spent.
    assert_eq!(
        g.generate("assess", 200).await,
        Err(ExternalError::LimitReached)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_and_counter_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let inner = CountingGenerator::default();
    let calls = inner.calls.clone();

    {
        let g = CachingGenerator::new(inner.clone(), dir.path().to_path_buf(), 5);
        g.generate("one", 10).await.unwrap();
        g.generate("two", 10).await.unwrap();
    }

    let g = CachingGenerator::new(inner, dir.path().to_path_buf(), 5);
    assert_eq!(g.calls_today(), 2);
    assert_eq!(g.generate("one", 10).await.unwrap(), "one/10");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_limit_blocks_every_real_call() {
    let dir = tempfile::tempdir().unwrap();
    let inner = CountingGenerator::default();
    let calls = inner.calls.clone();
    let g = CachingGenerator::new(inner, dir.path().to_path_buf(), 0);

    assert_eq!(g.generate("x", 1).await, Err(ExternalError::LimitReached));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_errors_are_not_cached_or_counted() {
    struct Flaky;

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _p: &str, _m: u32) -> Result<String, ExternalError> {
            Err(ExternalError::Status(503))
        }
        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let g = CachingGenerator::new(Flaky, dir.path().to_path_buf(), 3);
    assert_eq!(g.generate("x", 1).await, Err(ExternalError::Status(503)));
    assert_eq!(g.calls_today(), 0);
}

/// Counts calls on entry, then waits before answering.
#[derive(Clone, Default)]
struct SlowCountingGenerator {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl TextGenerator for SlowCountingGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(prompt.to_string())
    }
    fn name(&self) -> &'static str {
        "slow-counting"
    }
}

#[tokio::test]
async fn concurrent_calls_cannot_overshoot_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let inner = SlowCountingGenerator::default();
    let calls = inner.calls.clone();
    let g = CachingGenerator::new(inner, dir.path().to_path_buf(), 1);

    let (a, b) = tokio::join!(g.generate("first", 10), g.generate("second", 10));
    let outcomes = [a, b];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| **r == Err(ExternalError::LimitReached))
            .count(),
        1
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(g.calls_today(), 1);
}

#[tokio::test]
async fn failed_call_returns_its_reserved_slot() {
    struct FailsOnce {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl TextGenerator for FailsOnce {
        async fn generate(&self, prompt: &str, _m: u32) -> Result<String, ExternalError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ExternalError::Timeout(std::time::Duration::from_millis(10)));
            }
            Ok(prompt.to_string())
        }
        fn name(&self) -> &'static str {
            "fails-once"
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let g = CachingGenerator::new(FailsOnce { calls: calls.clone() }, dir.path().to_path_buf(), 1);

    assert!(g.generate("x", 1).await.is_err());
    assert_eq!(g.generate("x", 1).await.unwrap(), "x");
    assert_eq!(g.calls_today(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
