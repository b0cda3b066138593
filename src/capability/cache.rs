// src/capability/cache.rs
//! Caching wrapper for any `TextGenerator`: file cache + per-day call limit.
//!
//! Layout under `cache_dir`:
//! - `<sha256(prompt, max_tokens)>.json` → `{ "text": "..." }`
//! - `daily_count.json`                 → `{ "date": "YYYY-MM-DD", "count": N }`
//!
//! Only successful real calls count toward the limit; cache hits are free.
//! Cache I/O is best-effort: a broken cache dir never fails a call.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::TextGenerator;
use crate::error::ExternalError;

pub struct CachingGenerator<G: TextGenerator> {
    inner: G,
    cache_dir: PathBuf,
    daily_limit: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<G: TextGenerator> CachingGenerator<G> {
    pub fn new(inner: G, cache_dir: PathBuf, daily_limit: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!(error = %e, dir = %cache_dir.display(), "cannot create generator cache dir");
        }
        let counter = load_daily_counter(&cache_dir).unwrap_or_default();
        Self {
            inner,
            cache_dir,
            daily_limit,
            counter: Arc::new(Mutex::new(counter)),
        }
    }

    /// Real calls made today (after rollover).
    pub fn calls_today(&self) -> u32 {
        let mut g = self.lock_counter();
        g.roll_over(&self.cache_dir);
        g.count
    }

    fn lock_counter(&self) -> MutexGuard<'_, DailyCounter> {
        self.counter.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Give back a slot reserved for a call that failed. A slot from a day
    /// that has since rolled over is already gone.
    fn release_slot(&self, reserved_on: &str) {
        let mut g = self.lock_counter();
        if g.date == reserved_on {
            g.count = g.count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for CachingGenerator<G> {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ExternalError> {
        let key = cache_key(prompt, max_tokens);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(key = %&key[..12], "generator cache hit");
            return Ok(hit.text);
        }

        // Reserve a slot before the call so concurrent callers cannot overshoot the limit.
        let reserved_on = {
            let mut g = self.lock_counter();
            g.roll_over(&self.cache_dir);
            if g.count >= self.daily_limit {
                return Err(ExternalError::LimitReached);
            }
            g.count += 1;
            g.date.clone()
        };

        let text = match self.inner.generate(prompt, max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                self.release_slot(&reserved_on);
                return Err(e);
            }
        };

        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CacheEntry { text: text.clone() }) {
            warn!(error = %e, "generator cache write failed");
        }
        let g = self.lock_counter();
        if let Err(e) = save_daily_counter(&self.cache_dir, &g) {
            warn!(error = %e, "daily counter write failed");
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    text: String,
}

fn cache_key(prompt: &str, max_tokens: u32) -> String {
    let mut h = Sha256::new();
    h.update(prompt.as_bytes());
    h.update([0u8]);
    h.update(max_tokens.to_le_bytes());
    h.finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CacheEntry> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

/// Write via temp file + rename so readers never see a partial entry.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    fs::write(&tmp, json)?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, entry: &CacheEntry) -> io::Result<()> {
    write_json_atomic(&cache_path(dir, key), entry)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn roll_over(&mut self, dir: &Path) {
        if self.date != today() {
            self.date = today();
            self.count = 0;
            if let Err(e) = save_daily_counter(dir, self) {
                warn!(error = %e, "daily counter write failed");
            }
        }
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    write_json_atomic(&counter_path(dir), dc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_depends_on_prompt_and_budget() {
        let a = cache_key("prompt", 100);
        assert_eq!(a.len(), 64);
        assert_eq!(a, cache_key("prompt", 100));
        assert_ne!(a, cache_key("prompt", 200));
        assert_ne!(a, cache_key("prompt!", 100));
    }

    #[test]
    fn stale_counter_rolls_over() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = DailyCounter {
            date: "2000-01-01".into(),
            count: 9,
        };
        c.roll_over(dir.path());
        assert_eq!(c.count, 0);
        assert_eq!(c.date, today());
        let saved = load_daily_counter(dir.path()).unwrap();
        assert_eq!(saved.count, 0);
    }
}
