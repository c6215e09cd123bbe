//! Identity string resolution for the content load.
//!
//! The remote client rejects unfamiliar browsers, so the webview presents a
//! current desktop Linux Chrome identity. The value comes from a public feed
//! and is cached on disk for a week; every failure degrades to a synthesized
//! string instead of blocking the window.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const FEED_URL: &str = "https://jnrbsn.github.io/user-agents/user-agents.json";
pub const CACHE_FILE_NAME: &str = "ua-cache.json";
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const MIN_PLAUSIBLE_MAJOR: u32 = 100;
const PLATFORM_MARKER: &str = "X11; Linux x86_64";
const ENGINE_MARKER: &str = "Chrome/";
const EXCLUDED_MARKER: &str = "Edg/";
const PINNED_ENGINE_VERSION: &str = "131.0.0.0";

static CHROME_MAJOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Chrome/(\d+)\.").expect("valid regex"));

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("feed is not an array")]
    NotAnArray,
    #[error("feed has no desktop Linux Chrome entries")]
    NoCandidates,
    #[error("feed entry looks implausible: {0}")]
    Implausible(String),
}

/// Source of the raw identity feed document.
pub trait FeedSource {
    fn fetch(&self) -> Result<Value, FeedError>;
}

/// Fetches the feed over HTTPS.
pub struct HttpFeed {
    url: String,
    request_identity: String,
}

impl HttpFeed {
    pub fn new(request_identity: String) -> Self {
        Self {
            url: FEED_URL.to_string(),
            request_identity,
        }
    }
}

impl FeedSource for HttpFeed {
    fn fetch(&self) -> Result<Value, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.request_identity.as_str())
            .build()?;
        let response = client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        Ok(response.json::<Value>()?)
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct CacheRecord {
    ts: i64,
    ua: String,
}

pub struct UserAgentProvider<F> {
    cache_path: PathBuf,
    feed: F,
    fallback: String,
}

impl UserAgentProvider<HttpFeed> {
    /// Provider backed by the network feed, caching under `data_dir`.
    pub fn with_http_feed(data_dir: &Path) -> Self {
        let fallback = fallback_user_agent(wry::webview_version().ok().as_deref());
        Self::new(
            data_dir.join(CACHE_FILE_NAME),
            HttpFeed::new(fallback.clone()),
            fallback,
        )
    }
}

impl<F: FeedSource> UserAgentProvider<F> {
    pub fn new(cache_path: PathBuf, feed: F, fallback: String) -> Self {
        Self {
            cache_path,
            feed,
            fallback,
        }
    }

    pub fn resolve(&self) -> String {
        self.resolve_at(chrono::Utc::now().timestamp_millis())
    }

    /// Cached value if fresh, else a feed refresh, else the fallback.
    pub fn resolve_at(&self, now_ms: i64) -> String {
        if let Some(cached) = read_cache(&self.cache_path, now_ms) {
            debug!("Using cached user agent");
            return cached;
        }

        match self.feed.fetch().and_then(|doc| select_candidate(&doc)) {
            Ok(user_agent) => {
                if let Err(err) = write_cache(&self.cache_path, &user_agent, now_ms) {
                    warn!("Failed to cache user agent: {:#}", err);
                }
                info!("Resolved user agent from feed");
                user_agent
            }
            Err(err) => {
                warn!("User agent feed unavailable, using fallback: {}", err);
                self.fallback.clone()
            }
        }
    }
}

/// Picks the newest desktop Linux Chrome identity from a feed document.
pub fn select_candidate(doc: &Value) -> Result<String, FeedError> {
    let entries = doc.as_array().ok_or(FeedError::NotAnArray)?;
    let mut candidates: Vec<&str> = entries
        .iter()
        .filter_map(Value::as_str)
        .filter(|ua| is_linux_chrome(ua))
        .collect();
    if candidates.is_empty() {
        return Err(FeedError::NoCandidates);
    }

    candidates.sort_by_key(|ua| std::cmp::Reverse(chrome_major(ua).unwrap_or(0)));
    let picked = candidates[0];
    match chrome_major(picked) {
        Some(major) if major >= MIN_PLAUSIBLE_MAJOR => Ok(picked.to_string()),
        _ => Err(FeedError::Implausible(picked.to_string())),
    }
}

fn is_linux_chrome(ua: &str) -> bool {
    ua.contains(PLATFORM_MARKER) && ua.contains(ENGINE_MARKER) && !ua.contains(EXCLUDED_MARKER)
}

pub fn chrome_major(ua: &str) -> Option<u32> {
    CHROME_MAJOR
        .captures(ua)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Synthesizes an identity from the embedded engine version. Engines that
/// do not report a Chromium-scale version get a pinned one.
pub fn fallback_user_agent(engine_version: Option<&str>) -> String {
    let version = engine_version
        .filter(|v| {
            v.split('.')
                .next()
                .and_then(|major| major.parse::<u32>().ok())
                .is_some_and(|major| major >= MIN_PLAUSIBLE_MAJOR)
        })
        .unwrap_or(PINNED_ENGINE_VERSION);
    format!(
        "Mozilla/5.0 ({PLATFORM_MARKER}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36"
    )
}

fn read_cache(path: &Path, now_ms: i64) -> Option<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!("No user agent cache at {}: {}", path.display(), err);
            return None;
        }
    };
    let record: CacheRecord = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(err) => {
            warn!("Ignoring unreadable user agent cache: {}", err);
            return None;
        }
    };

    let fresh = now_ms
        .checked_sub(record.ts)
        .is_some_and(|age_ms| age_ms >= 0 && (age_ms as u128) < CACHE_TTL.as_millis());
    if !fresh {
        debug!("User agent cache is stale");
        return None;
    }
    if record.ua.trim().is_empty() {
        debug!("User agent cache holds an empty identity");
        return None;
    }
    Some(record.ua)
}

fn write_cache(path: &Path, ua: &str, now_ms: i64) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create cache directory")?;
    }
    let record = CacheRecord {
        ts: now_ms,
        ua: ua.to_string(),
    };
    let content = serde_json::to_string_pretty(&record).context("failed to serialize cache")?;
    fs::write(path, content).context("failed to write cache file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    const CHROME_120: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_120: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const CHROME_115: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    const NOW: i64 = 1_760_000_000_000;

    struct StubFeed {
        doc: Option<Value>,
        calls: Cell<usize>,
    }

    impl StubFeed {
        fn returning(doc: Value) -> Self {
            Self {
                doc: Some(doc),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                doc: None,
                calls: Cell::new(0),
            }
        }
    }

    impl FeedSource for StubFeed {
        fn fetch(&self) -> Result<Value, FeedError> {
            self.calls.set(self.calls.get() + 1);
            self.doc.clone().ok_or(FeedError::Status(503))
        }
    }

    fn provider(dir: &Path, feed: StubFeed) -> UserAgentProvider<StubFeed> {
        UserAgentProvider::new(
            dir.join("data").join(CACHE_FILE_NAME),
            feed,
            "fallback-ua".to_string(),
        )
    }

    fn seed_cache(provider: &UserAgentProvider<StubFeed>, ts: i64, ua: &str) {
        write_cache(&provider.cache_path, ua, ts).unwrap();
    }

    #[test]
    fn fresh_cache_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
        seed_cache(&provider, NOW - 6 * DAY_MS, "cached-ua");

        assert_eq!(provider.resolve_at(NOW), "cached-ua");
        assert_eq!(provider.feed.calls.get(), 0);
    }

    #[test]
    fn stale_cache_triggers_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
        seed_cache(&provider, NOW - 7 * DAY_MS, "cached-ua");

        assert_eq!(provider.resolve_at(NOW), CHROME_120);
        assert_eq!(provider.feed.calls.get(), 1);

        let raw = fs::read_to_string(&provider.cache_path).unwrap();
        let record: CacheRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.ua, CHROME_120);
        assert_eq!(record.ts, NOW);
    }

    #[test]
    fn future_dated_cache_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
        seed_cache(&provider, NOW + DAY_MS, "cached-ua");

        assert_eq!(provider.resolve_at(NOW), CHROME_120);
    }

    #[test]
    fn corrupt_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
        fs::create_dir_all(provider.cache_path.parent().unwrap()).unwrap();
        fs::write(&provider.cache_path, r#"{"ua": 12}"#).unwrap();

        assert_eq!(provider.resolve_at(NOW), CHROME_120);
        assert_eq!(provider.feed.calls.get(), 1);
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        for ts in [i64::MIN, i64::MAX] {
            let dir = tempfile::tempdir().unwrap();
            let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
            seed_cache(&provider, ts, "cached-ua");

            assert_eq!(provider.resolve_at(NOW), CHROME_120);
            assert_eq!(provider.feed.calls.get(), 1);
        }
    }

    #[test]
    fn blank_cached_identity_is_a_miss() {
        for ua in ["", "   "] {
            let dir = tempfile::tempdir().unwrap();
            let provider = provider(dir.path(), StubFeed::returning(json!([CHROME_120])));
            seed_cache(&provider, NOW - DAY_MS, ua);

            assert_eq!(provider.resolve_at(NOW), CHROME_120);
            assert_eq!(provider.feed.calls.get(), 1);
        }
    }

    #[test]
    fn picks_highest_chrome_and_skips_edge() {
        let doc = json!([CHROME_115, EDGE_120, CHROME_120]);
        assert_eq!(select_candidate(&doc).unwrap(), CHROME_120);

        let doc = json!([EDGE_120, CHROME_120, CHROME_115]);
        assert_eq!(select_candidate(&doc).unwrap(), CHROME_120);
    }

    #[test]
    fn non_string_entries_are_ignored() {
        let doc = json!([42, null, {"ua": CHROME_120}, CHROME_115]);
        assert_eq!(select_candidate(&doc).unwrap(), CHROME_115);
    }

    #[test]
    fn rejects_bad_feeds() {
        assert!(matches!(
            select_candidate(&json!({"ua": CHROME_120})),
            Err(FeedError::NotAnArray)
        ));
        assert!(matches!(
            select_candidate(&json!([])),
            Err(FeedError::NoCandidates)
        ));
        assert!(matches!(
            select_candidate(&json!([EDGE_120, "Mozilla/5.0 (Windows NT 10.0) Chrome/120.0"])),
            Err(FeedError::NoCandidates)
        ));
        assert!(matches!(
            select_candidate(&json!(["Mozilla/5.0 (X11; Linux x86_64) Chrome/99.0.1 Safari"])),
            Err(FeedError::Implausible(_))
        ));
    }

    #[test]
    fn bad_feed_falls_back_without_caching() {
        let docs = [
            json!("not an array"),
            json!([]),
            json!([EDGE_120]),
            json!(["Mozilla/5.0 (X11; Linux x86_64) Chrome/98.0.0.0 Safari/537.36"]),
        ];
        for doc in docs {
            let dir = tempfile::tempdir().unwrap();
            let provider = provider(dir.path(), StubFeed::returning(doc));
            assert_eq!(provider.resolve_at(NOW), "fallback-ua");
            assert!(!provider.cache_path.exists());
        }
    }

    #[test]
    fn network_failure_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path(), StubFeed::failing());
        assert_eq!(provider.resolve_at(NOW), "fallback-ua");
        assert!(!provider.cache_path.exists());
    }

    #[test]
    fn fallback_uses_chromium_scale_engine_version() {
        assert!(fallback_user_agent(Some("124.0.2478.80")).contains("Chrome/124.0.2478.80 "));
        assert!(fallback_user_agent(Some("2.44.3")).contains("Chrome/131.0.0.0 "));
        assert!(fallback_user_agent(None).contains("X11; Linux x86_64"));
        assert_eq!(chrome_major(&fallback_user_agent(None)), Some(131));
    }
}
