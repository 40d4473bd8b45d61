//! Headline ticker items. Fetched items are as untrusted as graph payloads, so
//! they are narrowed here and malformed entries are skipped.

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

pub const DEBUNK_PLATFORM: &str = "中国互联网联合辟谣平台";
const WEIBO: &str = "微博";
const TOUTIAO: &str = "今日头条";

const FALLBACK_IMAGES: [&str; 5] = [
    "https://images.unsplash.com/photo-1504711434969-e33886168f5c?w=800&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1495020689067-958852a7765e?w=800&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1557318041-1ce374d55ebf?w=800&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1586339949916-3e9457bef6d3?w=800&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1526304640152-d4619684e884?w=800&auto=format&fit=crop",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadlineStatus {
    Verified,
    Debunked,
    Uncertain,
}

impl HeadlineStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Debunked => "debunked",
            Self::Uncertain => "uncertain",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Headline {
    pub id: String,
    pub title: String,
    pub source: String,
    pub status: HeadlineStatus,
    pub timestamp: String,
    pub url: String,
    pub image_url: Option<String>,
}

/// Accepts either an item array or an object wrapping one under `items`.
pub fn sanitize_headlines(raw: &Value, batch: u64) -> Vec<Headline> {
    let items: &[Value] = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => match object.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let headlines = items
        .iter()
        .filter_map(|item| item.as_object())
        .filter_map(|item| {
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|title| !title.is_empty())?;
            let source = item
                .get("source")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|source| !source.is_empty())
                .unwrap_or(DEBUNK_PLATFORM);
            let status = match item.get("status").and_then(Value::as_str) {
                Some("verified") => HeadlineStatus::Verified,
                Some("uncertain") => HeadlineStatus::Uncertain,
                _ => HeadlineStatus::Debunked,
            };
            let timestamp = item
                .get("timestamp")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some((title, source, status, timestamp))
        })
        .enumerate()
        .map(|(index, (title, source, status, timestamp))| Headline {
            id: format!("feed-{batch}-{index}"),
            title: title.to_owned(),
            source: source.to_owned(),
            status,
            timestamp: timestamp.to_owned(),
            url: search_url(source, title),
            image_url: Some(FALLBACK_IMAGES[index % FALLBACK_IMAGES.len()].to_owned()),
        })
        .collect::<Vec<_>>();

    debug!(received = items.len(), kept = headlines.len(), "sanitized headlines");
    headlines
}

fn search_url(source: &str, title: &str) -> String {
    let (base, param) = if source.contains(WEIBO) {
        ("https://s.weibo.com/weibo", "q")
    } else if source.contains("头条") {
        ("https://so.toutiao.com/search", "keyword")
    } else {
        ("https://www.piyao.org.cn/pysjk/frontsql.htm", "kw")
    };
    Url::parse_with_params(base, &[(param, title)])
        .map(String::from)
        .unwrap_or_else(|_| base.to_owned())
}

/// Built-in items shown until a fetch returns something usable.
pub fn default_headlines() -> Vec<Headline> {
    let seeds = [
        (
            "Claim that social security cards must be replaced by a deadline is a rumor",
            DEBUNK_PLATFORM,
            HeadlineStatus::Debunked,
            "10 min ago",
        ),
        (
            "Official notice: rainstorm warnings upgraded, emergency response activated",
            TOUTIAO,
            HeadlineStatus::Verified,
            "30 min ago",
        ),
        (
            "New satellite successfully launched",
            WEIBO,
            HeadlineStatus::Verified,
            "1 hour ago",
        ),
        (
            "Rumor: drinking purified water long-term causes calcium loss",
            DEBUNK_PLATFORM,
            HeadlineStatus::Debunked,
            "2 hours ago",
        ),
        (
            "Explainer: latest rural subsidy policy for new energy vehicles",
            TOUTIAO,
            HeadlineStatus::Verified,
            "3 hours ago",
        ),
    ];

    seeds
        .iter()
        .enumerate()
        .map(|(index, (title, source, status, timestamp))| Headline {
            id: format!("default-{index}"),
            title: (*title).to_owned(),
            source: (*source).to_owned(),
            status: *status,
            timestamp: (*timestamp).to_owned(),
            url: search_url(source, title),
            image_url: Some(FALLBACK_IMAGES[index % FALLBACK_IMAGES.len()].to_owned()),
        })
        .collect()
}
