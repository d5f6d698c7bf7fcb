use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::RawArticle;
use crate::policy::CurationPolicy;

const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

/// Source of candidate articles for a keyword.
///
/// Collectors never fail outright: an upstream problem is logged and shows up
/// as an empty list.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, keyword: &str, max_results: usize) -> Vec<RawArticle>;
}

pub struct GoogleNewsCollector {
    client: Client,
    policy: Arc<CurationPolicy>,
}

impl GoogleNewsCollector {
    pub fn new(policy: Arc<CurationPolicy>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; news-curator/0.1)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, policy })
    }

    /// The company's related search terms OR-ed together.
    pub fn query_for(&self, keyword: &str) -> String {
        self.policy.search_terms_for(keyword).join(" OR ")
    }

    pub fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}?q={}&hl=ko&gl=KR&ceid=KR:ko",
            GOOGLE_NEWS_SEARCH,
            urlencoding::encode(&self.query_for(keyword))
        )
    }

    async fn fetch(&self, keyword: &str) -> Result<Vec<u8>> {
        let url = self.search_url(keyword);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch Google News feed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Google News returned error: {} - {}", status, error_text);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read Google News feed")?;
        Ok(bytes.to_vec())
    }
}

/// Host of a URL without a leading "www.".
fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Google News titles end in " - <press>"; drop that suffix.
fn strip_press_suffix(title: &str, press: &str) -> String {
    let title = title.trim();
    if !press.is_empty() {
        if let Some(stripped) = title.strip_suffix(press) {
            if let Some(stripped) = stripped.trim_end().strip_suffix('-') {
                return stripped.trim_end().to_string();
            }
        }
    }
    title.to_string()
}

/// Read a Google News RSS document into raw articles, at most `max_results`.
pub fn parse_feed(content: &[u8], max_results: usize) -> Result<Vec<RawArticle>> {
    let channel = rss::Channel::read_from(content).context("Failed to parse RSS feed")?;

    let articles = channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?;
            let url = item.link().unwrap_or_default().to_string();

            let press = item
                .source()
                .and_then(|source| {
                    source
                        .title()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .or_else(|| host_of(source.url()))
                })
                .or_else(|| host_of(&url))
                .unwrap_or_default();

            Some(RawArticle {
                content: strip_press_suffix(title, &press),
                url,
                date: item.pub_date().unwrap_or_default().to_string(),
                press,
            })
        })
        .take(max_results)
        .collect();

    Ok(articles)
}

#[async_trait]
impl Collector for GoogleNewsCollector {
    async fn collect(&self, keyword: &str, max_results: usize) -> Vec<RawArticle> {
        let result = match self.fetch(keyword).await {
            Ok(content) => parse_feed(&content, max_results),
            Err(e) => Err(e),
        };

        match result {
            Ok(articles) => {
                info!(keyword, count = articles.len(), "Collected from Google News");
                articles
            }
            Err(e) => {
                warn!(keyword, error = %format!("{:#}", e), "Collection failed");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArticleFile {
    Flat(Vec<RawArticle>),
    ByKeyword(BTreeMap<String, Vec<RawArticle>>),
}

/// Articles read from a JSON file: either one array used for every keyword,
/// or an object mapping keywords to arrays.
pub struct JsonFileCollector {
    path: PathBuf,
}

impl JsonFileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self, keyword: &str) -> Result<Vec<RawArticle>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read article file: {}", self.path.display()))?;

        let file: ArticleFile = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse article JSON from {}. Expected an array of articles or an object keyed by keyword.",
                self.path.display()
            )
        })?;

        Ok(match file {
            ArticleFile::Flat(articles) => articles,
            ArticleFile::ByKeyword(mut by_keyword) => {
                by_keyword.remove(keyword).unwrap_or_default()
            }
        })
    }
}

#[async_trait]
impl Collector for JsonFileCollector {
    async fn collect(&self, keyword: &str, max_results: usize) -> Vec<RawArticle> {
        match self.read(keyword) {
            Ok(mut articles) => {
                articles.truncate(max_results);
                info!(keyword, count = articles.len(), path = %self.path.display(), "Collected from file");
                articles
            }
            Err(e) => {
                warn!(keyword, error = %format!("{:#}", e), "Collection failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"삼성" - Google 뉴스</title>
    <link>https://news.google.com</link>
    <description>Google 뉴스</description>
    <item>
      <title>삼성전자, 3분기 영업이익 12조 - 한국경제</title>
      <link>https://news.google.com/rss/articles/abc</link>
      <pubDate>Tue, 14 Oct 2025 07:00:00 GMT</pubDate>
      <source url="https://www.hankyung.com">한국경제</source>
    </item>
    <item>
      <title>삼성바이오로직스 수주 - 이데일리</title>
      <link>https://news.google.com/rss/articles/def</link>
      <pubDate>Tue, 14 Oct 2025 06:00:00 GMT</pubDate>
      <source url="https://www.edaily.co.kr"></source>
    </item>
    <item>
      <title>출처 없는 기사</title>
      <link>https://www.yna.co.kr/view/123</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_reads_source_and_strips_suffix() {
        let articles = parse_feed(FEED.as_bytes(), 50).unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].content, "삼성전자, 3분기 영업이익 12조");
        assert_eq!(articles[0].press, "한국경제");
        assert_eq!(articles[0].date, "Tue, 14 Oct 2025 07:00:00 GMT");
    }

    #[test]
    fn test_parse_feed_falls_back_to_hosts() {
        let articles = parse_feed(FEED.as_bytes(), 50).unwrap();
        assert_eq!(articles[1].press, "edaily.co.kr");
        assert_eq!(articles[1].content, "삼성바이오로직스 수주 - 이데일리");
        assert_eq!(articles[2].press, "yna.co.kr");
        assert_eq!(articles[2].date, "");
    }

    #[test]
    fn test_parse_feed_truncates() {
        assert_eq!(parse_feed(FEED.as_bytes(), 1).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(parse_feed(b"<html>nope</html>", 10).is_err());
    }

    #[test]
    fn test_query_joins_search_terms() {
        let mut policy = CurationPolicy::default();
        policy
            .search_terms
            .insert("LG".to_string(), vec!["LG".to_string(), "LG전자".to_string()]);
        policy.search_terms.remove("GS");
        let collector = GoogleNewsCollector::new(Arc::new(policy)).unwrap();

        assert_eq!(collector.query_for("LG"), "LG OR LG전자");
        assert_eq!(collector.query_for("GS"), "GS");
        assert!(collector
            .search_url("LG")
            .ends_with("?q=LG%20OR%20LG%EC%A0%84%EC%9E%90&hl=ko&gl=KR&ceid=KR:ko"));
    }

    #[tokio::test]
    async fn test_json_file_flat_and_keyed() {
        let dir = tempfile::tempdir().unwrap();
        let flat = dir.path().join("flat.json");
        fs::write(
            &flat,
            r#"[{"content": "a", "press": "한국경제"}, {"content": "b"}, {"content": "c"}]"#,
        )
        .unwrap();
        let keyed = dir.path().join("keyed.json");
        fs::write(&keyed, r#"{"SK": [{"content": "sk", "url": "u"}]}"#).unwrap();

        let articles = JsonFileCollector::new(&flat).collect("삼성", 2).await;
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].press, "한국경제");

        let articles = JsonFileCollector::new(&keyed).collect("SK", 10).await;
        assert_eq!(articles[0].content, "sk");
        assert!(JsonFileCollector::new(&keyed).collect("LG", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_json_file_missing_is_empty() {
        let collector = JsonFileCollector::new("/nonexistent/articles.json");
        assert!(collector.collect("삼성", 10).await.is_empty());
    }
}
