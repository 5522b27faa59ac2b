//! # Web search
//!
//! Search backends used to gather research material, and the retry wrapper the essay workflow calls them through.

use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use std::time::Duration;
use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::config::Settings;

pub const NO_RESULTS: &str = "No relevant information found.";
pub const RETRIES_EXHAUSTED: &str = "Failed to retrieve search results after multiple attempts.";

const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";
const WIKIPEDIA_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const WIKIPEDIA_ARTICLE_BASE: &str = "https://en.wikipedia.org/wiki/";

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// One hit of a web search. Backends leave fields they do not know empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// At most `num_results` hits for `query`.
    async fn results(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>>;
}

/// Error when a search backend answers with a non-success status.
#[derive(Debug)]
pub struct SearchFailed {
    pub backend: &'static str,
    pub status: u16,
    pub body: String,
}

impl fmt::Display for SearchFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SearchFailed: {} answered with status {}: {}", self.backend, self.status, self.body)
    }
}

impl Error for SearchFailed {}

async fn check_status(backend: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(SearchFailed { backend, status: status.as_u16(), body }.into())
    }
}

/// Google Programmable Search (Custom Search JSON API).
#[derive(Debug, Clone)]
pub struct GoogleSearch {
    pub client: reqwest::Client,
    pub api_key: String,
    pub cse_id: String,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

impl GoogleSearch {
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.google_api_key()?, settings.google_cse_id()?))
    }

    fn request_url(&self, query: &str, num_results: usize) -> Result<Url> {
        // the API serves 1 to 10 results per request
        let num = num_results.clamp(1, 10).to_string();
        Ok(Url::parse_with_params(GOOGLE_ENDPOINT, &[
            ("key", self.api_key.as_str()),
            ("cx", self.cse_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ])?)
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn results(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        let url = self.request_url(query, num_results)?;
        let response = check_status("google", self.client.get(url).send().await?).await?;
        let body: GoogleResponse = response.json().await?;
        debug!("google returned {} results for {:?}", body.items.len(), query);
        Ok(body.items.into_iter().take(num_results).collect())
    }
}

/// DuckDuckGo instant answers.
#[derive(Debug, Clone, Default)]
pub struct DuckDuckGo {
    pub client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DuckDuckGoResponse {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<DuckDuckGoTopic>,
}

#[derive(Deserialize)]
struct DuckDuckGoTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

impl DuckDuckGoResponse {
    fn into_results(self, num_results: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();
        if !self.abstract_text.is_empty() {
            results.push(SearchResult {
                title: Some(self.heading).filter(|h| !h.is_empty()),
                snippet: Some(self.abstract_text),
                link: Some(self.abstract_url).filter(|u| !u.is_empty()),
            });
        }
        results.extend(self.related_topics
            .into_iter()
            .filter_map(|topic| topic.text.map(|text| SearchResult {
                title: None,
                snippet: Some(text),
                link: topic.first_url,
            })));
        results.truncate(num_results);
        results
    }
}

#[async_trait]
impl WebSearch for DuckDuckGo {
    async fn results(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        let url = Url::parse_with_params(DUCKDUCKGO_ENDPOINT, &[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])?;
        let response = check_status("duckduckgo", self.client.get(url).send().await?).await?;
        let body: DuckDuckGoResponse = response.json().await?;
        Ok(body.into_results(num_results))
    }
}

/// Full-text search over English Wikipedia.
#[derive(Debug, Clone, Default)]
pub struct Wikipedia {
    pub client: reqwest::Client,
}

#[derive(Deserialize)]
struct WikipediaResponse {
    query: WikipediaQuery,
}

#[derive(Deserialize)]
struct WikipediaQuery {
    #[serde(default)]
    search: Vec<WikipediaHit>,
}

#[derive(Deserialize)]
struct WikipediaHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

impl From<WikipediaHit> for SearchResult {
    fn from(hit: WikipediaHit) -> Self {
        let link = format!("{}{}", WIKIPEDIA_ARTICLE_BASE, hit.title.replace(' ', "_"));
        SearchResult {
            snippet: Some(HTML_TAG_RE.replace_all(&hit.snippet, "").into_owned()),
            title: Some(hit.title),
            link: Some(link),
        }
    }
}

#[async_trait]
impl WebSearch for Wikipedia {
    async fn results(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        let limit = num_results.to_string();
        let url = Url::parse_with_params(WIKIPEDIA_ENDPOINT, &[
            ("action", "query"),
            ("list", "search"),
            ("format", "json"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
        ])?;
        let response = check_status("wikipedia", self.client.get(url).send().await?).await?;
        let body: WikipediaResponse = response.json().await?;
        Ok(body.query.search.into_iter().take(num_results).map(SearchResult::from).collect())
    }
}

/// Render results as `Title: ...\nSummary: ...\n` blocks.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| format!("Title: {}\nSummary: {}\n",
                              result.title.as_deref().unwrap_or("No title"),
                              result.snippet.as_deref().unwrap_or("No description")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// How often and how patiently to retry a failing search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after the failed attempt number `attempt` (0-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        self.delay * (attempt as u32 + 1)
    }
}

/// Search with retries. Never fails: errors end up in the returned text, so research can go on without them.
pub async fn search_with_retry(search: &(impl WebSearch + ?Sized), query: &str, num_results: usize, policy: &RetryPolicy) -> String {
    for attempt in 0..policy.max_retries {
        match search.results(query, num_results).await {
            Ok(results) if results.is_empty() => return NO_RESULTS.to_string(),
            Ok(results) => return format_results(&results),
            Err(e) if attempt + 1 < policy.max_retries => {
                let wait = policy.backoff(attempt);
                warn!("search for {:?} failed (attempt {}): {:#}, retrying in {:?}", query, attempt + 1, e, wait);
                tokio::time::sleep(wait).await;
            }
            Err(e) => return format!("Error performing search: {}", e),
        }
    }
    RETRIES_EXHAUSTED.to_string()
}

#[cfg(test)]
pub(crate) mod test_search {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use super::{format_results, search_with_retry, DuckDuckGoResponse, RetryPolicy, SearchResult, WebSearch,
                WikipediaHit, NO_RESULTS, RETRIES_EXHAUSTED};

    /// Replays queued outcomes and records the queries it was asked.
    pub(crate) struct ScriptedSearch {
        pub outcomes: Mutex<VecDeque<Result<Vec<SearchResult>>>>,
        pub queries: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        pub(crate) fn new(outcomes: Vec<Result<Vec<SearchResult>>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn hit(title: &str, snippet: &str) -> SearchResult {
            SearchResult {
                title: Some(title.to_string()),
                snippet: Some(snippet.to_string()),
                link: None,
            }
        }
    }

    #[async_trait]
    impl WebSearch for ScriptedSearch {
        async fn results(&self, query: &str, _num_results: usize) -> Result<Vec<SearchResult>> {
            self.queries.lock().unwrap().push(query.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![ScriptedSearch::hit(query, "default")]))
        }
    }

    fn no_wait(max_retries: usize) -> RetryPolicy {
        RetryPolicy { max_retries, delay: Duration::ZERO }
    }

    #[test]
    fn test_format_results() {
        let results = vec![
            ScriptedSearch::hit("Exercise", "Good for you"),
            SearchResult::default(),
        ];
        assert_eq!("Title: Exercise\nSummary: Good for you\n\nTitle: No title\nSummary: No description\n",
                   format_results(&results));
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(Duration::from_secs(2), policy.backoff(0));
        assert_eq!(Duration::from_secs(4), policy.backoff(1));
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let search = ScriptedSearch::new(vec![Err(anyhow!("rate limited")), Ok(vec![ScriptedSearch::hit("t", "s")])]);
        let text = search_with_retry(&search, "q", 3, &no_wait(3)).await;
        assert_eq!("Title: t\nSummary: s\n", text);
        assert_eq!(2, search.queries.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_message() {
        let search = ScriptedSearch::new(vec![Err(anyhow!("boom")), Err(anyhow!("boom")), Err(anyhow!("quota"))]);
        let text = search_with_retry(&search, "q", 3, &no_wait(3)).await;
        assert_eq!("Error performing search: quota", text);
        assert_eq!(3, search.queries.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_empty_results_and_zero_retries() {
        let search = ScriptedSearch::new(vec![Ok(vec![])]);
        assert_eq!(NO_RESULTS, search_with_retry(&search, "q", 3, &no_wait(3)).await);
        assert_eq!(RETRIES_EXHAUSTED, search_with_retry(&search, "q", 3, &no_wait(0)).await);
    }

    #[test]
    fn test_parse_backends() {
        let body = r#"{"Heading":"Rust","AbstractText":"A language","AbstractURL":"https://rust-lang.org",
            "RelatedTopics":[{"Text":"Cargo","FirstURL":"https://x"},{"Name":"Group","Topics":[]}]}"#;
        let response: DuckDuckGoResponse = serde_json::from_str(body).unwrap();
        let results = response.into_results(5);
        assert_eq!(2, results.len());
        assert_eq!(Some("Rust".to_string()), results[0].title);
        assert_eq!(Some("Cargo".to_string()), results[1].snippet);

        let hit = WikipediaHit { title: "Rust (language)".to_string(), snippet: "a <span>systems</span> language".to_string() };
        let result = SearchResult::from(hit);
        assert_eq!(Some("a systems language".to_string()), result.snippet);
        assert_eq!(Some("https://en.wikipedia.org/wiki/Rust_(language)".to_string()), result.link);
    }
}
