use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::services::advisor::Advisor;

const WIKIPEDIA_SUMMARY_API: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const WIKIPEDIA_SEARCH_API: &str = "https://en.wikipedia.org/w/api.php";
const YOUTUBE_SEARCH_API: &str = "https://www.googleapis.com/youtube/v3/search";
const ARXIV_QUERY_API: &str = "http://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("forest-backend/", env!("CARGO_PKG_VERSION"));
const MAX_ARXIV_RESULTS: usize = 3;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("missing API key: {0}")]
    MissingApiKey(&'static str),
    #[error("feed decode failed: {0}")]
    Xml(#[from] quick_xml::DeError),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WikipediaSummary {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_ai_generated: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArxivPaper {
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub url: String,
    pub published: String,
}

#[derive(Debug, Deserialize)]
struct WikiSummaryPayload {
    title: String,
    extract: Option<String>,
    content_urls: Option<WikiContentUrls>,
    thumbnail: Option<WikiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct WikiContentUrls {
    desktop: Option<WikiDesktopUrls>,
}

#[derive(Debug, Deserialize)]
struct WikiDesktopUrls {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WikiThumbnail {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WikiSearchPayload {
    query: Option<WikiSearchQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiSearchQuery {
    #[serde(default)]
    search: Vec<WikiSearchHit>,
}

#[derive(Debug, Deserialize)]
struct WikiSearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct YoutubeSearchPayload {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Deserialize)]
struct YoutubeItem {
    id: YoutubeVideoId,
    snippet: YoutubeSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeVideoId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeSnippet {
    title: String,
    #[serde(default)]
    description: String,
    thumbnails: Option<YoutubeThumbnails>,
    channel_title: String,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnails {
    medium: Option<YoutubeThumbnail>,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: String,
    summary: String,
    published: String,
    #[serde(default)]
    author: Vec<AtomAuthor>,
    #[serde(default)]
    link: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@type")]
    link_type: Option<String>,
}

/// External reference fetcher: Wikipedia summaries (with search and AI
/// fallbacks), YouTube videos and arXiv papers for a concept.
#[derive(Clone)]
pub struct ReferenceService {
    client: reqwest::Client,
    youtube_api_key: Option<String>,
}

impl ReferenceService {
    pub fn from_env() -> Self {
        let youtube_api_key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            youtube_api_key,
        }
    }

    /// Looks the concept up by exact title, then via full-text search when
    /// the title 404s, then asks the model for a generated summary. `None`
    /// only when every tier fails.
    pub async fn wikipedia_summary(
        &self,
        advisor: &Advisor,
        concept: &str,
    ) -> Option<WikipediaSummary> {
        match self.wikipedia_lookup(concept).await {
            Ok(Some(summary)) => Some(summary),
            Ok(None) => {
                warn!(concept, "no wikipedia match, falling back to generated summary");
                self.generated_summary(advisor, concept).await
            }
            Err(err) => {
                warn!(error = %err, concept, "wikipedia lookup failed, falling back");
                self.generated_summary(advisor, concept).await
            }
        }
    }

    async fn wikipedia_lookup(
        &self,
        concept: &str,
    ) -> Result<Option<WikipediaSummary>, ReferenceError> {
        if let Some(summary) = self.wikipedia_by_title(concept).await? {
            return Ok(Some(summary));
        }

        // Exact title missed; take the top search hit if it actually shares
        // a word with the query.
        let payload: WikiSearchPayload = self
            .client
            .get(WIKIPEDIA_SEARCH_API)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", concept),
                ("format", "json"),
                ("srlimit", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(hit) = payload.query.and_then(|q| q.search.into_iter().next()) else {
            return Ok(None);
        };
        if !shares_a_word(concept, &hit.title) {
            return Ok(None);
        }

        self.wikipedia_by_title(&hit.title).await
    }

    async fn wikipedia_by_title(
        &self,
        title: &str,
    ) -> Result<Option<WikipediaSummary>, ReferenceError> {
        let url = format!("{WIKIPEDIA_SUMMARY_API}/{}", urlencoding::encode(title));
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ReferenceError::Status(response.status()));
        }

        let payload: WikiSummaryPayload = response.json().await?;
        let summary = payload.extract.unwrap_or_default();
        if summary.is_empty() {
            return Ok(None);
        }

        Ok(Some(WikipediaSummary {
            title: payload.title,
            summary,
            url: payload
                .content_urls
                .and_then(|u| u.desktop)
                .and_then(|d| d.page),
            image: payload.thumbnail.and_then(|t| t.source),
            is_ai_generated: false,
        }))
    }

    async fn generated_summary(
        &self,
        advisor: &Advisor,
        concept: &str,
    ) -> Option<WikipediaSummary> {
        match advisor.concept_summary(concept).await {
            Ok(generated) => Some(WikipediaSummary {
                title: generated.title,
                summary: generated.summary,
                url: None,
                image: None,
                is_ai_generated: true,
            }),
            Err(err) => {
                warn!(error = %err, concept, "generated summary unavailable");
                None
            }
        }
    }

    /// Top educational videos for the concept. Errors with `MissingApiKey`
    /// when no YouTube key is configured.
    pub async fn youtube_videos(&self, concept: &str) -> Result<Vec<VideoResult>, ReferenceError> {
        let api_key = self
            .youtube_api_key
            .as_deref()
            .ok_or(ReferenceError::MissingApiKey("YOUTUBE_API_KEY"))?;

        let query = format!("{concept} tutorial explained");
        let payload: YoutubeSearchPayload = self
            .client
            .get(YOUTUBE_SEARCH_API)
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("type", "video"),
                ("maxResults", "3"),
                ("relevanceLanguage", "en"),
                ("key", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(payload
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoResult {
                    title: item.snippet.title,
                    description: item.snippet.description,
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    thumbnail: item
                        .snippet
                        .thumbnails
                        .and_then(|t| t.medium)
                        .map(|t| t.url),
                    channel: item.snippet.channel_title,
                })
            })
            .collect())
    }

    /// Recent arXiv papers matching the concept, newest first, capped at
    /// three.
    pub async fn arxiv_papers(&self, concept: &str) -> Result<Vec<ArxivPaper>, ReferenceError> {
        let query = format!("all:{concept}");
        let body = self
            .client
            .get(ARXIV_QUERY_API)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", "3"),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let feed: AtomFeed = quick_xml::de::from_str(&body)?;
        Ok(feed
            .entry
            .into_iter()
            .take(MAX_ARXIV_RESULTS)
            .map(|entry| {
                let url = entry
                    .link
                    .iter()
                    .find(|l| l.link_type.as_deref() == Some("text/html"))
                    .or_else(|| entry.link.first())
                    .map(|l| l.href.clone())
                    .unwrap_or_default();
                ArxivPaper {
                    title: squash_whitespace(&entry.title),
                    summary: squash_whitespace(&entry.summary),
                    authors: entry.author.into_iter().map(|a| a.name).collect(),
                    url,
                    published: entry.published,
                }
            })
            .collect())
    }
}

/// arXiv wraps titles and abstracts with hard newlines and indentation.
fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn shares_a_word(query: &str, title: &str) -> bool {
    let title_lower = title.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .any(|word| word.len() > 2 && title_lower.contains(word))
}
