// src/ingest/providers/reddit.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{BrandConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::ingest::types::{SocialPost, SocialSnapshot, SocialSource};
use crate::ingest::{build_http_client, map_http_error, normalize_text};

pub const REDDIT_SEARCH_URL: &str = "https://www.reddit.com/r/all/search.json";
const SOURCE: &str = "osint";

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: PostData,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    title: Option<String>,
    selftext: Option<String>,
}

pub struct RedditSearchProvider {
    brand_name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        query: String,
        limit: u32,
        sort: String,
        timeout_secs: u64,
        client: reqwest::Client,
    },
}

impl RedditSearchProvider {
    pub fn from_fixture(brand_name: impl Into<String>, body: &str) -> Self {
        Self {
            brand_name: brand_name.into(),
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_config(brand: &BrandConfig, http: &HttpConfig) -> Result<Self> {
        Self::with_url(REDDIT_SEARCH_URL, brand, http)
    }

    pub fn with_url(url: &str, brand: &BrandConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            brand_name: brand.name.clone(),
            mode: Mode::Http {
                url: url.to_string(),
                query: brand.search_query.clone(),
                limit: brand.search_limit,
                sort: brand.search_sort.clone(),
                timeout_secs: http.timeout_secs,
                client: build_http_client(http)?,
            },
        })
    }

    fn parse_posts(body: &str) -> Result<Vec<SocialPost>> {
        let listing: Listing =
            serde_json::from_str(body).map_err(|e| Error::fetch(SOURCE, format!("parse: {e}")))?;

        let children = listing.data.map(|d| d.children).unwrap_or_default();
        let posts = children
            .into_iter()
            // t3 = link/self post; skip comments, subreddits, etc.
            .filter(|c| c.kind == "t3")
            .map(|c| SocialPost {
                title: normalize_text(c.data.title.as_deref().unwrap_or_default()),
                text: normalize_text(c.data.selftext.as_deref().unwrap_or_default()),
            })
            .collect();
        Ok(posts)
    }
}

#[async_trait]
impl SocialSource for RedditSearchProvider {
    async fn fetch(&self) -> Result<SocialSnapshot> {
        let posts = match &self.mode {
            Mode::Fixture(body) => Self::parse_posts(body)?,
            Mode::Http {
                url,
                query,
                limit,
                sort,
                timeout_secs,
                client,
            } => {
                tracing::info!(target: "ingest", query = %query, "fetching reddit search");
                let limit = limit.to_string();
                let resp = client
                    .get(url)
                    .query(&[
                        ("q", query.as_str()),
                        ("limit", limit.as_str()),
                        ("sort", sort.as_str()),
                        ("restrict_sr", "false"),
                    ])
                    .send()
                    .await
                    .map_err(|e| map_http_error(SOURCE, *timeout_secs, e))?;
                let resp = resp
                    .error_for_status()
                    .map_err(|e| Error::fetch(SOURCE, e))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| map_http_error(SOURCE, *timeout_secs, e))?;
                Self::parse_posts(&body)?
            }
        };

        tracing::info!(
            target: "ingest",
            brand = %self.brand_name,
            posts = posts.len(),
            "reddit posts fetched"
        );
        Ok(SocialSnapshot {
            brand_name: self.brand_name.clone(),
            posts,
        })
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
