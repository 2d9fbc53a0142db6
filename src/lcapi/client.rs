use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::Config;
use crate::lcapi::{self, QueryResponse, RequestBody, SubmissionSource};
use crate::models;

/// GraphQL client for the LeetCode API.
#[derive(Debug, Clone)]
pub struct LeetcodeClient {
    http: Client,
    api_url: String,
}

impl LeetcodeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let headers = HeaderMap::from_iter([
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (HeaderName::from_static("referer"), HeaderValue::from_static("https://leetcode.com")),
        ]);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .build()
            .context("Could not build the HTTP client.")?;

        Ok(Self { http, api_url: config.api_url.clone() })
    }
}

impl SubmissionSource for LeetcodeClient {
    async fn fetch_recent_accepted(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<models::Submission>> {
        log::trace!("[fetch_recent_accepted] Fetching {limit} submissions for {username}...");

        let body = RequestBody {
            query: lcapi::RECENT_AC_QUERY,
            variables: serde_json::json!({ "username": username, "limit": limit }),
        };

        let response = self.http
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Error in LeetCode API request for {username}"))?
            .error_for_status()
            .with_context(|| format!("LeetCode API rejected the request for {username}"))?
            .json::<QueryResponse>()
            .await
            .context("Could not decode the LeetCode API response.")?;

        lcapi::parse_recent_ac(response, username)
    }
}
