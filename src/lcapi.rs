use std::future::Future;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models;

pub mod client;

pub const RECENT_AC_QUERY: &str = include_str!("lcapi/recentac.graphql");

/// Anything that can list a user's most recent accepted submissions.
///
/// Results are most recent first, at most `limit` long; callers must not rely on the order.
pub trait SubmissionSource {
    fn fetch_recent_accepted(
        &self,
        username: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<models::Submission>>> + Send;
}

#[derive(Serialize)]
struct RequestBody {
    query: &'static str,
    variables: Value,
}

#[derive(Deserialize)]
struct QueryResponse {
    data: Option<Value>,
}

/// A submission as the GraphQL API reports it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcSubmission {
    title: String,
    #[serde(default)]
    title_slug: String,
    /// Unix seconds, sent as a string.
    timestamp: String,
    status_display: String,
    #[serde(default)]
    lang: String,
}

impl TryFrom<RecentAcSubmission> for models::Submission {
    type Error = anyhow::Error;

    fn try_from(raw: RecentAcSubmission) -> Result<Self> {
        let timestamp = raw.timestamp
            .parse::<i64>()
            .with_context(|| format!("Malformed timestamp '{}' for {}", raw.timestamp, raw.title))?;

        Ok(models::Submission::new(
            &raw.title,
            &raw.title_slug,
            timestamp,
            &raw.status_display,
            &raw.lang,
        ))
    }
}

/// Returns an error message for when a JSON attribute can't be obtained.
fn err_cant_get(attribute: &str, username: &str) -> String {
    format!("Couldn't get {} for {}", attribute, username)
}

/// Extracts the accepted submissions from a `recentAcSubmissionList` response.
fn parse_recent_ac(response: QueryResponse, username: &str) -> Result<Vec<models::Submission>> {
    let data = response.data.context("No data found in the response.")?;

    let raw_submissions = data
        .get("recentAcSubmissionList")
        .filter(|list| !list.is_null())
        .with_context(|| err_cant_get("recentAcSubmissionList", username))?
        .as_array()
        .context("Couldn't deserialize recentAcSubmissionList into an array.")?;

    raw_submissions
        .iter()
        .map(|val| {
            serde_json::from_value::<RecentAcSubmission>(val.clone())
                .context("Couldn't deserialize values into Submissions.")
                .and_then(models::Submission::try_from)
        })
        .filter_ok(models::Submission::is_accepted)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(data: Value) -> QueryResponse {
        serde_json::from_value(data).unwrap()
    }

    #[test]
    fn parses_recent_accepted_submissions() {
        let body = response(json!({
            "data": {
                "recentAcSubmissionList": [
                    { "title": "Two Sum", "titleSlug": "two-sum", "timestamp": "1741577400",
                      "statusDisplay": "Accepted", "lang": "rust" },
                    { "title": "Merge Two Sorted Lists", "titleSlug": "", "timestamp": "1741500000",
                      "statusDisplay": "Accepted", "lang": "" }
                ]
            }
        }));

        let submissions = parse_recent_ac(body, "leek").unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].timestamp, 1_741_577_400);
        assert_eq!(submissions[1].slug, "merge-two-sorted-lists");
        assert_eq!(submissions[1].language, models::UNKNOWN_LANGUAGE);
    }

    #[test]
    fn missing_list_is_an_error() {
        let body = response(json!({ "data": { "recentAcSubmissionList": null } }));
        let err = parse_recent_ac(body, "ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));

        assert!(parse_recent_ac(response(json!({ "data": null })), "ghost").is_err());
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let body = response(json!({
            "data": { "recentAcSubmissionList": [
                { "title": "Two Sum", "titleSlug": "two-sum", "timestamp": "yesterday",
                  "statusDisplay": "Accepted", "lang": "rust" }
            ]}
        }));
        assert!(parse_recent_ac(body, "leek").is_err());
    }

    #[test]
    fn query_asks_for_the_recent_ac_list() {
        assert!(RECENT_AC_QUERY.contains("recentAcSubmissionList"));
    }
}
