use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{FetcherError, Result};
use crate::models::{RawContent, RawTopic, TopicPage};
use crate::params::ContentSearchRequest;

/// Longest response body excerpt kept in error messages.
const BODY_EXCERPT_LEN: usize = 512;

/// Remote calls used by the fetcher; one request per call, no retries.
#[async_trait]
pub trait NulpService: Send + Sync {
    async fn search_content(
        &self,
        url: &Url,
        request: &ContentSearchRequest,
    ) -> Result<Vec<RawContent>>;

    async fn list_topics(&self, url: &Url) -> Result<TopicPage>;
}

/// [`NulpService`] over reqwest.
#[derive(Clone, Debug)]
pub struct HttpNulpService {
    http_client: reqwest::Client,
}

impl HttpNulpService {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetcherError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NulpService for HttpNulpService {
    async fn search_content(
        &self,
        url: &Url,
        request: &ContentSearchRequest,
    ) -> Result<Vec<RawContent>> {
        let response = self
            .http_client
            .post(url.clone())
            .json(request)
            .send()
            .await?;
        let data = Self::read_json(response).await?;

        let content = data
            .pointer("/result/content")
            .and_then(Value::as_array)
            .ok_or(FetcherError::MissingEnvelope("result.content"))?;
        decode_items(content, "content")
    }

    async fn list_topics(&self, url: &Url) -> Result<TopicPage> {
        let response = self
            .http_client
            .get(url.clone())
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let data = Self::read_json(response).await?;

        if let Some(topics) = data.get("topics").and_then(Value::as_array) {
            return Ok(TopicPage {
                topics: decode_items::<RawTopic>(topics, "topic")?,
                topic_count: data.get("topicCount").and_then(Value::as_u64),
            });
        }

        if let Some(title) = data.get("title").and_then(Value::as_str) {
            if title.contains("404") {
                return Err(FetcherError::NotFoundDocument(title.to_string()));
            }
        }
        Err(FetcherError::MissingEnvelope("topics"))
    }
}

/// Decodes every array item; one item that is not a record rejects the whole collection,
/// since a missing item would read as a remote deletion.
fn decode_items<T: DeserializeOwned>(items: &[Value], kind: &'static str) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<T>(item.clone()).map_err(|err| {
                log::warn!("Rejecting {} #{} in response: {}", kind, index, err);
                FetcherError::MalformedItem {
                    kind,
                    index,
                    reason: err.to_string(),
                }
            })
        })
        .collect()
}

fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_EXCERPT_LEN);
        let cut = excerpt(&long);
        assert!(cut.ends_with('…'));
        assert!(cut.len() <= BODY_EXCERPT_LEN + '…'.len_utf8());
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn decode_items_rejects_collection_with_non_record() {
        let items = vec![json!({"identifier": "do_1"}), json!(42), json!({"name": "x"})];
        let err = decode_items::<RawContent>(&items, "content").unwrap_err();
        assert!(matches!(
            err,
            FetcherError::MalformedItem {
                kind: "content",
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn decode_items_keeps_numeric_status() {
        let items = vec![
            json!({"identifier": "do_A", "status": "Live"}),
            json!({"identifier": "do_B", "status": 1}),
        ];
        let decoded: Vec<RawContent> = decode_items(&items, "content").unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].status.as_deref(), Some("1"));
    }
}
