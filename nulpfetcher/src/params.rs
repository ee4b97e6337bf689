use nstorage::models::EntityType;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::error::{FetcherError, Result};

/// Topic endpoint used when `DISCUSSION_API_URL` is not set.
pub const DEFAULT_DISCUSSION_API_URL: &str =
    "https://devnulp.niua.org/discussion-forum/api/popular";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const COURSE_FIELDS: &[&str] = &["name", "identifier", "primaryCategory", "status", "description"];
const GOOD_PRACTICE_FIELDS: &[&str] = &[
    "name",
    "identifier",
    "primaryCategory",
    "status",
    "lastUpdatedAt",
    "lastPublishedOn",
];
const GOOD_PRACTICE_FACETS: &[&str] = &["channel", "gradeLevel", "subject", "medium"];

/// Endpoint settings as read from the environment, before fallbacks apply.
#[derive(Debug, Clone, Default)]
pub struct SourceSettings {
    pub course_api_url: String,
    pub course_api_limit: u32,
    pub good_practice_api_url: Option<String>,
    pub good_practice_api_limit: Option<u32>,
    pub discussion_api_url: Option<String>,
    pub discussion_api_limit: Option<u32>,
    pub http_timeout_secs: Option<u64>,
}

impl SourceSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Applies fallbacks and validates every endpoint, one descriptor per entity type.
    pub fn descriptors(&self) -> Result<Vec<SourceDescriptor>> {
        let course_url = parse_endpoint("COURSE_API_URL", &self.course_api_url)?;
        let good_practice_url = match &self.good_practice_api_url {
            Some(raw) => parse_endpoint("GOOD_PRACTICE_API_URL", raw)?,
            None => course_url.clone(),
        };
        let discussion_url = parse_endpoint(
            "DISCUSSION_API_URL",
            self.discussion_api_url
                .as_deref()
                .unwrap_or(DEFAULT_DISCUSSION_API_URL),
        )?;

        Ok(vec![
            SourceDescriptor {
                entity_type: EntityType::Course,
                url: course_url,
                limit: self.course_api_limit,
                request: SourceRequest::ContentSearch(ContentSearchParams {
                    primary_category: "Course",
                    fields: COURSE_FIELDS,
                    facets: None,
                    offset: None,
                }),
            },
            SourceDescriptor {
                entity_type: EntityType::GoodPractice,
                url: good_practice_url,
                limit: self.good_practice_api_limit.unwrap_or(self.course_api_limit),
                request: SourceRequest::ContentSearch(ContentSearchParams {
                    primary_category: "Good Practices",
                    fields: GOOD_PRACTICE_FIELDS,
                    facets: Some(GOOD_PRACTICE_FACETS),
                    offset: Some(0),
                }),
            },
            SourceDescriptor {
                entity_type: EntityType::Discussion,
                url: discussion_url,
                limit: self.discussion_api_limit.unwrap_or(self.course_api_limit),
                request: SourceRequest::TopicList,
            },
        ])
    }
}

fn parse_endpoint(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| FetcherError::InvalidParam(format!("{name} '{raw}' is not a URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetcherError::InvalidParam(format!(
            "{name} must use http or https, got '{other}'"
        ))),
    }
}

/// How one entity type is fetched.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub entity_type: EntityType,
    pub url: Url,
    pub limit: u32,
    pub request: SourceRequest,
}

#[derive(Debug, Clone)]
pub enum SourceRequest {
    /// POST to the content search API, envelope `result.content`.
    ContentSearch(ContentSearchParams),
    /// GET of the forum topic list, envelope `topics`.
    TopicList,
}

#[derive(Debug, Clone)]
pub struct ContentSearchParams {
    pub primary_category: &'static str,
    pub fields: &'static [&'static str],
    pub facets: Option<&'static [&'static str]>,
    pub offset: Option<u32>,
}

impl ContentSearchParams {
    pub fn to_request(&self, limit: u32) -> ContentSearchRequest {
        ContentSearchRequest {
            request: SearchBody {
                filters: SearchFilters {
                    status: vec!["Live"],
                    primary_category: vec![self.primary_category],
                    visibility: Vec::new(),
                },
                limit,
                sort_by: SortBy {
                    last_published_on: "desc",
                },
                fields: self.fields.to_vec(),
                facets: self.facets.map(|facets| facets.to_vec()),
                offset: self.offset,
            },
        }
    }
}

/// Wire body of the content search POST.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSearchRequest {
    pub request: SearchBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchBody {
    pub filters: SearchFilters,
    pub limit: u32,
    pub sort_by: SortBy,
    pub fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFilters {
    pub status: Vec<&'static str>,
    #[serde(rename = "primaryCategory")]
    pub primary_category: Vec<&'static str>,
    pub visibility: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SortBy {
    #[serde(rename = "lastPublishedOn")]
    pub last_published_on: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> SourceSettings {
        SourceSettings {
            course_api_url: "https://nulp.example/api/content/v1/search".into(),
            course_api_limit: 50,
            ..Default::default()
        }
    }

    #[test]
    fn fallbacks_follow_course_settings() {
        let descriptors = settings().descriptors().unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[1].url, descriptors[0].url);
        assert_eq!(descriptors[1].limit, 50);
        assert_eq!(descriptors[2].url.as_str(), DEFAULT_DISCUSSION_API_URL);
        assert_eq!(descriptors[2].limit, 50);
        assert!(matches!(descriptors[2].request, SourceRequest::TopicList));
    }

    #[test]
    fn explicit_settings_win() {
        let settings = SourceSettings {
            good_practice_api_url: Some("https://gp.example/search".into()),
            good_practice_api_limit: Some(5),
            discussion_api_url: Some("http://forum.example/api/popular".into()),
            discussion_api_limit: Some(7),
            ..settings()
        };
        let descriptors = settings.descriptors().unwrap();
        assert_eq!(descriptors[1].url.as_str(), "https://gp.example/search");
        assert_eq!(descriptors[1].limit, 5);
        assert_eq!(descriptors[2].url.as_str(), "http://forum.example/api/popular");
        assert_eq!(descriptors[2].limit, 7);
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let mut bad = settings();
        bad.course_api_url = "not a url".into();
        assert!(matches!(bad.descriptors(), Err(FetcherError::InvalidParam(_))));

        let mut ftp = settings();
        ftp.discussion_api_url = Some("ftp://forum.example".into());
        assert!(matches!(ftp.descriptors(), Err(FetcherError::InvalidParam(_))));
    }

    #[test]
    fn good_practice_payload_carries_facets_and_offset() {
        let descriptors = settings().descriptors().unwrap();
        let SourceRequest::ContentSearch(params) = &descriptors[1].request else {
            panic!("good practices use content search");
        };
        let body = serde_json::to_value(params.to_request(10)).unwrap();
        assert_eq!(
            body,
            json!({
                "request": {
                    "filters": {
                        "status": ["Live"],
                        "primaryCategory": ["Good Practices"],
                        "visibility": []
                    },
                    "limit": 10,
                    "sort_by": { "lastPublishedOn": "desc" },
                    "fields": ["name", "identifier", "primaryCategory", "status", "lastUpdatedAt", "lastPublishedOn"],
                    "facets": ["channel", "gradeLevel", "subject", "medium"],
                    "offset": 0
                }
            })
        );

        let SourceRequest::ContentSearch(course) = &descriptors[0].request else {
            panic!("courses use content search");
        };
        let course_body = serde_json::to_value(course.to_request(10)).unwrap();
        assert!(course_body["request"].get("facets").is_none());
        assert!(course_body["request"].get("offset").is_none());
    }
}
