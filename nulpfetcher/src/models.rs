use serde::{Deserialize, Deserializer, Serialize};

/// One item of the content search `result.content` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContent {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub identifier: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "primaryCategory",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub primary_category: Option<String>,
}

/// One item of the forum `topics` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTopic {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub tid: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub title: Option<String>,
}

/// Topic list as returned by the forum endpoint.
#[derive(Debug, Clone, Default)]
pub struct TopicPage {
    pub topics: Vec<RawTopic>,
    pub topic_count: Option<u64>,
}

/// Text fields sometimes arrive as numbers or booleans; those are kept as their JSON text.
fn deserialize_lenient_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;

    match value {
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
        serde_json::Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, got {other}"
        ))),
    }
}

/// Forum ids arrive as numbers, integral floats or numeric strings depending on the endpoint.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;

    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("tid '{n}' is not an integer"))),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse::<i64>().map(Some).map_err(|_| {
                    serde::de::Error::custom(format!("Cannot parse '{}' as tid", s))
                })
            }
        }
        serde_json::Value::Null => Ok(None),
        _ => Err(serde::de::Error::custom("Expected number or string for tid")),
    }
}
