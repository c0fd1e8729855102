use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Canonical timestamp layout used for `created_at` everywhere.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The normalized record every source adapter produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(
        default,
        with = "canonical_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub content: String,
    pub source: String,
    pub link: String,
}

impl Article {
    pub fn created_at_string(&self) -> Option<String> {
        self.created_at
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
    }
}

/// One document queued for the backend: id, target partition and body.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAction {
    pub id: String,
    pub partition: String,
    pub document: Article,
}

/// Per-item outcome of a bulk write. `error` is `None` when the backend accepted the item.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    pub id: String,
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

mod canonical_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article() -> Article {
        Article {
            title: "IHSG Menguat".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 3, 5)
                .and_then(|d| d.and_hms_opt(9, 7, 0)),
            image_url: None,
            content: "Indeks naik.".to_string(),
            source: "cnbc indonesia".to_string(),
            link: "https://www.cnbcindonesia.com/market/1".to_string(),
        }
    }

    #[test]
    fn test_serializes_canonical_timestamp() {
        let json = serde_json::to_value(article()).unwrap();
        assert_eq!(json["created_at"], "2024-03-05 09:07:00");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_deserializes_document() {
        let json = r#"{
            "title": "IHSG Menguat",
            "created_at": "2024-03-05 09:07:00",
            "content": "Indeks naik.",
            "source": "cnbc indonesia",
            "link": "https://www.cnbcindonesia.com/market/1"
        }"#;
        let parsed: Article = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, article());
        assert_eq!(parsed.created_at_string().as_deref(), Some("2024-03-05 09:07:00"));
    }

    #[test]
    fn test_missing_created_at() {
        let mut a = article();
        a.created_at = None;
        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("created_at"));
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back.created_at, None);
    }
}
