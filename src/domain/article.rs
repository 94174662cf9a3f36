use chrono::{DateTime, Local, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 4;

/// Article metadata. The markdown body lives in its own file keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub summary: String,

    /// Publication date as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub hidden: bool,

    #[serde(rename = "requiresKey", default = "default_requires_key")]
    pub requires_key: bool,

    #[serde(default)]
    pub views: u64,
}

const fn default_requires_key() -> bool {
    true
}

impl Article {
    /// Creates a new article dated `now` (UTC calendar date).
    #[must_use]
    pub fn new(id: String, title: String, summary: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            summary,
            date: now.format("%Y-%m-%d").to_string(),
            hidden: false,
            requires_key: true,
            views: 0,
        }
    }
}

/// Builds a time-derived article id such as `post-20250301-120000-k3x9`.
///
/// The timestamp part uses the server's local time.
pub fn new_article_id<R: Rng>(now: DateTime<Local>, rng: &mut R) -> String {
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        let idx = rng.random_range(0..ID_SUFFIX_ALPHABET.len());
        suffix.push(char::from(ID_SUFFIX_ALPHABET[idx]));
    }
    format!("post-{}-{suffix}", now.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn article_id_is_time_derived() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        let id = new_article_id(now, &mut rand::rng());

        assert!(id.starts_with("post-20250301-090507-"), "{id}");
        assert_eq!(id.len(), "post-20250301-090507-".len() + 4);
    }

    #[test]
    fn missing_requires_key_defaults_to_true() {
        let json = r#"{"id":"post-1","title":"Hello","summary":"s","date":"2024-01-01","hidden":false}"#;
        let article: Article = serde_json::from_str(json).unwrap();

        assert!(article.requires_key);
        assert_eq!(article.views, 0);
    }

    #[test]
    fn requires_key_uses_camel_case_on_disk() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let article = Article::new("post-x".into(), "T".into(), "S".into(), now);
        let value = serde_json::to_value(&article).unwrap();

        assert_eq!(value["requiresKey"], true);
        assert_eq!(value["date"], "2025-01-02");
    }
}
