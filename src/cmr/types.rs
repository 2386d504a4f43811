//! CMR wire types and the reshaped tool payload.

use serde::{Deserialize, Deserializer, Serialize};

/// One collection as returned to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub concept_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl From<CmrEntry> for DatasetSummary {
    fn from(entry: CmrEntry) -> Self {
        Self {
            concept_id: entry.id,
            title: entry.title,
            abstract_text: entry.summary,
        }
    }
}

/// Body of `GET /search/collections.json`
#[derive(Debug, Default, Deserialize)]
pub struct CmrSearchResponse {
    #[serde(default)]
    pub feed: Option<CmrFeed>,
}

impl CmrSearchResponse {
    /// Entries in relevance order; a missing feed is an empty result
    pub fn into_entries(self) -> Vec<CmrEntry> {
        self.feed.map(|f| f.entry).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CmrFeed {
    #[serde(default)]
    pub entry: Vec<CmrEntry>,
}

/// The subset of a CMR collection entry the tool reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmrEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
}

/// CMR sends `null` for some unset text fields; read them as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_maps_to_summary() {
        let entry: CmrEntry = serde_json::from_value(json!({
            "id": "C1234-PODAAC",
            "title": "GHRSST Level 4",
            "summary": "Sea surface temperature analysis",
            "dataset_id": "ignored",
            "online_access_flag": true
        }))
        .unwrap();

        let summary = DatasetSummary::from(entry);
        assert_eq!(summary.concept_id, "C1234-PODAAC");
        assert_eq!(summary.title, "GHRSST Level 4");
        assert_eq!(summary.abstract_text, "Sea surface temperature analysis");
    }

    #[test]
    fn test_summary_serializes_with_abstract_key() {
        let summary = DatasetSummary {
            concept_id: "C1".to_string(),
            title: "T".to_string(),
            abstract_text: "A".to_string(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value, json!({"concept_id": "C1", "title": "T", "abstract": "A"}));
    }

    #[test]
    fn test_missing_feed_is_empty() {
        let response: CmrSearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_entries().is_empty());

        let response: CmrSearchResponse =
            serde_json::from_value(json!({"feed": {"updated": "now"}})).unwrap();
        assert!(response.into_entries().is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let response: CmrSearchResponse =
            serde_json::from_value(json!({"feed": {"entry": [{"id": "C9"}]}})).unwrap();
        let entries = response.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "");
        assert_eq!(entries[0].summary, "");
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let response: CmrSearchResponse = serde_json::from_value(json!({
            "feed": {"entry": [
                {"id": "C1", "title": "T", "summary": null},
                {"id": null, "title": null, "summary": "S"}
            ]}
        }))
        .unwrap();
        let entries = response.into_entries();
        assert_eq!(entries[0].summary, "");
        assert_eq!(entries[1].id, "");
        assert_eq!(entries[1].title, "");
        assert_eq!(entries[1].summary, "S");
    }
}
