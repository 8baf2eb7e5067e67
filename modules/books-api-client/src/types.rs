use serde::{Deserialize, Serialize};

/// Body of `GET /volumes`. The API omits `items` entirely when nothing matched.
///
/// Items stay raw here so that one malformed hit cannot fail the whole page;
/// see `VolumesResponse::into_items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(rename = "totalItems", default)]
    pub total_items: u64,
}

/// A single search hit. `id` is the API's own identifier for the volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: Option<String>,
    #[serde(rename = "volumeInfo", default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    /// Free-form: "2004", "2004-05" and "2004-05-17" all occur.
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "pageCount")]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "maturityRating")]
    pub maturity_rating: Option<String>,
    #[serde(rename = "imageLinks")]
    pub image_links: Option<ImageLinks>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageLinks {
    #[serde(rename = "smallThumbnail")]
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
}

/// One entry of a result page, decoded on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeItem {
    Parsed(Volume),
    /// The entry did not match the volume schema. `id` is kept when the raw
    /// entry still carried a string id.
    Malformed { id: Option<String>, reason: String },
}

impl VolumeItem {
    pub fn from_value(value: serde_json::Value) -> Self {
        let id = value
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string);
        match serde_json::from_value::<Volume>(value) {
            Ok(volume) => VolumeItem::Parsed(volume),
            Err(e) => VolumeItem::Malformed {
                id,
                reason: e.to_string(),
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            VolumeItem::Parsed(volume) => volume.id.as_deref(),
            VolumeItem::Malformed { id, .. } => id.as_deref(),
        }
    }
}

impl From<Volume> for VolumeItem {
    fn from(volume: Volume) -> Self {
        VolumeItem::Parsed(volume)
    }
}

impl VolumesResponse {
    /// Decode each entry independently, keeping page order.
    pub fn into_items(self) -> Vec<VolumeItem> {
        self.items.into_iter().map(VolumeItem::from_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_items_key_means_no_results() {
        let resp: VolumesResponse =
            serde_json::from_str(r#"{"kind": "books#volumes", "totalItems": 0}"#).unwrap();
        assert!(resp.items.is_empty());
        assert_eq!(resp.total_items, 0);
    }

    #[test]
    fn volume_with_sparse_info_parses() {
        let raw = r#"{
            "id": "zyTCAlFPjgYC",
            "volumeInfo": {
                "title": "The Google Story",
                "authors": ["David A. Vise", "Mark Malseed"],
                "publishedDate": "2005-11-15",
                "pageCount": 207,
                "imageLinks": {"thumbnail": "http://books.google.com/t.jpg"}
            }
        }"#;
        let volume: Volume = serde_json::from_str(raw).unwrap();
        assert_eq!(volume.id.as_deref(), Some("zyTCAlFPjgYC"));
        assert_eq!(volume.volume_info.authors.len(), 2);
        assert!(volume.volume_info.categories.is_empty());
        assert_eq!(volume.volume_info.page_count, Some(207));
        let links = volume.volume_info.image_links.unwrap();
        assert!(links.small_thumbnail.is_none());
        assert_eq!(links.thumbnail.as_deref(), Some("http://books.google.com/t.jpg"));
    }

    #[test]
    fn malformed_entry_does_not_spoil_the_page() {
        let raw = r#"{
            "totalItems": 2,
            "items": [
                {"id": "GOOD1", "volumeInfo": {"title": "Go", "pageCount": 300}},
                {"id": "BAD1", "volumeInfo": {"title": "Broken", "pageCount": "n/a"}}
            ]
        }"#;
        let resp: VolumesResponse = serde_json::from_str(raw).unwrap();
        let items = resp.into_items();

        assert_eq!(items.len(), 2);
        match &items[0] {
            VolumeItem::Parsed(v) => assert_eq!(v.volume_info.page_count, Some(300)),
            other => panic!("expected parsed volume, got {other:?}"),
        }
        match &items[1] {
            VolumeItem::Malformed { id, reason } => {
                assert_eq!(id.as_deref(), Some("BAD1"));
                assert!(reason.contains("n/a"), "{reason}");
            }
            other => panic!("expected malformed entry, got {other:?}"),
        }
    }

    #[test]
    fn malformed_entry_without_string_id() {
        let item = VolumeItem::from_value(serde_json::json!({"id": 42}));
        assert!(matches!(item, VolumeItem::Malformed { id: None, .. }));
        assert_eq!(item.id(), None);
    }

    #[test]
    fn volume_without_info_gets_defaults() {
        let volume: Volume = serde_json::from_str(r#"{"id": "A1"}"#).unwrap();
        assert_eq!(volume.volume_info, VolumeInfo::default());
    }
}
