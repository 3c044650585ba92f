use serde::{Deserialize, Serialize};

/// Machine image returned by the image search endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(rename = "imageId", alias = "id")]
    pub id: String,
    #[serde(rename = "imageName", alias = "name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Creation time in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Image {
    pub fn created_at_display(&self) -> String {
        self.created_at
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_accepts_both_field_spellings() {
        let a: Image = serde_json::from_value(json!({"imageId": "fd8a", "imageName": "ubuntu-22"})).unwrap();
        let b: Image = serde_json::from_value(json!({"id": "fd8a", "name": "ubuntu-22"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_created_at_display() {
        let image = Image {
            id: "fd8a".into(),
            name: "ubuntu-22".into(),
            description: None,
            family: None,
            account: None,
            created_at: Some(0),
        };
        assert_eq!(image.created_at_display(), "1970-01-01 00:00");
    }
}
