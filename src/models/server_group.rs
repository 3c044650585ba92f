use serde::{Deserialize, Serialize};

/// Row of the application's server group listing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroupSummary {
    pub name: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub cloud_provider: String,
    #[serde(default)]
    pub is_disabled: bool,
}
