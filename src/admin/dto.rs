use serde::{Deserialize, Serialize};

use crate::json::null_as_empty;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateLinkRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLinkResponse {
    pub message: String,
    pub registration_link: String,
}
