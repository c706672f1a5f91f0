use serde::{Deserialize, Serialize};

use crate::json::null_as_empty;

/// Contact-form body. Every field is required; absent or `null` ones
/// deserialize as empty and are rejected by the service.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitContactRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub destination: String,
    #[serde(deserialize_with = "string_or_number")]
    pub travel_date: String,
    #[serde(deserialize_with = "string_or_number")]
    pub number_of_travelers: String,
    #[serde(deserialize_with = "string_or_number")]
    pub budget: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub agent_username: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitContactResponse {
    pub message: String,
}

/// Forms post counts and budgets either as strings or bare numbers.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
        Null(()),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}
