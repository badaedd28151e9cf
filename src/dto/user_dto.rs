use super::auth_dto::trim_optional_string;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub domain: Option<String>,
    pub blocked: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserPayload {
    pub role: Option<String>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub domain: Option<String>,
    #[serde(default)]
    pub clear_domain: bool,
    pub blocked: Option<bool>,
    pub approved: Option<bool>,
}
