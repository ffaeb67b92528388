use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::pagination::Identified;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub media: Vec<PostMedia>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMedia {
    pub media_url: String,

    #[serde(default)]
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl Identified for Post {
    fn item_id(&self) -> &str {
        &self.id
    }
}
