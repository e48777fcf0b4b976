//! Serde-deserializable types matching the listing endpoint's responses.

use serde::Deserialize;

use super::types::Post;

/// One item of a page. Only `id` and `title` are guaranteed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPost {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub user_id: Option<u64>,
  #[serde(default)]
  pub body: String,
}

impl From<ApiPost> for Post {
  fn from(api: ApiPost) -> Self {
    Post {
      id: api.id,
      user_id: api.user_id,
      title: api.title,
      body: api.body,
    }
  }
}
