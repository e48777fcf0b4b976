use crate::cache::{fetch_fn, CacheKey, FetchError, FetchFn};
use crate::config::ApiConfig;
use crate::posts::api_types::ApiPost;
use crate::posts::types::Post;
use color_eyre::{eyre::eyre, Result};
use url::Url;

/// Client for the paginated posts listing endpoint
#[derive(Clone)]
pub struct PostsClient {
  http: reqwest::Client,
  base_url: Url,
  page_size: u32,
}

impl PostsClient {
  pub fn new(api: &ApiConfig, page_size: u32) -> Result<Self> {
    let base_url = Url::parse(&api.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", api.base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API base URL {} cannot be a base", api.base_url));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("postpager/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      page_size,
    })
  }

  /// URL of one page: `{base}/{resource}?_limit={page_size}&_page={page}`
  pub fn page_url(&self, resource: &str, page: u32) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(resource);
    }
    url
      .query_pairs_mut()
      .append_pair("_limit", &self.page_size.to_string())
      .append_pair("_page", &page.to_string());
    url
  }

  /// Fetch one page of posts
  pub async fn fetch_page(&self, key: &CacheKey) -> Result<Vec<Post>, FetchError> {
    let url = self.page_url(&key.resource, key.page);

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?
      .error_for_status()
      .map_err(|e| FetchError::Network(e.to_string()))?;

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?;

    decode_page(&body)
  }

  /// Fetch function for the cache layer
  pub fn fetcher(&self) -> FetchFn<Post> {
    let client = self.clone();
    fetch_fn(move |key: CacheKey| {
      let client = client.clone();
      async move { client.fetch_page(&key).await }
    })
  }
}

/// Decode a page payload: a JSON array of posts.
pub fn decode_page(body: &[u8]) -> Result<Vec<Post>, FetchError> {
  let posts: Vec<ApiPost> =
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
  Ok(posts.into_iter().map(Post::from).collect())
}
