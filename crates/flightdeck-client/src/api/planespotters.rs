// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Photo lookups against the planespotters.net public API.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::{get_json, FetchError, PhotoSource};
use crate::model::Photo;

/// Default public endpoint.
pub const DEFAULT_PLANESPOTTERS_BASE: &str = "https://api.planespotters.net";

#[derive(Debug, Deserialize)]
struct ThumbnailInfo {
    src: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoInfo {
    thumbnail_large: Option<ThumbnailInfo>,
    link: Option<String>,
    photographer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlanespottersResponse {
    #[serde(default)]
    photos: Vec<PhotoInfo>,
}

impl From<PhotoInfo> for Photo {
    fn from(info: PhotoInfo) -> Self {
        Self {
            thumbnail_url: info.thumbnail_large.and_then(|thumb| thumb.src),
            link: info.link,
            photographer: info.photographer,
        }
    }
}

/// Client for `/pub/photos/reg/{reg}`.
#[derive(Debug, Clone)]
pub struct PlanespottersApi {
    client: reqwest::Client,
    base: String,
}

impl PlanespottersApi {
    #[must_use]
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/pub/photos/reg/{reg}` with `reg` as a single encoded segment.
    fn photos_url(&self, reg: &str) -> Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: self.base.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["pub", "photos", "reg", reg]);
        Ok(url)
    }
}

#[async_trait]
impl PhotoSource for PlanespottersApi {
    async fn photos_for_registration(&self, reg: &str) -> Result<Vec<Photo>, FetchError> {
        let url = self.photos_url(reg)?;
        let response: PlanespottersResponse =
            get_json(self.client.get(url.clone()), url.as_str()).await?;
        Ok(response.photos.into_iter().map(Photo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_photos_for_registration() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pub/photos/reg/N12345")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"photos": [
                    {"id": "1", "thumbnail_large": {"src": "https://t.example/1.jpg", "size": {"width": 420, "height": 280}},
                     "link": "https://www.planespotters.net/photo/1", "photographer": "J. Doe"},
                    {"id": "2", "thumbnail_large": {"src": "https://t.example/2.jpg"}}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let api = PlanespottersApi::new(reqwest::Client::new(), &server.url());
        let photos = api.photos_for_registration("N12345").await.unwrap();

        mock.assert_async().await;
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].thumbnail_url.as_deref(), Some("https://t.example/1.jpg"));
        assert_eq!(photos[0].photographer.as_deref(), Some("J. Doe"));
        assert!(photos[1].link.is_none());
    }

    #[tokio::test]
    async fn test_missing_photos_key_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/pub/photos/reg/N0NE")
            .with_status(200)
            .with_body(r#"{"error": "not found"}"#)
            .create_async()
            .await;

        let api = PlanespottersApi::new(reqwest::Client::new(), &server.url());
        assert!(api.photos_for_registration("N0NE").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registration_is_one_path_segment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pub/photos/reg/A%2FB%23C%3FD")
            .with_status(200)
            .with_body(r#"{"photos": []}"#)
            .expect(1)
            .create_async()
            .await;

        let api = PlanespottersApi::new(reqwest::Client::new(), &server.url());
        assert!(api.photos_for_registration("A/B#C?D").await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unusable_base_is_an_error() {
        let api = PlanespottersApi::new(reqwest::Client::new(), "not a url");
        let err = api.photos_for_registration("N12345").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
