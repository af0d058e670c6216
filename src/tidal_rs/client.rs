use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{OptionExt, WrapErr, eyre};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::tidal_rs::types::{
    TidalDocument, TidalIdentifier, TidalItemMeta, TidalPlaylistItem, TidalResource,
};

pub const TIDAL_API_URL: &str = "https://openapi.tidal.com/v2/";

const JSON_API: &str = "application/vnd.api+json";
/// TIDAL accepts at most 20 items per playlist mutation.
const MAX_ITEMS_PER_REQUEST: usize = 20;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, thiserror::Error)]
pub enum TidalApiError {
    #[error("TIDAL rejected the access token (HTTP 401). Provide a fresh token")]
    Unauthorized,
    #[error("TIDAL refused the request (HTTP 403). Playlists owned by another user cannot be edited")]
    Forbidden,
    #[error("TIDAL rate limit hit")]
    RateLimited,
    #[error("TIDAL request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TidalApiError {
    fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => TidalApiError::Unauthorized,
            403 => TidalApiError::Forbidden,
            429 => TidalApiError::RateLimited,
            status => TidalApiError::Status { status, body },
        }
    }
}

/// TIDAL OpenAPI v2 client (JSON:API). Every request is scoped to `country_code`.
pub struct TidalClient {
    access_token: String,
    country_code: String,
    base_url: Url,
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl TidalClient {
    pub fn new(access_token: String, country_code: String, requests_per_second: u32) -> Result<Self> {
        let base_url = Url::parse(TIDAL_API_URL).wrap_err("Invalid TIDAL API URL")?;
        Self::with_base_url(access_token, country_code, requests_per_second, base_url)
    }

    pub fn with_base_url(
        access_token: String,
        country_code: String,
        requests_per_second: u32,
        base_url: Url,
    ) -> Result<Self> {
        let per_second = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| eyre!("requests_per_second must be greater than 0"))?;

        Ok(Self {
            access_token,
            country_code,
            base_url,
            client: reqwest::Client::new(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .wrap_err_with(|| format!("Invalid TIDAL endpoint: {}", path))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("countryCode", &self.country_code);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// `links.next` is relative to the API root, not to the host.
    fn resolve_next(&self, next: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(next) {
            return Ok(url);
        }
        let root = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", root, next.trim_start_matches('/')))
            .wrap_err_with(|| format!("TIDAL returned an invalid next link: {}", next))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let response = request
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, JSON_API)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .wrap_err("Failed to send TIDAL request")?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TidalApiError::from_status(status.as_u16(), body).into())
    }

    async fn get_document<T: DeserializeOwned>(&self, url: Url) -> Result<TidalDocument<T>> {
        log::debug!("GET {}", url);
        self.send(self.client.get(url))
            .await?
            .json::<TidalDocument<T>>()
            .await
            .wrap_err("Failed to deserialize TIDAL response")
    }

    async fn send_items(
        &self,
        method: reqwest::Method,
        url: Url,
        items: &[TidalIdentifier],
    ) -> Result<()> {
        for chunk in items.chunks(MAX_ITEMS_PER_REQUEST) {
            log::debug!("{} {} ({} items)", method, url, chunk.len());
            let body = serde_json::to_vec(&json!({ "data": chunk }))?;
            self.send(
                self.client
                    .request(method.clone(), url.clone())
                    .header(reqwest::header::CONTENT_TYPE, JSON_API)
                    .body(body),
            )
            .await?;
        }
        Ok(())
    }

    /// Playlists owned by the token's user
    pub async fn get_my_playlists(&self) -> Result<Vec<TidalResource>> {
        let mut playlists = Vec::new();
        let mut next_url = Some(self.endpoint("playlists", &[("filter[r.owners.id]", "me")])?);

        while let Some(url) = next_url {
            let page: TidalDocument<Vec<TidalResource>> = self.get_document(url).await?;
            playlists.extend(page.data);
            next_url = match page.links.and_then(|l| l.next) {
                Some(next) => Some(self.resolve_next(&next)?),
                None => None,
            };
        }

        Ok(playlists)
    }

    pub async fn get_playlist_items(&self, playlist_id: &str) -> Result<Vec<TidalPlaylistItem>> {
        let mut items = Vec::new();
        let mut next_url = Some(self.endpoint(
            &format!("playlists/{}/relationships/items", playlist_id),
            &[("include", "items")],
        )?);

        while let Some(url) = next_url {
            let page: TidalDocument<Vec<TidalIdentifier>> = self.get_document(url).await?;
            items.extend(playlist_items(page.data, page.included));
            next_url = match page.links.and_then(|l| l.next) {
                Some(next) => Some(self.resolve_next(&next)?),
                None => None,
            };
        }

        Ok(items)
    }

    pub async fn create_playlist(&self, name: &str) -> Result<TidalResource> {
        let url = self.endpoint("playlists", &[])?;
        log::debug!("POST {}", url);
        let body = serde_json::to_vec(&json!({
            "data": {
                "type": "playlists",
                "attributes": { "name": name, "accessType": "UNLISTED" }
            }
        }))?;

        let document = self
            .send(
                self.client
                    .post(url)
                    .header(reqwest::header::CONTENT_TYPE, JSON_API)
                    .body(body),
            )
            .await?
            .json::<TidalDocument<TidalResource>>()
            .await
            .wrap_err("Failed to deserialize created TIDAL playlist")?;

        Ok(document.data)
    }

    pub async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let url = self.endpoint(&format!("playlists/{}/relationships/items", playlist_id), &[])?;
        let items: Vec<_> = track_ids.iter().map(TidalIdentifier::track).collect();
        self.send_items(reqwest::Method::POST, url, &items)
            .await
            .wrap_err("Failed to add tracks to TIDAL playlist")
    }

    pub async fn remove_items(&self, playlist_id: &str, items: &[TidalPlaylistItem]) -> Result<()> {
        let url = self.endpoint(&format!("playlists/{}/relationships/items", playlist_id), &[])?;
        let identifiers = items
            .iter()
            .map(|item| {
                let item_id = item
                    .item_id
                    .clone()
                    .ok_or_eyre(format!("Playlist item for track {} has no itemId", item.track_id))?;
                Ok(TidalIdentifier {
                    meta: Some(TidalItemMeta {
                        item_id: Some(item_id),
                    }),
                    ..TidalIdentifier::track(item.track_id.clone())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.send_items(reqwest::Method::DELETE, url, &identifiers)
            .await
            .wrap_err("Failed to remove tracks from TIDAL playlist")
    }

    /// Catalog tracks by TIDAL id, with artists and albums included. Requested 20 ids at a time.
    pub async fn get_tracks(&self, track_ids: &[String]) -> Result<TidalDocument<Vec<TidalResource>>> {
        let mut document = TidalDocument {
            data: Vec::new(),
            included: Vec::new(),
            links: None,
        };

        for chunk in track_ids.chunks(MAX_ITEMS_PER_REQUEST) {
            let mut params: Vec<(&str, &str)> =
                chunk.iter().map(|id| ("filter[id]", id.as_str())).collect();
            params.push(("include", "artists,albums"));

            let page: TidalDocument<Vec<TidalResource>> =
                self.get_document(self.endpoint("tracks", &params)?).await?;
            document.data.extend(page.data);
            document.included.extend(page.included);
        }

        Ok(document)
    }

    /// Catalog tracks with the given ISRC, with artists and albums included.
    pub async fn tracks_by_isrc(&self, isrc: &str) -> Result<TidalDocument<Vec<TidalResource>>> {
        let url = self.endpoint(
            "tracks",
            &[("filter[isrc]", isrc), ("include", "artists,albums")],
        )?;
        self.get_document(url).await
    }
}

/// Joins relationship linkage with the included track resources.
pub(crate) fn playlist_items(
    data: Vec<TidalIdentifier>,
    included: Vec<TidalResource>,
) -> Vec<TidalPlaylistItem> {
    let tracks: HashMap<String, TidalResource> = included
        .into_iter()
        .filter(|r| r.kind == "tracks")
        .map(|r| (r.id.clone(), r))
        .collect();

    data.into_iter()
        .filter(|identifier| identifier.kind == "tracks")
        .map(|identifier| TidalPlaylistItem {
            track: tracks.get(&identifier.id).cloned(),
            item_id: identifier.meta.and_then(|m| m.item_id),
            track_id: identifier.id,
        })
        .collect()
}
