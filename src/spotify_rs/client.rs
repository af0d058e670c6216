use std::num::NonZeroU32;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::spotify_rs::types::{
    SpotifyPage, SpotifyPlaylist, SpotifyPlaylistItem, SpotifySearchResponse, SpotifyTrack,
    SpotifyUser,
};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1/";

/// Spotify accepts at most 100 URIs per playlist mutation.
const MAX_URIS_PER_REQUEST: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    #[error("Spotify rejected the access token (HTTP 401). Provide a fresh token")]
    Unauthorized,
    #[error(
        "Spotify refused the request (HTTP 403). Playlists owned by another user cannot be edited"
    )]
    Forbidden,
    #[error("Spotify rate limit hit, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },
    #[error("Spotify request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl SpotifyApiError {
    fn from_status(status: u16, retry_after: Option<u64>, body: String) -> Self {
        match status {
            401 => SpotifyApiError::Unauthorized,
            403 => SpotifyApiError::Forbidden,
            429 => SpotifyApiError::RateLimited { retry_after },
            status => SpotifyApiError::Status { status, body },
        }
    }
}

/// Spotify Web API client
pub struct SpotifyClient {
    access_token: String,
    base_url: Url,
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl SpotifyClient {
    pub fn new(access_token: String, requests_per_second: u32) -> Result<Self> {
        let base_url = Url::parse(SPOTIFY_API_URL).wrap_err("Invalid Spotify API URL")?;
        Self::with_base_url(access_token, requests_per_second, base_url)
    }

    pub fn with_base_url(
        access_token: String,
        requests_per_second: u32,
        base_url: Url,
    ) -> Result<Self> {
        let per_second = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| eyre!("requests_per_second must be greater than 0"))?;

        Ok(Self {
            access_token,
            base_url,
            client: reqwest::Client::new(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .wrap_err_with(|| format!("Invalid Spotify endpoint: {}", path))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let response = request
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .wrap_err("Failed to send Spotify request")?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.unwrap_or_default();
        Err(SpotifyApiError::from_status(status.as_u16(), retry_after, body).into())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {}", url);
        self.send(self.client.get(url))
            .await?
            .json::<T>()
            .await
            .wrap_err("Failed to deserialize Spotify response")
    }

    /// Follows `next` links until the last page.
    async fn get_all_pages<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next_url = Some(first);

        while let Some(url) = next_url {
            let page: SpotifyPage<T> = self.get_json(url).await?;
            items.extend(page.items);
            next_url = page
                .next
                .map(|next| Url::parse(&next))
                .transpose()
                .wrap_err("Spotify returned an invalid next page URL")?;
        }

        Ok(items)
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser> {
        self.get_json(self.endpoint("me")?).await
    }

    /// Get all playlists for the current user
    pub async fn get_user_playlists(&self) -> Result<Vec<SpotifyPlaylist>> {
        self.get_all_pages(self.endpoint("me/playlists?limit=50")?)
            .await
    }

    /// Get all tracks in a playlist, skipping episodes and removed tracks
    pub async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyTrack>> {
        let url = self.endpoint(&format!("playlists/{}/tracks?limit=100", playlist_id))?;
        let items: Vec<SpotifyPlaylistItem> = self.get_all_pages(url).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| item.track)
            .filter(|track| track.is_track() && track.id.is_some())
            .collect())
    }

    pub async fn create_playlist(&self, user_id: &str, name: &str) -> Result<SpotifyPlaylist> {
        let url = self.endpoint(&format!("users/{}/playlists", user_id))?;
        log::debug!("POST {}", url);

        self.send(
            self.client
                .post(url)
                .json(&json!({ "name": name, "public": false })),
        )
        .await?
        .json::<SpotifyPlaylist>()
        .await
        .wrap_err("Failed to deserialize created Spotify playlist")
    }

    pub async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        let url = self.endpoint(&format!("playlists/{}/tracks", playlist_id))?;

        for chunk in uris.chunks(MAX_URIS_PER_REQUEST) {
            log::debug!("POST {} ({} uris)", url, chunk.len());
            self.send(self.client.post(url.clone()).json(&json!({ "uris": chunk })))
                .await
                .wrap_err("Failed to add tracks to Spotify playlist")?;
        }

        Ok(())
    }

    /// Removes every occurrence of each URI from the playlist.
    pub async fn remove_tracks_from_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<()> {
        let url = self.endpoint(&format!("playlists/{}/tracks", playlist_id))?;

        for chunk in uris.chunks(MAX_URIS_PER_REQUEST) {
            let tracks: Vec<_> = chunk.iter().map(|uri| json!({ "uri": uri })).collect();
            log::debug!("DELETE {} ({} uris)", url, chunk.len());
            self.send(
                self.client
                    .delete(url.clone())
                    .json(&json!({ "tracks": tracks })),
            )
            .await
            .wrap_err("Failed to remove tracks from Spotify playlist")?;
        }

        Ok(())
    }

    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyTrack>> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "track")
            .append_pair("limit", &limit.to_string());

        let response: SpotifySearchResponse = self.get_json(url).await?;
        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}
