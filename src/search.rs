//! Wire types and HTTP client for the Places "searchText" endpoint.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::ApiKey, place::Coordinate, place::Place};

pub const SEARCH_TEXT_URL: &str =
    "https://places.googleapis.com/v1/places:searchText";

/// Restricts the response to the fields that end up in the output file.
pub const FIELD_MASK: &str = "nextPageToken,places.displayName,\
    places.formattedAddress,places.rating,places.nationalPhoneNumber,\
    places.location.latitude,places.location.longitude,places.websiteUri,\
    places.primaryType,places.reviewSummary.text";

/// The largest page the API will return.
pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub text_query: String,
    pub page_size: u32,
    pub rank_preference: RankPreference,
    pub location_bias: LocationBias,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl SearchRequest {
    /// A first-page request for places nearest to `center`.
    pub fn nearest(query: &str, center: Coordinate, radius: f64) -> Self {
        SearchRequest {
            text_query: query.to_owned(),
            page_size: PAGE_SIZE,
            rank_preference: RankPreference::Distance,
            location_bias: LocationBias {
                circle: Circle { center, radius },
            },
            page_token: None,
        }
    }

    pub fn center(&self) -> Coordinate {
        self.location_bias.circle.center
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankPreference {
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationBias {
    pub circle: Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Circle {
    pub center: Coordinate,
    /// Meters
    pub radius: f64,
}

/// One page of results. Both fields may be missing from the body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub places: Vec<Place>,
    pub next_page_token: Option<String>,
}

impl SearchResponse {
    /// The continuation token, treating an empty string as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("could not decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl SearchError {
    /// The response body, when the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            SearchError::Status { body, .. } | SearchError::Decode { body, .. }
                if !body.is_empty() =>
            {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

/// Anything that can answer a text search, one page at a time.
#[allow(async_fn_in_trait)]
pub trait SearchApi {
    async fn search_text(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchError>;
}

/// `SearchApi` over HTTPS.
pub struct PlacesClient {
    client: Client,
    api_key: ApiKey,
    url: String,
}

impl PlacesClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self::with_client(Client::new(), api_key, SEARCH_TEXT_URL)
    }

    /// A client that posts searches to `url` instead of the Places API.
    pub fn with_client(client: Client, api_key: ApiKey, url: &str) -> Self {
        PlacesClient {
            client,
            api_key,
            url: url.to_owned(),
        }
    }
}

impl SearchApi for PlacesClient {
    async fn search_text(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchError> {
        log::debug!(
            "POST {} near {} (page token: {})",
            self.url,
            request.center(),
            request.page_token.is_some()
        );
        let response = self
            .client
            .post(&self.url)
            .header("X-Goog-Api-Key", self.api_key.expose())
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status { status, body });
        }
        serde_json::from_str(&body)
            .map_err(|source| SearchError::Decode { source, body })
    }
}
