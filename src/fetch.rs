use thiserror::Error;

use crate::{
    place::{Coordinate, Place},
    search::{SearchApi, SearchError, SearchRequest},
};

/// The API serves at most 3 pages (60 results) for one query.
pub const MAX_PAGE_COUNT: u32 = 3;

pub const SEARCH_RADIUS_METERS: f64 = 1000.0;

/// A coordinate whose search failed part way. Pages fetched before the
/// failure are not kept.
#[derive(Error, Debug)]
#[error("page {page} failed after {discarded} places were fetched: {source}")]
pub struct FetchError {
    pub page: u32,
    pub discarded: usize,
    #[source]
    pub source: SearchError,
}

/// Runs one query around a coordinate and follows its continuation tokens.
pub struct PageFetcher<A> {
    api: A,
    query: String,
    max_pages: u32,
    radius: f64,
}

impl<A: SearchApi> PageFetcher<A> {
    pub fn new(api: A, query: impl Into<String>) -> Self {
        PageFetcher {
            api,
            query: query.into(),
            max_pages: MAX_PAGE_COUNT,
            radius: SEARCH_RADIUS_METERS,
        }
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch the places nearest to `at`, closest first.
    ///
    /// A failure on any page fails the whole coordinate.
    pub async fn fetch(
        &self,
        at: Coordinate,
    ) -> Result<Vec<Place>, FetchError> {
        let mut request = SearchRequest::nearest(&self.query, at, self.radius);
        let mut places = vec![];

        let mut page = 1;
        while page <= self.max_pages {
            let response =
                self.api.search_text(&request).await.map_err(|source| {
                    FetchError {
                        page,
                        discarded: places.len(),
                        source,
                    }
                })?;
            log::debug!(
                "Fetched page {page}/{} with {} results",
                self.max_pages,
                response.places.len()
            );

            let next = response.continuation().map(str::to_owned);
            places.extend(response.places);
            match next {
                Some(token) => {
                    request.page_token = Some(token);
                    page += 1;
                }
                None => break,
            }
        }
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::{place, ScriptedApi};

    const AT: Coordinate = Coordinate::new(47.646431, -122.335499);

    fn full_page(page: usize) -> Vec<Place> {
        (0..20)
            .map(|i| place(&format!("Cafe {page}-{i}"), &format!("{page}-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn single_page_without_token() {
        let api = ScriptedApi::new().page(
            AT,
            vec![place("Alpha", "A"), place("Beta", "B")],
            None,
        );
        let fetcher = PageFetcher::new(api, "coffee shops");

        let places = fetcher.fetch(AT).await.unwrap();

        assert_eq!(places, vec![place("Alpha", "A"), place("Beta", "B")]);
        assert_eq!(fetcher.api().requests().len(), 1);
        assert_eq!(fetcher.api().requests()[0].page_token, None);
    }

    #[tokio::test]
    async fn follows_tokens_until_absent() {
        let api = ScriptedApi::new()
            .page(AT, vec![place("1", "p1")], Some("t1"))
            .page(AT, vec![place("2", "p2")], Some("t2"))
            .page(AT, vec![place("3", "p3")], None);
        let fetcher = PageFetcher::new(api, "coffee shops");

        let places = fetcher.fetch(AT).await.unwrap();

        assert_eq!(
            places,
            vec![place("1", "p1"), place("2", "p2"), place("3", "p3")]
        );
        let tokens: Vec<_> = fetcher
            .api()
            .requests()
            .into_iter()
            .map(|r| r.page_token)
            .collect();
        assert_eq!(tokens, vec![None, Some("t1".into()), Some("t2".into())]);
    }

    #[tokio::test]
    async fn stops_at_page_cap_even_with_token() {
        let api = ScriptedApi::new()
            .page(AT, full_page(1), Some("t1"))
            .page(AT, full_page(2), Some("t2"))
            .page(AT, full_page(3), Some("t3"))
            .page(AT, full_page(4), None);
        let fetcher = PageFetcher::new(api, "coffee shops");

        let places = fetcher.fetch(AT).await.unwrap();

        assert_eq!(fetcher.api().requests().len(), 3);
        assert_eq!(places.len(), 60);
        assert_eq!(places[59].formatted_address(), Some("3-19"));
    }

    #[tokio::test]
    async fn custom_page_cap() {
        let api = ScriptedApi::new()
            .page(AT, full_page(1), Some("t1"))
            .page(AT, full_page(2), Some("t2"));
        let fetcher = PageFetcher::new(api, "coffee shops").max_pages(1);

        let places = fetcher.fetch(AT).await.unwrap();

        assert_eq!(fetcher.api().requests().len(), 1);
        assert_eq!(places.len(), 20);
    }

    #[tokio::test]
    async fn empty_token_ends_pagination() {
        let api = ScriptedApi::new()
            .page(AT, vec![place("1", "p1")], Some(""))
            .page(AT, vec![place("2", "p2")], None);
        let fetcher = PageFetcher::new(api, "coffee shops");

        let places = fetcher.fetch(AT).await.unwrap();

        assert_eq!(places, vec![place("1", "p1")]);
        assert_eq!(fetcher.api().requests().len(), 1);
    }

    #[tokio::test]
    async fn first_page_failure_returns_error() {
        let api = ScriptedApi::new()
            .failure(AT, 500, "backend error")
            .page(AT, vec![place("later", "L")], None);
        let fetcher = PageFetcher::new(api, "coffee shops");

        let err = fetcher.fetch(AT).await.unwrap_err();

        assert_eq!(err.page, 1);
        assert_eq!(err.discarded, 0);
        assert_eq!(err.source.body(), Some("backend error"));
        assert_eq!(fetcher.api().requests().len(), 1);
    }

    #[tokio::test]
    async fn later_page_failure_discards_earlier_pages() {
        let api = ScriptedApi::new()
            .page(AT, full_page(1), Some("t1"))
            .failure(AT, 400, "INVALID_ARGUMENT");
        let fetcher = PageFetcher::new(api, "coffee shops");

        let err = fetcher.fetch(AT).await.unwrap_err();

        assert_eq!(err.page, 2);
        assert_eq!(err.discarded, 20);
        assert_eq!(fetcher.api().requests().len(), 2);
    }

    #[tokio::test]
    async fn sends_query_and_radius() {
        let fetcher =
            PageFetcher::new(ScriptedApi::new(), "mens haircut").radius(250.0);

        let places = fetcher.fetch(AT).await.unwrap();

        assert!(places.is_empty());
        let requests = fetcher.api().requests();
        let request = &requests[0];
        assert_eq!(request.text_query, "mens haircut");
        assert_eq!(request.location_bias.circle.radius, 250.0);
        assert_eq!(request.center(), AT);
    }
}
