//! Catalog browsing routes. Upstream failures degrade to empty results
//! instead of error statuses.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::views::render_catalog;
use super::{AppState, FilterResponse, SearchResponse};
use crate::clients::upstream::FilterQuery;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Json<SearchResponse> {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected search query string");
            return Json(SearchResponse::failed());
        }
    };

    let Some(query) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Json(SearchResponse::failed());
    };

    match state.shared.upstream.search(query).await {
        Ok(data) => Json(SearchResponse {
            success: true,
            data,
        }),
        Err(e) => {
            warn!(query, error = %e, "Catalog search failed");
            Json(SearchResponse::failed())
        }
    }
}

pub async fn filter(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Json<FilterResponse> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected filter query string");
            return Json(FilterResponse::failed("Invalid filter parameters"));
        }
    };

    match state.shared.upstream.filter(&query).await {
        Ok(page) => Json(FilterResponse::page(page)),
        Err(e) => {
            warn!(?query, error = %e, "Catalog filter failed");
            Json(FilterResponse::failed("Failed to fetch filter data"))
        }
    }
}

pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let upstream = &state.shared.upstream;

    let result = async {
        let constants = upstream.filter_constants().await?;
        let page = upstream.filter(&FilterQuery::default()).await?;
        Ok::<_, crate::clients::upstream::UpstreamError>((constants, page))
    }
    .await;

    match result {
        Ok((constants, page)) => Html(render_catalog(&constants, &page)).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load catalog page");
            "Failed to load data from the catalog API.".into_response()
        }
    }
}
