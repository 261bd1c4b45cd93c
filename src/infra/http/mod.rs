//! HTTP transport for the film service.

mod error;
mod films;
mod middleware;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use films::{FullFilm, SearchParams, SearchResponse, ShortFilm};
pub use middleware::{CACHE_OUTCOME_HEADER, CacheOutcome, REQUEST_ID_HEADER, RequestContext};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::films::FilmService;

#[derive(Clone)]
pub struct HttpState {
    pub films: FilmService,
}

impl HttpState {
    pub fn new(films: FilmService) -> Self {
        Self { films }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/v1/films", get(films::search_films))
        .route("/api/v1/films/", get(films::search_films))
        .route("/api/v1/films/{film_id}", get(films::get_film))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
