//! Film endpoints and their response views.

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};

use crate::application::films::{FilmLookup, SearchOutcome};
use crate::application::search::{SearchRequest, SearchResult};
use crate::domain::film::Film;

use super::{HttpState, error::ApiError, middleware::CacheOutcome};

/// Detail view: scalar fields and name lists, without embedded people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullFilm {
    pub id: String,
    pub imdb_rating: f64,
    pub genre: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    pub director: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
}

impl From<Film> for FullFilm {
    fn from(film: Film) -> Self {
        Self {
            id: film.id,
            imdb_rating: film.imdb_rating,
            genre: film.genre,
            title: film.title,
            description: film.description,
            director: film.director,
            actors_names: film.actors_names,
            writers_names: film.writers_names,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortFilm {
    pub id: String,
    pub imdb_rating: f64,
    pub genre: Vec<String>,
    pub title: String,
}

impl From<Film> for ShortFilm {
    fn from(film: Film) -> Self {
        Self {
            id: film.id,
            imdb_rating: film.imdb_rating,
            genre: film.genre,
            title: film.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub page: u32,
    pub results: Vec<ShortFilm>,
}

impl From<SearchResult> for SearchResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            total: result.total,
            page: result.page,
            results: result.results.into_iter().map(ShortFilm::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    #[serde(alias = "filters")]
    pub filter: Option<String>,
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        SearchRequest {
            query: params.query,
            sort: params.sort,
            page: params.page,
            filter: params.filter,
        }
    }
}

pub(super) async fn get_film(
    State(state): State<HttpState>,
    Path(film_id): Path<String>,
) -> Result<(Extension<CacheOutcome>, Json<FullFilm>), ApiError> {
    let lookup = state.films.lookup(&film_id).await;
    let outcome = CacheOutcome(lookup.label());
    match lookup {
        FilmLookup::Cached(film) | FilmLookup::Indexed(film) => {
            Ok((Extension(outcome), Json(FullFilm::from(film))))
        }
        FilmLookup::NotFound | FilmLookup::IndexUnavailable(_) => {
            Err(ApiError::not_found("film not found").with_outcome(outcome))
        }
    }
}

pub(super) async fn search_films(
    State(state): State<HttpState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<(Extension<CacheOutcome>, Json<SearchResponse>), ApiError> {
    let Query(params) = params
        .map_err(|err| ApiError::bad_request("invalid search parameters", Some(err.body_text())))?;

    let outcome = state.films.search_outcome(&params.into()).await;
    let label = CacheOutcome(outcome.label());
    match outcome {
        SearchOutcome::Cached(result) | SearchOutcome::Fresh(result) => {
            Ok((Extension(label), Json(SearchResponse::from(result))))
        }
        SearchOutcome::IndexUnavailable(_) => Err(ApiError::index_unavailable(Some(
            "retry the search later".to_string(),
        ))
        .with_outcome(label)),
    }
}
