use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CACHE_OUTCOME_HEADER: &str = "x-cache-outcome";

const FILM_PATH_PREFIX: &str = "/api/v1/films/";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// How the film service resolved a request: `cached`, `indexed`, `fresh`,
/// `not_found` or `index_unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOutcome(pub &'static str);

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Film id addressed by a detail request, if any.
fn film_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(FILM_PATH_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or("").to_owned();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let film_id = film_id_from_path(&path).unwrap_or("");

    let outcome = response.extensions().get::<CacheOutcome>().copied();
    if let Some(CacheOutcome(label)) = outcome {
        response
            .headers_mut()
            .insert(CACHE_OUTCOME_HEADER, HeaderValue::from_static(label));
    }
    let cache_outcome = outcome.map_or("none", |CacheOutcome(label)| label);

    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target: "film_search::http::response",
            status = status.as_u16(),
            path = %path,
            film_id,
            query = %query,
            cache_outcome,
            elapsed_ms,
            request_id = %request_id,
            "request served",
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target: "film_search::http::response",
            status = status.as_u16(),
            path = %path,
            film_id,
            query = %query,
            cache_outcome,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id = %request_id,
            "request failed",
        );
    } else {
        warn!(
            target: "film_search::http::response",
            status = status.as_u16(),
            path = %path,
            film_id,
            query = %query,
            cache_outcome,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id = %request_id,
            "client request error",
        );
    }

    response
}
