//! HTTP server rendering pages on request.
//!
//! `/static/*` is served straight from disk. Every other path is mapped to a
//! [`Route`] and resolved by the [`PageAssembler`] on the blocking pool, so
//! each request reads the content tree afresh.

use std::{path::Path, sync::Arc};

use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use folio_generator::{Page, PageAssembler, Route};
use tower_http::services::ServeDir;

/// Body of every not-found response.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// Body of every internal-error response.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Shared, read-only server state.
#[derive(Clone)]
pub struct ServerState {
    /// Page assembler built once at startup.
    pub assembler: Arc<PageAssembler>,
}

impl ServerState {
    /// Create a new server state.
    pub fn new(assembler: PageAssembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
        }
    }
}

/// Create the site router.
pub fn create_router(static_dir: &Path, state: ServerState) -> Router {
    Router::new()
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(page_handler)
        .with_state(state)
}

/// Resolve any non-static path through the page assembler.
async fn page_handler(State(state): State<ServerState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(route) = Route::parse(uri.path()) else {
        tracing::warn!(path = uri.path(), "no route");
        return not_found();
    };

    let assembler = Arc::clone(&state.assembler);
    let resolved = tokio::task::spawn_blocking(move || assembler.resolve(&route)).await;

    match resolved {
        Ok(Ok(Page::Html(html))) => Html(html).into_response(),
        Ok(Ok(Page::Download {
            file_name,
            content_type,
            bytes,
        })) => (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) if e.is_not_found() => {
            tracing::warn!(path = uri.path(), error = %e, "content not found");
            not_found()
        }
        Ok(Err(e)) => {
            tracing::error!(path = uri.path(), error = %e, "failed to render page");
            internal_error()
        }
        Err(e) => {
            tracing::error!(path = uri.path(), error = %e, "page task failed");
            internal_error()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}
