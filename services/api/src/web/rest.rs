//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::envelope::ApiResponse;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use scripture_core::domain::{Annotation, Bookmark, Chapter, NewBookmark, SearchResults, Verse};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_chapters_handler,
        chapter_detail_handler,
        verse_detail_handler,
        search_handler,
        user_bookmarks_handler,
        add_bookmark_handler,
        remove_bookmark_handler,
        clear_bookmarks_handler,
    ),
    components(
        schemas(
            Chapter,
            Verse,
            Annotation,
            Bookmark,
            SearchResults,
            AddBookmarkRequest,
            DeletedCount
        )
    ),
    tags(
        (name = "Content", description = "Read-only chapter and verse endpoints."),
        (name = "Bookmarks", description = "Per-user verse bookmarks.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The request body for saving a bookmark. Sending an existing `id` overwrites that bookmark.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddBookmarkRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: String,
    pub chapter_id: i64,
    pub verse_number: i32,
    #[serde(default)]
    pub note: String,
}

impl From<AddBookmarkRequest> for NewBookmark {
    fn from(req: AddBookmarkRequest) -> Self {
        NewBookmark {
            id: req.id,
            user_id: req.user_id,
            chapter_id: req.chapter_id,
            verse_number: req.verse_number,
            note: req.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Query parameters of `DELETE /api/v1/bookmarks`. Kept as raw strings so that
/// a malformed value is reported with the envelope rather than axum's rejection.
#[derive(Debug, Deserialize)]
pub struct RemoveBookmarkParams {
    pub user_id: Option<String>,
    pub chapter_id: Option<String>,
    pub verse_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedCount {
    pub deleted: u64,
}

fn parse_number<T: FromStr>(name: &str, raw: Option<&str>) -> Result<T, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_input(format!("{} is required", name)))?;
    raw.parse()
        .map_err(|_| ApiError::bad_input(format!("Invalid {} format", name)))
}

//=========================================================================================
// Content Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up"))
)]
pub async fn health_handler() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("ok"))
}

/// List every chapter (without verses), ordered by number.
#[utoipa::path(
    get,
    path = "/api/v1/content/chapters",
    tag = "Content",
    responses(
        (status = 200, description = "All chapters", body = ApiResponse<Vec<Chapter>>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_chapters_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Chapter>>>, ApiError> {
    let chapters = app_state.content.get_all_chapters().await?;
    Ok(Json(ApiResponse::data(chapters)))
}

/// Fetch one chapter with all of its verses.
#[utoipa::path(
    get,
    path = "/api/v1/content/chapters/{number}",
    tag = "Content",
    params(("number" = i32, Path, description = "The chapter number.")),
    responses(
        (status = 200, description = "The chapter and its verses", body = ApiResponse<Chapter>),
        (status = 400, description = "The chapter number is not an integer"),
        (status = 404, description = "No chapter has that number"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn chapter_detail_handler(
    State(app_state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<ApiResponse<Chapter>>, ApiError> {
    let number: i32 = number
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_input("Invalid chapter number"))?;
    let chapter = app_state.content.get_chapter_detail(number).await?;
    Ok(Json(ApiResponse::data(chapter)))
}

/// Fetch a single verse, scoped to its chapter.
#[utoipa::path(
    get,
    path = "/api/v1/content/chapters/{number}/verses/{verse}",
    tag = "Content",
    params(
        ("number" = i32, Path, description = "The chapter number."),
        ("verse" = i32, Path, description = "The verse number inside the chapter.")
    ),
    responses(
        (status = 200, description = "The verse", body = ApiResponse<Verse>),
        (status = 400, description = "A path segment is not an integer"),
        (status = 404, description = "No such verse in that chapter"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn verse_detail_handler(
    State(app_state): State<Arc<AppState>>,
    Path((number, verse)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Verse>>, ApiError> {
    let number: i32 = number
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_input("Invalid chapter number"))?;
    let verse: i32 = verse
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_input("Invalid verse number"))?;
    let verse = app_state.content.get_verse_detail(number, verse).await?;
    Ok(Json(ApiResponse::data(verse)))
}

/// Search chapter names and verse texts for `q` (case-insensitive substring).
#[utoipa::path(
    get,
    path = "/api/v1/content/search",
    tag = "Content",
    params(("q" = String, Query, description = "The text to look for.")),
    responses(
        (status = 200, description = "Matching chapters and verses", body = ApiResponse<SearchResults>),
        (status = 400, description = "The query is missing or blank"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    let q = params.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(ApiError::bad_input("Query parameter 'q' is required"));
    }
    let results = app_state.content.search(&q).await?;
    Ok(Json(ApiResponse::data(results)))
}

//=========================================================================================
// Bookmark Handlers
//=========================================================================================

/// List a user's bookmarks, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/bookmarks/{user_id}",
    tag = "Bookmarks",
    params(("user_id" = String, Path, description = "The owner of the bookmarks.")),
    responses(
        (status = 200, description = "The user's bookmarks", body = ApiResponse<Vec<Bookmark>>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn user_bookmarks_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Bookmark>>>, ApiError> {
    let bookmarks = app_state.bookmarks.user_bookmarks(&user_id).await?;
    Ok(Json(ApiResponse::data(bookmarks)))
}

/// Save a bookmark.
#[utoipa::path(
    post,
    path = "/api/v1/bookmarks",
    tag = "Bookmarks",
    request_body = AddBookmarkRequest,
    responses(
        (status = 201, description = "Bookmark saved", body = ApiResponse<Bookmark>),
        (status = 400, description = "Malformed body or invalid fields"),
        (status = 404, description = "The referenced chapter does not exist"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_bookmark_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AddBookmarkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_input(rejection.body_text()))?;
    let bookmark = app_state.bookmarks.add_bookmark(request.into()).await?;
    info!(
        bookmark_id = bookmark.id,
        user_id = %bookmark.user_id,
        "Bookmark created successfully"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::data(bookmark))))
}

/// Delete a user's bookmarks on one verse. Deleting nothing still succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/bookmarks",
    tag = "Bookmarks",
    params(
        ("user_id" = String, Query, description = "The owner of the bookmark."),
        ("chapter_id" = i64, Query, description = "The chapter's database id."),
        ("verse_number" = i32, Query, description = "The verse number inside the chapter.")
    ),
    responses(
        (status = 200, description = "Bookmarks deleted", body = ApiResponse<DeletedCount>),
        (status = 400, description = "Missing or malformed query parameters"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn remove_bookmark_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<RemoveBookmarkParams>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    let user_id = params.user_id.unwrap_or_default();
    let chapter_id: i64 = parse_number("chapter_id", params.chapter_id.as_deref())?;
    let verse_number: i32 = parse_number("verse_number", params.verse_number.as_deref())?;

    let deleted = app_state
        .bookmarks
        .remove_bookmark(&user_id, chapter_id, verse_number)
        .await?;
    Ok(Json(ApiResponse::data(DeletedCount { deleted })))
}

/// Delete every bookmark a user owns.
#[utoipa::path(
    delete,
    path = "/api/v1/bookmarks/{user_id}",
    tag = "Bookmarks",
    params(("user_id" = String, Path, description = "The owner of the bookmarks.")),
    responses(
        (status = 200, description = "Bookmarks deleted", body = ApiResponse<DeletedCount>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_bookmarks_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    let deleted = app_state.bookmarks.clear_bookmarks(&user_id).await?;
    Ok(Json(ApiResponse::data(DeletedCount { deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_required_and_must_parse() {
        let missing = parse_number::<i64>("chapter_id", None).unwrap_err();
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            parse_number::<i64>("chapter_id", Some("  ")),
            Err(ApiError::Port(scripture_core::PortError::BadInput(m))) if m == "chapter_id is required"
        ));
        assert!(matches!(
            parse_number::<i32>("verse_number", Some("seven")),
            Err(ApiError::Port(scripture_core::PortError::BadInput(m))) if m == "Invalid verse_number format"
        ));
        assert_eq!(parse_number::<i32>("verse_number", Some(" 7 ")).unwrap(), 7);
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/content/chapters",
            "/api/v1/content/chapters/{number}",
            "/api/v1/content/chapters/{number}/verses/{verse}",
            "/api/v1/content/search",
            "/api/v1/bookmarks",
            "/api/v1/bookmarks/{user_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    /// The JSON schema documented for a successful response, with a `$ref` resolved.
    fn success_schema(doc: &serde_json::Value, path: &str, method: &str, status: &str) -> serde_json::Value {
        let schema = &doc["paths"][path][method]["responses"][status]["content"]["application/json"]["schema"];
        match schema["$ref"].as_str() {
            Some(reference) => {
                let name = reference.rsplit('/').next().unwrap_or_default();
                doc["components"]["schemas"][name].clone()
            }
            None => schema.clone(),
        }
    }

    #[test]
    fn documented_bodies_carry_the_envelope() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for (path, method, status) in [
            ("/api/v1/content/chapters", "get", "200"),
            ("/api/v1/content/chapters/{number}", "get", "200"),
            ("/api/v1/content/chapters/{number}/verses/{verse}", "get", "200"),
            ("/api/v1/content/search", "get", "200"),
            ("/api/v1/bookmarks/{user_id}", "get", "200"),
            ("/api/v1/bookmarks", "post", "201"),
            ("/api/v1/bookmarks", "delete", "200"),
            ("/api/v1/bookmarks/{user_id}", "delete", "200"),
        ] {
            let schema = success_schema(&doc, path, method, status);
            let properties = &schema["properties"];
            assert!(properties.get("success").is_some(), "{} {} has no envelope", method, path);
            assert!(properties.get("data").is_some(), "{} {} has no data field", method, path);
        }
    }
}
