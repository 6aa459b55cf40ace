use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::services::text_service::TextStore;
use crate::state::record::TextLookup;

/// Body of a save request. `text` may be absent or null.
#[derive(Debug, Default, Deserialize)]
pub struct SaveTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Build the text routes under /api/texts
pub fn routes(texts: TextStore) -> Router {
    Router::new()
        .route("/:key", get(get_text).post(save_text))
        .with_state(texts)
}

//
// ─────────────────────────────────────────────────────────────
// GET /api/texts/{key}
// Stored text, or empty text with exists = false
// ─────────────────────────────────────────────────────────────
//
async fn get_text(
    Path(key): Path<String>,
    State(texts): State<TextStore>,
) -> Result<Json<TextLookup>, ApiError>
{
    texts
        .get(&key)
        .await
        .map(Json)
        .map_err(ApiError::GetFailed)
}

//
// ─────────────────────────────────────────────────────────────
// POST /api/texts/{key}
// Create or replace the text for a key
// ─────────────────────────────────────────────────────────────
//
// A request without a JSON body saves empty text; a JSON body that does not
// parse is refused and nothing is written.
async fn save_text(
    Path(key): Path<String>,
    State(texts): State<TextStore>,
    body: Result<Json<SaveTextRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
{
    let req = match body {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => SaveTextRequest::default(),
        Err(rejection) => return Err(ApiError::InvalidBody(rejection)),
    };

    let record = texts
        .upsert(&key, req.text)
        .await
        .map_err(ApiError::SaveFailed)?;

    Ok(Json(json!({
        "success": true,
        "text": record,
    })))
}
