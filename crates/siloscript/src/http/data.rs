use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::AppError;
use crate::ids::SiloHandle;
use crate::state::AppState;

fn parse_handle(raw: &str) -> Result<SiloHandle, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    prompt: Option<String>,
    #[serde(default = "default_save", deserialize_with = "deserialize_save")]
    save: bool,
    options: Option<String>,
}

fn default_save() -> bool {
    true
}

/// The reference client sends Python's `str(bool)`, i.e. `True`/`False`,
/// not the lowercase `true`/`false` `str::parse::<bool>` expects.
fn deserialize_save<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean `{other}`, expected true/false"
        ))),
    }
}

fn split_options(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|s| s.split(',').map(str::to_string).collect())
}

pub async fn get_value(
    State(app): State<AppState>,
    Path((handle, key)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> Result<Bytes, AppError> {
    let handle = parse_handle(&handle)?;
    let value = app
        .machine
        .data_get(handle, &key, query.prompt, query.save, split_options(query.options))
        .await?;
    Ok(Bytes::from(value))
}

pub async fn put_value(
    State(app): State<AppState>,
    Path((handle, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let handle = parse_handle(&handle)?;
    app.machine.data_put(handle, &key, body.to_vec()).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    value: String,
}

pub async fn create_token(
    State(app): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<String, AppError> {
    let handle = parse_handle(&handle)?;
    app.machine
        .data_create_token(handle, query.value.as_bytes())
        .await
}
