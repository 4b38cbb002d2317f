use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::error::AppError;
use crate::ids::QuestionId;
use crate::state::AppState;

pub async fn answer(
    State(app): State<AppState>,
    Path(question): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let question: QuestionId = question.parse().map_err(|_| AppError::NotFound)?;
    let answer = String::from_utf8(body.to_vec())
        .map_err(|_| AppError::TypeError("answer body must be utf-8"))?;
    app.machine.answer_question(question, answer).await?;
    Ok(StatusCode::OK)
}
