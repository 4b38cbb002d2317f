use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Form;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use siloscript_runner::{Channel as OutputChannel, Observer};

use crate::channel::{Question, Receiver};
use crate::error::AppError;
use crate::ids::ChannelId;
use crate::machine::{Machine, ReceiverToken};
use crate::state::{AppState, AppStore};

pub async fn open_channel(State(app): State<AppState>) -> String {
    app.machine.channel_open().await.to_string()
}

/// Bridges a [`Receiver`] callback (synchronous, fire-and-forget) onto an
/// unbounded channel an async stream can poll.
struct SseReceiver {
    tx: mpsc::UnboundedSender<Question>,
}

impl Receiver for SseReceiver {
    fn notify(&self, question: Question) {
        let _ = self.tx.send(question);
    }
}

/// Detaches its receiver from the Machine when the client disconnects and
/// axum drops the response stream.
struct QuestionStream {
    inner: UnboundedReceiverStream<Question>,
    machine: Arc<Machine<AppStore>>,
    token: Option<ReceiverToken>,
}

impl Stream for QuestionStream {
    type Item = Question;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for QuestionStream {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            let machine = self.machine.clone();
            tokio::spawn(async move { machine.channel_disconnect(token).await });
        }
    }
}

pub async fn channel_events(
    State(app): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let channel: ChannelId = channel.parse().map_err(|_| AppError::NotFound)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let receiver = Arc::new(SseReceiver { tx });
    let token = app.machine.channel_connect(channel, receiver).await?;

    let opening = stream::once(async move {
        Ok(Event::default().event("channel_key").data(channel.to_string()))
    });

    let questions = QuestionStream {
        inner: UnboundedReceiverStream::new(rx),
        machine: app.machine.clone(),
        token: Some(token),
    }
    .map(|question| Ok(Event::default().event("question").json_data(&question).expect("Question always serializes")));

    Ok(Sse::new(opening.chain(questions)).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
pub struct RunForm {
    script: String,
    #[serde(default)]
    channel_key: String,
    #[serde(default)]
    args: String,
}

/// Logs subprocess output as it streams, matching the ambient structured
/// logging the rest of the service uses instead of printing to stdout.
struct TracingObserver;

#[async_trait::async_trait]
impl Observer for TracingObserver {
    async fn on_output(&self, channel: OutputChannel, data: Vec<u8>) {
        tracing::debug!(channel = ?channel, bytes = data.len(), "script output");
    }

    async fn on_exit(&self, code: i32) {
        tracing::info!(exit_code = code, "script exited");
    }
}

pub async fn run(
    State(app): State<AppState>,
    Path(user): Path<String>,
    Form(form): Form<RunForm>,
) -> Result<Bytes, AppError> {
    let channel = if form.channel_key.is_empty() {
        None
    } else {
        Some(form.channel_key.parse::<ChannelId>().map_err(|_| AppError::NotFound)?)
    };

    let args: Vec<String> = if form.args.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&form.args)?
    };

    let output = app
        .machine
        .run(
            &app.runner,
            user,
            form.script,
            args,
            std::collections::HashMap::new(),
            channel,
            Some(Arc::new(TracingObserver)),
        )
        .await?;

    Ok(Bytes::from(output.stdout))
}
