use serde::Serialize;

use crate::ids::QuestionId;

/// A one-shot prompt with a unique id, destined for a human operator.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// A receiver attached to a channel. Receiving is synchronous and
/// non-blocking by contract: implementations forward the question onward
/// (e.g. into an SSE response body's queue) without awaiting anything here.
pub trait Receiver: Send + Sync {
    fn notify(&self, question: Question);
}
