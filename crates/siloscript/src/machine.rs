use std::collections::HashMap;
use std::sync::Arc;

use sha1::{Digest, Sha1};
use tokio::sync::{oneshot, Mutex};

use siloscript_runner::{Observer, Runner, RunnerError, SiloWrappingRunner};
use siloscript_store::Store;

use crate::channel::{Question, Receiver};
use crate::error::AppError;
use crate::ids::{ChannelId, QuestionId, SiloHandle};
use crate::silo::{PromptRequest, Silo};

/// Reserved key under which the per-silo token map is stored. No
/// script-visible key may start with `:`; this is the one exception, and it
/// is never written directly by a script.
const TOKENS_KEY: &str = ":tokens";

struct QuestionRecord {
    question: Question,
    channel: Option<ChannelId>,
    answer_tx: Option<oneshot::Sender<String>>,
}

#[derive(Default)]
struct ChannelState {
    receivers: Vec<(u64, Arc<dyn Receiver>)>,
    next_receiver_id: u64,
    /// Questions posted to this channel, oldest first, not yet answered.
    /// Used only to replay in order to newly attached receivers.
    pending: Vec<QuestionId>,
    close_waiters: Vec<oneshot::Sender<()>>,
}

struct MachineState<S> {
    channels: HashMap<ChannelId, ChannelState>,
    /// Global so that a question remains answerable by id even after its
    /// channel has been closed (spec: closing a channel does not cancel
    /// in-flight questions on it).
    questions: HashMap<QuestionId, QuestionRecord>,
    silos: HashMap<SiloHandle, (Arc<Silo<S>>, Option<ChannelId>)>,
}

impl<S> Default for MachineState<S> {
    fn default() -> Self {
        Self {
            channels: HashMap::new(),
            questions: HashMap::new(),
            silos: HashMap::new(),
        }
    }
}

/// Opaque token returned by [`Machine::channel_connect`], needed to detach
/// the same receiver later via [`Machine::channel_disconnect`].
#[derive(Debug, Clone, Copy)]
pub struct ReceiverToken {
    channel: ChannelId,
    id: u64,
}

/// Central coordinator: brokers channels, questions, silos, and runs. All
/// coordination state lives here and is not durable — the `Store` is the
/// single source of durable truth.
pub struct Machine<S> {
    store: Arc<S>,
    state: Mutex<MachineState<S>>,
    token_salt: String,
}

impl<S: Store + 'static> Machine<S> {
    pub fn new(store: Arc<S>, token_salt: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            store,
            state: Mutex::new(MachineState::default()),
            token_salt: token_salt.into(),
        })
    }

    // ---- channels ------------------------------------------------------

    pub async fn channel_open(&self) -> ChannelId {
        let id = ChannelId::new();
        self.state.lock().await.channels.insert(id, ChannelState::default());
        id
    }

    pub async fn channel_connect(
        &self,
        channel: ChannelId,
        receiver: Arc<dyn Receiver>,
    ) -> Result<ReceiverToken, AppError> {
        let mut state = self.state.lock().await;

        let pending_ids = state
            .channels
            .get(&channel)
            .ok_or(AppError::NotFound)?
            .pending
            .clone();

        for id in &pending_ids {
            if let Some(record) = state.questions.get(id) {
                receiver.notify(record.question.clone());
            }
        }

        let ch = state.channels.get_mut(&channel).expect("checked above");
        let id = ch.next_receiver_id;
        ch.next_receiver_id += 1;
        ch.receivers.push((id, receiver));

        Ok(ReceiverToken { channel, id })
    }

    pub async fn channel_disconnect(&self, token: ReceiverToken) {
        let mut state = self.state.lock().await;
        if let Some(ch) = state.channels.get_mut(&token.channel) {
            ch.receivers.retain(|(id, _)| *id != token.id);
        }
    }

    pub async fn channel_notify_closed(&self, channel: ChannelId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().await;
        match state.channels.get_mut(&channel) {
            Some(ch) => ch.close_waiters.push(tx),
            None => {
                let _ = tx.send(());
            }
        }
        rx
    }

    pub async fn channel_close(&self, channel: ChannelId) {
        let mut state = self.state.lock().await;
        if let Some(ch) = state.channels.remove(&channel) {
            for waiter in ch.close_waiters {
                let _ = waiter.send(());
            }
        }
    }

    // ---- questions -------------------------------------------------------

    pub async fn channel_prompt(
        &self,
        channel: ChannelId,
        prompt: String,
        options: Option<Vec<String>>,
    ) -> Result<oneshot::Receiver<String>, AppError> {
        let (tx, rx) = oneshot::channel();
        let question = Question {
            id: QuestionId::new(),
            prompt,
            options,
        };

        let mut state = self.state.lock().await;
        let ch = state.channels.get_mut(&channel).ok_or(AppError::NotFound)?;
        ch.pending.push(question.id);
        for (_, receiver) in &ch.receivers {
            receiver.notify(question.clone());
        }

        state.questions.insert(
            question.id,
            QuestionRecord {
                question,
                channel: Some(channel),
                answer_tx: Some(tx),
            },
        );

        Ok(rx)
    }

    pub async fn answer_question(&self, question: QuestionId, answer: String) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let record = state.questions.get_mut(&question).ok_or(AppError::NotFound)?;
        let tx = record.answer_tx.take().ok_or(AppError::NotFound)?;

        if let Some(channel) = record.channel {
            if let Some(ch) = state.channels.get_mut(&channel) {
                ch.pending.retain(|id| *id != question);
            }
        }

        state.questions.remove(&question);
        let _ = tx.send(answer);
        Ok(())
    }

    // ---- silos -------------------------------------------------------

    pub async fn make_silo(
        self: &Arc<Self>,
        user: String,
        silo_name: String,
        channel: Option<ChannelId>,
    ) -> Result<SiloHandle, AppError> {
        if let Some(channel) = channel {
            if !self.state.lock().await.channels.contains_key(&channel) {
                return Err(AppError::NotFound);
            }
        }

        let prompt = channel.map(|channel| {
            let machine = self.clone();
            Arc::new(move |req: PromptRequest| {
                let machine = machine.clone();
                Box::pin(async move {
                    let rx = machine.channel_prompt(channel, req.prompt, req.options).await?;
                    rx.await.map_err(|_| AppError::NotFound)
                }) as futures::future::BoxFuture<'static, Result<String, AppError>>
            }) as crate::silo::PromptFn
        });

        let handle = SiloHandle::new();
        let silo = Arc::new(Silo::new(self.store.clone(), user, silo_name, prompt));
        self.state.lock().await.silos.insert(handle, (silo, channel));
        Ok(handle)
    }

    pub async fn close_silo(&self, handle: SiloHandle) {
        let channel = self
            .state
            .lock()
            .await
            .silos
            .remove(&handle)
            .and_then(|(_, channel)| channel);

        if let Some(channel) = channel {
            self.channel_close(channel).await;
        }
    }

    /// Clones the silo handle's `Arc` out from under the lock so that the
    /// (possibly long-lived, human-round-trip) data operation itself never
    /// holds the Machine's single serialization point.
    async fn silo(&self, handle: SiloHandle) -> Result<Arc<Silo<S>>, AppError> {
        self.state
            .lock()
            .await
            .silos
            .get(&handle)
            .map(|(silo, _)| silo.clone())
            .ok_or(AppError::NotFound)
    }

    // ---- data ----------------------------------------------------------

    pub async fn data_get(
        &self,
        handle: SiloHandle,
        key: &str,
        prompt: Option<String>,
        save: bool,
        options: Option<Vec<String>>,
    ) -> Result<Vec<u8>, AppError> {
        reject_reserved_key(key)?;
        self.silo(handle).await?.get(key, prompt, save, options).await
    }

    pub async fn data_put(&self, handle: SiloHandle, key: &str, value: Vec<u8>) -> Result<(), AppError> {
        reject_reserved_key(key)?;
        self.silo(handle).await?.put(key, value).await
    }

    pub async fn data_create_token(&self, handle: SiloHandle, plaintext: &[u8]) -> Result<String, AppError> {
        let silo = self.silo(handle).await?;
        let store = silo.store();
        let user = silo.user();
        let silo_name = silo.silo_name();

        let mut salted = plaintext.to_vec();
        salted.extend_from_slice(self.token_salt.as_bytes());
        let digest = hex::encode(Sha1::digest(&salted));

        let mut tokens: HashMap<String, String> = match store.get(user, silo_name, TOKENS_KEY).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(siloscript_store::StoreError::NotFound) => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(token) = tokens.get(&digest) {
            return Ok(token.clone());
        }

        let token = uuid::Uuid::new_v4().to_string();
        tokens.insert(digest, token.clone());
        let bytes = serde_json::to_vec(&tokens)?;
        store.put(user, silo_name, TOKENS_KEY, bytes).await?;
        Ok(token)
    }

    // ---- run -------------------------------------------------------------

    pub async fn run<R: Runner>(
        self: &Arc<Self>,
        runner: &SiloWrappingRunner<R>,
        user: String,
        script: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        channel: Option<ChannelId>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<siloscript_runner::RunOutput, AppError> {
        let handle = self.make_silo(user, script.clone(), channel).await?;

        let result = runner
            .run_with_silo(&handle.to_string(), &script, &args, env, observer)
            .await;

        self.close_silo(handle).await;

        result.map_err(|e| match e {
            RunnerError::NotFound => AppError::NotFound,
            other => other.into(),
        })
    }
}

fn reject_reserved_key(key: &str) -> Result<(), AppError> {
    if key.starts_with(':') {
        return Err(AppError::InvalidKey);
    }
    Ok(())
}
