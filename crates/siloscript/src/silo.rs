use std::sync::Arc;

use futures::future::BoxFuture;
use siloscript_store::Store;

use crate::error::AppError;

/// A question raised by a [`Silo`] when a key is missing and must be
/// answered by a live human.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub options: Option<Vec<String>>,
}

/// A one-method capability: accept a question, produce an eventual answer.
/// The only piece of dynamic behavior that crosses from the `Machine` into
/// a `Silo`.
pub type PromptFn = Arc<dyn Fn(PromptRequest) -> BoxFuture<'static, Result<String, AppError>> + Send + Sync>;

/// A capability object that bounds read/write/prompt access to one
/// `(user, silo-name)` pair.
///
/// The `Silo` is the policy point for read-through-with-human-fallback; it
/// does not itself enforce the reserved-key-prefix invariant — that is a
/// `Machine`-level contract applied to script-visible operations.
pub struct Silo<S> {
    store: Arc<S>,
    user: String,
    silo_name: String,
    prompt: Option<PromptFn>,
}

impl<S: Store> Silo<S> {
    pub fn new(store: Arc<S>, user: String, silo_name: String, prompt: Option<PromptFn>) -> Self {
        Self {
            store,
            user,
            silo_name,
            prompt,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn silo_name(&self) -> &str {
        &self.silo_name
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// First tries the store; on a miss, prompts (if a callback and prompt
    /// text are both given) and optionally caches the answer.
    pub async fn get(
        &self,
        key: &str,
        prompt: Option<String>,
        save: bool,
        options: Option<Vec<String>>,
    ) -> Result<Vec<u8>, AppError> {
        if !save && prompt.is_none() {
            return Err(AppError::TypeError("save=false requires a prompt"));
        }

        match self.store.get(&self.user, &self.silo_name, key).await {
            Ok(value) => Ok(value),
            Err(siloscript_store::StoreError::NotFound) => {
                let (prompt_fn, prompt_text) = match (&self.prompt, prompt) {
                    (Some(prompt_fn), Some(prompt_text)) => (prompt_fn, prompt_text),
                    _ => return Err(AppError::NotFound),
                };

                let answer = prompt_fn(PromptRequest {
                    prompt: prompt_text,
                    options,
                })
                .await?;

                if save {
                    self.store
                        .put(&self.user, &self.silo_name, key, answer.clone().into_bytes())
                        .await?;
                }

                Ok(answer.into_bytes())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), AppError> {
        self.store
            .put(&self.user, &self.silo_name, key, value)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siloscript_store::MemoryStore;

    fn answering(answer: &'static str) -> PromptFn {
        Arc::new(move |_req| Box::pin(async move { Ok(answer.to_string()) }))
    }

    #[tokio::test]
    async fn cached_read_skips_prompt() {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new(store, "jim".into(), "s".into(), Some(answering("should not be used")));
        silo.put("k", b"V".to_vec()).await.unwrap();
        assert_eq!(silo.get("k", None, true, None).await.unwrap(), b"V");
    }

    #[tokio::test]
    async fn prompt_then_cache() {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new(store, "jim".into(), "s".into(), Some(answering("42")));

        assert_eq!(
            silo.get("age", Some("age?".into()), true, None).await.unwrap(),
            b"42"
        );
        // Second call needs no prompt: served from the store.
        assert_eq!(silo.get("age", None, true, None).await.unwrap(), b"42");
    }

    #[tokio::test]
    async fn no_save_prompt_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new(store, "jim".into(), "s".into(), Some(answering("42")));

        assert_eq!(
            silo.get("age", Some("age?".into()), false, None).await.unwrap(),
            b"42"
        );
        assert!(matches!(
            silo.get("age", None, true, None).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn save_false_without_prompt_is_a_type_error() {
        let store = Arc::new(MemoryStore::new());
        let silo: Silo<MemoryStore> = Silo::new(store, "jim".into(), "s".into(), None);
        assert!(matches!(
            silo.get("age", None, false, None).await,
            Err(AppError::TypeError(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_without_prompt_callback_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let silo: Silo<MemoryStore> = Silo::new(store, "jim".into(), "s".into(), None);
        assert!(matches!(
            silo.get("missing", Some("p?".into()), true, None).await,
            Err(AppError::NotFound)
        ));
    }
}
