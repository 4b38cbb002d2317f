/// Errors surfaced by a [`crate::Store`].
///
/// `NotFound` and `Crypt` are distinct per the data-model invariants: a wrong
/// passphrase must never be mistaken for a missing key.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("crypt error")]
    Crypt(#[source] anyhow::Error),

    #[error("store backend error")]
    Backend(#[from] sqlx::Error),
}
