#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("not found")]
    NotFound,

    #[error("subprocess io error")]
    Io(#[from] std::io::Error),
}
