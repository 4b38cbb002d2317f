/// Which stream a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout = 1,
    Stderr = 2,
}

/// Receives streaming events from a running script.
///
/// If no observer is given to [`crate::Runner::run`], streaming is
/// suppressed and only the aggregated output is returned at the end.
#[async_trait::async_trait]
pub trait Observer: Send + Sync {
    async fn on_output(&self, channel: Channel, data: Vec<u8>);

    async fn on_exit(&self, code: i32);
}
