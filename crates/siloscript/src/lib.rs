//! siloscript: a coordinator that lets untrusted scripts ask for
//! secret/user-specific data without that data ever living in the script's
//! source, falling back to a live human when the data isn't on file yet.

pub mod channel;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod cors;
pub mod error;
pub mod http;
pub mod ids;
pub mod machine;
pub mod shutdown;
pub mod silo;
pub mod startup;
pub mod state;

pub use channel::{Question, Receiver};
pub use error::AppError;
pub use ids::{ChannelId, QuestionId, SiloHandle};
pub use machine::{Machine, ReceiverToken};
pub use silo::{PromptFn, PromptRequest, Silo};
