//! Streaming chat-completion client for the Spark websocket API.
//!
//! One [`StreamSession`] owns a multi-turn conversation: it trims the
//! transcript under the language budget, signs the connection URL, opens a
//! websocket per exchange, reassembles the streamed answer fragments, and
//! keeps token-usage accounting across exchanges.

pub mod assembler;
pub mod auth;
pub mod context;
pub mod errcode;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod usage;

pub use assembler::{AssembledAnswer, AssemblerState, ChunkAssembler};
pub use context::ContextWindow;
pub use error::SparkError;
pub use protocol::{Fragment, FragmentStatus};
pub use session::StreamSession;
pub use transport::TransportEvent;
pub use usage::{UsageAccountant, UsageRecord};
