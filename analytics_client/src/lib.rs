//! Client side of the crowd analytics backend: configuration, media intake, the upload
//! cycle, account calls, the persisted session and the analysis screen state.

pub mod account;
pub mod blob;
pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod workspace;

pub use account::{AccountClient, ResetTicket};
pub use client::{AnalysisClient, AnalysisJob, AnalysisResponse, ProgressFn};
pub use config::ClientConfig;
pub use error::{AccountError, AnalysisError, MediaError};
pub use session::{SessionContext, SessionStore};
pub use workspace::{AnalysisPhase, Workspace};
