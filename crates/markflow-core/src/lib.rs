//! # Markflow Core
//!
//! Editing commands, markdown-style shortcuts and state coordination.
//!
//! ## Architecture Overview
//!
//! ```text
//! keystroke
//!    │
//!    ▼
//! ┌────────────────┐  matched   ┌───────────────────┐
//! │ TriggerEngine  │──────────▶│ command::*        │
//! └────────────────┘            │ (pure functions)  │
//!    │ declined                 └─────────┬─────────┘
//!    ▼                                    ▼
//! ┌──────────────────────────────────────────────────┐
//! │ Editor (owns the one current Arc<Snapshot>)      │──▶ EventBus
//! └──────────────────────────────────────────────────┘
//!    │ save / restore
//!    ▼
//! ┌────────────────┐
//! │ Persistence<S> │──▶ Storage (file, memory, ...)
//! └────────────────┘
//! ```
//!
//! Everything except `Editor` is a pure function over snapshots. The
//! editor is the only place where "the current state" exists.

pub mod command;
pub mod config;
pub mod editor;
pub mod event;
pub mod persistence;
pub mod style;
pub mod trigger;

pub use command::Edit;
pub use config::Config;
pub use editor::{Editor, InputResult};
pub use event::{EditorEvent, EventBus};
pub use persistence::{FileStorage, MemoryStorage, Persistence, RawDocument, Storage};
pub use style::StyleAttributes;
pub use trigger::{Outcome, Transform, Trigger, TriggerEngine};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Model error: {0}")]
    Model(#[from] markflow_model::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
