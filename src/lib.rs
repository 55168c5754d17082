//! # emberkv
//!
//! An embedded, Bitcask-style key-value store with:
//! - A single append-only log holding every write
//! - An in-memory key directory for O(1) lookups
//! - CRC32-checked records
//! - Group-commit crash recovery that tolerates a torn tail
//! - Concurrent get/put/delete from many threads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Shell / Embedding App                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │              (get / put / delete / close)                    │
//! └──────┬───────────────────────┬──────────────────────┬───────┘
//!        │                       │                      │
//!        ▼                       ▼                      ▼
//!  ┌───────────┐          ┌─────────────┐        ┌─────────────┐
//!  │  Record   │          │   LogFile   │        │   KeyDir    │
//!  │  (codec)  │          │  (Mutex)    │        │  (DashMap)  │
//!  └───────────┘          └──────┬──────┘        └──────▲──────┘
//!                                │ startup              │
//!                                ▼                      │
//!                         ┌─────────────┐               │
//!                         │  Recovery   │───────────────┘
//!                         └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod log;
pub mod keydir;
pub mod recovery;
pub mod engine;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
