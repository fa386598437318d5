//! # Folio Limiter
//!
//! Bounds the number of concurrent backing-store connections.
//!
//! Requests beyond capacity wait in a FIFO queue and fail with
//! [`FolioError::ConnectionTimeout`](folio_core::FolioError::ConnectionTimeout)
//! if no slot frees up within the acquire timeout.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_limiter::{ConnectionLimiter, LimiterConfig};
//!
//! let limiter = Arc::new(ConnectionLimiter::new(LimiterConfig::default())?);
//!
//! // Guard releases the slot on every exit path
//! let _slot = limiter.slot().await?;
//! let rows = store.list_projects().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod limiter;

pub use limiter::{ConnectionLimiter, ConnectionSlot, LimiterConfig, LimiterStatus};
