//! Cadence Core
//!
//! Platform-agnostic types, collaborator traits, and error handling shared by
//! every Cadence crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackId`, `TrackMetadata`, `ArtworkData`
//! - **Collaborator Traits**: `MetadataLookup`
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{TrackId, TrackMetadata};
//!
//! let id = TrackId::new(42);
//! let metadata = TrackMetadata::empty(id);
//! assert!(metadata.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use traits::MetadataLookup;
pub use types::{ArtworkData, TrackId, TrackMetadata};
