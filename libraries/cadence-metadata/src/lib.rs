//! Cadence Metadata
//!
//! `MetadataLookup` backed by audio file tags. Reads title, artist, album
//! and the front-cover picture with `lofty`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod lookup;

pub use error::{MetadataError, Result};
pub use lookup::LoftyMetadataLookup;
