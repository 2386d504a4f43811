//! NASA Common Metadata Repository (CMR) collection search.
//!
//! The `get_collections` tool forwards a keyword to the CMR collections
//! endpoint and reshapes each entry into a [`DatasetSummary`].

mod client;
mod error;
mod types;

pub use client::CmrClient;
pub use error::CmrError;
pub use types::{CmrEntry, CmrFeed, CmrSearchResponse, DatasetSummary};
