//! Pier Artifacts - Local cache of pier executables
//!
//! Pier ships as a platform-specific tarball plus one chain client plugin per
//! appchain family. This crate keeps both under
//! `<repo>/bin/pier_<os>_<version>/` and fetches them on demand.
//!
//! ## Guarantees
//!
//! - An artifact counts as present only when its completion marker exists
//! - Concurrent invocations serialize downloads on a per-directory lock
//! - A present artifact never triggers network access

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod fetch;
pub mod lock;
pub mod post;
pub mod store;
pub mod urls;

pub use error::{ArtifactError, Result};
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use lock::DirLock;
pub use store::{ArtifactKind, ArtifactLocation, ArtifactStore, FsArtifactStore};
pub use urls::ArtifactUrls;
