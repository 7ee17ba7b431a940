//! PromptStore - content-addressed prompt artifact storage
//!
//! Stores rendered prompt artifacts under deterministic keys derived from
//! their content hash. Writes are immutable: a key is only ever written once,
//! and identical keys always carry identical content, so concurrent duplicate
//! uploads are safe without locking.
//!
//! Read access goes through short-lived signed URLs issued by [`UrlSigner`].

mod signed;
mod store;

pub use signed::{SignedUrl, SignerError, UrlSigner, DEFAULT_URL_TTL_SECS};
pub use store::{ArtifactKey, ArtifactStore, FsArtifactStore, StoreError};
