//! The Node protocol — one peer within a file sharing network.

use crate::error::NodeError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Requirements on the opaque reference a network hands back once content
/// is seeded (a content id, a torrent descriptor, ...).
///
/// The engine never looks inside a handle: it only clones it, compares it,
/// and prints it. Handles are produced by exactly one [`Node::genseed`] call
/// per experiment run and consumed by every leech and remove call of that
/// run; their lifetime is one repetition.
pub trait NetworkHandle: Clone + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> NetworkHandle for T where T: Clone + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// Requirements on the caller-supplied naming information needed to seed a
/// dataset before a network handle exists (e.g. a dataset name). Its string
/// form doubles as the correlation id on request events.
pub trait InitialMetadata: Clone + fmt::Display + Send + Sync + 'static {}

impl<T> InitialMetadata for T where T: Clone + fmt::Display + Send + Sync + 'static {}

/// A `Node` is a peer within a file sharing network.
///
/// One implementing type exists per storage backend, injected at
/// construction time; the orchestration engine depends only on this trait.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    /// The network's content reference type.
    type Handle: NetworkHandle;
    /// Backend-specific seeding metadata.
    type Meta: InitialMetadata;
    /// The backend's in-flight download reference.
    type Download: DownloadHandle + 'static;

    /// A network-wide name for this node.
    fn name(&self) -> &str;

    /// Generate a random file of `size` bytes from `seed` and make this node
    /// a seeder for it.
    ///
    /// Identical `(size, seed, meta)` triples must produce identical
    /// handles, so repetitions of an experiment are comparable.
    async fn genseed(
        &self,
        size: u64,
        seed: u64,
        meta: &Self::Meta,
    ) -> Result<Self::Handle, NodeError>;

    /// Make this node a leecher for the content behind `handle`. The
    /// returned download can be awaited for completion.
    async fn leech(&self, handle: &Self::Handle) -> Result<Self::Download, NodeError>;

    /// Remove the content behind `handle` from this node — seeders stop
    /// serving it, leechers stop downloading it, and local storage is
    /// reclaimed.
    ///
    /// Returns `false`, not an error, when there was nothing to remove.
    async fn remove(&self, handle: &Self::Handle) -> Result<bool, NodeError>;
}

/// A reference to one in-flight download on one node.
///
/// Created by [`Node::leech`]; becomes invalid once the owning experiment
/// tears down.
#[async_trait]
pub trait DownloadHandle: Send + Sync {
    /// Name of the node that initiated the download. This is the only part
    /// of the node the engine consumes from a download, so the
    /// back-reference is narrowed to it.
    fn node_name(&self) -> &str;

    /// Block until the download completes or `deadline` elapses.
    /// `None` means no deadline.
    ///
    /// Expiry is reported as `Ok(false)`, never as an error.
    async fn await_for_completion(&self, deadline: Option<Duration>) -> Result<bool, NodeError>;
}
