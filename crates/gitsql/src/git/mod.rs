//! Git access: identifiers, discovery, resolution and handle caching.

pub mod cache;
pub mod discovery;
pub mod history;
pub mod pathspec;
pub mod repository;
pub mod resolver;
pub mod uri;

pub use cache::{Git2Opener, RepoSlot, RepositoryOpener, SharedRepoCache};
pub use repository::GitRepo;
pub use resolver::{ContextResolver, ResolvedContext, RevisionObject};
