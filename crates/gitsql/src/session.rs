//! Per-connection state shared by every registered table function.

use crate::config::Config;
use crate::git::{ContextResolver, Git2Opener, SharedRepoCache};
use crate::scan::Interrupt;
use std::sync::Arc;

/// Configuration, the identifier resolver, the shared repository cache and
/// the cancellation flag for one engine.
pub struct Session {
    config: Config,
    resolver: ContextResolver,
    repos: Arc<SharedRepoCache<Git2Opener>>,
    interrupt: Interrupt,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            resolver: ContextResolver::new(),
            repos: Arc::new(SharedRepoCache::new(Git2Opener)),
            interrupt: Interrupt::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    pub fn repos(&self) -> &Arc<SharedRepoCache<Git2Opener>> {
        &self.repos
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("cached_repositories", &self.repos.len())
            .field("interrupted", &self.interrupt.is_triggered())
            .finish()
    }
}
