//! The host-facing table function lifecycle: bind, init, pull.

use crate::config::Config;
use crate::error::{GitsqlError, Result};
use crate::git::uri;
use crate::git::{ContextResolver, Git2Opener, GitRepo, RepositoryOpener, ResolvedContext, SharedRepoCache};
use crate::providers::{ColumnDef, TableOperation};
use crate::scan::{CallMode, InputRow, Interrupt, LateralScan, PullStatus, Row, ScanOptions, SingleScan};
use crate::session::Session;
use std::borrow::Borrow;
use std::sync::Arc;

/// Arguments supplied when a table function is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindArgs {
    pub identifier: Option<String>,
    pub revision: Option<String>,
    pub options: ScanOptions,
}

/// Schema and bound state for one invocation.
#[derive(Debug, Clone)]
pub struct Bound {
    pub columns: &'static [ColumnDef],
    pub mode: CallMode,
    context: Option<ResolvedContext>,
    fallback_revision: String,
    options: ScanOptions,
}

/// State shared by every local scan of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalState {
    pub max_threads: usize,
    pub batch_size: usize,
}

/// Per-thread scan state.
pub enum LocalState<O: RepositoryOpener> {
    Single(SingleScan<O>),
    Lateral(LateralScan<O>),
}

/// One registered table function: an operation in a call mode.
pub struct TableFunction<O: RepositoryOpener = Git2Opener> {
    operation: Arc<dyn TableOperation>,
    mode: CallMode,
    resolver: ContextResolver,
    opener: O,
    repos: Arc<SharedRepoCache<O>>,
    config: Config,
    interrupt: Interrupt,
}

impl TableFunction<Git2Opener> {
    /// Builds the function against a session's resolver, cache and
    /// interrupt flag.
    pub fn for_session(operation: Arc<dyn TableOperation>, mode: CallMode, session: &Session) -> Self {
        Self {
            operation,
            mode,
            resolver: session.resolver().clone(),
            opener: Git2Opener,
            repos: Arc::clone(session.repos()),
            config: session.config().clone(),
            interrupt: session.interrupt().clone(),
        }
    }
}

impl<O> TableFunction<O>
where
    O: RepositoryOpener + Clone,
    O::Handle: Borrow<GitRepo>,
{
    pub fn new(
        operation: Arc<dyn TableOperation>,
        mode: CallMode,
        opener: O,
        repos: Arc<SharedRepoCache<O>>,
        config: Config,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            operation,
            mode,
            resolver: ContextResolver::new(),
            opener,
            repos,
            config,
            interrupt,
        }
    }

    /// Registered name, e.g. `git_log` or `git_log_each`.
    pub fn name(&self) -> String {
        self.mode.function_name(self.operation.name())
    }

    pub fn operation(&self) -> &dyn TableOperation {
        self.operation.as_ref()
    }

    pub fn mode(&self) -> CallMode {
        self.mode
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Binds the call arguments.
    ///
    /// Single-target calls resolve their identifier here, so an unknown
    /// repository or revision fails before any row is produced. Lateral
    /// calls only record the fallback revision.
    pub fn bind(&self, args: BindArgs) -> Result<Bound> {
        let explicit_revision = args.revision.filter(|r| !r.is_empty());
        let fallback_revision = explicit_revision
            .clone()
            .unwrap_or_else(|| self.config.default_revision.clone());

        let mut options = args.options;
        if options.max_bytes.is_none() {
            options.max_bytes = self.config.max_bytes;
        }

        let context = match self.mode {
            CallMode::Lateral => None,
            CallMode::Single => {
                let identifier = args
                    .identifier
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| ".".to_string());
                let context = self
                    .resolve_single(&identifier, explicit_revision.as_deref(), &fallback_revision)
                    .map_err(|e| e.in_operation(self.operation.name()))?;
                Some(context)
            }
        };

        Ok(Bound {
            columns: self.operation.columns(),
            mode: self.mode,
            context,
            fallback_revision,
            options,
        })
    }

    /// Scans keep a repository handle and an input cursor, so one
    /// invocation runs on one thread.
    pub fn init_global(&self, _bound: &Bound) -> GlobalState {
        GlobalState {
            max_threads: 1,
            batch_size: self.config.batch_size.max(1),
        }
    }

    pub fn init_local(&self, bound: &Bound) -> Result<LocalState<O>> {
        match (&bound.context, self.mode) {
            (Some(context), CallMode::Single) => Ok(LocalState::Single(SingleScan::new(
                Arc::clone(&self.operation),
                context.clone(),
                bound.options.clone(),
                self.config.batch_size,
                self.interrupt.clone(),
                Arc::clone(&self.repos),
            ))),
            (None, CallMode::Lateral) => Ok(LocalState::Lateral(LateralScan::new(
                Arc::clone(&self.operation),
                self.resolver.clone(),
                self.opener.clone(),
                bound.fallback_revision.clone(),
                bound.options.clone(),
                self.config.batch_size,
                self.interrupt.clone(),
            ))),
            _ => Err(GitsqlError::InvalidInput(format!(
                "{}: bound state does not match call mode",
                self.name()
            ))),
        }
    }

    /// Advances a local scan. Single-target scans ignore `input`.
    pub fn pull(&self, local: &mut LocalState<O>, input: &[InputRow], out: &mut Vec<Row>) -> Result<PullStatus> {
        match local {
            LocalState::Single(scan) => scan.pull(out),
            LocalState::Lateral(scan) => scan.pull(input, out),
        }
    }

    fn resolve_single(
        &self,
        identifier: &str,
        explicit_revision: Option<&str>,
        fallback_revision: &str,
    ) -> Result<ResolvedContext> {
        if let Some(argument) = explicit_revision {
            if uri::is_git_uri(identifier) {
                if let Some(embedded) = uri::split(identifier)?.revision {
                    if embedded != argument {
                        return Err(GitsqlError::InvalidInput(format!(
                            "conflicting revision: identifier names '{embedded}' but '{argument}' was given"
                        )));
                    }
                }
            }
        }
        self.resolver.resolve(identifier, fallback_revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::cache::testing::CountingOpener;
    use crate::providers::testing::{commit_file, empty_repo};
    use crate::providers::{all_operations, LogOperation};

    fn function(mode: CallMode, opener: &CountingOpener) -> TableFunction<CountingOpener> {
        TableFunction::new(
            Arc::new(LogOperation),
            mode,
            opener.clone(),
            Arc::new(SharedRepoCache::new(opener.clone())),
            Config::default(),
            Interrupt::new(),
        )
    }

    #[test]
    fn global_state_is_single_threaded() {
        let opener = CountingOpener::default();
        let f = function(CallMode::Lateral, &opener);
        let bound = f.bind(BindArgs::default()).unwrap();
        let global = f.init_global(&bound);
        assert_eq!(global.max_threads, 1);
        assert_eq!(global.batch_size, Config::default().batch_size);
    }

    fn run(f: &TableFunction<CountingOpener>, args: BindArgs, input: &[InputRow]) -> Result<Vec<Row>> {
        let bound = f.bind(args)?;
        let mut local = f.init_local(&bound)?;
        let mut out = Vec::new();
        loop {
            match f.pull(&mut local, input, &mut out)? {
                PullStatus::MoreOutput => continue,
                PullStatus::NeedMoreInput | PullStatus::Done => return Ok(out),
            }
        }
    }

    fn args(identifier: &str, revision: Option<&str>) -> BindArgs {
        BindArgs {
            identifier: Some(identifier.to_string()),
            revision: revision.map(str::to_string),
            options: ScanOptions::default(),
        }
    }

    #[test]
    fn unresolvable_revision_message_in_every_operation() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"a\n", "first");
        let opener = CountingOpener::default();
        let id = repo.path().display().to_string();

        for op in all_operations() {
            let f = TableFunction::new(
                op.clone(),
                CallMode::Single,
                opener.clone(),
                Arc::new(SharedRepoCache::new(opener.clone())),
                Config::default(),
                Interrupt::new(),
            );
            let err = f.bind(args(&id, Some("not-a-ref"))).unwrap_err();
            assert_eq!(err.to_string(), format!("{}: unable to parse OID", op.name()));
        }
    }

    #[test]
    fn single_mode_reuses_shared_handle() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"a\n", "first");
        let opener = CountingOpener::default();
        let f = function(CallMode::Single, &opener);
        let id = repo.path().display().to_string();

        assert_eq!(run(&f, args(&id, None), &[]).unwrap().len(), 1);
        assert_eq!(run(&f, args(&id, Some("main")), &[]).unwrap().len(), 1);
        assert_eq!(opener.opens(), 1);
    }

    #[test]
    fn single_mode_rejects_conflicting_revisions() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"a\n", "first");
        let opener = CountingOpener::default();
        let f = function(CallMode::Single, &opener);
        let uri = format!("git://{}@main", repo.path().display());

        let err = f.bind(args(&uri, Some("HEAD"))).unwrap_err();
        assert!(err.to_string().contains("conflicting revision"));
        assert!(f.bind(args(&uri, Some("main"))).is_ok());
        assert!(f.bind(args(&uri, None)).is_ok());
    }

    #[test]
    fn single_mode_propagates_missing_repository() {
        let dir = tempfile::TempDir::new().unwrap();
        let opener = CountingOpener::default();
        let f = function(CallMode::Single, &opener);

        let err = f
            .bind(args(&dir.path().join("x").display().to_string(), None))
            .unwrap_err();
        assert!(err.to_string().starts_with("git_log: no repository found"));
    }

    #[test]
    fn lateral_mode_skips_and_continues() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"a\n", "first");
        commit_file(repo.path(), "b.txt", b"b\n", "second");
        let missing = tempfile::TempDir::new().unwrap();
        let opener = CountingOpener::default();
        let f = function(CallMode::Lateral, &opener);

        let valid = format!("git://{}@HEAD", repo.path().display());
        let input = [
            InputRow::new(valid.clone()),
            InputRow::new(""),
            InputRow::new(format!("git://{}@HEAD", missing.path().display())),
            InputRow::new(valid),
        ];
        let rows = run(&f, BindArgs::default(), &input).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(opener.opens(), 1);
    }

    #[test]
    fn cancelled_single_scan_fails() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"a\n", "first");
        let opener = CountingOpener::default();
        let f = function(CallMode::Single, &opener);

        let bound = f.bind(args(&repo.path().display().to_string(), None)).unwrap();
        let mut local = f.init_local(&bound).unwrap();
        f.interrupt().trigger();
        let err = f.pull(&mut local, &[], &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "git_log: scan cancelled");
    }
}
