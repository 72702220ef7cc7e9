//! Recycle-bin scan entry points.

use std::path::{Path, PathBuf};

use tracing::Dispatch;

use crate::accounts::AccountsConfig;
use crate::assemble::{DeletedItems, OutputRecord};
use crate::correlate::{self, TrashGroup};
use crate::error::Result;
use crate::progress::ProgressSink;

/// Configured scan over one recycle-bin root
pub struct TrashScanner {
    accounts: AccountsConfig,
    progress: Option<Box<dyn ProgressSink>>,
    dispatch: Option<Dispatch>,
}

impl TrashScanner {
    pub fn new(accounts: AccountsConfig) -> Self {
        Self {
            accounts,
            progress: None,
            dispatch: None,
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_boxed_progress(mut self, sink: Option<Box<dyn ProgressSink>>) -> Self {
        self.progress = sink;
        self
    }

    /// Route this scan's diagnostics to `dispatch` instead of the global subscriber
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Correlate the trash tree and return a lazy sequence of deleted items
    pub fn scan(self, root: impl AsRef<Path>) -> Result<ScanIter> {
        let root = root.as_ref().to_path_buf();
        let dispatch = self.dispatch;

        let groups = with_dispatch(dispatch.as_ref(), || -> Result<Vec<TrashGroup>> {
            tracing::info!("Started parsing {}", root.display());
            let groups = correlate::correlate(&root)?;
            tracing::debug!("{} trash groups to process", groups.len());
            Ok(groups)
        })?;

        Ok(ScanIter {
            items: DeletedItems::new(groups, self.accounts, self.progress),
            dispatch,
            root,
            logged_complete: false,
        })
    }
}

fn with_dispatch<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

/// Deleted items of one scan, produced on demand
pub struct ScanIter {
    items: DeletedItems,
    dispatch: Option<Dispatch>,
    root: PathBuf,
    logged_complete: bool,
}

impl ScanIter {
    pub fn total_groups(&self) -> usize {
        self.items.total()
    }

    pub fn processed_groups(&self) -> usize {
        self.items.processed()
    }
}

impl Iterator for ScanIter {
    type Item = OutputRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let dispatch = self.dispatch.clone();
        with_dispatch(dispatch.as_ref(), || {
            let next = self.items.next();
            if next.is_none() && !self.logged_complete {
                self.logged_complete = true;
                tracing::info!("Parsing complete {}", self.root.display());
            }
            next
        })
    }
}

/// Scan `root` for deleted items belonging to any bucket in `accounts`
pub fn find_deleted(
    root: impl AsRef<Path>,
    accounts: AccountsConfig,
    progress: Option<Box<dyn ProgressSink>>,
) -> Result<ScanIter> {
    TrashScanner::new(accounts)
        .with_boxed_progress(progress)
        .scan(root)
}
