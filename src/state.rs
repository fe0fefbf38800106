//! Per-type load state: `Unloaded → Loading → Loaded | Failed`.

use crate::error::TypeLoadError;
use crate::store::Store;
use std::fmt;

/// Public view of a config type's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Failed => "failed",
        })
    }
}

/// State with its payload: the published store, or the error that stopped the load.
#[derive(Debug)]
pub(crate) enum EntryState {
    Unloaded,
    Loading,
    Loaded(Store),
    Failed(TypeLoadError),
}

impl EntryState {
    pub(crate) fn status(&self) -> LoadState {
        match self {
            EntryState::Unloaded => LoadState::Unloaded,
            EntryState::Loading => LoadState::Loading,
            EntryState::Loaded(_) => LoadState::Loaded,
            EntryState::Failed(_) => LoadState::Failed,
        }
    }
}
