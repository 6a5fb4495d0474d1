//! The history collaborator the router reads locations from and navigates through.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::location::{HistoryMethod, Location};

/// Host-side history: reports the current location and performs navigations.
///
/// A navigation must be visible through `current_location` as soon as `navigate`
/// returns, even when the host re-renders later.
pub trait Navigator {
    fn current_location(&self) -> Location;
    fn navigate(&self, path: &str, method: HistoryMethod);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn current_location(&self) -> Location {
        (**self).current_location()
    }

    fn navigate(&self, path: &str, method: HistoryMethod) {
        (**self).navigate(path, method)
    }
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn current_location(&self) -> Location {
        (**self).current_location()
    }

    fn navigate(&self, path: &str, method: HistoryMethod) {
        (**self).navigate(path, method)
    }
}

struct HistoryState {
    entries: Vec<Location>,
    index: usize,
}

/// In-memory history stack with push, replace, back and forward.
pub struct MemoryHistory {
    state: Mutex<HistoryState>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryHistory {
    /// History with a single entry at `initial_path`.
    pub fn new(initial_path: &str) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                entries: vec![Location::parse(initial_path)],
                index: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn location(&self) -> Location {
        let state = self.lock();
        state.entries[state.index].clone()
    }

    /// Add an entry after the current one, dropping any forward entries.
    pub fn push(&self, path: &str) {
        let mut state = self.lock();
        let next = state.index + 1;
        state.entries.truncate(next);
        state.entries.push(Location::parse(path));
        state.index = next;
    }

    /// Overwrite the current entry.
    pub fn replace(&self, path: &str) {
        let mut state = self.lock();
        let index = state.index;
        state.entries[index] = Location::parse(path);
    }

    /// Step back one entry. Returns false at the start of the stack.
    pub fn back(&self) -> bool {
        let mut state = self.lock();
        if state.index == 0 {
            return false;
        }
        state.index -= 1;
        true
    }

    /// Step forward one entry. Returns false at the end of the stack.
    pub fn forward(&self) -> bool {
        let mut state = self.lock();
        if state.index + 1 >= state.entries.len() {
            return false;
        }
        state.index += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.lock().index
    }

    pub fn entries(&self) -> Vec<Location> {
        self.lock().entries.clone()
    }
}

impl Navigator for MemoryHistory {
    fn current_location(&self) -> Location {
        self.location()
    }

    fn navigate(&self, path: &str, method: HistoryMethod) {
        debug!("History {} {path}", method.as_str());
        match method {
            HistoryMethod::Push => self.push(path),
            HistoryMethod::Replace => self.replace(path),
        }
    }
}
