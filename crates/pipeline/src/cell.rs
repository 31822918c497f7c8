//! Single state cell holding the current grid.

use roost_core::SlotGrid;
use std::sync::Arc;
use tokio::sync::watch;

/// Owner of the current [`SlotGrid`].
///
/// Every mutation computes a whole new grid from the current one inside a
/// synchronous closure and swaps it in, so readers only ever see complete
/// grids. Subscribers are woken on each change.
#[derive(Clone)]
pub struct GridCell {
    tx: Arc<watch::Sender<SlotGrid>>,
}

impl GridCell {
    pub fn new(grid: SlotGrid) -> Self {
        let (tx, _rx) = watch::channel(grid);
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current grid.
    pub fn snapshot(&self) -> SlotGrid {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotGrid> {
        self.tx.subscribe()
    }

    /// Apply a transition. `f` returns the next grid and a value for the
    /// caller, or `None` to leave the grid untouched (subscribers are not
    /// woken in that case).
    pub fn update<R>(&self, f: impl FnOnce(&SlotGrid) -> Option<(SlotGrid, R)>) -> Option<R> {
        let mut out = None;
        self.tx.send_if_modified(|grid| match f(grid) {
            Some((next, value)) => {
                *grid = next;
                out = Some(value);
                true
            }
            None => false,
        });
        out
    }

    /// Swap in an unrelated grid, returning the old one.
    pub fn replace(&self, grid: SlotGrid) -> SlotGrid {
        self.tx.send_replace(grid)
    }
}
