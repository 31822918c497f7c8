//! Fixed-capacity slot grid and compaction.
//!
//! A grid is a sequence of exactly `capacity` slots. At any stable moment it
//! satisfies the layout invariant checked by [`SlotGrid::is_compact`]:
//! confirmed items form a contiguous prefix, pending items the next block,
//! and every remaining slot is empty.
//!
//! All transitions take `&self` and return a new grid. Callers hold the grid
//! in a single state cell and swap whole values, so a reader never observes a
//! half-applied change.

use crate::GRID_CAPACITY;
use crate::error::{Error, Result};
use crate::media::{LifecycleState, MediaId, MediaItem};
use crate::upload::CorrelationToken;

/// One position of the grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    Filled(MediaItem),
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn item(&self) -> Option<&MediaItem> {
        match self {
            Self::Empty => None,
            Self::Filled(item) => Some(item),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.item().is_some_and(|item| item.state.is_confirmed())
    }

    pub fn is_pending(&self) -> bool {
        self.item().is_some_and(|item| item.state.is_pending())
    }

    pub fn token(&self) -> Option<CorrelationToken> {
        self.item().and_then(|item| item.token)
    }

    /// Layout rank: confirmed < pending < empty. Failed items rank last.
    fn rank(&self) -> u8 {
        match self.item().map(|item| item.state) {
            Some(LifecycleState::Uploaded) => 0,
            Some(LifecycleState::Previewing | LifecycleState::Uploading) => 1,
            None => 2,
            Some(LifecycleState::Failed) => 3,
        }
    }
}

/// Pull confirmed items to the front, then pending items, then pad with
/// empty slots up to `capacity`.
///
/// Relative order within each group is preserved. Failed items are dropped.
/// Pure and idempotent.
pub fn compact(slots: &[Slot], capacity: usize) -> Vec<Slot> {
    let mut confirmed = Vec::new();
    let mut pending = Vec::new();

    for item in slots.iter().filter_map(Slot::item) {
        match item.state {
            LifecycleState::Uploaded => confirmed.push(item.clone()),
            LifecycleState::Previewing | LifecycleState::Uploading => pending.push(item.clone()),
            LifecycleState::Failed => {}
        }
    }

    let mut out: Vec<Slot> = confirmed
        .into_iter()
        .chain(pending)
        .take(capacity)
        .map(Slot::Filled)
        .collect();
    out.resize(capacity, Slot::Empty);
    out
}

/// Fixed-length ordered collection of slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotGrid {
    slots: Vec<Slot>,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotGrid {
    /// An empty grid with the standard capacity.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Empty; GRID_CAPACITY],
        }
    }

    /// An empty grid with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            slots: vec![Slot::Empty; capacity],
        })
    }

    /// Build a grid from confirmed items in display order.
    ///
    /// Items beyond `capacity` are dropped.
    pub fn hydrate(capacity: usize, items: impl IntoIterator<Item = MediaItem>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        let slots: Vec<Slot> = items.into_iter().map(Slot::Filled).collect();
        Ok(Self {
            slots: compact(&slots, capacity),
        })
    }

    /// Wrap raw slots without compacting them. The slot count becomes the capacity.
    pub fn from_slots(slots: Vec<Slot>) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self { slots })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn confirmed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_confirmed()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_pending()).count()
    }

    /// Number of slots that can still accept a new upload.
    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_empty()).count()
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_empty)
    }

    pub fn find_by_token(&self, token: CorrelationToken) -> Option<usize> {
        self.slots.iter().position(|s| s.token() == Some(token))
    }

    pub fn position_of(&self, id: MediaId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_confirmed() && s.item().and_then(|i| i.id) == Some(id))
    }

    /// Remote IDs of confirmed items in display order.
    pub fn confirmed_ids(&self) -> Vec<MediaId> {
        self.slots
            .iter()
            .filter(|s| s.is_confirmed())
            .filter_map(|s| s.item().and_then(|i| i.id))
            .collect()
    }

    /// Check the layout invariant: no empty slot precedes a filled one and
    /// confirmed items come before pending ones.
    pub fn is_compact(&self) -> bool {
        self.slots.iter().all(|s| s.rank() < 3)
            && self.slots.windows(2).all(|w| w[0].rank() <= w[1].rank())
    }

    pub fn compacted(&self) -> Self {
        Self {
            slots: compact(&self.slots, self.capacity()),
        }
    }

    /// Place `item` in the first empty slot.
    pub fn inserted(&self, item: MediaItem) -> Result<(Self, usize)> {
        let index = self.first_empty().ok_or(Error::CapacityExceeded {
            capacity: self.capacity(),
        })?;
        let mut slots = self.slots.clone();
        slots[index] = Slot::Filled(item);
        Ok((Self { slots }, index))
    }

    /// Replace the slot holding `token` with `item`. `None` if the token is gone.
    pub fn replaced(&self, token: CorrelationToken, item: MediaItem) -> Option<Self> {
        let index = self.find_by_token(token)?;
        let mut slots = self.slots.clone();
        slots[index] = Slot::Filled(item);
        Some(Self { slots })
    }

    /// Move the item holding `token` to a new lifecycle state.
    pub fn with_state(&self, token: CorrelationToken, state: LifecycleState) -> Option<Self> {
        let index = self.find_by_token(token)?;
        let item = self.slots[index].item()?;
        if item.state == state {
            return None;
        }
        let updated = item.with_state(state);
        self.replaced(token, updated)
    }

    /// Mark the item holding `token` as failed and compact, which drops it.
    pub fn failed(&self, token: CorrelationToken) -> Option<Self> {
        let index = self.find_by_token(token)?;
        let item = self.slots[index].item()?.with_state(LifecycleState::Failed);
        let mut slots = self.slots.clone();
        slots[index] = Slot::Filled(item);
        Some(Self {
            slots: compact(&slots, self.capacity()),
        })
    }

    /// Remove the confirmed item with remote ID `id` and compact.
    pub fn without_media(&self, id: MediaId) -> Option<Self> {
        let index = self.position_of(id)?;
        let mut slots = self.slots.clone();
        slots[index] = Slot::Empty;
        Some(Self {
            slots: compact(&slots, self.capacity()),
        })
    }

    /// Remove the content at `index` and compact.
    pub fn removed_at(&self, index: usize) -> Result<(Self, MediaItem)> {
        let slot = self.slots.get(index).ok_or(Error::SlotOutOfRange {
            index,
            capacity: self.capacity(),
        })?;
        let item = slot.item().cloned().ok_or(Error::EmptySlot { index })?;
        let mut slots = self.slots.clone();
        slots[index] = Slot::Empty;
        Ok((
            Self {
                slots: compact(&slots, self.capacity()),
            },
            item,
        ))
    }

    /// Move the confirmed item at `from` to position `to`, shifting the items
    /// in between. Both positions must hold confirmed items, so the layout
    /// invariant survives without recompaction.
    pub fn moved(&self, from: usize, to: usize) -> Result<Self> {
        let capacity = self.capacity();
        for index in [from, to] {
            if index >= capacity {
                return Err(Error::SlotOutOfRange { index, capacity });
            }
        }
        if !self.slots[from].is_confirmed() || !self.slots[to].is_confirmed() {
            return Err(Error::IllegalReorder { from, to });
        }

        let mut slots = self.slots.clone();
        let item = slots.remove(from);
        slots.insert(to, item);
        Ok(Self { slots })
    }
}
