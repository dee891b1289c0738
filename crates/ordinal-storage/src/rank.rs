//! Rank arithmetic shared by every backend.
//!
//! Reprioritizing one item moves it from rank `from` to rank `to` and shifts
//! every row strictly between the two (plus the row at `to`) by exactly one
//! step towards `from`. [`ShiftPlan`] captures that computation once so the
//! in-memory and PostgreSQL backends cannot disagree on it. [`RankLock`]
//! names the address range a mutation must hold exclusively while it runs.

use ordinal_core::{CoreError, ItemKey, Priority};

/// Inclusive range of ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRange {
    pub lo: Priority,
    pub hi: Priority,
}

impl RankRange {
    pub fn new(lo: Priority, hi: Priority) -> Self {
        debug_assert!(lo <= hi, "rank range must be ordered");
        Self { lo, hi }
    }

    pub fn contains(&self, priority: Priority) -> bool {
        self.lo <= priority && priority <= self.hi
    }
}

/// Critical section a store mutation must hold until commit or rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankLock {
    /// The whole addressable set. Taken by insert, which reads the global maximum.
    All,
    /// Every row whose rank lies in the range, target included. Taken by reprioritize.
    Range(RankRange),
    /// A single addressed row. Taken by text updates.
    Row(ItemKey),
}

/// Direction the target moves in the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    /// Target moves to a larger rank number; neighbors step down by one.
    Later,
    /// Target moves to a smaller rank number; neighbors step up by one.
    Earlier,
}

/// The shift needed to move one item from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPlan {
    pub from: Priority,
    pub to: Priority,
}

impl ShiftPlan {
    /// Returns `None` when the move is a no-op.
    pub fn new(from: Priority, to: Priority) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    pub fn direction(&self) -> ShiftDirection {
        if self.to > self.from {
            ShiftDirection::Later
        } else {
            ShiftDirection::Earlier
        }
    }

    /// Amount added to every shifted neighbor.
    pub fn neighbor_delta(&self) -> i64 {
        match self.direction() {
            ShiftDirection::Later => -1,
            ShiftDirection::Earlier => 1,
        }
    }

    /// Ranks of the neighbors that move: `(from, to]` or `[to, from)`.
    pub fn shifted(&self) -> RankRange {
        match self.direction() {
            ShiftDirection::Later => RankRange::new(self.from + 1, self.to),
            ShiftDirection::Earlier => RankRange::new(self.to, self.from - 1),
        }
    }

    /// Range that must be locked: shifted neighbors plus the target.
    pub fn lock_range(&self) -> RankRange {
        RankRange::new(self.from.min(self.to), self.from.max(self.to))
    }

    pub fn lock(&self) -> RankLock {
        RankLock::Range(self.lock_range())
    }

    /// New rank of a non-target row currently at `priority`.
    pub fn apply(&self, priority: Priority) -> Priority {
        if self.shifted().contains(priority) {
            priority + self.neighbor_delta()
        } else {
            priority
        }
    }
}

/// A reprioritize target must land on an existing rank, `1..=max`.
pub fn check_target(priority: Priority, max: Priority) -> Result<(), CoreError> {
    if priority < 1 || priority > max {
        return Err(CoreError::priority_out_of_range(priority, max));
    }
    Ok(())
}
