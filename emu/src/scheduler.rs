//! Event scheduler.
//!
//! Every peripheral that produces a periodic or one-shot effect (timer overflow,
//! PPU scanline boundary, APU channel clock, ...) schedules an [`EventKind`] with
//! the scheduler instead of being ticked once per CPU cycle. The CPU bills cycles
//! into the scheduler after every fetch/execute step; the scheduler fires any
//! event whose target cycle has been reached, in priority order.
//!
//! Kinds are intentionally a flat enum rather than boxed closures: the container
//! owns a `dispatch(kind, extra_cycles)` method that matches on the tag and calls
//! the right component. This keeps every piece of state borrow-checkable without
//! back-pointers (see the module design notes on cross-references).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// Identifies what fires when a scheduled event comes due.
///
/// Order here also defines tie-breaking priority: variants declared earlier
/// outrank variants declared later when two events share a `cycle_to_execute`.
/// Frame-level PPU events outrank peripheral clocks, matching real hardware
/// where a scanline boundary is visible before same-cycle audio events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    VDraw,
    HBlank,
    VBlank,
    Timer0Overflow,
    Timer1Overflow,
    Timer2Overflow,
    Timer3Overflow,
    ApuSampleOutput,
    SoundEnvelopeTick,
    SoundFrequencySweepTick,
    SoundLengthTick,
    HaltIrqWake,
}

/// The fixed priority used to break ties between events scheduled for the same cycle.
/// Lower values fire first.
fn priority(kind: EventKind) -> u8 {
    kind as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Event {
    kind: EventKind,
    cycle_queued: u64,
    cycle_to_execute: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest/lowest-priority event sorts highest.
        other
            .cycle_to_execute
            .cmp(&self.cycle_to_execute)
            .then_with(|| priority(other.kind).cmp(&priority(self.kind)))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A due event handed back to the container for dispatch.
pub struct Fired {
    pub kind: EventKind,
    /// `now - cycle_to_execute`, always `>= 0`. Periodic events re-schedule using
    /// this to avoid phase drift.
    pub extra_cycles: u64,
}

/// Min-heap of pending events plus the monotonic cycle counter.
#[derive(Default, Serialize, Deserialize)]
pub struct Scheduler {
    now: u64,
    heap: BinaryHeap<Event>,
    registered: std::collections::HashSet<EventKind>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Declares that `kind` is a legal event to schedule. Boot-time only; calling
    /// this twice for the same kind is a programmer error.
    pub fn register(&mut self, kind: EventKind) {
        assert!(
            self.registered.insert(kind),
            "event kind {kind:?} registered twice"
        );
    }

    /// Schedules `kind` to fire at `now + cycles_ahead`. A kind with an existing
    /// pending entry has that entry replaced (at-most-one-live-instance semantics).
    pub fn schedule(&mut self, kind: EventKind, cycles_ahead: u64) {
        assert!(
            cycles_ahead > 0,
            "event {kind:?} scheduled with non-positive delta"
        );
        self.unschedule(kind);
        self.heap.push(Event {
            kind,
            cycle_queued: self.now,
            cycle_to_execute: self.now + cycles_ahead,
        });
    }

    /// Removes any pending entry for `kind`, if one exists.
    pub fn unschedule(&mut self, kind: EventKind) {
        if self.heap.iter().any(|e| e.kind == kind) {
            let remaining: BinaryHeap<Event> =
                self.heap.drain().filter(|e| e.kind != kind).collect();
            self.heap = remaining;
        }
    }

    /// Cycles elapsed since `kind` was queued, if it is currently pending.
    #[must_use]
    pub fn elapsed_since(&self, kind: EventKind) -> Option<u64> {
        self.heap
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| self.now - e.cycle_queued)
    }

    #[must_use]
    pub fn is_scheduled(&self, kind: EventKind) -> bool {
        self.heap.iter().any(|e| e.kind == kind)
    }

    /// Cycles until `kind` is due, if pending.
    #[must_use]
    pub fn cycles_until(&self, kind: EventKind) -> Option<u64> {
        self.heap
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.cycle_to_execute.saturating_sub(self.now))
    }

    /// Advances `now` by `cycles` and drains every event now due, in priority
    /// order. The caller dispatches each one; dispatch may itself schedule new
    /// events without disturbing this drain (the heap is a standalone structure).
    pub fn step(&mut self, cycles: u64) -> Vec<Fired> {
        self.now += cycles;
        self.drain_due()
    }

    /// Jumps `now` directly to the next scheduled event and fires it. Used by the
    /// CPU's halt state: rather than stepping cycle-by-cycle while idle, skip
    /// straight to the next thing that could wake it up.
    pub fn fire_next_event(&mut self) -> Option<Fired> {
        let next = self.heap.peek()?;
        self.now = next.cycle_to_execute;
        self.drain_due().into_iter().next()
    }

    fn drain_due(&mut self) -> Vec<Fired> {
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.cycle_to_execute > self.now {
                break;
            }
            let event = self.heap.pop().unwrap();
            fired.push(Fired {
                kind: event.kind,
                extra_cycles: self.now - event.cycle_to_execute,
            });
        }
        fired
    }
}
