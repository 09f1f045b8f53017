//! Clock and scheduler capabilities.
//!
//! The pickers and the timer never touch platform timers directly. They ask a
//! [`Scheduler`] for a [`TimerHandle`], remember it, and accept a fired task
//! only while the handle they hold still matches. A callback that was
//! superseded by a newer gesture, a pause or a reset is therefore ignored even
//! if the host delivers it late.
//!
//! [`ManualClock`] is the deterministic host used by tests: time only moves when
//! the caller advances it, and due tasks are handed back one at a time in due
//! order.

use crate::quantity::QuantityKind;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Work the host calls back into the session for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Scroll on this picker went quiet; snap and commit.
    Snap(QuantityKind),
    /// Periodic timer refresh.
    Tick,
    /// Slide-to-start animation finished.
    FinishStart,
    /// Reset animation finished.
    FinishReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub task: Task,
}

pub trait Scheduler {
    fn schedule_once(&self, delay_ms: u32, task: Task) -> TimerHandle;
    fn schedule_every(&self, period_ms: u32, task: Task) -> TimerHandle;
    /// Cancelling an unknown or already fired handle is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

#[derive(Debug)]
struct Pending {
    due_ms: u64,
    period_ms: Option<u32>,
    task: Task,
}

#[derive(Debug, Default)]
struct ManualInner {
    now_ms: u64,
    next_id: u64,
    pending: BTreeMap<TimerHandle, Pending>,
}

/// Hand-driven clock and scheduler.
#[derive(Debug, Default)]
pub struct ManualClock {
    inner: RefCell<ManualInner>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            inner: RefCell::new(ManualInner {
                now_ms: start_ms,
                ..ManualInner::default()
            }),
        }
    }

    /// Number of tasks still scheduled.
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Move time forward by `ms`, handing every task that falls due to
    /// `on_fire` with the clock set to that task's due time.
    ///
    /// `on_fire` may schedule or cancel freely; the internal borrow is released
    /// before each call.
    pub fn advance(&self, ms: u64, mut on_fire: impl FnMut(Fired)) {
        let target = self.inner.borrow().now_ms + ms;
        while let Some(fired) = self.pop_due(target) {
            on_fire(fired);
        }
        self.inner.borrow_mut().now_ms = target;
    }

    /// Move time forward, collecting fired tasks instead of dispatching them.
    pub fn advance_collect(&self, ms: u64) -> Vec<Fired> {
        let mut fired = Vec::new();
        self.advance(ms, |f| fired.push(f));
        fired
    }

    fn pop_due(&self, target: u64) -> Option<Fired> {
        let mut inner = self.inner.borrow_mut();
        let (&handle, _) = inner
            .pending
            .iter()
            .filter(|(_, p)| p.due_ms <= target)
            .min_by_key(|(handle, p)| (p.due_ms, **handle))?;
        let pending = inner.pending.remove(&handle)?;
        inner.now_ms = pending.due_ms;
        if let Some(period) = pending.period_ms {
            inner.pending.insert(
                handle,
                Pending {
                    due_ms: pending.due_ms + period.max(1) as u64,
                    ..pending
                },
            );
        }
        Some(Fired {
            handle,
            task: pending.task,
        })
    }

    fn insert(&self, delay_ms: u32, period_ms: Option<u32>, task: Task) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let handle = TimerHandle(inner.next_id);
        let due_ms = inner.now_ms + delay_ms as u64;
        inner.pending.insert(
            handle,
            Pending {
                due_ms,
                period_ms,
                task,
            },
        );
        handle
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }
}

impl Scheduler for ManualClock {
    fn schedule_once(&self, delay_ms: u32, task: Task) -> TimerHandle {
        self.insert(delay_ms, None, task)
    }

    fn schedule_every(&self, period_ms: u32, task: Task) -> TimerHandle {
        self.insert(period_ms.max(1), Some(period_ms), task)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.inner.borrow_mut().pending.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let clock = ManualClock::new(1_000);
        let late = clock.schedule_once(300, Task::FinishReset);
        let early = clock.schedule_once(100, Task::FinishStart);

        let mut seen = Vec::new();
        clock.advance(500, |f| seen.push((f.handle, clock.now_ms())));

        assert_eq!(seen, vec![(early, 1_100), (late, 1_300)]);
        assert_eq!(clock.now_ms(), 1_500);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let clock = ManualClock::new(0);
        let handle = clock.schedule_once(150, Task::Snap(QuantityKind::Coffee));
        clock.cancel(handle);
        assert!(clock.advance_collect(1_000).is_empty());
    }

    #[test]
    fn intervals_repeat_until_cancelled() {
        let clock = ManualClock::new(0);
        let handle = clock.schedule_every(100, Task::Tick);
        assert_eq!(clock.advance_collect(350).len(), 3);
        clock.cancel(handle);
        assert!(clock.advance_collect(350).is_empty());
    }

    #[test]
    fn callbacks_may_cancel_later_tasks() {
        let clock = ManualClock::new(0);
        let first = clock.schedule_once(10, Task::FinishStart);
        let second = clock.schedule_once(20, Task::FinishReset);
        let mut fired = Vec::new();
        clock.advance(100, |f| {
            fired.push(f.handle);
            if f.handle == first {
                clock.cancel(second);
            }
        });
        assert_eq!(fired, vec![first]);
    }
}
