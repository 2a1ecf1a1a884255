//! Cancellable timers that report back through the coordinator's event
//! channel.
//!
//! Each armed timer gets a fresh id. The coordinator keeps the handle of the
//! timer it currently expects and drops any firing whose id doesn't match, so
//! a firing that raced with a cancel is harmless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::Event;
use crate::room::RoomId;

pub type TimerId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Pre-game countdown; `remaining` reaches 0 on the final tick
    Countdown { remaining: u32 },
    /// Nobody connected for the whole grace period
    EmptyRoom,
    /// A disconnected player's seat is no longer held
    Reconnect { nickname: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub id: TimerId,
    pub room_id: RoomId,
    pub kind: TimerKind,
}

/// A running timer. Cancelling is idempotent and safe after it fired.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Spawns timers onto the runtime
pub struct Scheduler {
    next_id: AtomicU64,
    events: mpsc::UnboundedSender<Event>,
}

impl Scheduler {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            events,
        }
    }

    fn allocate(&self) -> TimerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fire `kind` once after `delay`
    pub fn once(&self, room_id: RoomId, delay: Duration, kind: TimerKind) -> TimerHandle {
        let id = self.allocate();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::Timer(TimerFired { id, room_id, kind }));
        });
        TimerHandle { id, task }
    }

    /// Tick once a second with the seconds remaining, ending with 0.
    pub fn countdown(&self, room_id: RoomId, seconds: u32) -> TimerHandle {
        let id = self.allocate();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick completes immediately.
            interval.tick().await;
            for remaining in (0..seconds).rev() {
                interval.tick().await;
                let fired = TimerFired {
                    id,
                    room_id,
                    kind: TimerKind::Countdown { remaining },
                };
                if events.send(Event::Timer(fired)).is_err() {
                    break;
                }
            }
        });
        TimerHandle { id, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn timer_of(event: Event) -> TimerFired {
        match event {
            Event::Timer(fired) => fired,
            other => panic!("expected timer event, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_down_to_zero() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let room_id = Uuid::new_v4();
        let handle = scheduler.countdown(room_id, 3);

        for expected in [2, 1, 0] {
            let fired = timer_of(rx.recv().await.unwrap());
            assert_eq!(fired.id, handle.id());
            assert_eq!(fired.room_id, room_id);
            assert_eq!(fired.kind, TimerKind::Countdown { remaining: expected });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let handle = scheduler.once(Uuid::new_v4(), Duration::from_secs(5), TimerKind::EmptyRoom);
        handle.cancel();
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ids_are_unique() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let room_id = Uuid::new_v4();
        let a = scheduler.once(room_id, Duration::from_secs(1), TimerKind::EmptyRoom);
        let b = scheduler.once(room_id, Duration::from_secs(1), TimerKind::EmptyRoom);
        assert_ne!(a.id(), b.id());
    }
}
