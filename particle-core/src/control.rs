//! Hand-control snapshots and the single-slot mailbox that carries them from
//! the gesture tracker to the tick loop.
//!
//! Producers run at their own cadence (usually slower than the frame rate)
//! and [`ControlSender::send`] never waits. The tick thread calls
//! [`ControlReceiver::latest`] once per frame and gets the most recent
//! snapshot; each send overwrites the previous one, so nothing queues while
//! the consumer is paused. When nothing usable is available the
//! receiver answers with [`ControlSignal::absent`], so the simulation falls
//! back to its idle behaviour instead of stalling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Hand pose class reported by the tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    /// Spread fingers: pushes particles away from the cursor.
    Open,
    /// Fist or pinch: pulls targets toward the cursor.
    Closed,
    #[default]
    Neutral,
}

/// One frame of external influence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlSignal {
    pub present: bool,
    pub gesture: Gesture,
    /// Palm position, normalized to `[-1, 1]` on both axes.
    pub position: Vec2,
    /// How spread the hand is, in `[0, 1]`.
    pub openness: f32,
    /// Thumb-to-index distance, in `[0, 1]`. Informational only.
    pub pinch: f32,
}

impl ControlSignal {
    /// The "no hand" snapshot.
    pub const fn absent() -> Self {
        Self {
            present: false,
            gesture: Gesture::Neutral,
            position: Vec2::ZERO,
            openness: 0.0,
            pinch: 0.0,
        }
    }

    /// A present hand at `position` with the given gesture. Position and
    /// openness are clamped into their documented ranges; non-finite inputs
    /// read as zero.
    pub fn hand(gesture: Gesture, position: Vec2, openness: f32) -> Self {
        let position = if position.is_finite() {
            position.clamp(Vec2::NEG_ONE, Vec2::ONE)
        } else {
            Vec2::ZERO
        };
        Self {
            present: true,
            gesture,
            position,
            openness: unit(openness),
            pinch: 0.0,
        }
    }

    pub fn with_pinch(mut self, pinch: f32) -> Self {
        self.pinch = unit(pinch);
        self
    }

    /// Whether the hand should soften the relaxation (present and not
    /// neutral).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.present && self.gesture != Gesture::Neutral
    }

    /// Cursor in world space: `position * scale` on the `z = 0` plane.
    #[inline]
    pub fn cursor(&self, scale: f32) -> Vec3 {
        (self.position * scale).extend(0.0)
    }
}

impl Default for ControlSignal {
    fn default() -> Self {
        Self::absent()
    }
}

/// Clamps into `[0, 1]`, mapping NaN and infinities to 0.
fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[derive(Clone, Copy, Debug)]
struct Stamped {
    signal: ControlSignal,
    at: Instant,
}

/// State shared by both halves: one overwritable slot plus liveness.
#[derive(Debug)]
struct Shared {
    slot: Mutex<Option<Stamped>>,
    senders: AtomicUsize,
    receiver_alive: AtomicBool,
}

/// Creates a connected sender/receiver pair.
///
/// `max_age` bounds how long a snapshot stays valid; `None` keeps the last
/// snapshot until it is replaced or every sender is dropped.
pub fn mailbox(max_age: Option<Duration>) -> (ControlSender, ControlReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        senders: AtomicUsize::new(1),
        receiver_alive: AtomicBool::new(true),
    });
    (
        ControlSender {
            shared: Arc::clone(&shared),
        },
        ControlReceiver {
            shared,
            max_age,
            connected: true,
        },
    )
}

/// Producer half. Cheap to clone; one clone per tracker thread is fine.
#[derive(Debug)]
pub struct ControlSender {
    shared: Arc<Shared>,
}

impl ControlSender {
    /// Publishes a snapshot, overwriting whatever was sent before.
    ///
    /// ### Returns
    /// `false` once the receiver has been dropped.
    pub fn send(&self, signal: ControlSignal) -> bool {
        if !self.shared.receiver_alive.load(Ordering::Acquire) {
            return false;
        }
        *self.shared.slot.lock() = Some(Stamped {
            signal,
            at: Instant::now(),
        });
        true
    }

    /// Publishes the explicit "not present" snapshot.
    pub fn send_absent(&self) -> bool {
        self.send(ControlSignal::absent())
    }
}

impl Clone for ControlSender {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for ControlSender {
    fn drop(&mut self) {
        self.shared.senders.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Consumer half, owned by the tick loop.
#[derive(Debug)]
pub struct ControlReceiver {
    shared: Arc<Shared>,
    max_age: Option<Duration>,
    connected: bool,
}

impl ControlReceiver {
    /// Returns the newest snapshot without blocking.
    ///
    /// Reads the single slot; the snapshot stays there until a producer
    /// overwrites it. Falls back to [`ControlSignal::absent`] when nothing
    /// was ever sent, when the snapshot is older than `max_age`, or when all
    /// senders have disconnected.
    pub fn latest(&mut self) -> ControlSignal {
        self.latest_at(Instant::now())
    }

    fn latest_at(&mut self, now: Instant) -> ControlSignal {
        if self.shared.senders.load(Ordering::Acquire) == 0 {
            if self.connected {
                log::debug!("control producers disconnected");
            }
            self.connected = false;
            return ControlSignal::absent();
        }

        match *self.shared.slot.lock() {
            Some(stamped) if !self.is_stale(&stamped, now) => stamped.signal,
            _ => ControlSignal::absent(),
        }
    }

    fn is_stale(&self, stamped: &Stamped, now: Instant) -> bool {
        self.max_age
            .is_some_and(|max| now.saturating_duration_since(stamped.at) > max)
    }

    /// Whether any sender is still alive, as of the last [`latest`] call.
    ///
    /// [`latest`]: ControlReceiver::latest
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for ControlReceiver {
    fn drop(&mut self) {
        self.shared.receiver_alive.store(false, Ordering::Release);
    }
}
