//! Time-ordered event queue over jump-process identifiers.
//!
//! [`EventQueue`] keeps at most one pending time per [`JumpId`] and never
//! lets two identifiers share an absolute time. A collision (which has
//! probability zero in continuous time, but not in floating point) is
//! resolved by nudging the later-registered event forward.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use pdmp_core::JumpId;

/// Offset applied to an event whose time is already taken.
pub const NUDGE_EPSILON: f64 = 1e-9;

/// Absolute event time with a total order. NaN never enters the queue.
#[derive(Clone, Copy, Debug)]
struct EventTime(f64);

impl PartialEq for EventTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventTime {}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from [`EventQueue::add`].
#[derive(Clone, Debug, PartialEq)]
pub enum QueueError {
    /// The time is NaN or infinite.
    InvalidTime {
        /// The event being scheduled.
        jump: JumpId,
        /// The rejected time.
        time: f64,
    },
    /// Nudging past the occupied times overflowed to infinity.
    TimeCollision {
        /// The event being scheduled.
        jump: JumpId,
        /// The originally requested time.
        time: f64,
    },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime { jump, time } => {
                write!(f, "cannot schedule jump process {jump} at non-finite time {time}")
            }
            Self::TimeCollision { jump, time } => {
                write!(
                    f,
                    "jump process {jump} cannot be nudged past the events at t={time}"
                )
            }
        }
    }
}

impl Error for QueueError {}

// ── EventQueue ─────────────────────────────────────────────────────

/// Map from jump process to its next scheduled absolute time.
///
/// Poll, insert and remove are all O(log n).
#[derive(Debug, Default)]
pub struct EventQueue {
    by_time: BTreeMap<EventTime, JumpId>,
    /// `scheduled[j]` is the pending time of jump `j`, if any.
    scheduled: Vec<Option<f64>>,
}

impl EventQueue {
    /// An empty queue with slots preallocated for `num_jumps` processes.
    pub fn new(num_jumps: usize) -> Self {
        Self {
            by_time: BTreeMap::new(),
            scheduled: vec![None; num_jumps],
        }
    }

    /// Schedule `jump` at `time`, replacing any pending time it had.
    ///
    /// Returns the time actually used: `time` itself, or, if other
    /// processes already hold `time`, the first free slot found by
    /// stepping [`NUDGE_EPSILON`] past each of them. Any number of tied
    /// proposals is resolved in one walk over the occupied run.
    pub fn add(&mut self, jump: JumpId, time: f64) -> Result<f64, QueueError> {
        if !time.is_finite() {
            return Err(QueueError::InvalidTime { jump, time });
        }
        self.remove(jump);

        let mut t = time;
        for (&EventTime(taken), _) in self.by_time.range(EventTime(time)..) {
            if taken > t {
                break;
            }
            if taken == t {
                t = nudge(t);
            }
        }
        if !t.is_finite() {
            return Err(QueueError::TimeCollision { jump, time });
        }
        if t != time {
            tracing::warn!(
                jump = %jump,
                requested = time,
                nudged = t,
                "event scheduled at the same time as another; moving the later one"
            );
        }

        self.by_time.insert(EventTime(t), jump);
        let idx = jump.index();
        if idx >= self.scheduled.len() {
            self.scheduled.resize(idx + 1, None);
        }
        self.scheduled[idx] = Some(t);
        Ok(t)
    }

    /// Cancel the pending event of `jump`. Returns its time, if any.
    pub fn remove(&mut self, jump: JumpId) -> Option<f64> {
        let t = self.scheduled.get_mut(jump.index())?.take()?;
        self.by_time.remove(&EventTime(t));
        Some(t)
    }

    /// Remove and return the earliest event.
    pub fn poll_min(&mut self) -> Option<(f64, JumpId)> {
        let (EventTime(t), jump) = self.by_time.pop_first()?;
        self.scheduled[jump.index()] = None;
        Some((t, jump))
    }

    /// The earliest event, without removing it.
    pub fn peek_min(&self) -> Option<(f64, JumpId)> {
        self.by_time
            .first_key_value()
            .map(|(&EventTime(t), &jump)| (t, jump))
    }

    /// Whether some process is scheduled at exactly `time`.
    pub fn contains_time(&self, time: f64) -> bool {
        self.by_time.contains_key(&EventTime(time))
    }

    /// The pending time of `jump`, if any.
    pub fn scheduled(&self, jump: JumpId) -> Option<f64> {
        self.scheduled.get(jump.index()).copied().flatten()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.by_time.len()
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.by_time.clear();
        self.scheduled.fill(None);
    }
}

/// The next candidate time after a collision at `t`.
///
/// Falls back to the next representable float when `t` is so large that
/// adding the epsilon rounds back to `t`.
fn nudge(t: f64) -> f64 {
    let n = t + NUDGE_EPSILON;
    if n > t {
        n
    } else {
        t.next_up()
    }
}
