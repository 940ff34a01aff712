//! Event catalog and bounded history for controller phase transitions.
//!
//! The state machine records an event at every observable transition so
//! firmware diagnostics and the emulator can replay what the indicator did
//! without instrumenting the machine itself. Events carry compact numeric
//! codes for transport over diagnostics channels and remain `no_std`
//! compatible.

use core::fmt;
use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered};

use crate::clock::MonotonicInstant;
use crate::stages::StageId;

/// Identifier assigned to recorded events, monotonically increasing.
pub type EventId = u32;

/// Total number of event records retained in memory.
pub const EVENT_RING_CAPACITY: usize = 64;

/// Discriminated controller events shared across all targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorEventKind {
    /// A debounced start press moved the controller out of idle.
    ChargeStarted,
    /// A stage finished its blink cycles and latched fully lit.
    StageLatched(StageId),
    /// All four stages latched; the terminal blink began.
    ChargeComplete,
    /// A stop long-press cut the sequence short.
    ForcedStop,
    /// The terminal blink finished and the indicator returned to ready.
    ReturnedToIdle,
    /// Reserved for codes this firmware revision does not understand.
    Custom(u16),
}

impl fmt::Display for IndicatorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorEventKind::ChargeStarted => f.write_str("charge-started"),
            IndicatorEventKind::StageLatched(stage) => write!(f, "stage-latched {stage}"),
            IndicatorEventKind::ChargeComplete => f.write_str("charge-complete"),
            IndicatorEventKind::ForcedStop => f.write_str("forced-stop"),
            IndicatorEventKind::ReturnedToIdle => f.write_str("returned-to-idle"),
            IndicatorEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl IndicatorEventKind {
    const CHARGE_STARTED_CODE: u16 = 0x0000;
    const CHARGE_COMPLETE_CODE: u16 = 0x0001;
    const FORCED_STOP_CODE: u16 = 0x0002;
    const RETURNED_TO_IDLE_CODE: u16 = 0x0003;
    const STAGE_LATCHED_BASE: u16 = 0x0010;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            IndicatorEventKind::ChargeStarted => Self::CHARGE_STARTED_CODE,
            IndicatorEventKind::ChargeComplete => Self::CHARGE_COMPLETE_CODE,
            IndicatorEventKind::ForcedStop => Self::FORCED_STOP_CODE,
            IndicatorEventKind::ReturnedToIdle => Self::RETURNED_TO_IDLE_CODE,
            IndicatorEventKind::StageLatched(stage) => match stage {
                StageId::Quarter => Self::STAGE_LATCHED_BASE,
                StageId::Half => Self::STAGE_LATCHED_BASE + 1,
                StageId::ThreeQuarters => Self::STAGE_LATCHED_BASE + 2,
                StageId::Full => Self::STAGE_LATCHED_BASE + 3,
            },
            IndicatorEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`Custom`](Self::Custom).
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::CHARGE_STARTED_CODE => IndicatorEventKind::ChargeStarted,
            Self::CHARGE_COMPLETE_CODE => IndicatorEventKind::ChargeComplete,
            Self::FORCED_STOP_CODE => IndicatorEventKind::ForcedStop,
            Self::RETURNED_TO_IDLE_CODE => IndicatorEventKind::ReturnedToIdle,
            code => {
                let offset = code.wrapping_sub(Self::STAGE_LATCHED_BASE);
                match StageId::from_index(usize::from(offset)) {
                    Some(stage) if code >= Self::STAGE_LATCHED_BASE => {
                        IndicatorEventKind::StageLatched(stage)
                    }
                    _ => IndicatorEventKind::Custom(code),
                }
            }
        }
    }
}

/// Event record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: IndicatorEventKind,
    /// Elapsed time since the previous record, when one exists.
    pub since_previous: Option<Duration>,
}

/// Event ring buffer type alias.
pub type EventRing<TInstant, const CAPACITY: usize = EVENT_RING_CAPACITY> =
    HistoryBuf<EventRecord<TInstant>, CAPACITY>;

/// Records controller events into a fixed-size ring buffer.
pub struct EventRecorder<TInstant, const CAPACITY: usize = EVENT_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: EventRing<TInstant, CAPACITY>,
    last_recorded_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> EventRecorder<TInstant, CAPACITY>
where
    TInstant: MonotonicInstant,
{
    /// Creates a recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_recorded_at: None,
            next_event_id: 0,
        }
    }

    /// Records an event, returning its assigned identifier.
    pub fn record(&mut self, event: IndicatorEventKind, timestamp: TInstant) -> EventId {
        let since_previous = self
            .last_recorded_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_recorded_at = Some(timestamp);

        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(EventRecord {
            id,
            timestamp,
            event,
            since_previous,
        });
        id
    }

    /// Returns an iterator over recorded events in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, EventRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&EventRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<TInstant, const CAPACITY: usize> Default for EventRecorder<TInstant, CAPACITY>
where
    TInstant: MonotonicInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
