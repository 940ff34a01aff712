//! Stage output catalog and timing constants shared by firmware and host targets.
//!
//! The charge state machine uses these definitions to drive the staged
//! progress animation without embedding any MCU-specific knowledge.
//! Everything in this module is `no_std` friendly so the same data can be
//! compiled for both the STM32 firmware and the host-side emulator.

use core::fmt;
use core::time::Duration;

/// Number of discrete progress stages in the charging animation.
pub const STAGE_COUNT: usize = 4;

/// Interval in milliseconds between successive on/off transitions while
/// any blinking runs.
pub const BLINK_INTERVAL_MILLIS: u64 = 600;

/// Interval between successive on/off transitions while any blinking runs.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(BLINK_INTERVAL_MILLIS);

/// On/off transitions per stage (three full blink cycles) before it latches lit.
pub const BLINK_TOGGLES: u8 = 6;

/// Milliseconds for one stage to blink out and latch.
pub const STAGE_DURATION_MILLIS: u64 = BLINK_INTERVAL_MILLIS * 6;

/// Elapsed time for one stage to blink out and latch.
pub const STAGE_DURATION: Duration = Duration::from_millis(STAGE_DURATION_MILLIS);

/// Milliseconds for the full four-stage charging animation.
pub const FULL_CHARGE_MILLIS: u64 = STAGE_DURATION_MILLIS * 4;

/// Elapsed time for the full four-stage charging animation.
pub const FULL_CHARGE_DURATION: Duration = Duration::from_millis(FULL_CHARGE_MILLIS);

/// Milliseconds for the synchronized terminal blink before returning to idle.
pub const TERMINAL_BLINK_MILLIS: u64 = STAGE_DURATION_MILLIS;

/// Elapsed time for the synchronized terminal blink before returning to idle.
pub const TERMINAL_BLINK_DURATION: Duration = Duration::from_millis(TERMINAL_BLINK_MILLIS);

/// Identifier for the logical stage outputs exposed by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StageId {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl StageId {
    /// Deterministic index for lookups into [`ALL_STAGES`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            StageId::Quarter => 0,
            StageId::Half => 1,
            StageId::ThreeQuarters => 2,
            StageId::Full => 3,
        }
    }

    /// Attempts to construct a [`StageId`] from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(StageId::Quarter),
            1 => Some(StageId::Half),
            2 => Some(StageId::ThreeQuarters),
            3 => Some(StageId::Full),
            _ => None,
        }
    }

    /// Charge percentage this stage represents once latched.
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            StageId::Quarter => 25,
            StageId::Half => 50,
            StageId::ThreeQuarters => 75,
            StageId::Full => 100,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Metadata describing how a stage output is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StageLine {
    pub id: StageId,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub percent: u8,
}

impl StageLine {
    #[must_use]
    pub const fn new(id: StageId, name: &'static str, mcu_pin: &'static str, percent: u8) -> Self {
        Self {
            id,
            name,
            mcu_pin,
            percent,
        }
    }
}

/// Compile-time catalog of every stage output.
pub const ALL_STAGES: [StageLine; STAGE_COUNT] = [
    StageLine::new(StageId::Quarter, "STAGE-25", "PA4", 25),
    StageLine::new(StageId::Half, "STAGE-50", "PA5", 50),
    StageLine::new(StageId::ThreeQuarters, "STAGE-75", "PA6", 75),
    StageLine::new(StageId::Full, "STAGE-100", "PA7", 100),
];

/// Retrieve stage metadata by identifier.
#[must_use]
pub const fn stage_by_id(id: StageId) -> StageLine {
    ALL_STAGES[id.as_index()]
}

/// Color shown on the bicolor status indicator.
///
/// The indicator is wired as two independent outputs; exactly one of them
/// is driven high at any time. (red, green) = (high, low) reads as the
/// busy/charging color and (low, high) as the ready color.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusColor {
    Ready,
    Charging,
}

impl StatusColor {
    /// Level driven on the red half of the bicolor indicator.
    #[must_use]
    pub const fn red_high(self) -> bool {
        matches!(self, StatusColor::Charging)
    }

    /// Level driven on the green half of the bicolor indicator.
    #[must_use]
    pub const fn green_high(self) -> bool {
        matches!(self, StatusColor::Ready)
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusColor::Ready => f.write_str("ready"),
            StatusColor::Charging => f.write_str("charging"),
        }
    }
}
