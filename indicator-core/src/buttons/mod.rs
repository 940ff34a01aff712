//! Button input catalog and debounce filtering shared by firmware and host targets.
//!
//! Both buttons are momentary switches wired active-low with the MCU's
//! internal pull-up, so an idle button reads high. Each input carries its
//! own debounce window; a raw transition restarts the window and the
//! accepted state only moves once the reading has held still long enough.

use core::fmt;
use core::time::Duration;

use crate::clock::MonotonicInstant;

/// Stability window a raw reading must survive before it is accepted.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Continuous hold on the stop button that triggers a forced stop.
pub const STOP_HOLD_THRESHOLD: Duration = Duration::from_millis(1_000);

/// Identifier for the logical button inputs exposed by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonId {
    Start,
    Stop,
}

impl ButtonId {
    /// Deterministic index for lookups into [`ALL_BUTTONS`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            ButtonId::Start => 0,
            ButtonId::Stop => 1,
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonId::Start => f.write_str("start"),
            ButtonId::Stop => f.write_str("stop"),
        }
    }
}

/// Metadata describing how a button input is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonLine {
    pub id: ButtonId,
    pub name: &'static str,
    pub mcu_pin: &'static str,
}

impl ButtonLine {
    #[must_use]
    pub const fn new(id: ButtonId, name: &'static str, mcu_pin: &'static str) -> Self {
        Self { id, name, mcu_pin }
    }
}

/// Compile-time catalog of every button input (all active-low, pull-up).
pub const ALL_BUTTONS: [ButtonLine; 2] = [
    ButtonLine::new(ButtonId::Start, "BTN-START", "PA0"),
    ButtonLine::new(ButtonId::Stop, "BTN-STOP", "PA1"),
];

/// Retrieve button metadata by identifier.
#[must_use]
pub const fn button_by_id(id: ButtonId) -> ButtonLine {
    ALL_BUTTONS[id.as_index()]
}

/// Raw electrical level sampled from a button input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputLevel {
    High,
    Low,
}

impl InputLevel {
    /// Active-low wiring: a pressed button pulls the line low.
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, InputLevel::Low)
    }
}

/// Debounced transition reported by a [`Debouncer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Per-input debounce filter.
///
/// Tracks the last raw reading and the instant it last changed; once the
/// reading has been stable for [`DEBOUNCE_WINDOW`] and differs from the
/// accepted state, the accepted state follows it and a single edge is
/// reported. Bounce faster than the window never surfaces.
#[derive(Copy, Clone, Debug)]
pub struct Debouncer<TInstant> {
    accepted: InputLevel,
    last_raw: InputLevel,
    changed_at: Option<TInstant>,
}

impl<TInstant> Debouncer<TInstant>
where
    TInstant: MonotonicInstant,
{
    /// Creates a debouncer resting at the unpressed (high) level.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accepted: InputLevel::High,
            last_raw: InputLevel::High,
            changed_at: None,
        }
    }

    /// Returns the currently accepted (debounced) level.
    #[must_use]
    pub const fn level(&self) -> InputLevel {
        self.accepted
    }

    /// Returns `true` when the debounced state reads as pressed.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.accepted.is_pressed()
    }

    /// Feeds one raw sample; returns the edge if the accepted state moved.
    pub fn sample(&mut self, raw: InputLevel, now: TInstant) -> Option<ButtonEdge> {
        if raw != self.last_raw {
            self.changed_at = Some(now);
            self.last_raw = raw;
        }

        if raw == self.accepted {
            return None;
        }

        let stable_for = match self.changed_at {
            Some(at) => now.saturating_duration_since(at),
            // Never observed a transition: the line has been stable since boot.
            None => Duration::MAX,
        };

        if stable_for < DEBOUNCE_WINDOW {
            return None;
        }

        self.accepted = raw;
        Some(if raw.is_pressed() {
            ButtonEdge::Pressed
        } else {
            ButtonEdge::Released
        })
    }
}

impl<TInstant> Default for Debouncer<TInstant>
where
    TInstant: MonotonicInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
