//! Polled charge state machine shared by firmware and host targets.
//!
//! One controller instance owns the whole indicator: it debounces the two
//! buttons, advances the staged blink animation while charging, and runs
//! the synchronized terminal blink on either exit path. The machine is
//! suspension-free; callers invoke [`ChargeController::poll`] from their
//! loop at whatever cadence they like (anything well under the debounce
//! window) and hand in the current monotonic instant.

use core::fmt;
use core::time::Duration;

use crate::buttons::{ButtonEdge, Debouncer, InputLevel, STOP_HOLD_THRESHOLD};
use crate::clock::MonotonicInstant;
use crate::events::{EventRecorder, IndicatorEventKind};
use crate::stages::{BLINK_INTERVAL, BLINK_TOGGLES, STAGE_COUNT, StageId, StatusColor};

/// Abstraction over the physical indicator outputs.
///
/// Implementations are pure hardware-write wrappers; all sequencing logic
/// stays in the controller.
pub trait IndicatorDriver {
    /// Drives a single stage output high (lit) or low.
    fn set_stage(&mut self, stage: StageId, lit: bool);

    /// Drives all four stage outputs to the same level.
    fn set_all_stages(&mut self, lit: bool);

    /// Selects the bicolor status indicator color.
    fn set_status(&mut self, color: StatusColor);
}

/// Indicator driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopIndicatorDriver;

impl NoopIndicatorDriver {
    /// Creates a new no-op indicator driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IndicatorDriver for NoopIndicatorDriver {
    fn set_stage(&mut self, _: StageId, _: bool) {}

    fn set_all_stages(&mut self, _: bool) {}

    fn set_status(&mut self, _: StatusColor) {}
}

/// Mutually exclusive lifecycle phases of the indicator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Resting: all stages dark, status shows ready.
    Idle,
    /// Staged progress animation is running.
    Charging,
    /// Synchronized all-stage blink before returning to idle.
    TerminalBlink,
}

impl Phase {
    /// Returns `true` while any blink animation is in flight.
    #[must_use]
    pub const fn is_animating(self) -> bool {
        matches!(self, Phase::Charging | Phase::TerminalBlink)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Charging => f.write_str("charging"),
            Phase::TerminalBlink => f.write_str("terminal-blink"),
        }
    }
}

/// Polled state machine driving the charging visualization.
pub struct ChargeController<TInstant, D = NoopIndicatorDriver>
where
    TInstant: MonotonicInstant,
    D: IndicatorDriver,
{
    driver: D,
    phase: Phase,
    forced: bool,
    stage_index: usize,
    blink_phase: bool,
    blink_count: u8,
    last_blink_at: Option<TInstant>,
    press_started_at: Option<TInstant>,
    start_button: Debouncer<TInstant>,
    stop_button: Debouncer<TInstant>,
}

impl<TInstant, D> ChargeController<TInstant, D>
where
    TInstant: MonotonicInstant,
    D: IndicatorDriver,
{
    /// Creates a controller and drives the hardware to the idle visual.
    #[must_use]
    pub fn with_driver(mut driver: D) -> Self {
        driver.set_all_stages(false);
        driver.set_status(StatusColor::Ready);
        Self {
            driver,
            phase: Phase::Idle,
            forced: false,
            stage_index: 0,
            blink_phase: false,
            blink_count: 0,
            last_blink_at: None,
            press_started_at: None,
            start_button: Debouncer::new(),
            stop_button: Debouncer::new(),
        }
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` when the active terminal blink came from a forced stop.
    ///
    /// Both exit paths share the same blink routine; the flag records
    /// provenance only and is cleared on the transition back to idle.
    #[must_use]
    pub const fn forced(&self) -> bool {
        self.forced
    }

    /// Index of the stage currently blinking, meaningful while charging.
    #[must_use]
    pub const fn stage_index(&self) -> usize {
        self.stage_index
    }

    /// Stage currently blinking, if the controller is charging.
    #[must_use]
    pub fn current_stage(&self) -> Option<StageId> {
        match self.phase {
            Phase::Charging => StageId::from_index(self.stage_index),
            Phase::Idle | Phase::TerminalBlink => None,
        }
    }

    /// Debounced state of the start button.
    #[must_use]
    pub const fn start_pressed(&self) -> bool {
        self.start_button.is_pressed()
    }

    /// Debounced state of the stop button.
    #[must_use]
    pub const fn stop_pressed(&self) -> bool {
        self.stop_button.is_pressed()
    }

    /// Returns an immutable handle to the owned driver.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns a mutable handle to the owned driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Runs one loop iteration: sample inputs, then advance the animation.
    pub fn poll<const CAPACITY: usize>(
        &mut self,
        start_raw: InputLevel,
        stop_raw: InputLevel,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        self.sample_inputs(start_raw, stop_raw, now, events);

        match self.phase {
            Phase::Idle => {}
            Phase::Charging => self.service_charging(now, events),
            Phase::TerminalBlink => self.service_terminal(now, events),
        }
    }

    /// Cuts a running charge short, entering the terminal blink.
    ///
    /// Callable at any time; has effect only while charging, so repeated
    /// triggers and triggers from idle or the terminal blink are no-ops.
    pub fn force_stop<const CAPACITY: usize>(
        &mut self,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        if self.phase != Phase::Charging {
            return;
        }

        self.press_started_at = None;
        self.enter_terminal(true, now);
        events.record(IndicatorEventKind::ForcedStop, now);
    }

    fn sample_inputs<const CAPACITY: usize>(
        &mut self,
        start_raw: InputLevel,
        stop_raw: InputLevel,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        if self.start_button.sample(start_raw, now) == Some(ButtonEdge::Pressed)
            && self.phase == Phase::Idle
        {
            self.begin_charging(now, events);
        }

        match self.stop_button.sample(stop_raw, now) {
            // Arm the long-press mark only while a charge is running; a
            // press begun in any other phase must never carry over.
            Some(ButtonEdge::Pressed) if self.phase == Phase::Charging => {
                self.press_started_at = Some(now);
            }
            Some(ButtonEdge::Released) => {
                self.press_started_at = None;
            }
            _ => {}
        }

        if self.phase == Phase::Charging
            && self.stop_button.is_pressed()
            && let Some(started) = self.press_started_at
            && now.saturating_duration_since(started) >= STOP_HOLD_THRESHOLD
        {
            self.force_stop(now, events);
        }
    }

    fn begin_charging<const CAPACITY: usize>(
        &mut self,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        self.driver.set_status(StatusColor::Charging);
        self.driver.set_all_stages(false);
        self.phase = Phase::Charging;
        self.stage_index = 0;
        self.blink_phase = false;
        self.blink_count = 0;
        self.last_blink_at = Some(now);
        events.record(IndicatorEventKind::ChargeStarted, now);
    }

    fn service_charging<const CAPACITY: usize>(
        &mut self,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        if !self.blink_interval_elapsed(now) {
            return;
        }

        let Some(stage) = StageId::from_index(self.stage_index) else {
            return;
        };

        self.blink_phase = !self.blink_phase;
        self.driver.set_stage(stage, self.blink_phase);
        self.last_blink_at = Some(now);
        self.blink_count += 1;

        if self.blink_count < BLINK_TOGGLES {
            return;
        }

        // Blinked out: latch this stage fully lit and move on.
        self.driver.set_stage(stage, true);
        self.blink_phase = false;
        self.blink_count = 0;
        self.stage_index += 1;
        events.record(IndicatorEventKind::StageLatched(stage), now);

        if self.stage_index >= STAGE_COUNT {
            self.enter_terminal(false, now);
            events.record(IndicatorEventKind::ChargeComplete, now);
        }
    }

    fn service_terminal<const CAPACITY: usize>(
        &mut self,
        now: TInstant,
        events: &mut EventRecorder<TInstant, CAPACITY>,
    ) {
        if !self.blink_interval_elapsed(now) {
            return;
        }

        self.blink_phase = !self.blink_phase;
        self.driver.set_all_stages(self.blink_phase);
        self.last_blink_at = Some(now);
        self.blink_count += 1;

        if self.blink_count < BLINK_TOGGLES {
            return;
        }

        self.driver.set_all_stages(false);
        self.driver.set_status(StatusColor::Ready);
        self.phase = Phase::Idle;
        self.forced = false;
        self.stage_index = 0;
        self.blink_phase = false;
        self.blink_count = 0;
        self.last_blink_at = None;
        self.press_started_at = None;
        events.record(IndicatorEventKind::ReturnedToIdle, now);
    }

    fn enter_terminal(&mut self, forced: bool, now: TInstant) {
        self.driver.set_all_stages(false);
        self.phase = Phase::TerminalBlink;
        self.forced = forced;
        self.blink_phase = false;
        self.blink_count = 0;
        self.last_blink_at = Some(now);
    }

    fn blink_interval_elapsed(&self, now: TInstant) -> bool {
        let elapsed = self
            .last_blink_at
            .map_or(Duration::MAX, |at| now.saturating_duration_since(at));
        elapsed >= BLINK_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TickInstant;
    use crate::events::EventRecorder;
    use crate::stages::STAGE_COUNT;

    const PRESSED: InputLevel = InputLevel::Low;
    const RELEASED: InputLevel = InputLevel::High;

    #[derive(Default)]
    struct MockPanel {
        stages: [bool; STAGE_COUNT],
        status: Option<StatusColor>,
        stage_writes: usize,
    }

    impl IndicatorDriver for MockPanel {
        fn set_stage(&mut self, stage: StageId, lit: bool) {
            self.stages[stage.as_index()] = lit;
            self.stage_writes += 1;
        }

        fn set_all_stages(&mut self, lit: bool) {
            self.stages = [lit; STAGE_COUNT];
        }

        fn set_status(&mut self, color: StatusColor) {
            self.status = Some(color);
        }
    }

    type Controller = ChargeController<TickInstant, MockPanel>;
    type Events = EventRecorder<TickInstant, 64>;

    fn at(millis: u64) -> TickInstant {
        TickInstant::from_millis(millis)
    }

    fn controller() -> (Controller, Events) {
        (ChargeController::with_driver(MockPanel::default()), Events::new())
    }

    /// Drives the controller one poll per simulated millisecond.
    fn run_quiet(controller: &mut Controller, events: &mut Events, from_ms: u64, to_ms: u64) {
        for millis in from_ms..=to_ms {
            controller.poll(RELEASED, RELEASED, at(millis), events);
        }
    }

    /// Polls with the start button held from t=0 until the edge is accepted.
    fn start_charge(controller: &mut Controller, events: &mut Events) {
        for millis in 0..=50 {
            controller.poll(PRESSED, RELEASED, at(millis), events);
        }
        assert_eq!(controller.phase(), Phase::Charging);
    }

    #[test]
    fn construction_drives_idle_visual() {
        let (controller, _) = controller();
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.forced());
        assert_eq!(controller.stage_index(), 0);
        assert_eq!(controller.driver().status, Some(StatusColor::Ready));
        assert_eq!(controller.driver().stages, [false; STAGE_COUNT]);
    }

    #[test]
    fn debounced_start_press_begins_charging() {
        let (mut controller, mut events) = controller();

        controller.poll(PRESSED, RELEASED, at(0), &mut events);
        assert_eq!(controller.phase(), Phase::Idle);

        controller.poll(PRESSED, RELEASED, at(50), &mut events);
        assert_eq!(controller.phase(), Phase::Charging);
        assert_eq!(controller.stage_index(), 0);
        assert_eq!(controller.current_stage(), Some(StageId::Quarter));
        assert_eq!(controller.driver().status, Some(StatusColor::Charging));
        assert_eq!(
            events.latest().map(|record| record.event),
            Some(IndicatorEventKind::ChargeStarted)
        );
    }

    #[test]
    fn start_press_while_charging_is_ignored() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);
        let recorded = events.len();

        // Release and press start again mid-charge.
        for millis in 51..=200 {
            controller.poll(RELEASED, RELEASED, at(millis), &mut events);
        }
        for millis in 201..=400 {
            controller.poll(PRESSED, RELEASED, at(millis), &mut events);
        }

        assert_eq!(controller.phase(), Phase::Charging);
        assert_eq!(controller.stage_index(), 0);
        assert_eq!(events.len(), recorded);
    }

    #[test]
    fn stage_blinks_six_toggles_then_latches() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);

        // First toggle lands one interval after the charge began (t=50).
        run_quiet(&mut controller, &mut events, 51, 649);
        assert!(!controller.driver().stages[0]);

        run_quiet(&mut controller, &mut events, 650, 650);
        assert!(controller.driver().stages[0]);

        // Sixth toggle at t=50+6*600 latches the stage and advances.
        run_quiet(&mut controller, &mut events, 651, 3_650);
        assert_eq!(controller.stage_index(), 1);
        assert!(controller.driver().stages[0]);
        assert_eq!(
            events.latest().map(|record| record.event),
            Some(IndicatorEventKind::StageLatched(StageId::Quarter))
        );
    }

    #[test]
    fn full_sequence_reaches_terminal_then_idle() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);

        // 4 stages x 6 toggles x 600 ms after the charge began at t=50.
        run_quiet(&mut controller, &mut events, 51, 14_450);
        assert_eq!(controller.phase(), Phase::TerminalBlink);
        assert!(!controller.forced());
        assert_eq!(controller.driver().stages, [false; STAGE_COUNT]);

        // Terminal blink holds the charging color until idle.
        assert_eq!(controller.driver().status, Some(StatusColor::Charging));

        run_quiet(&mut controller, &mut events, 14_451, 18_050);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.forced());
        assert_eq!(controller.stage_index(), 0);
        assert_eq!(controller.driver().status, Some(StatusColor::Ready));
        assert_eq!(controller.driver().stages, [false; STAGE_COUNT]);
        assert_eq!(
            events.latest().map(|record| record.event),
            Some(IndicatorEventKind::ReturnedToIdle)
        );
    }

    #[test]
    fn terminal_blink_toggles_all_stages_together() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);
        run_quiet(&mut controller, &mut events, 51, 14_450);
        assert_eq!(controller.phase(), Phase::TerminalBlink);

        // One interval in, every stage lights at once.
        run_quiet(&mut controller, &mut events, 14_451, 15_050);
        assert_eq!(controller.driver().stages, [true; STAGE_COUNT]);

        run_quiet(&mut controller, &mut events, 15_051, 15_650);
        assert_eq!(controller.driver().stages, [false; STAGE_COUNT]);
    }

    #[test]
    fn stop_long_press_forces_terminal_blink() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);

        run_quiet(&mut controller, &mut events, 51, 4_999);
        assert_eq!(controller.phase(), Phase::Charging);

        // Hold stop from t=5000; edge accepted at 5050, trigger at 6050.
        for millis in 5_000..=6_049 {
            controller.poll(RELEASED, PRESSED, at(millis), &mut events);
        }
        assert_eq!(controller.phase(), Phase::Charging);

        controller.poll(RELEASED, PRESSED, at(6_050), &mut events);
        assert_eq!(controller.phase(), Phase::TerminalBlink);
        assert!(controller.forced());
        assert_eq!(controller.driver().stages, [false; STAGE_COUNT]);
        assert_eq!(
            events.latest().map(|record| record.event),
            Some(IndicatorEventKind::ForcedStop)
        );

        // Exit animation runs to completion and clears the flag.
        for millis in 6_051..=9_650 {
            controller.poll(RELEASED, PRESSED, at(millis), &mut events);
        }
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.forced());
    }

    #[test]
    fn stop_tap_shorter_than_threshold_does_nothing() {
        let (mut controller, mut events) = controller();
        start_charge(&mut controller, &mut events);

        for millis in 51..=500 {
            controller.poll(RELEASED, PRESSED, at(millis), &mut events);
        }
        for millis in 501..=2_000 {
            controller.poll(RELEASED, RELEASED, at(millis), &mut events);
        }

        assert_eq!(controller.phase(), Phase::Charging);
        assert!(!controller.forced());
    }

    #[test]
    fn stop_press_begun_while_idle_never_carries_over() {
        let (mut controller, mut events) = controller();

        // Hold stop for two seconds while idle.
        for millis in 0..=2_000 {
            controller.poll(RELEASED, PRESSED, at(millis), &mut events);
        }
        assert_eq!(controller.phase(), Phase::Idle);

        // Start charging while stop is still held; the stale hold must not
        // trip an instant forced stop.
        for millis in 2_001..=2_051 {
            controller.poll(PRESSED, PRESSED, at(millis), &mut events);
        }
        assert_eq!(controller.phase(), Phase::Charging);

        for millis in 2_052..=3_500 {
            controller.poll(RELEASED, PRESSED, at(millis), &mut events);
        }
        assert_eq!(controller.phase(), Phase::Charging);
        assert!(!controller.forced());
    }

    #[test]
    fn force_stop_is_idempotent_outside_charging() {
        let (mut controller, mut events) = controller();

        controller.force_stop(at(0), &mut events);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.forced());
        assert!(events.is_empty());

        start_charge(&mut controller, &mut events);
        controller.force_stop(at(100), &mut events);
        assert_eq!(controller.phase(), Phase::TerminalBlink);
        assert!(controller.forced());
        let recorded = events.len();

        // Repeat triggers while already blinking change nothing.
        controller.force_stop(at(150), &mut events);
        controller.force_stop(at(200), &mut events);
        assert_eq!(controller.phase(), Phase::TerminalBlink);
        assert!(controller.forced());
        assert_eq!(events.len(), recorded);
    }

    #[test]
    fn bouncing_start_input_never_starts_a_charge() {
        let (mut controller, mut events) = controller();

        let mut now = 0;
        for _ in 0..50 {
            controller.poll(PRESSED, RELEASED, at(now), &mut events);
            now += 10;
            controller.poll(RELEASED, RELEASED, at(now), &mut events);
            now += 10;
        }

        assert_eq!(controller.phase(), Phase::Idle);
        assert!(events.is_empty());
    }
}
