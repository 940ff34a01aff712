//! Hardware bindings tying the shared charge controller to the MCU.
//!
//! Pin mapping (matches the catalogs in `indicator-core`): buttons on
//! PA0/PA1 with internal pull-ups (active-low), the four stage outputs on
//! PA4-PA7, and the bicolor status indicator on PB0 (red) / PB1 (green).

use indicator_core::clock::MonotonicInstant;
use indicator_core::machine::{ChargeController, Phase};
use indicator_core::stages::{StageId, stage_by_id};

use embassy_time::Instant;

#[cfg(target_os = "none")]
use embassy_stm32::gpio::{Input, Output};
#[cfg(target_os = "none")]
use indicator_core::stages::StatusColor;

/// Cadence of the polling loop; well inside the 50 ms debounce window.
pub const POLL_INTERVAL: embassy_time::Duration = embassy_time::Duration::from_millis(5);

/// Monotonic instant wrapper binding the shared controller to Embassy time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Wraps an Embassy instant.
    #[must_use]
    pub const fn from_embassy(instant: Instant) -> Self {
        Self(instant)
    }

    /// Returns the wrapped Embassy instant.
    #[must_use]
    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    /// Captures the current monotonic instant.
    #[cfg(target_os = "none")]
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self::from_embassy(instant)
    }
}

impl MonotonicInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> core::time::Duration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        core::time::Duration::from_micros(micros)
    }
}

/// Controller type used by the firmware task.
#[cfg(target_os = "none")]
pub type FirmwareController = ChargeController<FirmwareInstant, GpioIndicatorDriver<'static>>;

#[cfg(not(target_os = "none"))]
pub type FirmwareController =
    ChargeController<FirmwareInstant, indicator_core::machine::NoopIndicatorDriver>;

/// Push-pull GPIO writer for the stage and status outputs.
#[cfg(target_os = "none")]
pub struct GpioIndicatorDriver<'d> {
    quarter: Output<'d>,
    half: Output<'d>,
    three_quarters: Output<'d>,
    full: Output<'d>,
    red: Output<'d>,
    green: Output<'d>,
}

#[cfg(target_os = "none")]
impl<'d> GpioIndicatorDriver<'d> {
    pub fn new(
        quarter: Output<'d>,
        half: Output<'d>,
        three_quarters: Output<'d>,
        full: Output<'d>,
        red: Output<'d>,
        green: Output<'d>,
    ) -> Self {
        Self {
            quarter,
            half,
            three_quarters,
            full,
            red,
            green,
        }
    }

    fn output_mut(&mut self, stage: StageId) -> &mut Output<'d> {
        match stage {
            StageId::Quarter => &mut self.quarter,
            StageId::Half => &mut self.half,
            StageId::ThreeQuarters => &mut self.three_quarters,
            StageId::Full => &mut self.full,
        }
    }

    fn drive(output: &mut Output<'d>, high: bool) {
        if high {
            output.set_high();
        } else {
            output.set_low();
        }
    }
}

#[cfg(target_os = "none")]
impl<'d> indicator_core::machine::IndicatorDriver for GpioIndicatorDriver<'d> {
    fn set_stage(&mut self, stage: StageId, lit: bool) {
        Self::drive(self.output_mut(stage), lit);
        crate::status::record_stage(stage, lit);
    }

    fn set_all_stages(&mut self, lit: bool) {
        Self::drive(&mut self.quarter, lit);
        Self::drive(&mut self.half, lit);
        Self::drive(&mut self.three_quarters, lit);
        Self::drive(&mut self.full, lit);
        crate::status::record_all_stages(lit);
    }

    fn set_status(&mut self, color: StatusColor) {
        Self::drive(&mut self.red, color.red_high());
        Self::drive(&mut self.green, color.green_high());
        crate::status::record_status(color);
    }
}

/// Pulled-up active-low button reads.
#[cfg(target_os = "none")]
pub struct ButtonInputs<'d> {
    start: Input<'d>,
    stop: Input<'d>,
}

#[cfg(target_os = "none")]
impl<'d> ButtonInputs<'d> {
    pub fn new(start: Input<'d>, stop: Input<'d>) -> Self {
        Self { start, stop }
    }

    /// Samples both raw levels (pressed buttons read low).
    pub fn read(&self) -> (
        indicator_core::buttons::InputLevel,
        indicator_core::buttons::InputLevel,
    ) {
        (level_of(self.start.is_high()), level_of(self.stop.is_high()))
    }
}

#[cfg(target_os = "none")]
fn level_of(is_high: bool) -> indicator_core::buttons::InputLevel {
    if is_high {
        indicator_core::buttons::InputLevel::High
    } else {
        indicator_core::buttons::InputLevel::Low
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Charging => "charging",
        Phase::TerminalBlink => "terminal-blink",
    }
}

#[cfg(target_os = "none")]
pub fn log_phase_change(from: Phase, to: Phase, forced: bool, timestamp: FirmwareInstant) {
    let timestamp = timestamp.into_embassy();
    defmt::info!(
        "indicator: {} -> {} forced={} t={}us",
        phase_label(from),
        phase_label(to),
        forced,
        timestamp.as_micros()
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_phase_change(from: Phase, to: Phase, forced: bool, timestamp: FirmwareInstant) {
    let timestamp = timestamp.into_embassy();
    println!(
        "indicator: {} -> {} forced={} t={}us",
        phase_label(from),
        phase_label(to),
        forced,
        timestamp.as_micros()
    );
}

#[cfg(target_os = "none")]
pub fn log_stage_latched(stage: StageId, timestamp: FirmwareInstant) {
    let timestamp = timestamp.into_embassy();
    let line = stage_by_id(stage);
    defmt::info!(
        "stages:{} latched pin={} ({=u8}%) t={}us",
        line.name,
        line.mcu_pin,
        line.percent,
        timestamp.as_micros()
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_stage_latched(stage: StageId, timestamp: FirmwareInstant) {
    let timestamp = timestamp.into_embassy();
    let line = stage_by_id(stage);
    println!(
        "stages:{} latched pin={} ({}%) t={}us",
        line.name,
        line.mcu_pin,
        line.percent,
        timestamp.as_micros()
    );
}
