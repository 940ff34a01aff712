//! Lock-free mirror of the panel state, written by the indicator task and
//! readable from any context (debug probes, future wire protocols).

use portable_atomic::{AtomicU8, Ordering};

use indicator_core::machine::Phase;
use indicator_core::stages::{STAGE_COUNT, StageId, StatusColor};

static STAGE_MASK: AtomicU8 = AtomicU8::new(0);
static PHASE: AtomicU8 = AtomicU8::new(PHASE_IDLE);
static STATUS: AtomicU8 = AtomicU8::new(STATUS_READY);

const PHASE_IDLE: u8 = 0;
const PHASE_CHARGING: u8 = 1;
const PHASE_TERMINAL: u8 = 2;
const PHASE_FORCED_BIT: u8 = 0x80;

const STATUS_READY: u8 = 0;
const STATUS_CHARGING: u8 = 1;

/// Point-in-time copy of the mirrored panel state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub forced: bool,
    pub status: StatusColor,
    pub stage_mask: u8,
}

impl StatusSnapshot {
    /// Whether the given stage output is currently driven high.
    #[must_use]
    pub const fn stage_lit(&self, stage: StageId) -> bool {
        self.stage_mask & bit_for(stage) != 0
    }
}

const fn bit_for(stage: StageId) -> u8 {
    1 << stage.as_index()
}

const ALL_STAGES_MASK: u8 = (1 << STAGE_COUNT) - 1;

pub fn record_stage(stage: StageId, lit: bool) {
    if lit {
        STAGE_MASK.fetch_or(bit_for(stage), Ordering::Relaxed);
    } else {
        STAGE_MASK.fetch_and(!bit_for(stage), Ordering::Relaxed);
    }
}

pub fn record_all_stages(lit: bool) {
    let mask = if lit { ALL_STAGES_MASK } else { 0 };
    STAGE_MASK.store(mask, Ordering::Relaxed);
}

pub fn record_status(color: StatusColor) {
    let raw = match color {
        StatusColor::Ready => STATUS_READY,
        StatusColor::Charging => STATUS_CHARGING,
    };
    STATUS.store(raw, Ordering::Relaxed);
}

pub fn record_phase(phase: Phase, forced: bool) {
    let mut raw = match phase {
        Phase::Idle => PHASE_IDLE,
        Phase::Charging => PHASE_CHARGING,
        Phase::TerminalBlink => PHASE_TERMINAL,
    };
    if forced {
        raw |= PHASE_FORCED_BIT;
    }
    PHASE.store(raw, Ordering::Relaxed);
}

/// Reads a consistent-enough snapshot for reporting. Each field is atomic
/// on its own; the task updates them between polls, not mid-write.
#[must_use]
pub fn snapshot() -> StatusSnapshot {
    let raw_phase = PHASE.load(Ordering::Relaxed);
    let phase = match raw_phase & !PHASE_FORCED_BIT {
        PHASE_CHARGING => Phase::Charging,
        PHASE_TERMINAL => Phase::TerminalBlink,
        _ => Phase::Idle,
    };
    let status = if STATUS.load(Ordering::Relaxed) == STATUS_CHARGING {
        StatusColor::Charging
    } else {
        StatusColor::Ready
    };
    StatusSnapshot {
        phase,
        forced: raw_phase & PHASE_FORCED_BIT != 0,
        status,
        stage_mask: STAGE_MASK.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The statics are process-wide, so one test exercises the whole
    // record/snapshot surface sequentially.
    #[test]
    fn mirror_tracks_writes_in_order() {
        record_all_stages(false);
        record_status(StatusColor::Ready);
        record_phase(Phase::Idle, false);

        let idle = snapshot();
        assert_eq!(idle.phase, Phase::Idle);
        assert!(!idle.forced);
        assert_eq!(idle.status, StatusColor::Ready);
        assert_eq!(idle.stage_mask, 0);

        record_phase(Phase::Charging, false);
        record_status(StatusColor::Charging);
        record_stage(StageId::Quarter, true);
        record_stage(StageId::Half, true);

        let charging = snapshot();
        assert_eq!(charging.phase, Phase::Charging);
        assert_eq!(charging.status, StatusColor::Charging);
        assert!(charging.stage_lit(StageId::Quarter));
        assert!(charging.stage_lit(StageId::Half));
        assert!(!charging.stage_lit(StageId::Full));

        record_stage(StageId::Quarter, false);
        assert!(!snapshot().stage_lit(StageId::Quarter));

        record_phase(Phase::TerminalBlink, true);
        record_all_stages(true);
        let forced = snapshot();
        assert_eq!(forced.phase, Phase::TerminalBlink);
        assert!(forced.forced);
        assert_eq!(forced.stage_mask, ALL_STAGES_MASK);

        record_all_stages(false);
        record_phase(Phase::Idle, false);
        assert_eq!(snapshot().stage_mask, 0);
    }
}
