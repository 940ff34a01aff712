use embassy_time::{Instant, Timer};

use crate::indicator::{
    ButtonInputs, FirmwareController, FirmwareInstant, POLL_INTERVAL, log_phase_change,
    log_stage_latched,
};
use crate::status;
use indicator_core::events::EventRecorder;
use indicator_core::stages::StageId;

#[embassy_executor::task]
pub async fn run(mut controller: FirmwareController, buttons: ButtonInputs<'static>) -> ! {
    let mut events: EventRecorder<FirmwareInstant> = EventRecorder::new();
    let mut last_phase = controller.phase();
    let mut last_stage_index = controller.stage_index();
    status::record_phase(last_phase, controller.forced());

    loop {
        let (start, stop) = buttons.read();
        let now = FirmwareInstant::from(Instant::now());
        controller.poll(start, stop, now, &mut events);

        let phase = controller.phase();
        if phase != last_phase {
            status::record_phase(phase, controller.forced());
            log_phase_change(last_phase, phase, controller.forced(), now);
            last_phase = phase;
        }

        let stage_index = controller.stage_index();
        if stage_index > last_stage_index
            && let Some(stage) = StageId::from_index(stage_index - 1)
        {
            log_stage_latched(stage, now);
        }
        last_stage_index = stage_index;

        Timer::after(POLL_INTERVAL).await;
    }
}
