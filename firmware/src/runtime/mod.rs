use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};

use crate::indicator::{ButtonInputs, FirmwareController, GpioIndicatorDriver};
use indicator_core::machine::ChargeController;

mod indicator_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        PA7,
        PB0,
        PB1,
        ..
    } = hal::init(config);

    let driver = GpioIndicatorDriver::new(
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
        Output::new(PA7, Level::Low, Speed::Low),
        Output::new(PB0, Level::Low, Speed::Low),
        Output::new(PB1, Level::Low, Speed::Low),
    );
    let buttons = ButtonInputs::new(Input::new(PA0, Pull::Up), Input::new(PA1, Pull::Up));

    let controller: FirmwareController = ChargeController::with_driver(driver);

    spawner
        .spawn(indicator_task::run(controller, buttons))
        .expect("failed to spawn indicator task");

    core::future::pending::<()>().await;
}
