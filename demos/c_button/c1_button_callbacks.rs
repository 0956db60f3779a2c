//! Button callbacks on a Pico 1: a polled pin feeds the simulated driver, whose timer
//! service runs the callbacks.
#![no_std]
#![no_main]

use button_envoy::Result;
use button_envoy::button::sim_driver::SimDriver;
use button_envoy::button::{ActiveLevel, Button, ButtonEvent, Callback};
use core::convert::Infallible;
use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

const BUTTON_PIN: u8 = 13;

// 100 ticks per second: the serial interval below is in these ticks.
static DRIVER: SimDriver = SimDriver::new(100);
const TIMER_PERIOD: Duration = Duration::from_millis(10);
const POLL_PERIOD: Duration = Duration::from_millis(5);

fn on_tap() {
    info!("tap");
}
static ON_TAP: fn() = on_tap;

fn on_hold() {
    info!("held for 2 s");
}
static ON_HOLD: fn() = on_hold;

fn on_repeat() {
    info!("still held");
}
static ON_REPEAT: fn() = on_repeat;

fn on_long_release() {
    info!("released after a long hold");
}
static ON_LONG_RELEASE: fn() = on_long_release;

#[embassy_executor::task]
async fn timer_service_task() -> ! {
    DRIVER.timer_service(TIMER_PERIOD).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // Button wired to GND, so the pin is pulled up and reads low while pressed.
    let input = Input::new(p.PIN_13, Pull::Up);

    let mut button = Button::new(&DRIVER, BUTTON_PIN, ActiveLevel::Low)?;
    button.set_event_callback(ButtonEvent::Tap, Callback::new(&ON_TAP))?;
    button.add_on_press_callback(2, Callback::new(&ON_HOLD))?;
    button.add_on_release_callback(2, Callback::new(&ON_LONG_RELEASE))?;
    // Every half second once held for 3 s.
    button.set_serial_callback(Callback::new(&ON_REPEAT), 50, 3)?;

    // Callbacks run on the timer-service task, not on the polling loop below.
    spawner.must_spawn(timer_service_task());

    // Raw levels, no debouncing: a bouncing contact shows up as extra taps.
    let mut was_high = input.is_high();
    DRIVER.set_level(BUTTON_PIN, was_high);
    loop {
        Timer::after(POLL_PERIOD).await;
        let high = input.is_high();
        if high != was_high {
            DRIVER.set_level(BUTTON_PIN, high);
            was_high = high;
        }
    }
}
