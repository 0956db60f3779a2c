#![allow(missing_docs)]
//! Host-level tests for handle ownership: creation, release and drop order.

use button_envoy::Error;
use button_envoy::button::sim_driver::{DriverCall, SimDriver, SimHandle};
use button_envoy::button::{ActiveLevel, Button, ButtonEvent};

fn deleted_handles(driver: &SimDriver) -> Vec<SimHandle> {
    driver
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::Delete { handle } => Some(*handle),
            _ => None,
        })
        .collect()
}

#[test]
fn construct_then_drop_balances_create_and_delete() {
    let driver: SimDriver = SimDriver::default();

    for pin in [0_u8, 5, 13, 29] {
        for active_level in [ActiveLevel::High, ActiveLevel::Low] {
            let button = Button::new(&driver, pin, active_level).expect("create");
            assert_eq!(driver.live_count(), 1);
            drop(button);
            assert_eq!(driver.live_count(), 0);
        }
    }

    assert_eq!(driver.created_count(), 8);
    assert_eq!(driver.deleted_count(), 8);
}

#[test]
fn create_receives_pin_and_active_level_verbatim() {
    let driver: SimDriver = SimDriver::default();

    let button = Button::new(&driver, 17, ActiveLevel::Low).expect("create");

    assert_eq!(
        driver.calls().first(),
        Some(&DriverCall::Create {
            pin: 17,
            active_level: ActiveLevel::Low,
        })
    );
    assert_eq!(button.pin(), 17);
    assert_eq!(button.active_level(), ActiveLevel::Low);
}

#[test]
fn default_active_level_is_high() {
    assert_eq!(ActiveLevel::default(), ActiveLevel::High);
    assert!(ActiveLevel::High.is_pressed(true));
    assert!(ActiveLevel::Low.is_pressed(false));
}

#[test]
fn two_pins_own_distinct_handles() {
    let driver: SimDriver = SimDriver::default();

    let first = Button::new(&driver, 2, ActiveLevel::High).expect("create first");
    let second = Button::new(&driver, 3, ActiveLevel::High).expect("create second");

    assert_ne!(first.handle(), second.handle());
    assert_eq!(driver.live_count(), 2);
}

#[test]
fn drop_releases_handles_in_lifo_order() {
    let driver: SimDriver = SimDriver::default();

    let first = Button::new(&driver, 2, ActiveLevel::High).expect("create first");
    let second = Button::new(&driver, 3, ActiveLevel::High).expect("create second");
    let (first_handle, second_handle) = (first.handle(), second.handle());

    drop(second);
    drop(first);

    assert_eq!(deleted_handles(&driver), [second_handle, first_handle]);
}

#[test]
fn scope_end_releases_handles_in_lifo_order() {
    let driver: SimDriver = SimDriver::default();
    let handles = {
        let first = Button::new(&driver, 2, ActiveLevel::High).expect("create first");
        let second = Button::new(&driver, 3, ActiveLevel::High).expect("create second");
        (first.handle(), second.handle())
    };

    assert_eq!(deleted_handles(&driver), [handles.1, handles.0]);
}

#[test]
fn construction_fails_when_driver_is_out_of_handles() {
    let driver: SimDriver<1> = SimDriver::default();

    let _first = Button::new(&driver, 2, ActiveLevel::High).expect("create first");
    let second = Button::new(&driver, 3, ActiveLevel::High);

    assert_eq!(second.err(), Some(Error::OutOfHandles));
    assert_eq!(driver.created_count(), 1);
    // The failed construction never owned a handle, so nothing extra is deleted.
    assert_eq!(driver.deleted_count(), 0);
}

#[test]
fn construction_fails_for_a_pin_already_owned() {
    let driver: SimDriver = SimDriver::default();

    let first = Button::new(&driver, 6, ActiveLevel::High).expect("create first");
    let second = Button::new(&driver, 6, ActiveLevel::Low);
    assert_eq!(second.err(), Some(Error::PinInUse));

    drop(first);
    let third = Button::new(&driver, 6, ActiveLevel::Low);
    assert!(third.is_ok());
}

#[test]
fn handles_are_not_reused_after_release() {
    let driver: SimDriver = SimDriver::default();

    let first_handle = Button::new(&driver, 2, ActiveLevel::High)
        .expect("create first")
        .handle();
    let second_handle = Button::new(&driver, 2, ActiveLevel::High)
        .expect("create second")
        .handle();

    assert_ne!(first_handle, second_handle);
}

#[test]
fn released_handle_is_inert() {
    let driver: SimDriver = SimDriver::default();

    let handle = Button::new(&driver, 4, ActiveLevel::High)
        .expect("create")
        .handle();

    assert_eq!(driver.fire(handle, ButtonEvent::Tap), Err(Error::InvalidHandle));
    assert_eq!(driver.press(handle), Err(Error::InvalidHandle));
}

#[test]
fn call_log_keeps_most_recent_calls() {
    let driver: SimDriver = SimDriver::default();
    let mut button = Button::new(&driver, 4, ActiveLevel::High).expect("create");

    for _ in 0..40 {
        button
            .remove_callback(ButtonEvent::Push)
            .expect("remove push");
    }

    let calls = driver.calls();
    assert_eq!(calls.len(), button_envoy::button::sim_driver::CALL_LOG_CAPACITY);
    assert!(
        calls
            .iter()
            .all(|call| matches!(call, DriverCall::RemoveCallback { .. }))
    );

    driver.clear_calls();
    assert!(driver.calls().is_empty());
}
