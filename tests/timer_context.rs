#![allow(missing_docs)]
//! Host-level tests for where callbacks run: on the thread that drives the
//! simulated driver's timer, never on the thread that changes pin levels.

use std::sync::Mutex;
use std::thread::{self, ThreadId};
use std::time::{Duration as StdDuration, Instant};

use button_envoy::button::sim_driver::SimDriver;
use button_envoy::button::{ActiveLevel, Button, ButtonEvent, Callback};
use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;

type Journal = Mutex<Vec<(&'static str, ThreadId)>>;

fn new_journal() -> &'static Journal {
    Box::leak(Box::new(Mutex::new(Vec::new())))
}

/// A callback that records `label` and the thread it ran on.
fn journal_entry(journal: &'static Journal, label: &'static str) -> Callback {
    let callback: &'static _ = Box::leak(Box::new(move || {
        journal
            .lock()
            .expect("journal lock")
            .push((label, thread::current().id()));
    }));
    Callback::from(callback)
}

fn entries(journal: &Journal) -> Vec<(&'static str, ThreadId)> {
    journal.lock().expect("journal lock").clone()
}

fn labels(journal: &Journal) -> Vec<&'static str> {
    entries(journal).into_iter().map(|(label, _)| label).collect()
}

// Polls `condition` for up to ten seconds.
fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + StdDuration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(StdDuration::from_millis(1));
    }
    condition()
}

#[test]
fn level_changes_run_callbacks_on_the_advancing_thread() {
    let driver: SimDriver = SimDriver::default();
    let mut button = Button::new(&driver, 4, ActiveLevel::High).expect("create");
    let journal = new_journal();

    button
        .set_event_callback(ButtonEvent::Push, journal_entry(journal, "push"))
        .expect("set push");
    button
        .set_event_callback(ButtonEvent::Release, journal_entry(journal, "release"))
        .expect("set release");
    button
        .set_event_callback(ButtonEvent::Tap, journal_entry(journal, "tap"))
        .expect("set tap");

    let advance_on_other_thread = || {
        thread::scope(|scope| {
            scope
                .spawn(|| {
                    driver.advance_ticks(1);
                    thread::current().id()
                })
                .join()
                .expect("timer thread")
        })
    };

    driver.set_level(4, true);
    assert!(entries(journal).is_empty());
    let push_timer = advance_on_other_thread();

    driver.set_level(4, false);
    assert_eq!(labels(journal), ["push"]);
    let release_timer = advance_on_other_thread();

    let caller = thread::current().id();
    assert_eq!(
        entries(journal),
        [
            ("push", push_timer),
            ("release", release_timer),
            ("tap", release_timer),
        ]
    );
    assert!(entries(journal).iter().all(|(_, ran_on)| *ran_on != caller));
}

#[test]
fn timer_service_runs_hold_callbacks_on_its_own_thread() {
    const TICK_HZ: u32 = 1_000;
    const PERIOD: Duration = Duration::from_millis(1);

    let driver: SimDriver = SimDriver::new(TICK_HZ);
    let stop: Signal<CriticalSectionRawMutex, ()> = Signal::new();
    let mut button = Button::new(&driver, 7, ActiveLevel::Low).expect("create");
    let journal = new_journal();

    button
        .set_event_callback(ButtonEvent::Push, journal_entry(journal, "push"))
        .expect("set push");
    button
        .add_on_press_callback(1, journal_entry(journal, "hold"))
        .expect("add 1s");
    button
        .set_serial_callback(journal_entry(journal, "serial"), 100, 0)
        .expect("set serial");
    button
        .set_event_callback(ButtonEvent::Release, journal_entry(journal, "release"))
        .expect("set release");

    let has = |label: &'static str| move || labels(journal).contains(&label);
    let (service, held, released) = thread::scope(|scope| {
        let service = scope.spawn(|| {
            block_on(select(driver.timer_service(PERIOD), stop.wait()));
        });
        let service_id = service.thread().id();

        driver.set_level(7, false);
        let held = wait_until(has("hold"));
        driver.set_level(7, true);
        let released = wait_until(has("release"));

        // Stop the service before asserting so a failure cannot leave it running.
        stop.signal(());
        service.join().expect("timer service thread");
        (service_id, held, released)
    });

    assert!(held, "on-press callback did not fire: {:?}", labels(journal));
    assert!(released, "release did not fire: {:?}", labels(journal));
    let recorded = labels(journal);
    assert_eq!(recorded.first(), Some(&"push"));
    assert!(recorded.iter().filter(|label| **label == "serial").count() >= 2);
    assert!(
        entries(journal)
            .iter()
            .all(|(_, ran_on)| *ran_on == service)
    );
}
