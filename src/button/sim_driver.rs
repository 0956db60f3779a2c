//! An in-memory [`ButtonDriver`] for host tests and hardware-free bring-up.
//!
//! See [`SimDriver`] for details.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Ticker};
use heapless::{Deque, Vec};

use super::driver::ButtonDriver;
use super::{ActiveLevel, ButtonEvent, Callback, Ticks};
use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Tick rate used by [`SimDriver::default`], matching a typical RTOS tick.
pub const DEFAULT_TICK_HZ: u32 = 100;

/// Number of [`DriverCall`]s kept by the call log; older entries are dropped.
pub const CALL_LOG_CAPACITY: usize = 32;

const MICROS_PER_SECOND: u64 = 1_000_000;

// ============================================================================
// SimHandle and DriverCall - What tests observe
// ============================================================================

/// Handle issued by [`SimDriver`]. Ids are never reused within one driver.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimHandle(u32);

impl SimHandle {
    /// The numeric id of this handle.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// One call made to [`SimDriver`] through [`ButtonDriver`], with its arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[expect(missing_docs, reason = "fields mirror the ButtonDriver arguments")]
pub enum DriverCall {
    Create {
        pin: u8,
        active_level: ActiveLevel,
    },
    Delete {
        handle: SimHandle,
    },
    SetEventCallback {
        handle: SimHandle,
        event: ButtonEvent,
    },
    SetSerialCallback {
        handle: SimHandle,
        start_after_secs: u32,
        interval_ticks: Ticks,
    },
    AddOnPressCallback {
        handle: SimHandle,
        press_secs: u32,
    },
    AddOnReleaseCallback {
        handle: SimHandle,
        press_secs: u32,
    },
    RemoveCallback {
        handle: SimHandle,
        event: ButtonEvent,
    },
}

// ============================================================================
// Per-button state
// ============================================================================

#[derive(Clone, Copy)]
struct Threshold {
    press_secs: u32,
    callback: Callback,
}

impl Threshold {
    fn ticks(&self, tick_hz: u32) -> u64 {
        u64::from(self.press_secs).saturating_mul(u64::from(tick_hz))
    }
}

#[derive(Clone, Copy)]
struct Serial {
    callback: Callback,
    start_after_secs: u32,
    interval_ticks: Ticks,
}

impl Serial {
    fn is_due(&self, held_ticks: u64, tick_hz: u32) -> bool {
        let start_ticks = u64::from(self.start_after_secs).saturating_mul(u64::from(tick_hz));
        held_ticks
            .checked_sub(start_ticks)
            .and_then(|since_start| since_start.checked_rem(u64::from(self.interval_ticks)))
            == Some(0)
    }
}

struct Hold {
    ticks: u64,
    // An on-press threshold fired during this hold, so release is not a tap.
    threshold_reached: bool,
}

/// Callbacks collected under the lock and invoked after it is released.
struct Due<const CALLBACKS: usize> {
    first: Option<Callback>,
    thresholds: Vec<Callback, CALLBACKS>,
    last: Option<Callback>,
}

impl<const CALLBACKS: usize> Due<CALLBACKS> {
    fn invoke(self) {
        self.first
            .into_iter()
            .chain(self.thresholds)
            .chain(self.last)
            .for_each(Callback::call);
    }
}

struct Slot<const CALLBACKS: usize> {
    handle: SimHandle,
    pin: u8,
    active_level: ActiveLevel,
    push: Option<Callback>,
    release: Option<Callback>,
    tap: Option<Callback>,
    serial: Option<Serial>,
    on_press: Vec<Threshold, CALLBACKS>,
    on_release: Vec<Threshold, CALLBACKS>,
    hold: Option<Hold>,
    // Level seen on the pin since the last tick, applied by the timer.
    pending_level: Option<bool>,
}

impl<const CALLBACKS: usize> Slot<CALLBACKS> {
    const fn new(handle: SimHandle, pin: u8, active_level: ActiveLevel) -> Self {
        Self {
            handle,
            pin,
            active_level,
            push: None,
            release: None,
            tap: None,
            serial: None,
            on_press: Vec::new(),
            on_release: Vec::new(),
            hold: None,
            pending_level: None,
        }
    }

    const fn event_slot(&mut self, event: ButtonEvent) -> Option<&mut Option<Callback>> {
        match event {
            ButtonEvent::Push => Some(&mut self.push),
            ButtonEvent::Release => Some(&mut self.release),
            ButtonEvent::Tap => Some(&mut self.tap),
            ButtonEvent::Serial => None,
        }
    }

    fn callback_for(&self, event: ButtonEvent) -> Option<Callback> {
        match event {
            ButtonEvent::Push => self.push,
            ButtonEvent::Release => self.release,
            ButtonEvent::Tap => self.tap,
            ButtonEvent::Serial => self.serial.map(|serial| serial.callback),
        }
    }

    fn press(&mut self, tick_hz: u32) -> Option<Due<CALLBACKS>> {
        if self.hold.is_some() {
            return None;
        }
        self.hold = Some(Hold {
            ticks: 0,
            threshold_reached: false,
        });
        Some(self.hold_due(tick_hz, self.push))
    }

    // One timer tick: a pending level change that presses or releases the button takes
    // the place of advancing the hold.
    fn service(&mut self, tick_hz: u32) -> Option<Due<CALLBACKS>> {
        let pressed = self
            .pending_level
            .take()
            .map(|high| self.active_level.is_pressed(high));
        match pressed {
            Some(true) if self.hold.is_none() => self.press(tick_hz),
            Some(false) if self.hold.is_some() => self.release(tick_hz),
            _ => self.tick(tick_hz),
        }
    }

    fn tick(&mut self, tick_hz: u32) -> Option<Due<CALLBACKS>> {
        let hold = self.hold.as_mut()?;
        hold.ticks = hold.ticks.saturating_add(1);
        Some(self.hold_due(tick_hz, None))
    }

    // Collects the on-press thresholds and serial repeat due at the current hold time.
    fn hold_due(&mut self, tick_hz: u32, first: Option<Callback>) -> Due<CALLBACKS> {
        let Some(hold) = self.hold.as_mut() else {
            return Due {
                first,
                thresholds: Vec::new(),
                last: None,
            };
        };
        let held_ticks = hold.ticks;
        let thresholds: Vec<Callback, CALLBACKS> = self
            .on_press
            .iter()
            .filter(|threshold| threshold.ticks(tick_hz) == held_ticks)
            .map(|threshold| threshold.callback)
            .collect();
        if !thresholds.is_empty() {
            hold.threshold_reached = true;
        }
        let last = self
            .serial
            .filter(|serial| serial.is_due(held_ticks, tick_hz))
            .map(|serial| serial.callback);
        Due {
            first,
            thresholds,
            last,
        }
    }

    fn release(&mut self, tick_hz: u32) -> Option<Due<CALLBACKS>> {
        let hold = self.hold.take()?;
        // Latest threshold crossed wins; on a tie the most recent registration wins.
        let latest = self
            .on_release
            .iter()
            .filter(|threshold| threshold.ticks(tick_hz) <= hold.ticks)
            .fold(None::<&Threshold>, |best, threshold| match best {
                Some(best) if best.press_secs > threshold.press_secs => Some(best),
                _ => Some(threshold),
            });
        let last = match latest {
            Some(threshold) => Some(threshold.callback),
            None if !hold.threshold_reached => self.tap,
            None => None,
        };
        Some(Due {
            first: self.release,
            thresholds: Vec::new(),
            last,
        })
    }
}

// ============================================================================
// Driver state
// ============================================================================

struct State<const BUTTONS: usize, const CALLBACKS: usize> {
    slots: [Option<Slot<CALLBACKS>>; BUTTONS],
    next_id: u32,
    created: u32,
    deleted: u32,
    // Remainder of `micros * tick_hz` not yet worth a whole tick.
    carry: u64,
    calls: Deque<DriverCall, CALL_LOG_CAPACITY>,
}

impl<const BUTTONS: usize, const CALLBACKS: usize> State<BUTTONS, CALLBACKS> {
    const fn new() -> Self {
        Self {
            slots: [const { None }; BUTTONS],
            next_id: 1,
            created: 0,
            deleted: 0,
            carry: 0,
            calls: Deque::new(),
        }
    }

    fn record(&mut self, call: DriverCall) {
        trace!("SimDriver: {:?}", call);
        if self.calls.is_full() {
            let _ = self.calls.pop_front();
        }
        // Room was made above.
        let _ = self.calls.push_back(call);
    }

    fn slot_mut(&mut self, handle: SimHandle) -> Result<&mut Slot<CALLBACKS>> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|slot| slot.handle == handle)
            .ok_or(Error::InvalidHandle)
    }

    fn slot_for_pin(&mut self, pin: u8) -> Option<&mut Slot<CALLBACKS>> {
        self.slots.iter_mut().flatten().find(|slot| slot.pin == pin)
    }

    fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

// ============================================================================
// SimDriver
// ============================================================================

/// A button driver that lives entirely in memory.
///
/// It keeps the bookkeeping a real debounced-button driver keeps (handles per pin and
/// the callbacks registered against them) and records every call in a bounded log.
/// Instead of reading GPIO and running timers, it is told what happens.
///
/// [`set_level`](Self::set_level) is the GPIO side: it only records the level. The
/// timer side, [`advance`](Self::advance), [`advance_ticks`](Self::advance_ticks) or a
/// spawned [`timer_service`](Self::timer_service), picks the level up on its next tick
/// and runs the callbacks, so they run on the timer's context and never on the caller
/// of `set_level`. [`press`](Self::press) and [`release`](Self::release) are test
/// shortcuts that apply an edge at once; their caller stands in for the timer. The lock
/// is never held while a callback runs, so callbacks may call back into the driver.
///
/// `BUTTONS` bounds the number of live handles; `CALLBACKS` bounds the on-press and the
/// on-release lists of each handle.
///
/// # Event semantics
///
/// - Press fires [`ButtonEvent::Push`], then any zero-second on-press callbacks, then the
///   serial callback if it starts after zero seconds.
/// - Each tick of a hold fires the on-press callbacks whose threshold is reached exactly
///   then, and the serial callback at `start_after_secs` and every `interval_ticks` after.
/// - Release fires [`ButtonEvent::Release`], then a single on-release callback: the one
///   with the largest threshold not exceeding the hold (the most recently registered on a
///   tie). Without one, it fires [`ButtonEvent::Tap`] unless an on-press threshold fired.
///
/// # Example
///
/// ```rust
/// use button_envoy::button::sim_driver::{DriverCall, SimDriver};
/// use button_envoy::button::{ActiveLevel, Button};
///
/// # fn main() -> button_envoy::Result<()> {
/// let driver: SimDriver = SimDriver::new(1_000);
/// {
///     let _button = Button::new(&driver, 2, ActiveLevel::High)?;
/// }
/// assert_eq!(driver.created_count(), driver.deleted_count());
/// assert!(matches!(
///     driver.calls().first(),
///     Some(DriverCall::Create { pin: 2, .. })
/// ));
/// # Ok(())
/// # }
/// ```
pub struct SimDriver<const BUTTONS: usize = 4, const CALLBACKS: usize = 4> {
    tick_hz: u32,
    state: Mutex<CriticalSectionRawMutex, RefCell<State<BUTTONS, CALLBACKS>>>,
}

impl<const BUTTONS: usize, const CALLBACKS: usize> Default for SimDriver<BUTTONS, CALLBACKS> {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_HZ)
    }
}

impl<const BUTTONS: usize, const CALLBACKS: usize> SimDriver<BUTTONS, CALLBACKS> {
    /// Creates a driver whose timer runs at `tick_hz` ticks per second.
    ///
    /// A rate of zero is treated as one tick per second.
    #[must_use]
    pub const fn new(tick_hz: u32) -> Self {
        Self {
            tick_hz: if tick_hz == 0 { 1 } else { tick_hz },
            state: Mutex::new(RefCell::new(State::new())),
        }
    }

    /// Ticks per second of the simulated timer.
    #[must_use]
    pub const fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State<BUTTONS, CALLBACKS>) -> R) -> R {
        self.state.lock(|state| {
            let mut state_ref = state.borrow_mut();
            f(&mut state_ref)
        })
    }

    // Records `call`, then applies `f` to the slot for `handle`.
    fn with_slot<R>(
        &self,
        call: DriverCall,
        handle: SimHandle,
        f: impl FnOnce(&mut Slot<CALLBACKS>) -> Result<R>,
    ) -> Result<R> {
        self.with_state(|state| {
            state.record(call);
            let result = state.slot_mut(handle).and_then(f);
            if let Err(err) = result.as_ref() {
                warn!("SimDriver: {:?} failed: {:?}", call, err);
            }
            result
        })
    }

    // ------------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------------

    /// Drives `pin` to a level. Nothing runs until the next timer tick: a level matching
    /// the button's active level then presses it, and any other level releases it.
    /// Levels that do not change the state do nothing, and only the last level set
    /// before a tick counts.
    ///
    /// Pins without a live handle are ignored.
    pub fn set_level(&self, pin: u8, high: bool) {
        self.with_state(|state| {
            let Some(slot) = state.slot_for_pin(pin) else {
                warn!("SimDriver: no button on pin {}", pin);
                return;
            };
            slot.pending_level = Some(high);
        });
    }

    /// Starts a hold on `handle` right away, running the push callbacks on the caller.
    ///
    /// Pressing a button that is already held does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for an unknown or deleted handle.
    pub fn press(&self, handle: SimHandle) -> Result<()> {
        debug!("SimDriver: press {:?}", handle);
        let due = self.with_state(|state| {
            state
                .slot_mut(handle)
                .map(|slot| slot.press(self.tick_hz))
        })?;
        if let Some(due) = due {
            due.invoke();
        }
        Ok(())
    }

    /// Ends the hold on `handle` right away, running the release callbacks on the caller.
    ///
    /// Releasing a button that is not held does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for an unknown or deleted handle.
    pub fn release(&self, handle: SimHandle) -> Result<()> {
        debug!("SimDriver: release {:?}", handle);
        let due = self.with_state(|state| {
            state
                .slot_mut(handle)
                .map(|slot| slot.release(self.tick_hz))
        })?;
        if let Some(due) = due {
            due.invoke();
        }
        Ok(())
    }

    /// Invokes the callback registered for `event` directly, without any press state.
    /// Returns whether a callback was registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for an unknown or deleted handle.
    pub fn fire(&self, handle: SimHandle, event: ButtonEvent) -> Result<bool> {
        let callback = self.with_state(|state| {
            state
                .slot_mut(handle)
                .map(|slot| slot.callback_for(event))
        })?;
        let Some(callback) = callback else {
            return Ok(false);
        };
        callback.call();
        Ok(true)
    }

    /// Advances the timer by `ticks`, applying pending levels and firing callbacks as they
    /// come due.
    pub fn advance_ticks(&self, ticks: Ticks) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Advances the timer by `duration`. Fractions of a tick carry over to the next call.
    pub fn advance(&self, duration: Duration) {
        let ticks = self.with_state(|state| {
            let scaled = duration
                .as_micros()
                .saturating_mul(u64::from(self.tick_hz))
                .saturating_add(state.carry);
            state.carry = scaled % MICROS_PER_SECOND;
            scaled / MICROS_PER_SECOND
        });
        for _ in 0..ticks {
            self.step();
        }
    }

    fn step(&self) {
        for index in 0..BUTTONS {
            let due = self.with_state(|state| {
                state
                    .slots
                    .get_mut(index)
                    .and_then(Option::as_mut)
                    .and_then(|slot| slot.service(self.tick_hz))
            });
            if let Some(due) = due {
                due.invoke();
            }
        }
    }

    /// Runs the timer forever, advancing it by `period` on every tick of an
    /// `embassy-time` [`Ticker`].
    ///
    /// Spawn this from a task to give firmware a timer-service context.
    pub async fn timer_service(&self, period: Duration) -> ! {
        info!("SimDriver: timer service started");
        let mut ticker = Ticker::every(period);
        loop {
            ticker.next().await;
            self.advance(period);
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// The most recent calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall, CALL_LOG_CAPACITY> {
        self.with_state(|state| state.calls.iter().copied().collect())
    }

    /// Empties the call log.
    pub fn clear_calls(&self) {
        self.with_state(|state| state.calls.clear());
    }

    /// Number of handles successfully created.
    #[must_use]
    pub fn created_count(&self) -> u32 {
        self.with_state(|state| state.created)
    }

    /// Number of handles deleted.
    #[must_use]
    pub fn deleted_count(&self) -> u32 {
        self.with_state(|state| state.deleted)
    }

    /// Number of handles currently live.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.with_state(|state| state.live_count())
    }

    /// Whether `handle` is currently held down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for an unknown or deleted handle.
    pub fn is_pressed(&self, handle: SimHandle) -> Result<bool> {
        self.with_state(|state| state.slot_mut(handle).map(|slot| slot.hold.is_some()))
    }
}

impl<const BUTTONS: usize, const CALLBACKS: usize> ButtonDriver for SimDriver<BUTTONS, CALLBACKS> {
    type Pin = u8;
    type Handle = SimHandle;
    type Error = Error;

    fn create(&self, pin: u8, active_level: ActiveLevel) -> Result<SimHandle> {
        self.with_state(|state| {
            state.record(DriverCall::Create { pin, active_level });
            if state.slot_for_pin(pin).is_some() {
                warn!("SimDriver: pin {} already has a button", pin);
                return Err(Error::PinInUse);
            }
            let Some(free) = state.slots.iter_mut().find(|slot| slot.is_none()) else {
                warn!("SimDriver: no free handle for pin {}", pin);
                return Err(Error::OutOfHandles);
            };
            let handle = SimHandle(state.next_id);
            *free = Some(Slot::new(handle, pin, active_level));
            state.next_id = state.next_id.wrapping_add(1);
            state.created = state.created.saturating_add(1);
            info!("SimDriver: created {:?} on pin {}", handle, pin);
            Ok(handle)
        })
    }

    fn delete(&self, handle: SimHandle) {
        self.with_state(|state| {
            state.record(DriverCall::Delete { handle });
            let Some(slot) = state
                .slots
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|live| live.handle == handle))
            else {
                warn!("SimDriver: delete of unknown {:?} ignored", handle);
                return;
            };
            *slot = None;
            state.deleted = state.deleted.saturating_add(1);
            info!("SimDriver: deleted {:?}", handle);
        });
    }

    fn set_event_callback(
        &self,
        handle: SimHandle,
        event: ButtonEvent,
        callback: Callback,
    ) -> Result<()> {
        self.with_slot(
            DriverCall::SetEventCallback { handle, event },
            handle,
            |slot| {
                // Serial callbacks need timing; see `set_serial_callback`.
                let entry = slot.event_slot(event).ok_or(Error::InvalidArgument)?;
                *entry = Some(callback);
                Ok(())
            },
        )
    }

    fn set_serial_callback(
        &self,
        handle: SimHandle,
        start_after_secs: u32,
        interval_ticks: Ticks,
        callback: Callback,
    ) -> Result<()> {
        self.with_slot(
            DriverCall::SetSerialCallback {
                handle,
                start_after_secs,
                interval_ticks,
            },
            handle,
            |slot| {
                if interval_ticks == 0 {
                    return Err(Error::InvalidArgument);
                }
                slot.serial = Some(Serial {
                    callback,
                    start_after_secs,
                    interval_ticks,
                });
                Ok(())
            },
        )
    }

    fn add_on_press_callback(
        &self,
        handle: SimHandle,
        press_secs: u32,
        callback: Callback,
    ) -> Result<()> {
        self.with_slot(
            DriverCall::AddOnPressCallback { handle, press_secs },
            handle,
            |slot| {
                slot.on_press
                    .push(Threshold {
                        press_secs,
                        callback,
                    })
                    .map_err(|_| Error::CallbackListFull)
            },
        )
    }

    fn add_on_release_callback(
        &self,
        handle: SimHandle,
        press_secs: u32,
        callback: Callback,
    ) -> Result<()> {
        self.with_slot(
            DriverCall::AddOnReleaseCallback { handle, press_secs },
            handle,
            |slot| {
                slot.on_release
                    .push(Threshold {
                        press_secs,
                        callback,
                    })
                    .map_err(|_| Error::CallbackListFull)
            },
        )
    }

    fn remove_callback(&self, handle: SimHandle, event: ButtonEvent) -> Result<()> {
        self.with_slot(DriverCall::RemoveCallback { handle, event }, handle, |slot| {
            if event == ButtonEvent::Serial {
                slot.serial = None;
            } else if let Some(entry) = slot.event_slot(event) {
                *entry = None;
            }
            Ok(())
        })
    }
}
