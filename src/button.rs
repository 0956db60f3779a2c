//! A device abstraction that owns one button handle of an external button driver.
//!
//! See [`Button`] for usage example.

use core::fmt;

pub mod driver;
pub mod sim_driver;

use driver::ButtonDriver;

// ============================================================================
// ActiveLevel - How the button is wired
// ============================================================================

/// The GPIO level the driver reads while the button is pressed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    /// Button connects the pin to voltage (3.3V) when pressed.
    /// Pin reads HIGH when pressed.
    #[default]
    High,

    /// Button connects the pin to ground (GND) when pressed.
    /// Pin reads LOW when pressed.
    Low,
}

impl ActiveLevel {
    /// Returns whether a pin reading `high` means the button is pressed.
    #[must_use]
    pub const fn is_pressed(self, high: bool) -> bool {
        match self {
            Self::High => high,
            Self::Low => !high,
        }
    }
}

// ============================================================================
// ButtonEvent - Discrete callback slots
// ============================================================================

/// A discrete event a callback can be registered for with
/// [`Button::set_event_callback`] or removed with [`Button::remove_callback`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// The button went down.
    Push,
    /// The button went up.
    Release,
    /// The button went down and came back up without reaching any hold threshold.
    Tap,
    /// The repeating callback set by [`Button::set_serial_callback`].
    Serial,
}

/// Count of driver timer ticks.
pub type Ticks = u32;

// ============================================================================
// Callback
// ============================================================================

/// A callback the driver invokes from its timer-service context.
///
/// The callback's context is whatever the closure captures. Because the driver may call
/// it at any time from another context, it must be `'static` and `Sync`; use atomics
/// or a blocking mutex for any state it touches.
///
/// # Blocking
///
/// Callbacks run in the context of the driver's timer service. They must never block:
/// no delays, and no waiting on a queue, channel or mutex held by another context.
/// The type system cannot enforce this.
#[derive(Clone, Copy)]
pub struct Callback(&'static (dyn Fn() + Sync));

impl Callback {
    /// Wraps a `'static` closure or function.
    #[must_use]
    pub const fn new(callback: &'static (dyn Fn() + Sync)) -> Self {
        Self(callback)
    }

    /// Invokes the callback.
    pub fn call(self) {
        (self.0)();
    }
}

impl<F: Fn() + Sync> From<&'static F> for Callback {
    fn from(callback: &'static F) -> Self {
        Self(callback)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Callback {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "Callback(..)");
    }
}

// ============================================================================
// Button
// ============================================================================

/// Owns one driver handle for a button on one pin and forwards callback registrations
/// to the driver.
///
/// The handle is created in [`Button::new`] and deleted exactly once when the `Button`
/// is dropped. All debouncing, hold timing and callback dispatch happen inside the
/// driver; `Button` passes every argument through unchanged and returns the driver's
/// status unchanged.
///
/// # Example
///
/// ```rust
/// use button_envoy::button::sim_driver::SimDriver;
/// use button_envoy::button::{ActiveLevel, Button, ButtonEvent, Callback};
/// use core::sync::atomic::{AtomicU32, Ordering};
///
/// static TAPS: AtomicU32 = AtomicU32::new(0);
///
/// fn on_tap() {
///     TAPS.fetch_add(1, Ordering::Relaxed);
/// }
/// static ON_TAP: fn() = on_tap;
///
/// fn on_five_seconds() {}
/// static ON_FIVE_SECONDS: fn() = on_five_seconds;
///
/// # fn main() -> button_envoy::Result<()> {
/// let driver: SimDriver = SimDriver::default();
/// let mut button = Button::new(&driver, 13, ActiveLevel::Low)?;
///
/// button.set_event_callback(ButtonEvent::Tap, Callback::new(&ON_TAP))?;
/// button.add_on_press_callback(5, Callback::new(&ON_FIVE_SECONDS))?;
///
/// // Pin 13 is wired to ground: reading low means pressed. Callbacks run on the
/// // driver's timer, here advanced by hand one tick at a time.
/// driver.set_level(13, false);
/// driver.advance_ticks(1);
/// driver.set_level(13, true);
/// driver.advance_ticks(1);
/// assert_eq!(TAPS.load(Ordering::Relaxed), 1);
///
/// drop(button);
/// assert_eq!(driver.live_count(), 0);
/// # Ok(())
/// # }
/// ```
///
/// A `Button` cannot be cloned, since two owners would delete the same handle twice:
///
/// ```rust,compile_fail
/// use button_envoy::button::sim_driver::SimDriver;
/// use button_envoy::button::{ActiveLevel, Button};
///
/// let driver: SimDriver = SimDriver::default();
/// let button = Button::new(&driver, 4, ActiveLevel::High).unwrap();
/// let second_owner = button.clone();
/// ```
///
/// Nor copied by assignment; the original is moved out:
///
/// ```rust,compile_fail
/// use button_envoy::button::sim_driver::SimDriver;
/// use button_envoy::button::{ActiveLevel, Button};
///
/// let driver: SimDriver = SimDriver::default();
/// let button = Button::new(&driver, 4, ActiveLevel::High).unwrap();
/// let second_owner = button;
/// let _ = button.handle();
/// ```
pub struct Button<'d, D: ButtonDriver> {
    driver: &'d D,
    handle: D::Handle,
    pin: D::Pin,
    active_level: ActiveLevel,
}

impl<'d, D: ButtonDriver> Button<'d, D> {
    /// Creates the driver handle for `pin`.
    ///
    /// Pass [`ActiveLevel::default()`] (active high) when the wiring has no preference.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when it cannot allocate a handle. No `Button` exists
    /// in that case, so there is never a `Button` without a live handle.
    pub fn new(driver: &'d D, pin: D::Pin, active_level: ActiveLevel) -> Result<Self, D::Error> {
        let handle = driver.create(pin, active_level)?;
        debug!("Button::new: handle created");
        Ok(Self {
            driver,
            handle,
            pin,
            active_level,
        })
    }

    /// Registers `callback` for one discrete `event`, replacing any earlier one.
    ///
    /// See [`Callback`] for the blocking rules callbacks must follow.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn set_event_callback(
        &mut self,
        event: ButtonEvent,
        callback: Callback,
    ) -> Result<(), D::Error> {
        self.driver.set_event_callback(self.handle, event, callback)
    }

    /// Registers a callback that repeats every `interval_ticks` while the button stays
    /// held, starting once it has been held for `start_after_secs`.
    ///
    /// Neither value is checked here; the driver decides what zero means.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn set_serial_callback(
        &mut self,
        callback: Callback,
        interval_ticks: Ticks,
        start_after_secs: u32,
    ) -> Result<(), D::Error> {
        self.driver
            .set_serial_callback(self.handle, start_after_secs, interval_ticks, callback)
    }

    /// Adds a callback that fires once when the button has been held for `press_secs`.
    ///
    /// Registrations accumulate; several thresholds can be active at once.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn add_on_press_callback(
        &mut self,
        press_secs: u32,
        callback: Callback,
    ) -> Result<(), D::Error> {
        self.driver
            .add_on_press_callback(self.handle, press_secs, callback)
    }

    /// Adds a callback considered on release after a hold of at least `press_secs`.
    ///
    /// On release the driver runs a single one of these, chosen by the latest threshold
    /// the hold crossed.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn add_on_release_callback(
        &mut self,
        press_secs: u32,
        callback: Callback,
    ) -> Result<(), D::Error> {
        self.driver
            .add_on_release_callback(self.handle, press_secs, callback)
    }

    /// Unregisters the callback for `event`.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn remove_callback(&mut self, event: ButtonEvent) -> Result<(), D::Error> {
        self.driver.remove_callback(self.handle, event)
    }

    /// The driver handle this button owns.
    #[must_use]
    pub const fn handle(&self) -> D::Handle {
        self.handle
    }

    /// The pin the button was created on.
    #[must_use]
    pub const fn pin(&self) -> D::Pin {
        self.pin
    }

    /// The level that counts as pressed.
    #[must_use]
    pub const fn active_level(&self) -> ActiveLevel {
        self.active_level
    }
}

impl<D: ButtonDriver> Drop for Button<'_, D> {
    fn drop(&mut self) {
        debug!("Button::drop: deleting handle");
        self.driver.delete(self.handle);
    }
}

impl<D: ButtonDriver> fmt::Debug for Button<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("handle", &self.handle)
            .field("pin", &self.pin)
            .field("active_level", &self.active_level)
            .finish_non_exhaustive()
    }
}
