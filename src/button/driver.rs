//! The interface a button driver exposes to [`Button`](super::Button).

use core::fmt::Debug;

use super::{ActiveLevel, ButtonEvent, Callback, Ticks};

/// A handle-based debounced-button driver.
///
/// The driver owns debouncing, hold timing and its own timer-service context, and it
/// is responsible for synchronizing that context with registration calls. Hence every
/// method takes `&self`.
///
/// [`Button`](super::Button) is the intended caller: it creates one handle, forwards
/// registrations against it, and deletes it on drop. Calling any method with a handle
/// that was already deleted is up to the driver to detect.
pub trait ButtonDriver {
    /// Pin identifier accepted by [`create`](Self::create).
    type Pin: Copy + Debug;

    /// Opaque reference to driver state for one button.
    type Handle: Copy + Eq + Debug;

    /// Status returned by failed calls.
    type Error: Debug;

    /// Allocates driver state for a button on `pin`.
    ///
    /// # Errors
    ///
    /// Fails when the driver cannot allocate the handle or rejects the pin.
    fn create(&self, pin: Self::Pin, active_level: ActiveLevel) -> Result<Self::Handle, Self::Error>;

    /// Releases `handle` and everything registered against it.
    fn delete(&self, handle: Self::Handle);

    /// Sets the callback for one discrete event.
    ///
    /// # Errors
    ///
    /// Fails on a parameter error.
    fn set_event_callback(
        &self,
        handle: Self::Handle,
        event: ButtonEvent,
        callback: Callback,
    ) -> Result<(), Self::Error>;

    /// Sets the callback repeated every `interval_ticks` once the button has been held
    /// for `start_after_secs`.
    ///
    /// # Errors
    ///
    /// Fails on a parameter error.
    fn set_serial_callback(
        &self,
        handle: Self::Handle,
        start_after_secs: u32,
        interval_ticks: Ticks,
        callback: Callback,
    ) -> Result<(), Self::Error>;

    /// Adds a callback fired once a hold reaches `press_secs`.
    ///
    /// # Errors
    ///
    /// Fails on a parameter error or when no room is left.
    fn add_on_press_callback(
        &self,
        handle: Self::Handle,
        press_secs: u32,
        callback: Callback,
    ) -> Result<(), Self::Error>;

    /// Adds a release callback for holds of at least `press_secs`.
    ///
    /// # Errors
    ///
    /// Fails on a parameter error or when no room is left.
    fn add_on_release_callback(
        &self,
        handle: Self::Handle,
        press_secs: u32,
        callback: Callback,
    ) -> Result<(), Self::Error>;

    /// Removes the callback for `event`.
    ///
    /// # Errors
    ///
    /// Fails on a parameter error.
    fn remove_callback(&self, handle: Self::Handle, event: ButtonEvent) -> Result<(), Self::Error>;
}
