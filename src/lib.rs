//! Owning wrapper for handle-based debounced-button drivers.
//!
//! A button driver (the code that debounces a GPIO pin, times how long it is held and
//! runs callbacks from its own timer-service context) usually exposes a C-style API:
//! create a handle, register callbacks against it, delete it. This crate puts that
//! handle inside [`button::Button`], which owns it for its whole lifetime and releases
//! it on drop.
//!
//! The driver is a trait, [`button::driver::ButtonDriver`], so the same wrapper runs
//! against vendor drivers on hardware and against [`button::sim_driver::SimDriver`]
//! on the host.
//!
//! # Glossary
//!
//! - **Handle:** an opaque reference to driver-owned state.
//! - **Active level:** the GPIO level the driver treats as "pressed".
//! - **Serial callback:** a callback that repeats at a fixed interval while the button
//!   stays held, after an initial delay.
//! - **Timer-service context:** the driver's background context that evaluates press
//!   state and invokes registered callbacks.
#![no_std]

// Must come first so its macros are in scope for the modules below.
#[macro_use]
mod fmt;

pub mod button;
mod error;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
