//! Error type for the crate's own driver.
//!
//! [`Button`](crate::button::Button) itself never invents errors: it returns whatever its
//! driver's [`ButtonDriver::Error`](crate::button::driver::ButtonDriver::Error) is. This
//! type is that error for [`SimDriver`](crate::button::sim_driver::SimDriver).

use derive_more::{Display, Error};

/// Result alias defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Status a driver call can fail with.
#[derive(Clone, Copy, Debug, Display, Error, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A parameter was rejected, such as a zero serial interval.
    #[display("invalid argument")]
    InvalidArgument,

    /// The handle was never issued by this driver or has already been deleted.
    #[display("unknown or deleted button handle")]
    InvalidHandle,

    /// Another live handle already owns the pin.
    #[display("pin already owned by another button")]
    PinInUse,

    /// Every handle slot is in use.
    #[display("no free button handle")]
    OutOfHandles,

    /// The on-press or on-release list for this handle is full.
    #[display("callback list full")]
    CallbackListFull,
}
