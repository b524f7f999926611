//! Human Interface Device Service ([HIDS]).
//!
//! Builds the attribute table of one or more HID service instances for
//! registration with an external GATT server and serves the resulting
//! characteristic and descriptor accesses.
//!
//! The HID-over-GATT Profile ([HOGP]) defines how a device can support HID
//! services over the Bluetooth LE protocol stack using the Generic Attribute
//! Profile.
//!
//! [HIDS]: https://www.bluetooth.com/specifications/specs/human-interface-device-service-1-0/
//! [HOGP]: https://www.bluetooth.com/specifications/specs/hid-over-gatt-profile-1-0/

pub use {config::*, instance::*, report::*, service::*};

use crate::att::{self, Handle};
use crate::{ControlPoint, ProtocolMode, ReportType};

mod builder;
mod config;
mod instance;
mod report;
mod router;
mod service;
#[cfg(test)]
mod tests;

/// Maximum Report Map value length ([HIDS] Section 2.6).
pub const MAX_REPORT_MAP_LEN: usize = att::MAX_VAL_LEN;

/// Error type returned by the HID service lifecycle and application API.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{what} limit reached ({limit})")]
    ResourceExhausted { what: &'static str, limit: usize },
    #[error("too many reports ({0} > {1})")]
    TooManyReports(usize, usize),
    #[error("duplicate {0} report ID {1}")]
    DuplicateReport(ReportType, u8),
    #[error("report map too long ({0} > {max} bytes)", max = MAX_REPORT_MAP_LEN)]
    ReportMapTooLong(usize),
    #[error("report too long ({0} > {max} bytes)", max = MAX_REPORT_LEN)]
    ReportTooLong(usize),
    #[error("service table already registered")]
    AlreadyRegistered,
    #[error("invalid service instance {0}")]
    InvalidInstance(usize),
    #[error("service instance {inst} has no {typ} report with ID {id}")]
    UnknownReport { inst: usize, typ: ReportType, id: u8 },
    #[error("service instance {inst} does not have {field:?}")]
    MissingField { inst: usize, field: Field },
    #[error("service registration failed: {0}")]
    Registration(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Handle(#[from] HandleError),
}

/// Invalid handle assignment reported by the GATT server.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum HandleError {
    #[error("handle {1} assigned to unknown attribute {0:?}")]
    Unknown(AttrKey, Handle),
    #[error("handle {1} assigned to {0:?} is already in use")]
    Duplicate(AttrKey, Handle),
    #[error("no handle assigned to {0:?}")]
    Missing(AttrKey),
}

/// Common HID service result type.
pub type Result<T> = std::result::Result<T, Error>;

/// HID service instance state, as controlled by the peer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct HidState(Flag);

bitflags::bitflags! {
    /// HID service instance state flags.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    struct Flag: u8 {
        const BOOT = 1 << 0;
        const SUSPEND = 1 << 1;
    }
}

impl HidState {
    /// Creates the state implied by the specified protocol mode and control
    /// point values.
    #[inline]
    #[must_use]
    fn new(mode: Option<ProtocolMode>, cp: ControlPoint) -> Self {
        let mut s = Self(Flag::empty());
        s.0.set(Flag::BOOT, matches!(mode, Some(ProtocolMode::Boot)));
        s.0.set(Flag::SUSPEND, matches!(cp, ControlPoint::Suspend));
        s
    }

    /// Returns whether the host selected boot protocol mode.
    #[inline(always)]
    #[must_use]
    pub const fn is_boot_mode(self) -> bool {
        self.0.contains(Flag::BOOT)
    }

    /// Returns whether the host entered suspend state.
    #[inline(always)]
    #[must_use]
    pub const fn is_suspended(self) -> bool {
        self.0.contains(Flag::SUSPEND)
    }
}
