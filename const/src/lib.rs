//! Bluetooth assigned numbers for the HID-over-GATT profile.

#![warn(missing_debug_implementations)]
#![warn(non_ascii_idents)]
#![warn(single_use_lifetimes)]
#![warn(unused_crate_dependencies)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(clippy::cargo)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::empty_structs_with_brackets)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::print_stdout)]
#![warn(clippy::str_to_string)]
#![warn(clippy::todo)]
#![warn(clippy::undocumented_unsafe_blocks)]

pub use uuid::*;

mod uuid;

/// HID report type values used in the Report Reference descriptor
/// ([HIDS] Section 3.6.2).
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[repr(u8)]
pub enum ReportType {
    Input = 0x01,
    Output = 0x02,
    Feature = 0x03,
}

impl ReportType {
    /// Returns whether the report is sent from the device to the host.
    #[inline(always)]
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }
}

impl std::fmt::Display for ReportType {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Protocol Mode characteristic values ([HIDS] Section 2.4).
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[repr(u8)]
pub enum ProtocolMode {
    Boot = 0x00,
    Report = 0x01,
}

impl Default for ProtocolMode {
    #[inline(always)]
    fn default() -> Self {
        Self::Report
    }
}

/// HID Control Point commands ([HIDS] Section 2.11).
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[repr(u8)]
pub enum ControlPoint {
    Suspend = 0x00,
    ExitSuspend = 0x01,
}

impl Default for ControlPoint {
    #[inline(always)]
    fn default() -> Self {
        Self::ExitSuspend
    }
}
