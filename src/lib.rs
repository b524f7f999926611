//! HID-over-GATT service builder.
//!
//! Assembles the attribute table of one or more Human Interface Device
//! services ([HIDS]) from a compact description of each service instance,
//! hands it to an external GATT server for registration, and serves the
//! resulting characteristic and descriptor accesses by attribute handle.
//!
//! [HIDS]: https://www.bluetooth.com/specifications/specs/human-interface-device-service-1-0/

#![warn(missing_debug_implementations)]
#![warn(non_ascii_idents)]
#![warn(single_use_lifetimes)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::print_stdout)]
#![warn(clippy::str_to_string)]
#![warn(clippy::todo)]
#![warn(clippy::undocumented_unsafe_blocks)]

pub use hogp_const::{ControlPoint, ProtocolMode, ReportType, Uuid16};

pub mod att;
pub mod gatt;
pub mod hids;
mod util;

type SyncMutex<T> = parking_lot::Mutex<T>;
