//! Generic Attribute Profile ([Vol 3] Part G) plumbing shared with an
//! external GATT server: characteristic properties, the flattened service
//! table handed to the server for registration, and the access requests it
//! dispatches back by attribute handle.

pub use {consts::*, engine::*, io::*, table::*};

use crate::att::*;

mod consts;
mod engine;
mod io;
mod table;
