//! Attribute Protocol vocabulary ([Vol 3] Part F): handles, permissions, and
//! error codes shared with the GATT server engine.

pub use {consts::*, handle::*, perm::*};

mod consts;
mod handle;
mod perm;
