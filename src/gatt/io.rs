use std::fmt::{Debug, Formatter};

use structbuf::{Pack, StructBuf};

use hogp_const::Uuid16;

use crate::util::name_of;

use super::*;

/// I/O callback result type.
pub type IoResult = std::result::Result<(), ErrorCode>;

/// Connection handle of the peer that issued a request
/// ([Vol 4] Part E, Section 5.4.2).
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ConnHandle(u16);

impl ConnHandle {
    /// Maximum valid connection handle.
    const MAX: u16 = 0xEFF;

    /// Wraps a raw connection handle. Returns `None` if the handle is invalid.
    #[inline]
    #[must_use]
    pub const fn new(h: u16) -> Option<Self> {
        if h <= Self::MAX {
            Some(Self(h))
        } else {
            None
        }
    }
}

impl Debug for ConnHandle {
    #[allow(clippy::use_self)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#05X})", name_of!(ConnHandle), self.0)
    }
}

impl From<ConnHandle> for u16 {
    #[inline(always)]
    fn from(h: ConnHandle) -> Self {
        h.0
    }
}

/// Attribute access operation reported by the GATT server.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[repr(u8)]
pub enum Op {
    ReadChr = 0,
    WriteChr = 1,
    ReadDsc = 2,
    WriteDsc = 3,
}

impl Op {
    /// Returns whether the operation targets a descriptor.
    #[inline(always)]
    #[must_use]
    pub const fn is_dsc(self) -> bool {
        matches!(self, Self::ReadDsc | Self::WriteDsc)
    }
}

/// Characteristic or descriptor I/O request.
#[derive(Debug)]
pub enum IoReq<'a> {
    Read(&'a mut ReadReq),
    Write(&'a WriteReq<'a>),
}

impl IoReq<'_> {
    /// Returns the access operation.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> Op {
        match *self {
            Self::Read(ref r) => r.op,
            Self::Write(w) => w.op,
        }
    }

    /// Returns the connection that issued the request.
    #[inline]
    #[must_use]
    pub const fn conn(&self) -> ConnHandle {
        match *self {
            Self::Read(ref r) => r.conn,
            Self::Write(w) => w.conn,
        }
    }

    /// Returns the attribute handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> Handle {
        match *self {
            Self::Read(ref r) => r.hdl,
            Self::Write(w) => w.hdl,
        }
    }

    /// Returns the attribute UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(&self) -> Uuid16 {
        match *self {
            Self::Read(ref r) => r.uuid,
            Self::Write(w) => w.uuid,
        }
    }
}

/// Characteristic or descriptor read request. The response value is
/// accumulated in a buffer limited to the size the server can transmit.
#[derive(Debug)]
pub struct ReadReq {
    op: Op,
    conn: ConnHandle,
    hdl: Handle,
    uuid: Uuid16,
    buf: StructBuf,
}

impl ReadReq {
    /// Creates a characteristic value read request with a response buffer of
    /// `lim` bytes.
    #[inline]
    #[must_use]
    pub fn chr(conn: ConnHandle, hdl: Handle, uuid: impl Into<Uuid16>, lim: usize) -> Self {
        Self::new(Op::ReadChr, conn, hdl, uuid.into(), lim)
    }

    /// Creates a descriptor read request with a response buffer of `lim`
    /// bytes.
    #[inline]
    #[must_use]
    pub fn dsc(conn: ConnHandle, hdl: Handle, uuid: impl Into<Uuid16>, lim: usize) -> Self {
        Self::new(Op::ReadDsc, conn, hdl, uuid.into(), lim)
    }

    #[inline]
    const fn new(op: Op, conn: ConnHandle, hdl: Handle, uuid: Uuid16, lim: usize) -> Self {
        Self {
            op,
            conn,
            hdl,
            uuid,
            buf: StructBuf::new(lim),
        }
    }

    /// Returns the access operation.
    #[inline(always)]
    #[must_use]
    pub const fn op(&self) -> Op {
        self.op
    }

    /// Returns the attribute handle.
    #[inline(always)]
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.hdl
    }

    /// Returns the attribute UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid16 {
        self.uuid
    }

    /// Appends `v` to the response. Returns `InsufficientResources` without
    /// modifying the response if there is not enough room.
    pub fn append(&mut self, v: impl AsRef<[u8]>) -> IoResult {
        let v = v.as_ref();
        if self.buf.lim() - self.buf.len() < v.len() {
            return Err(ErrorCode::InsufficientResources);
        }
        self.buf.append().put(v);
        Ok(())
    }

    /// Returns the response value.
    #[inline(always)]
    #[must_use]
    pub fn value(&self) -> &[u8] {
        self.buf.as_ref()
    }
}

impl AsRef<[u8]> for ReadReq {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.buf.as_ref()
    }
}

/// Characteristic or descriptor write request.
#[derive(Debug)]
pub struct WriteReq<'a> {
    op: Op,
    conn: ConnHandle,
    hdl: Handle,
    uuid: Uuid16,
    val: &'a [u8],
}

impl<'a> WriteReq<'a> {
    /// Creates a characteristic value write request.
    #[inline]
    #[must_use]
    pub fn chr(conn: ConnHandle, hdl: Handle, uuid: impl Into<Uuid16>, val: &'a [u8]) -> Self {
        Self {
            op: Op::WriteChr,
            conn,
            hdl,
            uuid: uuid.into(),
            val,
        }
    }

    /// Creates a descriptor write request.
    #[inline]
    #[must_use]
    pub fn dsc(conn: ConnHandle, hdl: Handle, uuid: impl Into<Uuid16>, val: &'a [u8]) -> Self {
        Self {
            op: Op::WriteDsc,
            ..Self::chr(conn, hdl, uuid, val)
        }
    }

    /// Returns the access operation.
    #[inline(always)]
    #[must_use]
    pub const fn op(&self) -> Op {
        self.op
    }

    /// Returns the attribute handle.
    #[inline(always)]
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.hdl
    }

    /// Returns the attribute UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid16 {
        self.uuid
    }

    /// Returns the written value.
    #[inline(always)]
    #[must_use]
    pub const fn value(&self) -> &'a [u8] {
        self.val
    }

    /// Copies the written value to the start of `dst` and returns its length.
    /// Returns `InvalidAttributeValueLength` without modifying `dst` if the
    /// value is shorter than `min` or longer than `dst`.
    #[inline]
    pub fn to_flat(&self, min: usize, mut dst: impl AsMut<[u8]>) -> Result<usize, ErrorCode> {
        let n = self.val.len();
        let Some(dst) = dst.as_mut().get_mut(..n).filter(|_| min <= n) else {
            return Err(ErrorCode::InvalidAttributeValueLength);
        };
        dst.copy_from_slice(self.val);
        Ok(n)
    }
}

impl<'a> AsRef<[u8]> for WriteReq<'a> {
    #[inline(always)]
    fn as_ref(&self) -> &'a [u8] {
        self.val
    }
}
