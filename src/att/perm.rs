use std::ops::BitOr;

use super::*;

type Result<T> = std::result::Result<T, ErrorCode>;

/// Access permission/request builder. As a permission, the security flags
/// state what the link must provide. As a request, they state what the link
/// currently provides.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
#[repr(transparent)]
pub struct Access(Perm);

impl Access {
    /// No access.
    pub const NONE: Self = Self(Perm::empty());

    /// Read access permission/request.
    pub const READ: Self = Self(Perm::READ);

    /// Write access permission/request.
    pub const WRITE: Self = Self(Perm::WRITE);

    /// Read/write access permission/request.
    pub const READ_WRITE: Self = Self(Perm::READ_WRITE);

    /// Sets the authentication flag.
    #[inline]
    pub const fn authn(self) -> Self {
        Self(self.0.union(Perm::AUTHN))
    }

    /// Sets the encryption flag.
    #[inline]
    pub const fn encrypt(self) -> Self {
        Self(self.0.union(Perm::ENCRYPT))
    }

    /// Returns the permission array index.
    #[inline]
    #[must_use]
    const fn index(self) -> usize {
        self.0.access_type().bits() as usize
    }
}

impl BitOr for Access {
    type Output = Perms;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Perms::allow(self, rhs)
    }
}

/// A set of attribute permissions. Contains separate permissions for read-only,
/// write-only, and read/write access.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[must_use]
#[repr(transparent)]
pub struct Perms([Perm; 4]);

impl Perms {
    /// Creates a new permission set.
    #[inline]
    pub const fn new(allow: Access) -> Self {
        let mut ps = Self([Perm::empty(); 4]);
        ps.0[allow.index()] = allow.0;
        ps
    }

    /// Creates a permission set from two types of access.
    ///
    /// # Panics
    ///
    /// Panics if both accesses are of the same type.
    #[inline]
    pub const fn allow(a: Access, b: Access) -> Self {
        let (i, j) = (a.index(), b.index());
        assert!(i != j, "access type must be different");
        let mut ps = Self([Perm::empty(); 4]);
        ps.0[i] = a.0;
        ps.0[j] = b.0;
        ps
    }

    /// Returns whether any access is permitted.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.0[1].is_set() || self.0[2].is_set() || self.0[3].is_set())
    }

    /// Tests whether an access request should be allowed.
    pub const fn test(self, req: Access) -> Result<()> {
        const RW: usize = Access::READ_WRITE.index();
        let mut op = req.index();
        if !self.0[op].is_set() {
            op = RW;
        }
        // Read-only and write-only requests first check for an exact match and
        // then fall back to read/write permissions.
        let exact = self.0[op].test(req.0);
        if exact.is_ok() || op == RW || self.0[RW].test(req.0).is_err() {
            exact
        } else {
            Ok(())
        }
    }
}

impl From<Access> for Perms {
    #[inline]
    fn from(v: Access) -> Self {
        Self::new(v)
    }
}

bitflags::bitflags! {
    /// Attribute permissions ([Vol 3] Part F, Section 3.2.5).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[must_use]
    #[repr(transparent)]
    struct Perm: u8 {
        /// Read access.
        const READ = 1 << 0;
        /// Write access.
        const WRITE = 1 << 1;
        /// Read/write access.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();

        /// Authentication flag.
        const AUTHN = 1 << 2;
        /// Encryption flag.
        const ENCRYPT = 1 << 3;
    }
}

impl Perm {
    /// Returns whether read and/or write access is set.
    #[inline]
    #[must_use]
    const fn is_set(self) -> bool {
        self.intersects(Self::READ_WRITE)
    }

    /// Returns the read/write access type.
    #[inline]
    const fn access_type(self) -> Self {
        self.intersection(Self::READ_WRITE)
    }

    /// Returns the authentication and encryption flags.
    #[inline]
    const fn security(self) -> Self {
        self.difference(Self::READ_WRITE)
    }

    /// Tests whether the access request should be allowed.
    const fn test(self, req: Self) -> Result<()> {
        use ErrorCode::*;
        // Read/write access must be a superset of the request
        let want = req.access_type();
        let fail = want.difference(self.access_type());
        if want.is_empty() || fail.contains(Self::READ_WRITE) {
            return Err(RequestNotSupported);
        } else if fail.contains(Self::READ) {
            return Err(ReadNotPermitted);
        } else if fail.contains(Self::WRITE) {
            return Err(WriteNotPermitted);
        }
        // Security requirements must be a subset of the request
        let fail = self.security().difference(req.security());
        if fail.contains(Self::AUTHN) {
            Err(InsufficientAuthentication)
        } else if fail.contains(Self::ENCRYPT) {
            Err(InsufficientEncryption)
        } else {
            Ok(())
        }
    }
}
