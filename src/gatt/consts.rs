use bitflags::bitflags;

use super::*;

bitflags! {
    /// Characteristic properties ([Vol 3] Part G, Section 3.3.1.1).
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[repr(transparent)]
    pub struct Prop: u8 {
        /// Permits broadcasts of the Characteristic Value using Server
        /// Characteristic Configuration Descriptor.
        const BROADCAST = 0x01;
        /// Permits reads of the Characteristic Value.
        const READ = 0x02;
        /// Permit writes of the Characteristic Value without response.
        const WRITE_CMD = 0x04;
        /// Permits writes of the Characteristic Value with response.
        const WRITE = 0x08;
        /// Permits notifications of a Characteristic Value without
        /// acknowledgment. If set, the Client Characteristic Configuration
        /// Descriptor shall exist.
        const NOTIFY = 0x10;
        /// Permits indications of a Characteristic Value with acknowledgment.
        const INDICATE = 0x20;
        /// Permits signed writes to the Characteristic Value.
        const SIGNED_WRITE_CMD = 0x40;
        /// Additional characteristic properties are defined in the
        /// Characteristic Extended Properties Descriptor.
        const EXT_PROPS = 0x80;
    }
}

impl Prop {
    /// Returns the access type implied by the properties.
    #[inline]
    pub const fn access(self) -> Access {
        let r = self.contains(Self::READ);
        let w = self.intersects(Self::WRITE.union(Self::WRITE_CMD).union(Self::SIGNED_WRITE_CMD));
        match (r, w) {
            (true, true) => Access::READ_WRITE,
            (true, false) => Access::READ,
            (false, true) => Access::WRITE,
            (false, false) => Access::NONE,
        }
    }

    /// Returns whether the characteristic value can be written by the peer.
    #[inline(always)]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.intersects(Self::WRITE.union(Self::WRITE_CMD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_access() {
        assert_eq!(Prop::READ.access(), Access::READ);
        assert_eq!(Prop::WRITE_CMD.access(), Access::WRITE);
        assert_eq!((Prop::READ | Prop::NOTIFY | Prop::WRITE).access(), Access::READ_WRITE);
        assert_eq!(Prop::NOTIFY.access(), Access::NONE);
        assert_eq!((Prop::READ | Prop::WRITE_CMD).bits(), 0x06);
        assert!(!Prop::READ.is_writable());
    }
}
