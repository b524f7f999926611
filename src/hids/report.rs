use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;

use crate::att::Handle;
use crate::gatt::{IoResult, Prop, WriteReq};
use crate::util::name_of;

use super::*;

/// Maximum report value length.
pub const MAX_REPORT_LEN: usize = 256;

/// HID report ([HIDS] Section 2.5). Reports are identified within a service
/// instance by their type and ID.
#[derive(Clone, Eq, PartialEq)]
pub struct Report {
    typ: ReportType,
    id: u8,
    val: Buf<MAX_REPORT_LEN>,
    hdl: Option<Handle>,
    ref_hdl: Option<Handle>,
}

impl Report {
    /// Creates a report with an initial value.
    ///
    /// # Panics
    ///
    /// Panics if the value is longer than [`MAX_REPORT_LEN`].
    #[inline]
    #[must_use]
    pub fn new(typ: ReportType, id: u8, v: &[u8]) -> Self {
        let Some(val) = Buf::from_slice(v) else {
            panic!("report too long ({} > {MAX_REPORT_LEN} bytes)", v.len());
        };
        Self {
            typ,
            id,
            val,
            hdl: None,
            ref_hdl: None,
        }
    }

    /// Creates an input report.
    #[inline(always)]
    #[must_use]
    pub fn input(id: u8, v: &[u8]) -> Self {
        Self::new(ReportType::Input, id, v)
    }

    /// Creates an output report.
    #[inline(always)]
    #[must_use]
    pub fn output(id: u8, v: &[u8]) -> Self {
        Self::new(ReportType::Output, id, v)
    }

    /// Creates a feature report.
    #[inline(always)]
    #[must_use]
    pub fn feature(id: u8, v: &[u8]) -> Self {
        Self::new(ReportType::Feature, id, v)
    }

    /// Returns the report type.
    #[inline(always)]
    #[must_use]
    pub const fn typ(&self) -> ReportType {
        self.typ
    }

    /// Returns the report ID.
    #[inline(always)]
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Returns the handle of the Report characteristic value, once assigned.
    #[inline(always)]
    #[must_use]
    pub const fn handle(&self) -> Option<Handle> {
        self.hdl
    }

    /// Returns the handle of the Report Reference descriptor, once assigned.
    #[inline(always)]
    #[must_use]
    pub const fn ref_handle(&self) -> Option<Handle> {
        self.ref_hdl
    }

    /// Returns the Report Reference descriptor value ([HIDS] Section 3.6.2).
    #[inline]
    #[must_use]
    pub const fn reference(&self) -> [u8; 2] {
        [self.id, self.typ as u8]
    }

    /// Returns the Report characteristic properties, which depend on the
    /// report type.
    #[inline]
    #[must_use]
    pub const fn props(&self) -> Prop {
        match self.typ {
            ReportType::Input => Prop::READ.union(Prop::NOTIFY).union(Prop::WRITE),
            ReportType::Output => Prop::READ.union(Prop::WRITE).union(Prop::WRITE_CMD),
            ReportType::Feature => Prop::READ.union(Prop::WRITE),
        }
    }

    /// Replaces the report value.
    pub(super) fn set(&mut self, v: &[u8]) -> Result<()> {
        if self.val.set(v) {
            Ok(())
        } else {
            Err(Error::ReportTooLong(v.len()))
        }
    }

    /// Replaces the report value with the written value.
    #[inline(always)]
    pub(super) fn write(&mut self, w: &WriteReq) -> IoResult {
        self.val.write(w)
    }

    /// Records the assigned characteristic value handle.
    #[inline(always)]
    pub(super) fn set_handle(&mut self, hdl: Handle) -> bool {
        replace_none(&mut self.hdl, hdl)
    }

    /// Records the assigned Report Reference descriptor handle.
    #[inline(always)]
    pub(super) fn set_ref_handle(&mut self, hdl: Handle) -> bool {
        replace_none(&mut self.ref_hdl, hdl)
    }
}

impl AsRef<[u8]> for Report {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.val.as_ref()
    }
}

impl Debug for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_struct(name_of!(Report)))
            .field("typ", &self.typ)
            .field("id", &self.id)
            .field("val", &self.val)
            .field("hdl", &self.hdl)
            .finish()
    }
}

/// Returns the index of the report with the specified type and ID.
#[inline]
pub(super) fn find(rs: &[Report], typ: ReportType, id: u8) -> Option<usize> {
    rs.iter().position(|r| r.typ == typ && r.id == id)
}

/// Verifies that every report has a unique type and ID.
pub(super) fn check_unique(rs: &[Report]) -> Result<()> {
    let mut refs: SmallVec<[(ReportType, u8); 8]> = rs.iter().map(|r| (r.typ, r.id)).collect();
    refs.sort_unstable();
    match refs.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(Error::DuplicateReport(w[0].0, w[0].1)),
        None => Ok(()),
    }
}

/// Sets `dst` to `hdl` if it was `None`. Returns whether `dst` was updated.
#[inline]
pub(super) fn replace_none(dst: &mut Option<Handle>, hdl: Handle) -> bool {
    dst.is_none() && dst.replace(hdl).is_none()
}

/// Fixed-capacity value buffer with a variable length.
#[derive(Clone, Copy, Eq, PartialEq)]
pub(super) struct Buf<const N: usize> {
    n: usize,
    v: [u8; N],
}

impl<const N: usize> Buf<N> {
    /// Creates an empty buffer.
    #[inline(always)]
    pub const fn new() -> Self {
        Self { n: 0, v: [0; N] }
    }

    /// Creates a buffer containing `v` or `None` if `v` is too long.
    #[inline]
    pub fn from_slice(v: &[u8]) -> Option<Self> {
        let mut b = Self::new();
        b.set(v).then_some(b)
    }

    /// Replaces the buffer contents. Returns `false` without modifying the
    /// buffer if `v` is too long.
    #[inline]
    pub fn set(&mut self, v: &[u8]) -> bool {
        let Some(dst) = self.v.get_mut(..v.len()) else {
            return false;
        };
        dst.copy_from_slice(v);
        self.n = v.len();
        true
    }

    /// Replaces the buffer contents with the written value.
    #[inline]
    pub fn write(&mut self, w: &WriteReq) -> IoResult {
        self.n = w.to_flat(0, &mut self.v)?;
        Ok(())
    }
}

impl<const N: usize> AsRef<[u8]> for Buf<N> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        &self.v[..self.n]
    }
}

impl<const N: usize> Debug for Buf<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X?}", self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report() {
        let mut r = Report::feature(5, &[1, 2]);
        assert_eq!((r.typ(), r.id()), (ReportType::Feature, 5));
        assert_eq!(r.reference(), [0x05, 0x03]);
        assert_eq!(r.as_ref(), &[1, 2]);
        assert_eq!(r.props(), Prop::READ | Prop::WRITE);
        assert!(Report::input(1, &[]).props().contains(Prop::NOTIFY));
        assert!(Report::output(1, &[]).props().contains(Prop::WRITE_CMD));

        r.set(&[0; MAX_REPORT_LEN]).unwrap();
        assert_eq!(r.as_ref().len(), MAX_REPORT_LEN);
        assert!(matches!(
            r.set(&[0; MAX_REPORT_LEN + 1]),
            Err(Error::ReportTooLong(257))
        ));
        assert_eq!(r.as_ref().len(), MAX_REPORT_LEN);

        let h = Handle::new(3).unwrap();
        assert!(r.set_handle(h));
        assert!(!r.set_handle(Handle::MIN));
        assert_eq!(r.handle(), Some(h));
        assert_eq!(r.ref_handle(), None);
    }

    #[test]
    #[should_panic(expected = "report too long")]
    fn report_too_long() {
        let _ = Report::input(1, &[0; MAX_REPORT_LEN + 1]);
    }

    #[test]
    fn unique() {
        let rs = [Report::input(1, &[]), Report::output(1, &[]), Report::input(2, &[])];
        assert!(check_unique(&rs).is_ok());
        assert_eq!(find(&rs, ReportType::Output, 1), Some(1));
        assert_eq!(find(&rs, ReportType::Feature, 1), None);
        let rs = [Report::input(1, &[]), Report::feature(2, &[]), Report::input(1, &[1])];
        assert!(matches!(
            check_unique(&rs),
            Err(Error::DuplicateReport(ReportType::Input, 1))
        ));
    }

    #[test]
    fn buf() {
        let mut b = Buf::<3>::new();
        assert!(b.set(&[1, 2, 3]));
        assert!(!b.set(&[1, 2, 3, 4]));
        assert_eq!(b.as_ref(), &[1, 2, 3]);
        assert_eq!(format!("{b:?}"), "[01, 02, 03]");
        assert!(Buf::<2>::from_slice(&[0; 3]).is_none());
    }
}
