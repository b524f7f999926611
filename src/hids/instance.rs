use tokio::sync::watch;

use hogp_const::{Characteristic, Descriptor, Uuid16};

use crate::att::Handle;

use super::report::{check_unique, replace_none, Buf};
use super::*;

/// Boot Keyboard Input Report length ([HIDS] Section 2.7).
pub const BOOT_KBD_INPUT_LEN: usize = 8;

/// Maximum Boot Mouse Input Report length ([HIDS] Section 2.9). The first
/// three bytes are mandatory and the rest are vendor-defined.
pub const BOOT_MOUSE_INPUT_LEN: usize = 8;

bitflags::bitflags! {
    /// HID Information flags ([HIDS] Section 2.10).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct HidFlags: u8 {
        const REMOTE_WAKE = 1 << 0;
        const NORMALLY_CONNECTABLE = 1 << 1;
    }
}

/// HID Information characteristic value ([HIDS] Section 2.10).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct HidInfo(u32);

impl HidInfo {
    /// Creates a HID Information value from the HID class specification
    /// release number in binary-coded decimal, the country code of the
    /// localized hardware, and the device flags.
    #[inline]
    #[must_use]
    pub const fn new(bcd_hid: u16, country: u8, flags: HidFlags) -> Self {
        let [lo, hi] = bcd_hid.to_le_bytes();
        Self(u32::from_le_bytes([lo, hi, country, flags.bits()]))
    }

    /// Returns the HID class specification release number.
    #[allow(clippy::cast_possible_truncation)]
    #[inline(always)]
    #[must_use]
    pub const fn bcd_hid(self) -> u16 {
        self.0 as u16
    }

    /// Returns the hardware country code.
    #[allow(clippy::cast_possible_truncation)]
    #[inline(always)]
    #[must_use]
    pub const fn country(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Returns the device flags.
    #[allow(clippy::cast_possible_truncation)]
    #[inline(always)]
    #[must_use]
    pub const fn flags(self) -> HidFlags {
        HidFlags::from_bits_retain((self.0 >> 24) as u8)
    }

    /// Returns the characteristic value.
    #[inline(always)]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<u32> for HidInfo {
    #[inline(always)]
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<HidInfo> for u32 {
    #[inline(always)]
    fn from(v: HidInfo) -> Self {
        v.0
    }
}

/// Characteristic or descriptor of a HID service instance.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Field {
    ProtocolMode,
    ReportMap,
    /// External Report Reference descriptor of the Report Map.
    ExtReportRef,
    /// Report characteristic with the specified report index.
    Report(usize),
    /// Report Reference descriptor with the specified report index.
    ReportRef(usize),
    BootKeyboardInput,
    BootKeyboardOutput,
    BootMouseInput,
    HidInfo,
    ControlPoint,
}

impl Field {
    /// Returns the attribute type.
    #[must_use]
    pub const fn uuid(self) -> Uuid16 {
        match self {
            Self::ProtocolMode => Characteristic::ProtocolMode.uuid16(),
            Self::ReportMap => Characteristic::ReportMap.uuid16(),
            Self::ExtReportRef => Descriptor::ExternalReportReference.uuid16(),
            Self::Report(_) => Characteristic::Report.uuid16(),
            Self::ReportRef(_) => Descriptor::ReportReference.uuid16(),
            Self::BootKeyboardInput => Characteristic::BootKeyboardInputReport.uuid16(),
            Self::BootKeyboardOutput => Characteristic::BootKeyboardOutputReport.uuid16(),
            Self::BootMouseInput => Characteristic::BootMouseInputReport.uuid16(),
            Self::HidInfo => Characteristic::HidInformation.uuid16(),
            Self::ControlPoint => Characteristic::HidControlPoint.uuid16(),
        }
    }

    /// Returns whether the field is a descriptor.
    #[inline(always)]
    #[must_use]
    pub const fn is_dsc(self) -> bool {
        matches!(self, Self::ExtReportRef | Self::ReportRef(_))
    }
}

/// Identifies a characteristic or descriptor before its handle is assigned.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AttrKey {
    pub inst: usize,
    pub field: Field,
}

impl AttrKey {
    /// Creates a new attribute key.
    #[inline(always)]
    #[must_use]
    pub const fn new(inst: usize, field: Field) -> Self {
        Self { inst, field }
    }
}

/// HID service instance parameters. The Report Map, HID Information, and
/// HID Control Point characteristics are always present. Everything else is
/// optional.
#[derive(Clone, Debug)]
#[must_use]
pub struct Params {
    pub(super) proto_mode: Option<ProtocolMode>,
    pub(super) boot_kbd_in: Option<[u8; BOOT_KBD_INPUT_LEN]>,
    pub(super) boot_kbd_out: Option<u8>,
    pub(super) boot_mouse_in: Option<Buf<BOOT_MOUSE_INPUT_LEN>>,
    pub(super) reports: Vec<Report>,
    pub(super) report_map: Vec<u8>,
    pub(super) ext_report_ref: u16,
    pub(super) hid_info: HidInfo,
    pub(super) ctrl_pt: ControlPoint,
}

impl Params {
    /// Creates parameters for an instance with the specified Report Map
    /// (HID report descriptor) and HID Information values.
    #[inline]
    pub fn new(report_map: impl Into<Vec<u8>>, hid_info: HidInfo) -> Self {
        Self {
            proto_mode: None,
            boot_kbd_in: None,
            boot_kbd_out: None,
            boot_mouse_in: None,
            reports: Vec::new(),
            report_map: report_map.into(),
            ext_report_ref: 0,
            hid_info,
            ctrl_pt: ControlPoint::default(),
        }
    }

    /// Adds the Protocol Mode characteristic with an initial mode.
    #[inline]
    pub fn protocol_mode(mut self, m: ProtocolMode) -> Self {
        self.proto_mode = Some(m);
        self
    }

    /// Adds the Boot Keyboard Input Report characteristic.
    #[inline]
    pub fn boot_keyboard_input(mut self) -> Self {
        self.boot_kbd_in = Some([0; BOOT_KBD_INPUT_LEN]);
        self
    }

    /// Adds the Boot Keyboard Output Report characteristic.
    #[inline]
    pub fn boot_keyboard_output(mut self) -> Self {
        self.boot_kbd_out = Some(0);
        self
    }

    /// Adds the Boot Mouse Input Report characteristic with an initial value.
    ///
    /// # Panics
    ///
    /// Panics if the value is longer than [`BOOT_MOUSE_INPUT_LEN`].
    #[inline]
    pub fn boot_mouse_input(mut self, v: &[u8]) -> Self {
        let Some(b) = Buf::from_slice(v) else {
            panic!("boot mouse input too long ({} bytes)", v.len());
        };
        self.boot_mouse_in = Some(b);
        self
    }

    /// Sets the External Report Reference descriptor value, which is the
    /// 16-bit UUID of a characteristic in another service referenced by the
    /// Report Map.
    #[inline]
    pub fn external_report_ref(mut self, uuid: u16) -> Self {
        self.ext_report_ref = uuid;
        self
    }

    /// Sets the initial HID Control Point value.
    #[inline]
    pub fn control_point(mut self, cp: ControlPoint) -> Self {
        self.ctrl_pt = cp;
        self
    }

    /// Adds a Report characteristic. Reports are exposed in the order they
    /// are added.
    ///
    /// Reports are identified by their type and ID, so an input and an output
    /// report may share an ID, as keyboards usually do. Only a repeated
    /// `(type, id)` pair is rejected by [`HidService::add`].
    #[inline]
    pub fn report(mut self, r: Report) -> Self {
        self.reports.push(r);
        self
    }

    /// Returns the number of reports.
    #[inline(always)]
    #[must_use]
    pub fn num_reports(&self) -> usize {
        self.reports.len()
    }

    /// Returns the number of optional characteristics that are present.
    #[must_use]
    pub(super) fn num_optional(&self) -> usize {
        usize::from(self.proto_mode.is_some())
            + usize::from(self.boot_kbd_in.is_some())
            + usize::from(self.boot_kbd_out.is_some())
            + usize::from(self.boot_mouse_in.is_some())
    }

    /// Verifies that the parameters fit within the configured limits.
    pub(super) fn validate(&self, max_reports: usize) -> Result<()> {
        if self.reports.len() > max_reports {
            return Err(Error::TooManyReports(self.reports.len(), max_reports));
        }
        if self.report_map.len() > MAX_REPORT_MAP_LEN {
            return Err(Error::ReportMapTooLong(self.report_map.len()));
        }
        check_unique(&self.reports)
    }
}

/// Attribute handles of the single-valued fields of a service instance.
/// Report handles are available from [`Report`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Handles {
    pub protocol_mode: Option<Handle>,
    pub report_map: Option<Handle>,
    pub ext_report_ref: Option<Handle>,
    pub boot_keyboard_input: Option<Handle>,
    pub boot_keyboard_output: Option<Handle>,
    pub boot_mouse_input: Option<Handle>,
    pub hid_info: Option<Handle>,
    pub control_point: Option<Handle>,
}

/// Registered service instance.
#[derive(Debug)]
pub(super) struct Instance {
    pub p: Params,
    pub hdls: Handles,
    pub w: watch::Sender<HidState>,
}

impl Instance {
    /// Creates a new instance from its parameters.
    pub fn new(p: Params) -> Self {
        let (w, _) = watch::channel(HidState::new(p.proto_mode, p.ctrl_pt));
        Self {
            p,
            hdls: Handles::default(),
            w,
        }
    }

    /// Records the handle assigned to field `f`. Returns `false` if the field
    /// does not exist or already has a handle.
    pub fn assign(&mut self, f: Field, hdl: Handle) -> bool {
        let h = &mut self.hdls;
        let slot = match f {
            Field::ProtocolMode => &mut h.protocol_mode,
            Field::ReportMap => &mut h.report_map,
            Field::ExtReportRef => &mut h.ext_report_ref,
            Field::Report(i) => {
                return (self.p.reports.get_mut(i)).map_or(false, |r| r.set_handle(hdl));
            }
            Field::ReportRef(i) => {
                return (self.p.reports.get_mut(i)).map_or(false, |r| r.set_ref_handle(hdl));
            }
            Field::BootKeyboardInput => &mut h.boot_keyboard_input,
            Field::BootKeyboardOutput => &mut h.boot_keyboard_output,
            Field::BootMouseInput => &mut h.boot_mouse_input,
            Field::HidInfo => &mut h.hid_info,
            Field::ControlPoint => &mut h.control_point,
        };
        replace_none(slot, hdl)
    }

    /// Returns the report with the specified type and ID.
    pub fn report_mut(&mut self, inst: usize, typ: ReportType, id: u8) -> Result<&mut Report> {
        let i = report::find(&self.p.reports, typ, id);
        (i.and_then(|i| self.p.reports.get_mut(i))).ok_or(Error::UnknownReport { inst, typ, id })
    }
}
