use hogp_const::Service;

use crate::att::{Access, Perms};
use crate::gatt::{AttrTable, ChrDef, Cursors, DscDef, Prop, SvcDef, SvcType};

use super::*;

/// Returns the number of table slots required to build an instance.
pub(super) fn need(p: &Params) -> Cursors {
    let n = p.reports.len();
    // Report Map, HID Information, HID Control Point, and the terminator
    let chr = p.num_optional() + n + 4;
    // Report Map and Report descriptors, each with a terminator
    let dsc = 2 * (n + 1);
    Cursors::new(1, chr, dsc)
}

/// Attribute table builder for one service instance.
#[derive(Debug)]
pub(super) struct Builder<'a> {
    tab: &'a mut AttrTable<AttrKey>,
    inst: usize,
    sec: Security,
}

impl<'a> Builder<'a> {
    /// Creates a builder for instance `inst`.
    #[inline]
    pub fn new(tab: &'a mut AttrTable<AttrKey>, inst: usize, sec: Security) -> Self {
        Self { tab, inst, sec }
    }

    /// Appends the characteristic run for `p` followed by the service
    /// definition. Returns the service index or `None` if the table is full,
    /// in which case the table may contain a partial run.
    pub fn build(mut self, p: &Params) -> Option<usize> {
        const RO: Prop = Prop::READ;
        const IN: Prop = Prop::READ.union(Prop::WRITE).union(Prop::NOTIFY);
        const OUT: Prop = Prop::READ.union(Prop::WRITE).union(Prop::WRITE_CMD);
        let start = self.tab.cursors().chr;

        // Protocol Mode ([HIDS] Section 2.4)
        if p.proto_mode.is_some() {
            self.chr(Field::ProtocolMode, RO.union(Prop::WRITE_CMD), None)?;
        }

        // Report Map ([HIDS] Section 2.6)
        self.chr(Field::ReportMap, RO, Some(Field::ExtReportRef))?;

        // Reports ([HIDS] Section 2.5)
        for (i, r) in p.reports.iter().enumerate() {
            self.chr(Field::Report(i), r.props(), Some(Field::ReportRef(i)))?;
        }

        // Boot reports ([HIDS] Section 2.7, 2.8, 2.9)
        if p.boot_kbd_in.is_some() {
            self.chr(Field::BootKeyboardInput, IN, None)?;
        }
        if p.boot_kbd_out.is_some() {
            self.chr(Field::BootKeyboardOutput, OUT, None)?;
        }
        if p.boot_mouse_in.is_some() {
            self.chr(Field::BootMouseInput, IN, None)?;
        }

        // HID Information ([HIDS] Section 2.10)
        self.chr(Field::HidInfo, RO, None)?;

        // HID Control Point ([HIDS] Section 2.11)
        self.chr(Field::ControlPoint, Prop::WRITE_CMD, None)?;

        self.tab.push_chr(None)?;
        self.tab.push_svc(Some(SvcDef {
            typ: SvcType::Primary,
            uuid: Service::HumanInterfaceDevice.uuid16(),
            chrs: start,
        }))
    }

    /// Appends a characteristic with an optional descriptor.
    fn chr(&mut self, f: Field, props: Prop, dsc: Option<Field>) -> Option<()> {
        let dscs = match dsc {
            Some(d) => Some(self.tab.push_dsc(DscDef {
                uuid: d.uuid(),
                perms: Access::READ.into(),
                key: self.key(d),
            })?),
            None => None,
        };
        self.tab.push_chr(Some(ChrDef {
            uuid: f.uuid(),
            props,
            perms: Perms::new(self.sec.apply(props.access())),
            key: self.key(f),
            dscs,
        }))?;
        Some(())
    }

    #[inline(always)]
    const fn key(&self, f: Field) -> AttrKey {
        AttrKey::new(self.inst, f)
    }
}

#[cfg(test)]
mod tests {
    use hogp_const::Characteristic;

    use crate::att::ErrorCode;

    use super::*;

    fn params() -> Params {
        Params::new(vec![1, 2, 3], HidInfo::default())
            .protocol_mode(ProtocolMode::Report)
            .report(Report::input(1, &[0; 4]))
            .report(Report::output(1, &[0]))
            .report(Report::feature(5, &[]))
            .boot_keyboard_input()
            .boot_keyboard_output()
            .boot_mouse_input(&[0; 3])
    }

    #[test]
    fn order() {
        let p = params();
        let need = need(&p);
        assert_eq!(need, Cursors::new(1, 4 + 3 + 4, 8));
        let mut tab = AttrTable::new(need);
        assert_eq!(Builder::new(&mut tab, 1, Security::Encrypted).build(&p), Some(0));
        assert_eq!(tab.cursors(), need);

        let svc = tab.services().next().unwrap();
        assert_eq!(svc.def().uuid, Service::HumanInterfaceDevice);
        let chrs: Vec<_> = svc.characteristics().collect();
        let fields: Vec<_> = chrs.iter().map(|c| c.def().key.field).collect();
        assert_eq!(
            fields,
            [
                Field::ProtocolMode,
                Field::ReportMap,
                Field::Report(0),
                Field::Report(1),
                Field::Report(2),
                Field::BootKeyboardInput,
                Field::BootKeyboardOutput,
                Field::BootMouseInput,
                Field::HidInfo,
                Field::ControlPoint,
            ]
        );
        assert!(chrs.iter().all(|c| c.def().key.inst == 1));
        assert!(chrs.iter().all(|c| c.def().uuid == c.def().key.field.uuid()));
        assert_eq!(tab.chr_slots().last(), Some(&None));

        let props = |i: usize| chrs[i].def().props;
        assert_eq!(props(0), Prop::READ | Prop::WRITE_CMD);
        assert_eq!(props(2), Prop::READ | Prop::WRITE | Prop::NOTIFY);
        assert_eq!(props(3), Prop::READ | Prop::WRITE | Prop::WRITE_CMD);
        assert_eq!(props(4), Prop::READ | Prop::WRITE);
        assert_eq!(props(9), Prop::WRITE_CMD);

        let dscs: Vec<_> = chrs[1].descriptors().collect();
        assert_eq!(dscs.len(), 1);
        assert_eq!(dscs[0].key.field, Field::ExtReportRef);
        assert_eq!(dscs[0].perms.test(Access::READ), Ok(()));
        let dscs: Vec<_> = chrs[4].descriptors().map(|d| d.key.field).collect();
        assert_eq!(dscs, [Field::ReportRef(2)]);
        assert_eq!(chrs[8].descriptors().count(), 0);
        assert_eq!(tab.dsc_slots().iter().filter(|d| d.is_none()).count(), 4);
    }

    #[test]
    fn security() {
        let p = Params::new(Vec::new(), HidInfo::default());
        let mut tab = AttrTable::new(need(&p));
        Builder::new(&mut tab, 0, Security::Authenticated).build(&p).unwrap();
        for c in tab.chr_slots().iter().flatten() {
            let req = c.props.access().encrypt();
            assert_eq!(c.perms.test(req), Err(ErrorCode::InsufficientAuthentication));
            assert_eq!(c.perms.test(req.authn()), Ok(()));
        }
        let cp = tab.chr_slots()[2].as_ref().unwrap();
        assert_eq!(cp.uuid, Characteristic::HidControlPoint);
        assert_eq!(
            cp.perms.test(Access::READ.encrypt().authn()),
            Err(ErrorCode::ReadNotPermitted)
        );
    }

    #[test]
    fn table_full() {
        let p = params();
        let mut lim = need(&p);
        lim.chr -= 1;
        let mut tab = AttrTable::new(lim);
        assert_eq!(Builder::new(&mut tab, 0, Security::None).build(&p), None);
        let mut lim = need(&p);
        lim.dsc -= 1;
        let mut tab = AttrTable::new(lim);
        assert_eq!(Builder::new(&mut tab, 0, Security::None).build(&p), None);
    }
}
