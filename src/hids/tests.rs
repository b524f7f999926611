use std::sync::Arc;

use parking_lot::Mutex;

use hogp_const::{Characteristic, Descriptor, Service};

use crate::att::{ErrorCode, Handle};
use crate::gatt::{
    Assigned, AttrTable, ConnHandle, Cursors, Engine, IoReq, IoResult, Notifier, Prop, ReadReq,
    WriteReq,
};

use super::*;

/// GATT server that assigns handles sequentially, allocating declaration and
/// Client Characteristic Configuration descriptor handles like a real server.
#[derive(Debug, Default)]
struct MockEngine {
    next: u16,
    full: bool,
    fault: Option<Fault>,
}

#[derive(Clone, Copy, Debug)]
enum Fault {
    Skip,
    Duplicate,
    Repeat,
}

#[derive(Debug, thiserror::Error)]
#[error("attribute database full")]
struct DbFull;

impl Engine for MockEngine {
    type Error = DbFull;

    fn count_cfg<K>(&mut self, _: &AttrTable<K>) -> std::result::Result<(), DbFull> {
        if self.full {
            Err(DbFull)
        } else {
            Ok(())
        }
    }

    fn add_svcs<K: Copy>(
        &mut self,
        tab: &AttrTable<K>,
    ) -> std::result::Result<Vec<Assigned<K>>, DbFull> {
        let mut v = Vec::new();
        let mut next = || {
            self.next += 1;
            Handle::new(self.next).unwrap()
        };
        for s in tab.services() {
            next();
            for c in s.characteristics() {
                next();
                v.push(Assigned {
                    key: c.def().key,
                    hdl: next(),
                });
                if c.def().props.contains(Prop::NOTIFY) {
                    next();
                }
                for d in c.descriptors() {
                    v.push(Assigned {
                        key: d.key,
                        hdl: next(),
                    });
                }
            }
        }
        match self.fault {
            Some(Fault::Skip) => {
                v.pop();
            }
            Some(Fault::Duplicate) => v[1].hdl = v[0].hdl,
            Some(Fault::Repeat) => v.push(Assigned {
                key: v[0].key,
                hdl: Handle::MAX,
            }),
            None => {}
        }
        Ok(v)
    }
}

/// Notifier that records changed handles.
#[derive(Debug, Default)]
struct Changes(Mutex<Vec<Handle>>);

impl Notifier for Changes {
    fn value_changed(&self, hdl: Handle) {
        self.0.lock().push(hdl);
    }
}

impl Changes {
    fn take(&self) -> Vec<Handle> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn cfg(max_instances: usize, max_reports: usize) -> Config {
    Config {
        max_instances,
        max_reports,
        security: Security::None,
    }
}

fn keyboard() -> Params {
    Params::new(vec![0x05, 0x01, 0x09, 0x06], HidInfo::new(0x0111, 0, HidFlags::all()))
        .protocol_mode(ProtocolMode::Report)
        .report(Report::input(1, &[0; 8]))
        .report(Report::output(1, &[0]))
        .boot_keyboard_input()
        .boot_keyboard_output()
}

fn mouse(reports: u8) -> Params {
    let mut p = Params::new(vec![0x05, 0x01, 0x09, 0x02], HidInfo::default())
        .external_report_ref(0x2A19)
        .boot_mouse_input(&[0; 3]);
    for id in 0..reports {
        p = p.report(Report::feature(id, &[id]));
    }
    p
}

fn service(c: Config) -> (HidService, Arc<Changes>) {
    let ch = Arc::new(Changes::default());
    (HidService::new(c, Arc::clone(&ch)), ch)
}

fn conn() -> ConnHandle {
    ConnHandle::new(0x40).unwrap()
}

fn read(s: &HidService, hdl: Handle, f: Field) -> std::result::Result<Vec<u8>, ErrorCode> {
    let mut r = if f.is_dsc() {
        ReadReq::dsc(conn(), hdl, f.uuid(), 512)
    } else {
        ReadReq::chr(conn(), hdl, f.uuid(), 512)
    };
    s.access(IoReq::Read(&mut r))?;
    Ok(r.value().to_vec())
}

fn write(s: &HidService, hdl: Handle, f: Field, v: &[u8]) -> IoResult {
    s.access(IoReq::Write(&WriteReq::chr(conn(), hdl, f.uuid(), v)))
}

#[test]
fn table_layout() {
    let (s, _) = service(cfg(3, 4));
    assert_eq!(s.add(keyboard()).unwrap(), 0);
    assert_eq!(s.add(mouse(4)).unwrap(), 1);
    s.init(&mut MockEngine::default());

    // Two runs of 8 characteristics, each with a terminator
    assert_eq!(s.cursors(), Cursors::new(3, 8 + 1 + 8 + 1, 2 * 3 + 2 * 5));
    s.table(|t| {
        assert_eq!(t.svc_slots().iter().filter(|v| v.is_none()).count(), 1);
        assert_eq!(t.chr_slots().iter().filter(|v| v.is_none()).count(), 2);
        assert_eq!(t.svc_slots().last(), Some(&None));
        let svcs: Vec<_> = t.services().collect();
        assert_eq!(svcs.len(), 2);
        assert!(svcs.iter().all(|s| s.def().uuid == Service::HumanInterfaceDevice));
        assert_eq!(svcs[0].characteristics().count(), 8);
        assert_eq!(svcs[1].characteristics().count(), 8);
        let first = svcs[1].characteristics().next().unwrap();
        assert_eq!(first.def().uuid, Characteristic::ReportMap);
        assert_eq!(
            first.descriptors().next().unwrap().uuid,
            Descriptor::ExternalReportReference
        );
    });
}

#[test]
fn handles_unique() {
    let (s, _) = service(cfg(2, 8));
    s.add(keyboard()).unwrap();
    s.add(mouse(8)).unwrap();
    s.init(&mut MockEngine::default());

    let mut all = Vec::new();
    for inst in 0..2 {
        let h = s.handles(inst).unwrap();
        all.extend(
            [
                h.protocol_mode,
                h.report_map,
                h.ext_report_ref,
                h.boot_keyboard_input,
                h.boot_keyboard_output,
                h.boot_mouse_input,
                h.hid_info,
                h.control_point,
            ]
            .into_iter()
            .flatten(),
        );
    }
    for (typ, id) in [(ReportType::Input, 1), (ReportType::Output, 1)] {
        all.push(s.report_handle(0, typ, id).unwrap());
    }
    for id in 0..8 {
        all.push(s.report_handle(1, ReportType::Feature, id).unwrap());
    }
    let n = all.len();
    assert_eq!(n, 7 + 2 + 5 + 8);
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), n);

    for &h in &all {
        assert!(s.resolve(h).is_some());
    }
    let h = s.handles(1).unwrap();
    assert_eq!(h.protocol_mode, None);
    assert_eq!(
        s.resolve(h.ext_report_ref.unwrap()),
        Some(AttrKey::new(1, Field::ExtReportRef))
    );
}

#[test]
fn add_limits() {
    let (s, _) = service(cfg(1, 2));
    assert!(matches!(s.add(mouse(3)), Err(Error::TooManyReports(3, 2))));
    let p = keyboard().report(Report::feature(1, &[])).report(Report::input(1, &[]));
    assert!(matches!(
        s.add(p),
        Err(Error::TooManyReports(..) | Error::DuplicateReport(..))
    ));
    let p = Params::new(vec![0; MAX_REPORT_MAP_LEN + 1], HidInfo::default());
    assert!(matches!(s.add(p), Err(Error::ReportMapTooLong(513))));
    assert_eq!(s.cursors(), Cursors::default());

    s.add(keyboard()).unwrap();
    let before = s.cursors();
    assert!(matches!(
        s.add(mouse(0)),
        Err(Error::ResourceExhausted {
            what: "service instance",
            limit: 1
        })
    ));
    assert_eq!(s.cursors(), before);
    assert_eq!(s.instances(), 1);
}

#[test]
fn duplicate_report() {
    let (s, _) = service(cfg(1, 8));
    let p = keyboard().report(Report::input(1, &[]));
    assert!(matches!(
        s.add(p),
        Err(Error::DuplicateReport(ReportType::Input, 1))
    ));
    assert_eq!(s.instances(), 0);
}

/// Instance with every optional characteristic and `reports` input reports.
fn full(reports: u8) -> Params {
    let mut p = keyboard_base().boot_mouse_input(&[0; 3]);
    for id in 0..reports {
        p = p.report(Report::input(id, &[]));
    }
    p
}

fn keyboard_base() -> Params {
    Params::new(vec![0x05, 0x01], HidInfo::default())
        .protocol_mode(ProtocolMode::Boot)
        .boot_keyboard_input()
        .boot_keyboard_output()
}

#[test]
fn fills_to_limits() {
    for (n, r) in [(1, 0), (3, 20), (10, 0), (10, 8)] {
        let (s, _) = service(cfg(n, r));
        let lim = s.config().limits();
        for i in 0..n {
            assert_eq!(s.add(full(u8::try_from(r).unwrap())).unwrap(), i);
        }
        assert_eq!(s.cursors(), Cursors::new(n, lim.chr, lim.dsc));
        let before = s.cursors();
        assert!(matches!(
            s.add(keyboard_base()),
            Err(Error::ResourceExhausted {
                what: "service instance",
                ..
            })
        ));
        assert_eq!(s.cursors(), before);
        s.init(&mut MockEngine::default());
        assert_eq!(s.cursors(), lim);
        assert_eq!(s.instances(), n);
    }
}

#[test]
fn max_report_instances() {
    let (s, _) = service(cfg(10, 8));
    for i in 0..10 {
        assert_eq!(s.add(mouse(8)).unwrap(), i);
    }
    s.init(&mut MockEngine::default());
    let lim = s.config().limits();
    assert_eq!(s.cursors().dsc, lim.dsc);
    assert!(s.handles(9).unwrap().control_point.is_some());
}

#[test]
fn lifecycle() {
    let (s, _) = service(cfg(2, 8));
    s.add(keyboard()).unwrap();
    s.add(mouse(2)).unwrap();
    let built = s.cursors();
    s.init(&mut MockEngine::default());
    assert!(s.is_registered());
    assert!(matches!(s.add(mouse(0)), Err(Error::AlreadyRegistered)));
    assert!(matches!(
        s.try_init(&mut MockEngine::default()),
        Err(Error::AlreadyRegistered)
    ));
    let registered = s.cursors();
    assert_eq!(registered.svc, built.svc + 1);

    s.reset();
    s.reset();
    assert_eq!(s.cursors(), Cursors::default());
    assert_eq!(s.instances(), 0);
    assert!(!s.is_registered());
    assert!(s.handles(0).is_none());

    s.add(keyboard()).unwrap();
    s.add(mouse(2)).unwrap();
    assert_eq!(s.cursors(), built);
    s.init(&mut MockEngine::default());
    assert_eq!(s.cursors(), registered);
}

#[test]
fn registration_faults() {
    let (s, _) = service(cfg(1, 8));
    s.add(keyboard()).unwrap();
    let built = s.cursors();

    let mut eng = MockEngine {
        full: true,
        ..MockEngine::default()
    };
    let e = s.try_init(&mut eng).unwrap_err();
    assert!(matches!(e, Error::Registration(_)));
    assert!(e.to_string().contains("attribute database full"));
    assert_eq!(s.cursors(), built);
    assert!(!s.is_registered());

    for (fault, want) in [
        (Fault::Skip, "no handle"),
        (Fault::Duplicate, "already in use"),
        (Fault::Repeat, "already in use"),
    ] {
        let mut eng = MockEngine {
            fault: Some(fault),
            ..MockEngine::default()
        };
        let e = s.try_init(&mut eng).unwrap_err();
        assert!(matches!(e, Error::Handle(_)), "{fault:?}");
        assert!(e.to_string().contains(want), "{fault:?}: {e}");
        assert_eq!(s.handles(0), Some(Handles::default()));
    }
    s.init(&mut MockEngine::default());
    assert!(s.handles(0).unwrap().control_point.is_some());
}

#[test]
#[should_panic(expected = "HID service initialization failed")]
fn init_panics() {
    let (s, _) = service(cfg(1, 8));
    s.add(keyboard()).unwrap();
    s.init(&mut MockEngine {
        full: true,
        ..MockEngine::default()
    });
}

#[test]
fn dispatch_checks() {
    let (s, ch) = service(cfg(1, 8));
    s.add(keyboard()).unwrap();
    s.init(&mut MockEngine::default());
    let h = s.handles(0).unwrap();
    let map = h.report_map.unwrap();

    // Unknown handle
    assert_eq!(read(&s, Handle::MAX, Field::ReportMap), Err(ErrorCode::UnlikelyError));
    // UUID mismatch
    assert_eq!(read(&s, map, Field::HidInfo), Err(ErrorCode::UnlikelyError));
    // Write to a read-only characteristic
    assert_eq!(write(&s, map, Field::ReportMap, &[0]), Err(ErrorCode::UnlikelyError));
    // Read of a write-only characteristic
    let cp = h.control_point.unwrap();
    assert_eq!(read(&s, cp, Field::ControlPoint), Err(ErrorCode::UnlikelyError));
    // Characteristic operation on a descriptor
    let ext = h.ext_report_ref.unwrap();
    let mut r = ReadReq::chr(conn(), ext, Descriptor::ExternalReportReference, 8);
    assert_eq!(s.access(IoReq::Read(&mut r)), Err(ErrorCode::UnlikelyError));
    // Descriptor write
    let w = WriteReq::dsc(conn(), ext, Descriptor::ExternalReportReference, &[0, 0]);
    assert_eq!(s.access(IoReq::Write(&w)), Err(ErrorCode::UnlikelyError));

    assert_eq!(read(&s, ext, Field::ExtReportRef).unwrap(), [0, 0]);
    assert_eq!(read(&s, map, Field::ReportMap).unwrap(), [0x05, 0x01, 0x09, 0x06]);
    assert_eq!(
        read(&s, h.hid_info.unwrap(), Field::HidInfo).unwrap(),
        [0x11, 0x01, 0x00, 0x03]
    );
    assert!(ch.take().is_empty());
}

#[test]
fn read_buffer_limit() {
    let (s, _) = service(cfg(1, 8));
    s.add(keyboard()).unwrap();
    s.init(&mut MockEngine::default());
    let hdl = s.report_handle(0, ReportType::Input, 1).unwrap();
    let mut r = ReadReq::chr(conn(), hdl, Characteristic::Report, 7);
    assert_eq!(
        s.access(IoReq::Read(&mut r)),
        Err(ErrorCode::InsufficientResources)
    );
    assert!(r.value().is_empty());
}

#[test]
fn notifications() {
    let (s, ch) = service(cfg(1, 8));
    s.add(keyboard()).unwrap();
    s.init(&mut MockEngine::default());
    let inp = s.report_handle(0, ReportType::Input, 1).unwrap();
    let out = s.report_handle(0, ReportType::Output, 1).unwrap();
    let h = s.handles(0).unwrap();

    write(&s, inp, Field::Report(0), &[1, 2]).unwrap();
    write(&s, out, Field::Report(1), &[1]).unwrap();
    write(&s, h.boot_keyboard_input.unwrap(), Field::BootKeyboardInput, &[4]).unwrap();
    write(&s, h.boot_keyboard_output.unwrap(), Field::BootKeyboardOutput, &[2]).unwrap();
    write(&s, h.control_point.unwrap(), Field::ControlPoint, &[0]).unwrap();
    assert_eq!(ch.take(), [inp, h.boot_keyboard_input.unwrap()]);

    s.set_report(0, ReportType::Input, 1, &[0; 8]).unwrap();
    s.set_report(0, ReportType::Output, 1, &[3]).unwrap();
    s.set_boot_keyboard_input(0, [1; 8]).unwrap();
    assert_eq!(ch.take(), [inp, h.boot_keyboard_input.unwrap()]);

    assert_eq!(s.boot_keyboard_output(0), Some(2));
    assert_eq!(s.report(0, ReportType::Output, 1).unwrap(), [3]);
    assert!(matches!(
        s.set_boot_mouse_input(0, &[0; 3]),
        Err(Error::MissingField {
            inst: 0,
            field: Field::BootMouseInput
        })
    ));
    assert!(matches!(
        s.set_report(1, ReportType::Input, 1, &[]),
        Err(Error::InvalidInstance(1))
    ));
    assert!(matches!(
        s.set_report(0, ReportType::Feature, 1, &[]),
        Err(Error::UnknownReport { .. })
    ));
    assert!(matches!(
        s.set_report(0, ReportType::Input, 1, &[0; MAX_REPORT_LEN + 1]),
        Err(Error::ReportTooLong(257))
    ));
    assert!(ch.take().is_empty());
}

#[test]
fn updates_before_init() {
    let (s, ch) = service(cfg(1, 8));
    s.add(mouse(1)).unwrap();
    s.set_boot_mouse_input(0, &[1, 2, 3, 4]).unwrap();
    s.set_report(0, ReportType::Feature, 0, &[9]).unwrap();
    assert!(ch.take().is_empty());
    assert_eq!(s.boot_mouse_input(0).unwrap().as_slice(), &[1, 2, 3, 4]);
    assert!(matches!(
        s.set_boot_mouse_input(0, &[0; BOOT_MOUSE_INPUT_LEN + 1]),
        Err(Error::ReportTooLong(9))
    ));
    assert_eq!(s.report(0, ReportType::Feature, 0).unwrap(), [9]);
}
