use tracing::{debug, error, warn};

use crate::att::{ErrorCode, Handle};
use crate::gatt::{IoReq, IoResult, Op, Prop, ReadReq, WriteReq};

use super::instance::Instance;
use super::service::{Inner, Target};
use super::*;

impl Inner {
    /// Executes an access request. Returns the handle of the characteristic
    /// whose value changed if the peer should be notified.
    pub(super) fn access(&mut self, req: IoReq) -> std::result::Result<Option<Handle>, ErrorCode> {
        let (op, hdl, uuid) = (req.op(), req.handle(), req.uuid());
        let Some(&Target { key, props }) = self.map.get(&hdl) else {
            error!("{op:?} for unknown {hdl}");
            return Err(ErrorCode::UnlikelyError);
        };
        if key.field.uuid() != uuid {
            error!("{op:?} for {key:?} at {hdl} with mismatched UUID {uuid}");
            return Err(ErrorCode::UnlikelyError);
        }
        let dsc = key.field.is_dsc();
        let allow = match op {
            Op::ReadChr => !dsc && props.contains(Prop::READ),
            Op::WriteChr => !dsc && props.is_writable(),
            Op::ReadDsc => dsc,
            Op::WriteDsc => false,
        };
        if !allow {
            error!("{op:?} not allowed for {key:?} at {hdl}");
            return Err(ErrorCode::UnlikelyError);
        }
        let Some(inst) = self.insts.get_mut(key.inst) else {
            error!("Missing service instance for {key:?}");
            return Err(ErrorCode::UnlikelyError);
        };
        let conn = req.conn();
        match req {
            IoReq::Read(r) => inst.read(key.field, r).map(|_| None),
            IoReq::Write(w) => {
                inst.write(key.field, w)?;
                debug!("{conn:?} wrote {:02X?} to {key:?}", w.value());
                Ok(props.contains(Prop::NOTIFY).then_some(hdl))
            }
        }
    }
}

impl Instance {
    /// Appends the value of field `f` to the read response.
    fn read(&self, f: Field, r: &mut ReadReq) -> IoResult {
        use ErrorCode::UnlikelyError;
        let p = &self.p;
        match f {
            Field::ProtocolMode => r.append([u8::from(p.proto_mode.ok_or(UnlikelyError)?)]),
            Field::ReportMap => r.append(&p.report_map),
            Field::ExtReportRef => r.append(p.ext_report_ref.to_le_bytes()),
            Field::Report(i) => r.append(p.reports.get(i).ok_or(UnlikelyError)?),
            Field::ReportRef(i) => r.append(p.reports.get(i).ok_or(UnlikelyError)?.reference()),
            Field::BootKeyboardInput => r.append(p.boot_kbd_in.ok_or(UnlikelyError)?),
            Field::BootKeyboardOutput => r.append([p.boot_kbd_out.ok_or(UnlikelyError)?]),
            Field::BootMouseInput => r.append(p.boot_mouse_in.as_ref().ok_or(UnlikelyError)?),
            Field::HidInfo => r.append(p.hid_info.to_bytes()),
            Field::ControlPoint => Err(UnlikelyError),
        }
    }

    /// Updates the value of field `f`. The value is not modified if an error
    /// is returned.
    fn write(&mut self, f: Field, w: &WriteReq) -> IoResult {
        use ErrorCode::UnlikelyError;
        let p = &mut self.p;
        match f {
            // [HIDS] Section 2.4
            Field::ProtocolMode => {
                let Ok(m) = ProtocolMode::try_from(single(w)?) else {
                    warn!("Invalid protocol mode: {:02X?}", w.value());
                    return Err(ErrorCode::RequestNotSupported);
                };
                *p.proto_mode.as_mut().ok_or(UnlikelyError)? = m;
                self.set_state(Flag::BOOT, matches!(m, ProtocolMode::Boot));
            }
            // [HIDS] Section 2.11
            Field::ControlPoint => {
                let Ok(cp) = ControlPoint::try_from(single(w)?) else {
                    warn!("Invalid control point command: {:02X?}", w.value());
                    return Err(ErrorCode::RequestNotSupported);
                };
                p.ctrl_pt = cp;
                self.set_state(Flag::SUSPEND, matches!(cp, ControlPoint::Suspend));
            }
            Field::Report(i) => p.reports.get_mut(i).ok_or(UnlikelyError)?.write(w)?,
            Field::BootKeyboardInput => {
                w.to_flat(0, p.boot_kbd_in.as_mut().ok_or(UnlikelyError)?)?;
            }
            Field::BootKeyboardOutput => {
                let v = p.boot_kbd_out.as_mut().ok_or(UnlikelyError)?;
                w.to_flat(0, std::slice::from_mut(v))?;
            }
            Field::BootMouseInput => p.boot_mouse_in.as_mut().ok_or(UnlikelyError)?.write(w)?,
            Field::ReportMap | Field::ExtReportRef | Field::ReportRef(_) | Field::HidInfo => {
                return Err(UnlikelyError);
            }
        }
        Ok(())
    }

    /// Updates a state flag, notifying watchers if it changed.
    fn set_state(&self, f: Flag, on: bool) {
        self.w.send_if_modified(|s| {
            if s.0.contains(f) == on {
                return false;
            }
            s.0.set(f, on);
            debug!("State changed: {s:?}");
            true
        });
    }
}

/// Returns the single-byte value of a write request.
#[inline]
fn single(w: &WriteReq) -> std::result::Result<u8, ErrorCode> {
    match *w.value() {
        [v] => Ok(v),
        _ => Err(ErrorCode::InvalidAttributeValueLength),
    }
}
