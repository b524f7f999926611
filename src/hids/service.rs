use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::att::Handle;
use crate::gatt::{AttrTable, Cursors, Engine, IoReq, IoResult, Notifier, Prop};
use crate::util::name_of;
use crate::SyncMutex;

use super::builder::{self, Builder};
use super::instance::Instance;
use super::*;

/// Collection of HID service instances sharing one attribute table.
///
/// Instances are added with [`Self::add`] and registered with the GATT server
/// by [`Self::init`]. The server then forwards attribute accesses to
/// [`Self::access`]. All methods take `&self`, so the service can be shared
/// between the server's callback contexts and the application.
pub struct HidService {
    inner: SyncMutex<Inner>,
    ntf: Box<dyn Notifier>,
}

impl HidService {
    /// Creates an empty service collection. `ntf` is informed about
    /// characteristic value changes that require notifications.
    #[must_use]
    pub fn new(cfg: Config, ntf: impl Notifier + 'static) -> Self {
        Self {
            inner: SyncMutex::new(Inner {
                cfg,
                tab: AttrTable::new(cfg.limits()),
                insts: Vec::new(),
                map: BTreeMap::new(),
                registered: false,
            }),
            ntf: Box::new(ntf),
        }
    }

    /// Returns the service configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.lock().cfg
    }

    /// Adds a service instance to the attribute table and returns its index.
    /// The table is not modified if an error is returned.
    pub fn add(&self, p: Params) -> Result<usize> {
        let mut this = self.inner.lock();
        if this.registered {
            return Err(Error::AlreadyRegistered);
        }
        let inst = this.insts.len();
        if inst >= this.cfg.max_instances {
            warn!("Service instance limit reached ({})", this.cfg.max_instances);
            return Err(Error::ResourceExhausted {
                what: "service instance",
                limit: this.cfg.max_instances,
            });
        }
        p.validate(this.cfg.max_reports)?;
        if let Some((what, limit)) = this.tab.overflow(builder::need(&p)) {
            warn!("Attribute table {what} limit reached ({limit})");
            return Err(Error::ResourceExhausted { what, limit });
        }
        let Inner { cfg, tab, .. } = &mut *this;
        let start = tab.cursors();
        if Builder::new(tab, inst, cfg.security).build(&p).is_none() {
            error!("Attribute table overflow after reservation");
            tab.truncate(start);
            return Err(Error::ResourceExhausted {
                what: "attribute table",
                limit: tab.limits().chr,
            });
        }
        debug!(
            "Added HID service instance {inst} with {} report(s)",
            p.num_reports()
        );
        this.insts.push(Instance::new(p));
        Ok(inst)
    }

    /// Terminates the attribute table and registers it with the GATT server,
    /// recording the assigned handles.
    pub fn try_init<E: Engine>(&self, eng: &mut E) -> Result<()> {
        let mut this = self.inner.lock();
        if this.registered {
            return Err(Error::AlreadyRegistered);
        }
        let start = this.tab.cursors();
        if this.tab.push_svc(None).is_none() {
            let limit = this.tab.limits().svc;
            return Err(Error::ResourceExhausted { what: "service", limit });
        }
        let r = this.register(eng);
        if let Err(ref e) = r {
            error!("HID service registration failed: {e}");
            this.tab.truncate(start);
        }
        r
    }

    /// Registers the attribute table with the GATT server.
    ///
    /// # Panics
    ///
    /// Panics if registration fails. The service cannot operate without its
    /// attribute handles.
    pub fn init<E: Engine>(&self, eng: &mut E) {
        if let Err(e) = self.try_init(eng) {
            panic!("HID service initialization failed: {e}");
        }
    }

    /// Removes all instances and resets the attribute table, allowing the
    /// service to be built and registered again.
    pub fn reset(&self) {
        let mut this = self.inner.lock();
        this.tab.clear();
        this.insts.clear();
        this.map.clear();
        this.registered = false;
        debug!("HID service reset");
    }

    /// Handles characteristic or descriptor access by the peer.
    pub fn access(&self, req: IoReq) -> IoResult {
        let changed = self.inner.lock().access(req)?;
        if let Some(hdl) = changed {
            self.ntf.value_changed(hdl);
        }
        Ok(())
    }

    /// Replaces the value of a report. The peer is notified of input report
    /// changes.
    pub fn set_report(&self, inst: usize, typ: ReportType, id: u8, v: &[u8]) -> Result<()> {
        let hdl = {
            let mut this = self.inner.lock();
            let r = this.inst_mut(inst)?.report_mut(inst, typ, id)?;
            r.set(v)?;
            r.handle().filter(|_| typ.is_input())
        };
        self.changed(hdl);
        Ok(())
    }

    /// Replaces the Boot Keyboard Input Report value.
    pub fn set_boot_keyboard_input(&self, inst: usize, v: [u8; BOOT_KBD_INPUT_LEN]) -> Result<()> {
        let hdl = {
            let mut this = self.inner.lock();
            let i = this.inst_mut(inst)?;
            let Some(dst) = i.p.boot_kbd_in.as_mut() else {
                return Err(Error::MissingField {
                    inst,
                    field: Field::BootKeyboardInput,
                });
            };
            *dst = v;
            i.hdls.boot_keyboard_input
        };
        self.changed(hdl);
        Ok(())
    }

    /// Replaces the Boot Mouse Input Report value.
    pub fn set_boot_mouse_input(&self, inst: usize, v: &[u8]) -> Result<()> {
        let hdl = {
            let mut this = self.inner.lock();
            let i = this.inst_mut(inst)?;
            let Some(dst) = i.p.boot_mouse_in.as_mut() else {
                return Err(Error::MissingField {
                    inst,
                    field: Field::BootMouseInput,
                });
            };
            if !dst.set(v) {
                return Err(Error::ReportTooLong(v.len()));
            }
            i.hdls.boot_mouse_input
        };
        self.changed(hdl);
        Ok(())
    }

    /// Returns the current value of a report.
    #[must_use]
    pub fn report(&self, inst: usize, typ: ReportType, id: u8) -> Option<Vec<u8>> {
        self.with_report(inst, typ, id, |r| r.as_ref().to_vec())
    }

    /// Returns the characteristic value handle of a report.
    #[must_use]
    pub fn report_handle(&self, inst: usize, typ: ReportType, id: u8) -> Option<Handle> {
        self.with_report(inst, typ, id, Report::handle).flatten()
    }

    /// Returns the Boot Keyboard Input Report value.
    #[must_use]
    pub fn boot_keyboard_input(&self, inst: usize) -> Option<[u8; BOOT_KBD_INPUT_LEN]> {
        self.with_params(inst, |p| p.boot_kbd_in)
    }

    /// Returns the Boot Keyboard Output Report value.
    #[must_use]
    pub fn boot_keyboard_output(&self, inst: usize) -> Option<u8> {
        self.with_params(inst, |p| p.boot_kbd_out)
    }

    /// Returns the Boot Mouse Input Report value.
    #[must_use]
    pub fn boot_mouse_input(&self, inst: usize) -> Option<SmallVec<[u8; BOOT_MOUSE_INPUT_LEN]>> {
        self.with_params(inst, |p| p.boot_mouse_in.as_ref().map(|b| b.as_ref().into()))
    }

    /// Returns the current protocol mode.
    #[must_use]
    pub fn protocol_mode(&self, inst: usize) -> Option<ProtocolMode> {
        self.with_params(inst, |p| p.proto_mode)
    }

    /// Returns the last HID Control Point command.
    #[must_use]
    pub fn control_point(&self, inst: usize) -> Option<ControlPoint> {
        self.with_params(inst, |p| Some(p.ctrl_pt))
    }

    /// Returns the handles assigned to an instance.
    #[must_use]
    pub fn handles(&self, inst: usize) -> Option<Handles> {
        self.inner.lock().insts.get(inst).map(|i| i.hdls.clone())
    }

    /// Returns the attribute key of a handle.
    #[must_use]
    pub fn resolve(&self, hdl: Handle) -> Option<AttrKey> {
        self.inner.lock().map.get(&hdl).map(|t| t.key)
    }

    /// Returns a watch receiver that reflects state changes of an instance.
    #[must_use]
    pub fn state(&self, inst: usize) -> Option<watch::Receiver<HidState>> {
        self.inner.lock().insts.get(inst).map(|i| i.w.subscribe())
    }

    /// Returns the attribute table cursors.
    #[must_use]
    pub fn cursors(&self) -> Cursors {
        self.inner.lock().tab.cursors()
    }

    /// Returns the number of instances.
    #[must_use]
    pub fn instances(&self) -> usize {
        self.inner.lock().insts.len()
    }

    /// Returns whether the attribute table is registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.inner.lock().registered
    }

    /// Calls `f` with the attribute table.
    pub fn table<R>(&self, f: impl FnOnce(&AttrTable<AttrKey>) -> R) -> R {
        f(&self.inner.lock().tab)
    }

    /// Informs the notifier about a value change if the handle is assigned.
    #[inline]
    fn changed(&self, hdl: Option<Handle>) {
        if let Some(hdl) = hdl {
            self.ntf.value_changed(hdl);
        }
    }

    fn with_params<T>(&self, inst: usize, f: impl FnOnce(&Params) -> Option<T>) -> Option<T> {
        self.inner.lock().insts.get(inst).and_then(|i| f(&i.p))
    }

    fn with_report<T>(
        &self,
        inst: usize,
        typ: ReportType,
        id: u8,
        f: impl FnOnce(&Report) -> T,
    ) -> Option<T> {
        let this = self.inner.lock();
        let p = &this.insts.get(inst)?.p;
        report::find(&p.reports, typ, id).map(|i| f(&p.reports[i]))
    }
}

impl Debug for HidService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_struct(name_of!(HidService)))
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Resolved attribute handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Target {
    pub key: AttrKey,
    pub props: Prop,
}

/// Shared service state.
#[derive(Debug)]
pub(super) struct Inner {
    pub cfg: Config,
    pub tab: AttrTable<AttrKey>,
    pub insts: Vec<Instance>,
    pub map: BTreeMap<Handle, Target>,
    pub registered: bool,
}

impl Inner {
    /// Returns the specified instance.
    #[inline]
    fn inst_mut(&mut self, inst: usize) -> Result<&mut Instance> {
        self.insts.get_mut(inst).ok_or(Error::InvalidInstance(inst))
    }

    /// Performs two-phase registration and builds the handle map. Instance
    /// state is only modified if the assignments are valid.
    fn register<E: Engine>(&mut self, eng: &mut E) -> Result<()> {
        let reg = |e: E::Error| Error::Registration(Box::new(e));
        eng.count_cfg(&self.tab).map_err(reg)?;
        let hdls = eng.add_svcs(&self.tab).map_err(reg)?;

        let props: BTreeMap<AttrKey, Prop> = self.tab.keys().map(|(&k, p)| (k, p)).collect();
        let mut seen = BTreeSet::new();
        let mut map = BTreeMap::new();
        for a in hdls {
            let Some(&props) = props.get(&a.key) else {
                return Err(HandleError::Unknown(a.key, a.hdl).into());
            };
            let key = a.key;
            if !seen.insert(key) || map.insert(a.hdl, Target { key, props }).is_some() {
                return Err(HandleError::Duplicate(key, a.hdl).into());
            }
        }
        if let Some(&k) = props.keys().find(|k| !seen.contains(k)) {
            return Err(HandleError::Missing(k).into());
        }

        for (&hdl, t) in &map {
            let ok = (self.insts.get_mut(t.key.inst)).map_or(false, |i| i.assign(t.key.field, hdl));
            if !ok {
                error!("Failed to assign {hdl} to {:?}", t.key);
            }
        }
        debug!(
            "Registered {} HID service instance(s) with {} handles",
            self.insts.len(),
            map.len()
        );
        self.map = map;
        self.registered = true;
        Ok(())
    }
}
