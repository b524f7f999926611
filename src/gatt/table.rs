use hogp_const::{Declaration, Uuid16};

use super::*;

/// Positions in the three arrays of an attribute table. Used both for the
/// cursors (next free slot) and for the array limits.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Cursors {
    pub svc: usize,
    pub chr: usize,
    pub dsc: usize,
}

impl Cursors {
    /// Creates a new set of positions.
    #[inline(always)]
    #[must_use]
    pub const fn new(svc: usize, chr: usize, dsc: usize) -> Self {
        Self { svc, chr, dsc }
    }

    /// Returns the component-wise sum of `self` and `n` or `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, n: Self) -> Option<Self> {
        match (
            self.svc.checked_add(n.svc),
            self.chr.checked_add(n.chr),
            self.dsc.checked_add(n.dsc),
        ) {
            (Some(svc), Some(chr), Some(dsc)) => Some(Self { svc, chr, dsc }),
            _ => None,
        }
    }
}

/// Service type ([Vol 3] Part G, Section 3.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SvcType {
    Primary,
}

impl SvcType {
    /// Returns the service declaration attribute type.
    #[inline]
    #[must_use]
    pub const fn uuid(self) -> Uuid16 {
        match self {
            Self::Primary => Declaration::PrimaryService.uuid16(),
        }
    }
}

/// Service definition. `chrs` is the index of the first characteristic in
/// its run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SvcDef {
    pub typ: SvcType,
    pub uuid: Uuid16,
    pub chrs: usize,
}

/// Characteristic definition. `dscs` is the index of the first descriptor in
/// its run, if the characteristic has any.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChrDef<K> {
    pub uuid: Uuid16,
    pub props: Prop,
    pub perms: Perms,
    pub key: K,
    pub dscs: Option<usize>,
}

/// Descriptor definition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DscDef<K> {
    pub uuid: Uuid16,
    pub perms: Perms,
    pub key: K,
}

/// Flattened service table in the layout expected by the GATT server. Each
/// array holds consecutive runs of definitions, and every run ends with an
/// empty slot (`None`). Each characteristic and descriptor carries a key of
/// type `K` that the server reports back with the handle it assigned.
///
/// Array lengths are the cursors. Slots are only appended, except when a
/// partially built run is rolled back with [`Self::truncate`] or the whole
/// table is cleared.
#[derive(Clone, Debug)]
pub struct AttrTable<K> {
    svcs: Vec<Option<SvcDef>>,
    chrs: Vec<Option<ChrDef<K>>>,
    dscs: Vec<Option<DscDef<K>>>,
    lim: Cursors,
}

impl<K> AttrTable<K> {
    /// Creates an empty table with the specified array limits.
    #[inline]
    #[must_use]
    pub const fn new(lim: Cursors) -> Self {
        Self {
            svcs: Vec::new(),
            chrs: Vec::new(),
            dscs: Vec::new(),
            lim,
        }
    }

    /// Returns the array limits.
    #[inline(always)]
    #[must_use]
    pub const fn limits(&self) -> Cursors {
        self.lim
    }

    /// Returns the current cursors.
    #[inline]
    #[must_use]
    pub fn cursors(&self) -> Cursors {
        Cursors::new(self.svcs.len(), self.chrs.len(), self.dscs.len())
    }

    /// Returns the name and limit of the first array that would overflow if
    /// `need` more slots were allocated, or `None` if everything fits.
    #[must_use]
    pub fn overflow(&self, need: Cursors) -> Option<(&'static str, usize)> {
        let Some(end) = self.cursors().checked_add(need) else {
            return Some(("attribute table", usize::MAX));
        };
        if end.svc > self.lim.svc {
            Some(("service", self.lim.svc))
        } else if end.chr > self.lim.chr {
            Some(("characteristic", self.lim.chr))
        } else if end.dsc > self.lim.dsc {
            Some(("descriptor", self.lim.dsc))
        } else {
            None
        }
    }

    /// Appends a service definition or terminator. Returns its index or
    /// `None` if the array is full.
    pub fn push_svc(&mut self, def: Option<SvcDef>) -> Option<usize> {
        push(&mut self.svcs, self.lim.svc, def)
    }

    /// Appends a characteristic definition or terminator. Returns its index or
    /// `None` if the array is full.
    pub fn push_chr(&mut self, def: Option<ChrDef<K>>) -> Option<usize> {
        push(&mut self.chrs, self.lim.chr, def)
    }

    /// Appends a single-descriptor run: the definition followed by its
    /// terminator. Returns the index of the run or `None` if the array cannot
    /// hold both slots.
    pub fn push_dsc(&mut self, def: DscDef<K>) -> Option<usize> {
        if self.lim.dsc.saturating_sub(self.dscs.len()) < 2 {
            return None;
        }
        let i = self.dscs.len();
        self.dscs.extend([Some(def), None]);
        Some(i)
    }

    /// Discards all slots at or beyond `c`.
    pub fn truncate(&mut self, c: Cursors) {
        self.svcs.truncate(c.svc);
        self.chrs.truncate(c.chr);
        self.dscs.truncate(c.dsc);
    }

    /// Removes all definitions, resetting the cursors to zero.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(Cursors::default());
    }

    /// Returns the raw service array.
    #[inline(always)]
    #[must_use]
    pub fn svc_slots(&self) -> &[Option<SvcDef>] {
        &self.svcs
    }

    /// Returns the raw characteristic array.
    #[inline(always)]
    #[must_use]
    pub fn chr_slots(&self) -> &[Option<ChrDef<K>>] {
        &self.chrs
    }

    /// Returns the raw descriptor array.
    #[inline(always)]
    #[must_use]
    pub fn dsc_slots(&self) -> &[Option<DscDef<K>>] {
        &self.dscs
    }

    /// Returns an iterator over the service run starting at index 0.
    pub fn services(&self) -> impl Iterator<Item = SvcView<'_, K>> {
        run(&self.svcs, 0).map(move |def| SvcView { tab: self, def })
    }

    /// Returns the keys and properties of all characteristics and
    /// descriptors in the table. Descriptors have empty properties.
    pub fn keys(&self) -> impl Iterator<Item = (&K, Prop)> {
        let chrs = self.chrs.iter().flatten().map(|c| (&c.key, c.props));
        chrs.chain(self.dscs.iter().flatten().map(|d| (&d.key, Prop::empty())))
    }
}

/// Service view with access to its characteristics.
#[derive(Debug)]
pub struct SvcView<'a, K> {
    tab: &'a AttrTable<K>,
    def: &'a SvcDef,
}

impl<'a, K> SvcView<'a, K> {
    /// Returns the service definition.
    #[inline(always)]
    #[must_use]
    pub const fn def(&self) -> &'a SvcDef {
        self.def
    }

    /// Returns an iterator over the service characteristics.
    pub fn characteristics(&self) -> impl Iterator<Item = ChrView<'a, K>> {
        let tab = self.tab;
        run(&tab.chrs, self.def.chrs).map(move |def| ChrView { tab, def })
    }
}

/// Characteristic view with access to its descriptors.
#[derive(Debug)]
pub struct ChrView<'a, K> {
    tab: &'a AttrTable<K>,
    def: &'a ChrDef<K>,
}

impl<'a, K> ChrView<'a, K> {
    /// Returns the characteristic definition.
    #[inline(always)]
    #[must_use]
    pub const fn def(&self) -> &'a ChrDef<K> {
        self.def
    }

    /// Returns an iterator over the characteristic descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &'a DscDef<K>> {
        let tab = self.tab;
        (self.def.dscs.into_iter()).flat_map(move |i| run(&tab.dscs, i))
    }
}

/// Appends `v` to `arr` unless it already holds `lim` slots.
#[inline]
fn push<T>(arr: &mut Vec<Option<T>>, lim: usize, v: Option<T>) -> Option<usize> {
    let i = arr.len();
    (i < lim).then(|| arr.push(v)).map(|_| i)
}

/// Returns the definitions of the run starting at index `i`.
#[inline]
fn run<T>(arr: &[Option<T>], i: usize) -> impl Iterator<Item = &T> {
    arr.get(i..).unwrap_or_default().iter().map_while(Option::as_ref)
}
