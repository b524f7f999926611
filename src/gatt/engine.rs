use std::sync::Arc;

use tracing::debug;

use super::*;

/// Handle assigned by the GATT server to the characteristic value or
/// descriptor identified by `key`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Assigned<K> {
    pub key: K,
    pub hdl: Handle,
}

/// External GATT server that owns the attribute database. Registration is a
/// two-phase operation: the table is first counted to size the database and
/// then added to it.
pub trait Engine {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Verifies that the database can hold every service in `tab` without
    /// modifying it.
    fn count_cfg<K>(&mut self, tab: &AttrTable<K>) -> Result<(), Self::Error>;

    /// Adds every service in `tab` to the database. Returns the handle
    /// assigned to each characteristic value and descriptor.
    fn add_svcs<K: Copy>(&mut self, tab: &AttrTable<K>) -> Result<Vec<Assigned<K>>, Self::Error>;
}

/// Receiver of characteristic value change events. The GATT server uses these
/// to send notifications to subscribed peers. Delivery is not confirmed.
pub trait Notifier: Send + Sync {
    /// Reports that the value of the characteristic at `hdl` has changed.
    fn value_changed(&self, hdl: Handle);
}

impl Notifier for () {
    #[inline(always)]
    fn value_changed(&self, _: Handle) {}
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    #[inline(always)]
    fn value_changed(&self, hdl: Handle) {
        (**self).value_changed(hdl);
    }
}

impl Notifier for tokio::sync::mpsc::UnboundedSender<Handle> {
    fn value_changed(&self, hdl: Handle) {
        if self.send(hdl).is_err() {
            debug!("Notification receiver closed, dropping {hdl}");
        }
    }
}

/// Notifier that calls a closure.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct NotifyFn<F>(pub F);

impl<F: Fn(Handle) + Send + Sync> Notifier for NotifyFn<F> {
    #[inline(always)]
    fn value_changed(&self, hdl: Handle) {
        self.0(hdl);
    }
}

impl<F> std::fmt::Debug for NotifyFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NotifyFn")
    }
}
