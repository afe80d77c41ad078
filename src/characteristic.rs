//! Remote GATT characteristic handle.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use gattc_const::{Info, Table, Uuid};

pub use {prop::*, reply::*};

use crate::event::{ListenerId, Router, Subscriber};
use crate::host::{Descriptor, Event, EventKind, Handle, Key, Transport, Value};

mod prop;
mod reply;

#[cfg(test)]
mod tests;

/// Error type returned by characteristic operations.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("data must be a byte buffer")]
    NotBuffer,
    #[error("characteristic handle dropped before {0} completion")]
    Closed(EventKind),
}

/// Common characteristic result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Characteristic declaration reported by service discovery.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decl {
    pub peripheral: String,
    pub service: Uuid,
    pub uuid: Uuid,
    pub props: CharProp,
    pub value_handle: Handle,
    pub start_handle: Handle,
    pub end_handle: Handle,
}

/// Characteristic handle configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Reject [`Payload::Text`] writes. Disable for hosts where text is an
    /// acceptable transport payload.
    pub strict_payload: bool,
    /// Table used to resolve characteristic names and types.
    pub table: &'static Table,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            strict_payload: true,
            table: Table::global(),
        }
    }
}

/// Characteristic write payload.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum Payload {
    Buffer(Vec<u8>),
    Text(String),
}

impl Payload {
    #[inline]
    const fn type_name(&self) -> &'static str {
        match *self {
            Self::Buffer(_) => "buffer",
            Self::Text(_) => "text",
        }
    }
}

impl From<Vec<u8>> for Payload {
    #[inline(always)]
    fn from(v: Vec<u8>) -> Self {
        Self::Buffer(v)
    }
}

impl From<&[u8]> for Payload {
    #[inline(always)]
    fn from(v: &[u8]) -> Self {
        Self::Buffer(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Payload {
    #[inline(always)]
    fn from(v: [u8; N]) -> Self {
        Self::Buffer(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    #[inline(always)]
    fn from(v: &[u8; N]) -> Self {
        Self::Buffer(v.to_vec())
    }
}

impl From<String> for Payload {
    #[inline(always)]
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Payload {
    #[inline(always)]
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Handle of one characteristic on a remote peripheral.
///
/// Every operation registers its completion (if any) with the handle and then
/// issues a transport command. The transport reports completion through
/// [`Self::handle_event`]. Concurrent operations of the same kind complete in
/// the order they were issued. Operations have no timeout. A completion that
/// never arrives leaves its callback registered until the handle is dropped.
#[derive(Debug)]
pub struct Characteristic<T: Transport + ?Sized> {
    t: Arc<T>,
    key: Key,
    props: CharProp,
    value_handle: Handle,
    start_handle: Handle,
    end_handle: Handle,
    info: Option<&'static Info>,
    strict_payload: bool,
    descriptors: parking_lot::Mutex<Option<Vec<Descriptor>>>,
    router: Router,
}

impl<T: Transport + ?Sized> Characteristic<T> {
    /// Creates a characteristic handle with the default configuration.
    #[inline]
    #[must_use]
    pub fn new(t: Arc<T>, d: Decl) -> Self {
        Self::with_config(t, d, Config::default())
    }

    /// Creates a characteristic handle. The transport is not used until the
    /// first operation.
    #[must_use]
    pub fn with_config(t: Arc<T>, d: Decl, cfg: Config) -> Self {
        let info = cfg.table.characteristic(d.uuid);
        Self {
            t,
            key: Key {
                peripheral: d.peripheral,
                service: d.service,
                uuid: d.uuid,
            },
            props: d.props,
            value_handle: d.value_handle,
            start_handle: d.start_handle,
            end_handle: d.end_handle,
            info,
            strict_payload: cfg.strict_payload,
            descriptors: parking_lot::Mutex::new(None),
            router: Router::default(),
        }
    }

    /// Returns the routing key of the characteristic.
    #[inline(always)]
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the identifier of the owning peripheral.
    #[inline(always)]
    #[must_use]
    pub fn peripheral_id(&self) -> &str {
        &self.key.peripheral
    }

    /// Returns the UUID of the owning service.
    #[inline(always)]
    #[must_use]
    pub const fn service_uuid(&self) -> Uuid {
        self.key.service
    }

    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.key.uuid
    }

    /// Returns the assigned characteristic name, if known.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.info.map(|i| i.name.as_str())
    }

    /// Returns the assigned characteristic type, if known.
    #[inline]
    #[must_use]
    pub fn typ(&self) -> Option<&'static str> {
        self.info.map(|i| i.typ.as_str())
    }

    #[inline(always)]
    #[must_use]
    pub const fn properties(&self) -> CharProp {
        self.props
    }

    #[inline(always)]
    #[must_use]
    pub const fn value_handle(&self) -> Handle {
        self.value_handle
    }

    #[inline(always)]
    #[must_use]
    pub const fn start_handle(&self) -> Handle {
        self.start_handle
    }

    #[inline(always)]
    #[must_use]
    pub const fn end_handle(&self) -> Handle {
        self.end_handle
    }

    /// Returns the descriptors assigned by [`Self::set_descriptors`], or
    /// [`None`] if discovery has not been completed.
    #[must_use]
    pub fn descriptors(&self) -> Option<Vec<Descriptor>> {
        self.descriptors.lock().clone()
    }

    /// Assigns discovered descriptors. Descriptor discovery completion does
    /// not call this. It is the responsibility of the discovery procedure
    /// that owns the handle.
    pub fn set_descriptors(&self, v: Vec<Descriptor>) {
        *self.descriptors.lock() = Some(v);
    }

    /// Returns the number of registered completions of the specified kind.
    #[inline]
    #[must_use]
    pub fn pending(&self, kind: EventKind) -> usize {
        self.router.pending(kind)
    }

    /// Delivers a transport event for this characteristic.
    pub fn handle_event(&self, evt: Event) {
        trace!("{} event for {}: {evt:?}", evt.kind(), self.key);
        self.router.emit(evt);
    }

    /// Reads the characteristic value. The callback receives the first read
    /// reply that is not a notification.
    pub fn read(&self, cb: Option<Callback<Value>>) {
        self.once(EventKind::Read, cb, |evt| match evt {
            Event::Read(v) => Some(v),
            _ => None,
        });
        debug!("Read {}", self.key);
        self.t.read(&self.key, self.value_handle);
    }

    /// Reads the characteristic value.
    pub fn read_async(&self) -> Reply<Value> {
        let (cb, r) = Reply::pair(EventKind::Read);
        self.read(Some(cb));
        r
    }

    /// Writes the characteristic value. Returns [`Error::NotBuffer`] without
    /// contacting the transport if `data` is text and the handle is
    /// configured with [`Config::strict_payload`].
    ///
    /// The transport may not report completion of writes without response,
    /// in which case the callback is never called.
    pub fn write(
        &self,
        data: impl Into<Payload>,
        without_response: bool,
        cb: Option<Callback<()>>,
    ) -> Result<()> {
        let data = match data.into() {
            Payload::Buffer(b) => b,
            Payload::Text(s) if !self.strict_payload => s.into_bytes(),
            p => {
                warn!("Rejected {} write payload for {}", p.type_name(), self.key);
                return Err(Error::NotBuffer);
            }
        };
        self.once(EventKind::Write, cb, |evt| {
            matches!(evt, Event::Write).then_some(())
        });
        debug!(
            "Write {} ({} bytes, without_response={without_response})",
            self.key,
            data.len()
        );
        self.t.write(&self.key, &data, without_response, self.value_handle);
        Ok(())
    }

    /// Writes the characteristic value. The returned future resolves
    /// immediately with an error if the payload is rejected.
    pub fn write_async(&self, data: impl Into<Payload>, without_response: bool) -> Reply<()> {
        let (cb, r) = Reply::pair(EventKind::Write);
        match self.write(data, without_response, Some(cb)) {
            Ok(()) => r,
            Err(e) => Reply::failed(EventKind::Write, e),
        }
    }

    /// Enables or disables broadcasts of the characteristic value.
    pub fn broadcast(&self, enable: bool, cb: Option<Callback<()>>) {
        self.once(EventKind::Broadcast, cb, |evt| {
            matches!(evt, Event::Broadcast).then_some(())
        });
        debug!("Broadcast {} (enable={enable})", self.key);
        self.t.broadcast(&self.key, enable);
    }

    /// Enables or disables broadcasts of the characteristic value.
    pub fn broadcast_async(&self, enable: bool) -> Reply<()> {
        let (cb, r) = Reply::pair(EventKind::Broadcast);
        self.broadcast(enable, Some(cb));
        r
    }

    /// Enables or disables value notifications. Prefer [`Self::subscribe`]
    /// and [`Self::unsubscribe`].
    pub fn notify(&self, enable: bool, cb: Option<Callback<()>>) {
        self.once(EventKind::Notify, cb, |evt| {
            matches!(evt, Event::Notify).then_some(())
        });
        debug!("Notify {} (enable={enable})", self.key);
        self.t.notify(&self.key, enable, self.value_handle);
    }

    /// Enables or disables value notifications.
    pub fn notify_async(&self, enable: bool) -> Reply<()> {
        let (cb, r) = Reply::pair(EventKind::Notify);
        self.notify(enable, Some(cb));
        r
    }

    /// Enables value notifications. Values are delivered to listeners
    /// registered with [`Self::on_value`] and [`Self::values`].
    #[inline]
    pub fn subscribe(&self, cb: Option<Callback<()>>) {
        self.notify(true, cb);
    }

    /// Enables value notifications.
    #[inline]
    pub fn subscribe_async(&self) -> Reply<()> {
        self.notify_async(true)
    }

    /// Disables value notifications.
    #[inline]
    pub fn unsubscribe(&self, cb: Option<Callback<()>>) {
        self.notify(false, cb);
    }

    /// Disables value notifications.
    #[inline]
    pub fn unsubscribe_async(&self) -> Reply<()> {
        self.notify_async(false)
    }

    /// Discovers characteristic descriptors. The callback receives the
    /// descriptors in the order reported by the transport.
    pub fn discover_descriptors(&self, cb: Option<Callback<Vec<Descriptor>>>) {
        self.once(EventKind::DescriptorsDiscover, cb, |evt| match evt {
            Event::DescriptorsDiscover(v) => Some(v),
            _ => None,
        });
        debug!("Discover descriptors of {}", self.key);
        self.t.discover_descriptors(&self.key, self.value_handle);
    }

    /// Discovers characteristic descriptors.
    pub fn discover_descriptors_async(&self) -> Reply<Vec<Descriptor>> {
        let (cb, r) = Reply::pair(EventKind::DescriptorsDiscover);
        self.discover_descriptors(Some(cb));
        r
    }

    /// Registers a persistent listener for all values received by this
    /// handle, both read replies and notifications.
    pub fn on_value(&self, f: impl Fn(&Value) + Send + Sync + 'static) -> ListenerId {
        self.router.subscribe(Subscriber::Fn(Arc::new(f)))
    }

    /// Removes a listener registered with [`Self::on_value`]. Returns whether
    /// the listener was registered.
    #[inline]
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.router.unsubscribe(id)
    }

    /// Returns a stream of all values received by this handle, both read
    /// replies and notifications.
    #[must_use]
    pub fn values(&self) -> Values {
        let (tx, rx) = mpsc::unbounded_channel();
        self.router.subscribe(Subscriber::Chan(tx));
        Values(rx)
    }

    /// Registers a one-shot completion that converts the event with `f`.
    fn once<A: 'static>(
        &self,
        kind: EventKind,
        cb: Option<Callback<A>>,
        f: fn(Event) -> Option<A>,
    ) {
        let Some(cb) = cb else { return };
        self.router.once(
            kind,
            Box::new(move |evt| {
                if let Some(a) = f(evt) {
                    cb.call(a);
                }
            }),
        );
    }
}

impl<T: Transport + ?Sized> Display for Characteristic<T> {
    /// Formats a JSON summary of the characteristic identity and metadata.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        #[derive(serde::Serialize)]
        struct Summary {
            uuid: Uuid,
            name: Option<&'static str>,
            #[serde(rename = "type")]
            typ: Option<&'static str>,
            properties: Vec<&'static str>,
        }
        let s = Summary {
            uuid: self.key.uuid,
            name: self.name(),
            typ: self.typ(),
            properties: self.props.names(),
        };
        f.write_str(&serde_json::to_string(&s).map_err(|_| std::fmt::Error)?)
    }
}
