//! Host transport contract.
//!
//! The transport performs radio I/O on behalf of characteristic handles. All
//! commands return immediately. Results are reported later as [`Event`]s,
//! which the owner of the handle routes by [`Key`] to
//! [`Characteristic::handle_event`](crate::Characteristic::handle_event).

use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use gattc_const::{Info, Table, Uuid};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Transport commands used by characteristic handles. Implementations must
/// not block and must not call back into the issuing handle synchronously.
pub trait Transport: Debug + Send + Sync {
    /// Requests the characteristic value. Completes with [`Event::Read`].
    fn read(&self, k: &Key, value_handle: Handle);

    /// Writes the characteristic value. Completes with [`Event::Write`],
    /// which the transport may omit when `without_response` is set.
    fn write(&self, k: &Key, data: &[u8], without_response: bool, value_handle: Handle);

    /// Enables or disables broadcasts of the characteristic value. Completes
    /// with [`Event::Broadcast`].
    fn broadcast(&self, k: &Key, enable: bool);

    /// Enables or disables value notifications. Completes with
    /// [`Event::Notify`].
    fn notify(&self, k: &Key, enable: bool, value_handle: Handle);

    /// Discovers characteristic descriptors. Completes with
    /// [`Event::DescriptorsDiscover`].
    fn discover_descriptors(&self, k: &Key, value_handle: Handle);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    #[inline(always)]
    fn read(&self, k: &Key, value_handle: Handle) {
        (**self).read(k, value_handle);
    }

    #[inline(always)]
    fn write(&self, k: &Key, data: &[u8], without_response: bool, value_handle: Handle) {
        (**self).write(k, data, without_response, value_handle);
    }

    #[inline(always)]
    fn broadcast(&self, k: &Key, enable: bool) {
        (**self).broadcast(k, enable);
    }

    #[inline(always)]
    fn notify(&self, k: &Key, enable: bool, value_handle: Handle) {
        (**self).notify(k, enable, value_handle);
    }

    #[inline(always)]
    fn discover_descriptors(&self, k: &Key, value_handle: Handle) {
        (**self).discover_descriptors(k, value_handle);
    }
}

/// Characteristic identity used by the transport to address commands and by
/// registries to route events.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Key {
    pub peripheral: String,
    pub service: Uuid,
    pub uuid: Uuid,
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.peripheral, self.service, self.uuid)
    }
}

/// Opaque transport-level attribute handle.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Handle(pub u16);

impl Debug for Handle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({:#06X})", self.0)
    }
}

impl Display for Handle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

impl From<u16> for Handle {
    #[inline(always)]
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Characteristic value delivered by the transport, either as a reply to a
/// read request or as an unsolicited notification.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Value {
    pub data: Vec<u8>,
    pub is_notification: bool,
    pub value_handle: Handle,
}

impl Value {
    /// Creates a read reply.
    #[inline]
    #[must_use]
    pub fn reply(data: impl Into<Vec<u8>>, value_handle: Handle) -> Self {
        Self {
            data: data.into(),
            is_notification: false,
            value_handle,
        }
    }

    /// Creates an unsolicited notification.
    #[inline]
    #[must_use]
    pub fn notification(data: impl Into<Vec<u8>>, value_handle: Handle) -> Self {
        Self {
            data: data.into(),
            is_notification: true,
            value_handle,
        }
    }
}

impl AsRef<[u8]> for Value {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Completion event emitted by the transport for one characteristic.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    Read(Value),
    Write,
    Broadcast,
    Notify,
    DescriptorsDiscover(Vec<Descriptor>),
}

impl Event {
    /// Returns the event channel.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match *self {
            Self::Read(_) => EventKind::Read,
            Self::Write => EventKind::Write,
            Self::Broadcast => EventKind::Broadcast,
            Self::Notify => EventKind::Notify,
            Self::DescriptorsDiscover(_) => EventKind::DescriptorsDiscover,
        }
    }

    /// Returns whether the event is an unsolicited value notification.
    #[inline]
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(
            *self,
            Self::Read(Value {
                is_notification: true,
                ..
            })
        )
    }
}

/// Event channel name.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[non_exhaustive]
pub enum EventKind {
    Read,
    Write,
    Broadcast,
    Notify,
    DescriptorsDiscover,
}

impl EventKind {
    /// Returns the transport's name for the event channel.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Broadcast => "broadcast",
            Self::Notify => "notify",
            Self::DescriptorsDiscover => "descriptorsDiscover",
        }
    }
}

impl Display for EventKind {
    #[inline(always)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Discovered characteristic descriptor. Descriptor values are not
/// interpreted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Descriptor {
    uuid: Uuid,
    handle: Handle,
    info: Option<&'static Info>,
}

impl Descriptor {
    /// Creates a descriptor with metadata from the global table.
    #[inline]
    #[must_use]
    pub fn new(uuid: Uuid, handle: Handle) -> Self {
        Self::with_table(uuid, handle, Table::global())
    }

    /// Creates a descriptor with metadata from table `t`.
    #[inline]
    #[must_use]
    pub fn with_table(uuid: Uuid, handle: Handle, t: &'static Table) -> Self {
        Self {
            uuid,
            handle,
            info: t.descriptor(uuid),
        }
    }

    /// Returns the descriptor UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the descriptor attribute handle.
    #[inline(always)]
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns the assigned descriptor name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.info.map(|i| i.name.as_str())
    }

    /// Returns the assigned descriptor type.
    #[inline]
    #[must_use]
    pub fn typ(&self) -> Option<&'static str> {
        self.info.map(|i| i.typ.as_str())
    }
}
