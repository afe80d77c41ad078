//! Recording transport for tests.

use parking_lot::Mutex;

use super::*;

/// Transport command issued by a characteristic handle.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum Command {
    Read {
        key: Key,
        value_handle: Handle,
    },
    Write {
        key: Key,
        data: Vec<u8>,
        without_response: bool,
        value_handle: Handle,
    },
    Broadcast {
        key: Key,
        enable: bool,
    },
    Notify {
        key: Key,
        enable: bool,
        value_handle: Handle,
    },
    DiscoverDescriptors {
        key: Key,
        value_handle: Handle,
    },
}

impl Command {
    /// Returns the event channel that completes the command.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match *self {
            Self::Read { .. } => EventKind::Read,
            Self::Write { .. } => EventKind::Write,
            Self::Broadcast { .. } => EventKind::Broadcast,
            Self::Notify { .. } => EventKind::Notify,
            Self::DiscoverDescriptors { .. } => EventKind::DescriptorsDiscover,
        }
    }
}

/// Transport that records every command and never emits events.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Vec<Command>>);

impl Recorder {
    /// Creates an empty recorder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded commands.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.0.lock().clone()
    }

    /// Removes and returns all recorded commands.
    #[must_use]
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Returns the number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns whether no commands were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    #[inline]
    fn push(&self, c: Command) {
        self.0.lock().push(c);
    }
}

impl Transport for Recorder {
    fn read(&self, k: &Key, value_handle: Handle) {
        self.push(Command::Read {
            key: k.clone(),
            value_handle,
        });
    }

    fn write(&self, k: &Key, data: &[u8], without_response: bool, value_handle: Handle) {
        self.push(Command::Write {
            key: k.clone(),
            data: data.to_vec(),
            without_response,
            value_handle,
        });
    }

    fn broadcast(&self, k: &Key, enable: bool) {
        self.push(Command::Broadcast {
            key: k.clone(),
            enable,
        });
    }

    fn notify(&self, k: &Key, enable: bool, value_handle: Handle) {
        self.push(Command::Notify {
            key: k.clone(),
            enable,
            value_handle,
        });
    }

    fn discover_descriptors(&self, k: &Key, value_handle: Handle) {
        self.push(Command::DiscoverDescriptors {
            key: k.clone(),
            value_handle,
        });
    }
}
