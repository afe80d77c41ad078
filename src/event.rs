//! Correlation of transport events with outstanding requests.

use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::host::{Event, EventKind, Value};

/// One-shot completion of an outstanding request.
pub(crate) type Completion = Box<dyn FnOnce(Event) + Send>;

/// Persistent value listener callback.
pub(crate) type ValueFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// Persistent value listener identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ListenerId(u64);

/// Received event router. Each request registers a one-shot waiter in a
/// single queue. An event completes the oldest waiter of its kind, so
/// concurrent requests of the same kind complete in issue order. Value
/// notifications never complete read requests. Instead, they are broadcast
/// to persistent subscribers, which also observe read replies.
#[derive(Default)]
pub(crate) struct Router(parking_lot::Mutex<Waiters>);

impl Router {
    /// Registers a one-shot waiter for the next event of the specified kind.
    /// Returns the request id.
    pub fn once(&self, kind: EventKind, f: Completion) -> u64 {
        let mut ws = self.0.lock();
        let id = ws.next_id();
        ws.queue.push_back(Waiter { id, kind, f });
        trace!("Registered {kind} waiter #{id}");
        id
    }

    /// Registers a persistent value subscriber. Closed channel subscribers
    /// are removed here and on every value delivery.
    pub fn subscribe(&self, s: Subscriber) -> ListenerId {
        let mut ws = self.0.lock();
        ws.subs.retain(|(_, sub)| !sub.is_closed());
        let id = ListenerId(ws.next_id());
        ws.subs.push((id, s));
        id
    }

    /// Removes a persistent value subscriber. Returns whether the subscriber
    /// was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut ws = self.0.lock();
        let n = ws.subs.len();
        ws.subs.retain(|&(sid, _)| sid != id);
        ws.subs.len() != n
    }

    /// Returns the number of waiters of the specified kind.
    pub fn pending(&self, kind: EventKind) -> usize {
        (self.0.lock().queue.iter())
            .filter(|w| w.kind == kind)
            .count()
    }

    /// Delivers an event to subscribers and to the oldest matching waiter.
    /// Callbacks are invoked without holding the router lock, so they may
    /// issue new requests.
    pub fn emit(&self, evt: Event) {
        let (waiter, subs) = {
            let mut ws = self.0.lock();
            let waiter = (ws.queue.iter().position(|w| w.matches(&evt)))
                .and_then(|i| ws.queue.remove(i));
            let subs = match evt {
                Event::Read(_) if !ws.subs.is_empty() => ws.subs.clone(),
                _ => Vec::new(),
            };
            (waiter, subs)
        };
        if let Event::Read(ref v) = evt {
            let closed: Vec<ListenerId> = (subs.into_iter())
                .filter_map(|(id, s)| (!s.deliver(v)).then_some(id))
                .collect();
            if !closed.is_empty() {
                (self.0.lock().subs).retain(|(id, _)| !closed.contains(id));
            }
        }
        match waiter {
            Some(w) => {
                trace!("Completing {} waiter #{}", w.kind, w.id);
                (w.f)(evt);
            }
            None if evt.is_notification() => {}
            None => debug!("Unmatched {} event", evt.kind()),
        }
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ws = self.0.lock();
        f.debug_struct("Router")
            .field("queue", &ws.queue)
            .field("subs", &ws.subs.len())
            .finish()
    }
}

/// Persistent value subscriber.
#[derive(Clone)]
pub(crate) enum Subscriber {
    Fn(ValueFn),
    Chan(mpsc::UnboundedSender<Value>),
}

impl Subscriber {
    /// Returns whether the subscriber can no longer receive values.
    #[inline]
    fn is_closed(&self) -> bool {
        matches!(*self, Self::Chan(ref tx) if tx.is_closed())
    }

    /// Delivers a value. Returns `false` if the subscriber is closed.
    fn deliver(&self, v: &Value) -> bool {
        match *self {
            Self::Fn(ref f) => {
                f(v);
                true
            }
            Self::Chan(ref tx) => tx.send(v.clone()).is_ok(),
        }
    }
}

/// Registered waiters and subscribers. `VecDeque` is used because there are
/// likely to be only a few outstanding requests at a time.
#[derive(Default)]
struct Waiters {
    queue: VecDeque<Waiter>,
    subs: Vec<(ListenerId, Subscriber)>,
    next_id: u64,
}

impl Waiters {
    #[inline]
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

/// Registered one-shot waiter.
struct Waiter {
    id: u64,
    kind: EventKind,
    f: Completion,
}

impl Waiter {
    /// Returns whether `evt` completes the waiter.
    #[inline]
    fn matches(&self, evt: &Event) -> bool {
        self.kind == evt.kind() && !evt.is_notification()
    }
}

impl Debug for Waiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Waiter({} #{})", self.kind, self.id)
    }
}
