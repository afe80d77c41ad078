use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_core::{FusedFuture, Stream};
use pin_project::pin_project;
use tokio::sync::{mpsc, oneshot};

use crate::host::{EventKind, Value};

use super::*;

/// Completion callback.
pub struct Callback<A>(Box<dyn FnOnce(A) + Send>);

impl<A> Callback<A> {
    /// Wraps a completion closure.
    #[inline]
    pub fn new(f: impl FnOnce(A) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    #[inline(always)]
    pub(super) fn call(self, a: A) {
        (self.0)(a);
    }
}

impl<A> Debug for Callback<A> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callback")
    }
}

impl<A, F: FnOnce(A) + Send + 'static> From<F> for Callback<A> {
    #[inline(always)]
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// Future resolving to the completion of one request. The request is issued
/// when the future is created, not when it is first polled, and dropping the
/// future does not withdraw it.
#[pin_project]
#[must_use = "the request is issued regardless, but its completion is lost"]
pub struct Reply<T> {
    kind: EventKind,
    err: Option<Error>,
    done: bool,
    #[pin]
    rx: oneshot::Receiver<T>,
}

impl<T: Send + 'static> Reply<T> {
    /// Returns a callback and the future that it resolves.
    pub(super) fn pair(kind: EventKind) -> (Callback<T>, Self) {
        let (tx, rx) = oneshot::channel();
        let cb = Callback::new(move |v| {
            // Receiver may have been dropped
            let _ = tx.send(v);
        });
        let r = Self {
            kind,
            err: None,
            done: false,
            rx,
        };
        (cb, r)
    }

    /// Returns a future that resolves immediately with error `e`.
    pub(super) fn failed(kind: EventKind, e: Error) -> Self {
        let (_, rx) = oneshot::channel();
        Self {
            kind,
            err: Some(e),
            done: false,
            rx,
        }
    }
}

impl<T> Future for Reply<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        assert!(!*this.done, "poll of a completed future");
        if let Some(e) = this.err.take() {
            *this.done = true;
            return Poll::Ready(Err(e));
        }
        let r = ready!(this.rx.poll(cx));
        *this.done = true;
        Poll::Ready(r.map_err(|_| Error::Closed(*this.kind)))
    }
}

impl<T> FusedFuture for Reply<T> {
    #[inline(always)]
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<T> Debug for Reply<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply")
            .field("kind", &self.kind)
            .field("err", &self.err)
            .field("done", &self.done)
            .finish()
    }
}

/// Stream of characteristic values, including both read replies and
/// notifications. The stream ends when the characteristic handle is dropped.
#[derive(Debug)]
pub struct Values(pub(super) mpsc::UnboundedReceiver<Value>);

impl Values {
    /// Returns the next value or [`None`] if the handle was dropped.
    #[inline]
    pub async fn next(&mut self) -> Option<Value> {
        self.0.recv().await
    }
}

impl Stream for Values {
    type Item = Value;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.poll_recv(cx)
    }
}
