//! Settle-once call primitive.
//!
//! A [`PendingCall`] is the single mechanism behind both calling conventions.
//! The future style awaits it through [`UnaryFuture`], which hides the cancel
//! surface. The callback style spawns it and hands the caller a [`CallHandle`]
//! that can cancel it.
//!
//! Each call moves through [`CallState`]:
//!
//! ```text
//! Created -> Sent -> Succeeded
//!                 -> Failed
//!                 -> Cancelled
//! ```
//!
//! The move into a terminal state is one compare-exchange on a shared atomic,
//! so a completion racing a cancel has exactly one winner.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt};

use crate::error::ClientError;

/// Lifecycle of one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallState {
    Created = 0,
    Sent = 1,
    Succeeded = 2,
    Failed = 3,
    Cancelled = 4,
}

impl CallState {
    fn from_u8(value: u8) -> CallState {
        match value {
            0 => CallState::Created,
            1 => CallState::Sent,
            2 => CallState::Succeeded,
            3 => CallState::Failed,
            _ => CallState::Cancelled,
        }
    }

    /// Returns true once the call has settled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Succeeded | CallState::Failed | CallState::Cancelled
        )
    }
}

struct Shared {
    state: AtomicU8,
    abort: AbortHandle,
}

impl Shared {
    fn state(&self) -> CallState {
        CallState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from a non-terminal state to `to`. Returns false if the call had
    /// already settled.
    fn transition(&self, to: CallState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if CallState::from_u8(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// An in-flight call that settles exactly once.
///
/// Resolves with the call's outcome, or with [`ClientError::Cancelled`] if
/// [`CallHandle::cancel`] won the race against completion.
#[must_use = "a pending call does nothing unless awaited or spawned"]
pub struct PendingCall<T> {
    inner: Abortable<BoxFuture<'static, Result<T, ClientError>>>,
    shared: Arc<Shared>,
}

impl<T: Send + 'static> PendingCall<T> {
    /// Wrap a call future. The call starts in [`CallState::Created`].
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        Self {
            inner: Abortable::new(future.boxed(), registration),
            shared: Arc::new(Shared {
                state: AtomicU8::new(CallState::Created as u8),
                abort,
            }),
        }
    }

    /// A call that fails without touching the network.
    pub fn failed(error: ClientError) -> Self {
        Self::new(futures::future::ready(Err(error))).sent()
    }

    /// Mark the call as issued.
    pub(crate) fn sent(self) -> Self {
        let _ = self.shared.state.compare_exchange(
            CallState::Created as u8,
            CallState::Sent as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self
    }
}

impl<T> PendingCall<T> {
    /// A handle that observes and can cancel this call.
    pub fn handle(&self) -> CallHandle {
        CallHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn state(&self) -> CallState {
        self.shared.state()
    }
}

impl<T> Future for PendingCall<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match Pin::new(&mut self.inner).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(_aborted)) => Err(ClientError::Cancelled),
        };

        let target = if outcome.is_ok() {
            CallState::Succeeded
        } else {
            CallState::Failed
        };

        if self.shared.transition(target) {
            Poll::Ready(outcome)
        } else {
            Poll::Ready(Err(ClientError::Cancelled))
        }
    }
}

impl<T> fmt::Debug for PendingCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("state", &self.state())
            .finish()
    }
}

/// Future returned by the future calling convention.
///
/// Settles exactly once. Unlike [`PendingCall`] it exposes no cancellation
/// handle: once issued, the call can only be ignored by dropping this future.
#[must_use = "futures do nothing unless awaited"]
pub struct UnaryFuture<T> {
    call: PendingCall<T>,
}

impl<T> UnaryFuture<T> {
    pub(crate) fn new(call: PendingCall<T>) -> Self {
        Self { call }
    }
}

impl<T> Future for UnaryFuture<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.call).poll(cx)
    }
}

impl<T> fmt::Debug for UnaryFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryFuture")
            .field("state", &self.call.state())
            .finish()
    }
}

/// Cancellation handle for a callback-style call.
#[derive(Clone)]
pub struct CallHandle {
    shared: Arc<Shared>,
}

impl CallHandle {
    /// Cancel the call if it has not settled yet.
    ///
    /// Returns true if this cancel settled the call; the callback then sees
    /// [`ClientError::Cancelled`]. Returns false if the call had already
    /// settled, in which case its original outcome stands.
    pub fn cancel(&self) -> bool {
        if !self.shared.transition(CallState::Cancelled) {
            return false;
        }
        self.shared.abort.abort();

        #[cfg(feature = "tracing")]
        tracing::debug!("rpc call cancelled");

        true
    }

    pub fn state(&self) -> CallState {
        self.shared.state()
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_terminal()
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle")
            .field("state", &self.state())
            .finish()
    }
}

/// The runtime that drives callback-style calls.
pub(crate) fn current_runtime() -> Result<tokio::runtime::Handle, ClientError> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| ClientError::Transport(format!("no tokio runtime to drive the call: {e}")))
}

/// Drive `call` on the current tokio runtime and deliver its outcome to
/// `callback` exactly once.
///
/// Without a runtime the callback is invoked immediately with a transport
/// error and no handle is returned.
pub fn spawn_callback<T, F>(call: PendingCall<T>, callback: F) -> Option<CallHandle>
where
    T: Send + 'static,
    F: FnOnce(Result<T, ClientError>) + Send + 'static,
{
    let runtime = match current_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            callback(Err(err));
            return None;
        }
    };

    let handle = call.handle();
    runtime.spawn(async move {
        let outcome = call.await;
        callback(outcome);
    });
    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_pending_call_succeeds() {
        let call = PendingCall::new(async { Ok::<_, ClientError>(7) }).sent();
        let handle = call.handle();
        assert_eq!(handle.state(), CallState::Sent);

        assert_eq!(call.await.unwrap(), 7);
        assert_eq!(handle.state(), CallState::Succeeded);
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn test_pending_call_failed() {
        let call = PendingCall::<()>::failed(ClientError::Protocol("bad path".into()));
        let handle = call.handle();

        let err = call.await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
        assert_eq!(handle.state(), CallState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_completion() {
        let (_tx, rx) = oneshot::channel::<u32>();
        let call = PendingCall::new(async move {
            rx.await
                .map_err(|_| ClientError::Transport("dropped".into()))
        })
        .sent();
        let handle = call.handle();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(handle.state(), CallState::Cancelled);
        assert!(call.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_spawn_callback_invoked_once() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = oneshot::channel();

        let counter = invocations.clone();
        let handle = spawn_callback(
            PendingCall::new(async { Ok::<_, ClientError>("ok") }).sent(),
            move |outcome| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.send(outcome);
            },
        )
        .unwrap();

        assert_eq!(done_rx.await.unwrap().unwrap(), "ok");
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(handle.is_settled());
    }

    #[tokio::test]
    async fn test_spawn_callback_cancelled_never_sees_success() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();

        let call = PendingCall::new(async move {
            let _ = release_rx.await;
            Ok::<_, ClientError>("late")
        })
        .sent();
        let handle = spawn_callback(call, move |outcome| {
            let _ = done_tx.send(outcome);
        })
        .unwrap();

        assert!(handle.cancel());
        let _ = release_tx.send(());

        let outcome = tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_spawn_callback_without_runtime() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = spawn_callback(
            PendingCall::new(async { Ok::<_, ClientError>(1) }),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        );

        assert!(handle.is_none());
        let outcome = rx.try_recv().unwrap();
        assert!(matches!(outcome, Err(ClientError::Transport(_))));
    }
}
