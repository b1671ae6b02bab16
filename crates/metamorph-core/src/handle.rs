//! Future-like handle for a running transformation

use crate::error::EnvironmentError;
use crate::result::TransformationResult;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use uuid::Uuid;

type Delivery = Result<TransformationResult, EnvironmentError>;

/// Handle to a transformation dispatched to the worker pool
///
/// Await it for the result. It resolves to an error only for environment
/// failures; failed or aborted transformations are `Ok` results with the
/// matching outcome. Dropping the handle does not stop the worker.
#[derive(Debug)]
pub struct TransformationHandle {
    request_id: Uuid,
    receiver: oneshot::Receiver<Delivery>,
}

impl TransformationHandle {
    pub(crate) fn new(request_id: Uuid, receiver: oneshot::Receiver<Delivery>) -> Self {
        Self {
            request_id,
            receiver,
        }
    }

    /// Handle that is already complete
    pub(crate) fn ready(request_id: Uuid, delivery: Delivery) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(delivery);
        Self::new(request_id, receiver)
    }

    /// Request id, also carried by the result
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Take the result if it is already available
    ///
    /// Returns `None` while the worker is still running.
    pub fn try_result(&mut self) -> Option<Delivery> {
        match self.receiver.try_recv() {
            Ok(delivery) => Some(delivery),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(worker_lost())),
        }
    }

    /// Block the current thread until the result arrives
    ///
    /// # Panics
    /// When called from within an asynchronous execution context; await the
    /// handle there instead.
    ///
    /// # Errors
    /// The environment error the request failed with.
    pub fn blocking_wait(self) -> Delivery {
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(worker_lost()))
    }
}

impl Future for TransformationHandle {
    type Output = Delivery;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(worker_lost())))
    }
}

fn worker_lost() -> EnvironmentError {
    EnvironmentError::Worker("worker dropped the request without a result".to_string())
}
