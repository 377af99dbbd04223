//! Service loop: one task owns the driver and serves requests in order.
//!
//! Callers hold a cloneable [`DriverHandle`]. Each call sends an envelope
//! over a bounded channel and waits for the reply on a oneshot. The loop
//! ends when every handle has been dropped and returns the driver, so the
//! host can save it for a live update.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::driver::SecretDriver;
use crate::error::{DriverError, Result};
use crate::host::{Endpoint, GrantHandle, HostPort};
use crate::operation::{Operation, Reply, Request};

/// A request paired with where to send its reply.
struct Envelope {
    request: Request,
    reply: oneshot::Sender<Reply>,
}

/// Start the service loop on the current runtime.
pub fn spawn<H>(driver: SecretDriver<H>) -> (DriverHandle, JoinHandle<SecretDriver<H>>)
where
    H: HostPort + 'static,
{
    let (tx, rx) = mpsc::channel(driver.config().queue_depth);
    let task = tokio::spawn(serve(driver, rx));
    (DriverHandle { tx }, task)
}

async fn serve<H: HostPort>(
    mut driver: SecretDriver<H>,
    mut rx: mpsc::Receiver<Envelope>,
) -> SecretDriver<H> {
    tracing::debug!(device = %driver.name(), "service loop started");

    while let Some(Envelope { request, reply }) = rx.recv().await {
        let answer = driver.dispatch(&request);
        if reply.send(answer).is_err() {
            tracing::debug!(endpoint = %request.endpoint, "caller went away before reply");
        }
    }

    tracing::debug!(device = %driver.name(), "service loop stopped");
    driver
}

/// Handle for sending requests to a running driver.
#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Envelope>,
}

impl DriverHandle {
    /// Send a request and wait for the reply.
    pub async fn call(&self, request: Request) -> Result<Reply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| DriverError::ServiceClosed)?;
        rx.await.map_err(|_| DriverError::ServiceClosed)
    }

    pub async fn open(&self, endpoint: Endpoint, flags: u32) -> Result<Reply> {
        self.call(Request::new(endpoint, Operation::Open { flags })).await
    }

    pub async fn close(&self, endpoint: Endpoint) -> Result<Reply> {
        self.call(Request::new(endpoint, Operation::Close)).await
    }

    pub async fn read(&self, endpoint: Endpoint, handle: GrantHandle, len: usize) -> Result<Reply> {
        self.call(Request::new(endpoint, Operation::Read { handle, len }))
            .await
    }

    pub async fn write(
        &self,
        endpoint: Endpoint,
        handle: GrantHandle,
        len: usize,
    ) -> Result<Reply> {
        self.call(Request::new(endpoint, Operation::Write { handle, len }))
            .await
    }

    pub async fn grant(
        &self,
        endpoint: Endpoint,
        request: u32,
        handle: GrantHandle,
    ) -> Result<Reply> {
        self.call(Request::new(endpoint, Operation::Grant { request, handle }))
            .await
    }

    /// Whether the service loop is still accepting requests.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}
