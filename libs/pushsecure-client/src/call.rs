//! Deferred request handles
//!
//! Client methods return a [`Call`] instead of sending anything. The caller
//! decides how to run it: await [`Call::execute`], block on
//! [`Call::execute_blocking`], or hand it to the runtime with
//! [`Call::enqueue`]. Cancellation is cooperative: a cancelled call resolves
//! to [`PushSecureError::Cancelled`], including when it is cancelled while
//! the request is in flight.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::{PushSecureError, Result};
use crate::transport::{Endpoint, Transport};

/// Cancels the call it was taken from
#[derive(Clone)]
pub struct Canceller {
    signal: Arc<watch::Sender<bool>>,
}

impl Canceller {
    fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A not-yet-sent request whose response decodes to `T`
pub struct Call<T> {
    transport: Transport,
    method: Method,
    endpoint: Result<Endpoint>,
    canceller: Canceller,
    _response: PhantomData<fn() -> T>,
}

impl<T> Call<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(transport: Transport, method: Method, endpoint: Result<Endpoint>) -> Self {
        Self {
            transport,
            method,
            endpoint,
            canceller: Canceller::new(),
            _response: PhantomData,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, `None` when the request could not be built
    pub fn url(&self) -> Option<&Url> {
        self.endpoint.as_ref().ok().map(|e| &e.url)
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }

    /// Handle that cancels this call from elsewhere, e.g. another task
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Send the request and decode the response
    pub async fn execute(self) -> Result<T> {
        let mut cancelled = self.canceller.signal.subscribe();
        if *cancelled.borrow_and_update() {
            return Err(PushSecureError::Cancelled);
        }

        let endpoint = self.endpoint?;
        let transport = self.transport;

        tokio::select! {
            biased;
            Ok(_) = cancelled.wait_for(|c| *c) => Err(PushSecureError::Cancelled),
            result = transport.execute(endpoint) => result,
        }
    }

    /// Send the request, blocking the calling thread until it completes
    ///
    /// Inside a multi-threaded tokio runtime the current worker is handed
    /// off with `block_in_place`. Inside a current-thread runtime, or with
    /// no runtime at all, the request runs on a private runtime.
    pub fn execute_blocking(self) -> Result<T> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.execute()))
            }
            Ok(_) => std::thread::scope(|scope| {
                match scope.spawn(move || block_on_private_runtime(self)).join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }),
            Err(_) => block_on_private_runtime(self),
        }
    }

    /// Run the call on the current tokio runtime and pass the result to
    /// `callback` when it completes
    pub fn enqueue<F>(self, callback: F) -> Result<CallHandle>
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| PushSecureError::NoRuntime)?;
        let canceller = self.canceller();
        let task = handle.spawn(async move {
            callback(self.execute().await);
        });
        Ok(CallHandle { task, canceller })
    }
}

fn block_on_private_runtime<T>(call: Call<T>) -> Result<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(PushSecureError::Runtime)?;
    runtime.block_on(call.execute())
}

impl<T> fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.method)
            .field("url", &self.endpoint.as_ref().ok().map(|e| e.url.as_str()))
            .field("cancelled", &self.canceller.is_cancelled())
            .finish()
    }
}

/// A call running in the background via [`Call::enqueue`]
#[derive(Debug)]
pub struct CallHandle {
    task: JoinHandle<()>,
    canceller: Canceller,
}

impl CallHandle {
    /// Request cancellation; the callback still runs, with `Cancelled`
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the callback has run. A panic inside the callback is
    /// propagated to the caller.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}
