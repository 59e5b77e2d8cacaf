// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Secure channel: mutually-exclusive, synchronous request/response
//! exchange with the secure peer.
//!
//! All channel state (transport, session, shared message buffer) lives
//! behind one spinlock.  Acquiring the message buffer returns an RAII
//! guard; every send happens through a guard, so a forgotten release on an
//! error path is not expressible.  Because the lock serializes the whole
//! exchange, the peer observes messages in lock-acquisition order.
//!
//! The only retry policy in the driver lives here too:
//! [`SecureChannel::send_fw_message`] converts a bounded number of `Busy`
//! results (ring out of space) into an eventual success or failure.  Every
//! other error propagates immediately.

use crate::locking::{SpinLock, SpinLockGuard};

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;
use vdecdefs::endpoint::SendFwMessageArgs;
use vdecdefs::{CommsArea, Endpoint, SecError};
use zerocopy::IntoBytes;

/// Size of the shared message buffer visible to both worlds.
pub const SHARED_BUF_SIZE: usize = 0x10000;

/// Fixed interval between firmware-message send retries.
pub const FW_SEND_RETRY_MS: u32 = 2;
/// Maximum number of retries after the initial attempt.
pub const FW_SEND_MAX_RETRIES: u32 = 100;

/// Synchronous cross-boundary invocation, as provided by the platform's
/// secure-world client API.
pub trait SecureTransport {
    type Session;

    /// Opens a session with the peer, returning the session object and
    /// the secure id the peer assigned to this core.
    fn open_session(&mut self) -> Result<(Self::Session, u32), SecError>;

    fn close_session(&mut self, session: Self::Session);

    /// Performs one synchronous call.  `msg` and `aux` are both visible
    /// to the peer and may be mutated by it.
    fn invoke(
        &mut self,
        session: &mut Self::Session,
        secure_id: u32,
        endpoint: Endpoint,
        msg: &mut [u8],
        aux: Option<&mut [u8]>,
    ) -> Result<(), SecError>;
}

/// Blocking wait, used only by the firmware-message retry path.  Models
/// the event-object plus single-shot timer the platform provides.
pub trait Delay {
    fn wait_ms(&self, ms: u32);
}

/// What `release_id` does with the peer session.  The two platform
/// variants of the original driver disagree on this, so it is explicit
/// configuration rather than a baked-in choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPolicy {
    /// Keep the session open across releases; `release_id` is a no-op.
    #[default]
    KeepAlive,
    /// Tear the session down on every release and re-establish on next
    /// use.
    TeardownOnRelease,
}

/// Bounded fixed-interval retry, applied to `Busy` results only.  The
/// contract is deliberately rigid: no backoff, no unbounded retry, since
/// firmware relies on the observable timing.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: FW_SEND_MAX_RETRIES,
            interval_ms: FW_SEND_RETRY_MS,
        }
    }
}

struct ChanInner<T: SecureTransport> {
    transport: T,
    session: Option<(T::Session, u32)>,
    shared: Box<[u8]>,
}

/// Opens a session if none exists.  Does not probe an existing one; the
/// probe belongs to [`SecureChannel::secure_id`] only.
fn session_id<T: SecureTransport>(inner: &mut ChanInner<T>) -> Result<u32, SecError> {
    if let Some((_, id)) = inner.session.as_ref() {
        return Ok(*id);
    }
    let (session, id) = inner.transport.open_session().map_err(|err| {
        log::error!("cannot reach secure peer: {err}");
        SecError::Fatal
    })?;
    log::info!("secure session established, id {id:#010x}");
    inner.session = Some((session, id));
    Ok(id)
}

/// The secure channel for one hardware core.
pub struct SecureChannel<T: SecureTransport, D: Delay> {
    inner: SpinLock<ChanInner<T>>,
    delay: D,
    policy: SessionPolicy,
    retry: RetryPolicy,
}

impl<T: SecureTransport, D: Delay> fmt::Debug for SecureChannel<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("policy", &self.policy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<T: SecureTransport, D: Delay> SecureChannel<T, D> {
    pub fn new(transport: T, delay: D, policy: SessionPolicy) -> SecureChannel<T, D> {
        SecureChannel {
            inner: SpinLock::new(ChanInner {
                transport,
                session: None,
                shared: vec![0u8; SHARED_BUF_SIZE].into_boxed_slice(),
            }),
            delay,
            policy,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Establishes or reuses the peer session and returns its secure id.
    ///
    /// An existing session is probed with a trivial `GetCoreState` round
    /// trip; if the probe fails, the stale session is torn down and a
    /// fresh one opened.
    pub fn secure_id(&self) -> Result<u32, SecError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some((sess, id)) = inner.session.as_mut() {
            let id = *id;
            let mut probe = [0u8; 24];
            debug_assert_eq!(probe.len(), Endpoint::GetCoreState.arg_size());
            match inner
                .transport
                .invoke(sess, id, Endpoint::GetCoreState, &mut probe, None)
            {
                Ok(()) => return Ok(id),
                Err(err) => {
                    log::warn!("session {id:#010x} probe failed ({err}), reopening");
                    if let Some((sess, _)) = inner.session.take() {
                        inner.transport.close_session(sess);
                    }
                }
            }
        }

        session_id(inner)
    }

    /// Releases the secure id obtained from [`SecureChannel::secure_id`].
    /// Under `KeepAlive` this is a no-op; under `TeardownOnRelease` the
    /// peer session is closed and will be re-established on next use.
    pub fn release_id(&self) {
        if self.policy == SessionPolicy::KeepAlive {
            return;
        }
        let mut inner = self.inner.lock();
        if let Some((session, id)) = inner.session.take() {
            inner.transport.close_session(session);
            log::info!("secure session {id:#010x} closed");
        }
    }

    /// Locks the channel and hands out the shared message buffer.  The
    /// lock is held until the returned guard drops; concurrent callers
    /// block here.
    pub fn acquire_msg_buffer(
        &self,
        size: usize,
        endpoint: Endpoint,
    ) -> Result<MsgBufGuard<'_, T>, SecError> {
        if size > SHARED_BUF_SIZE {
            return Err(SecError::InvalidParameters);
        }
        Ok(MsgBufGuard {
            inner: self.inner.lock(),
            endpoint,
            size,
        })
    }

    /// One complete exchange: acquire, send, release.
    pub fn call(&self, endpoint: Endpoint, msg: &mut [u8]) -> Result<(), SecError> {
        let mut guard = self.acquire_msg_buffer(msg.len(), endpoint)?;
        guard.send(msg)
    }

    /// One complete exchange carrying an auxiliary payload region.
    pub fn call_with_buf(
        &self,
        endpoint: Endpoint,
        msg: &mut [u8],
        aux: &mut [u8],
    ) -> Result<(), SecError> {
        let mut guard = self.acquire_msg_buffer(msg.len() + aux.len(), endpoint)?;
        guard.send_with_buf(msg, aux)
    }

    /// Sends a firmware message into `area`, retrying on `Busy` at a
    /// fixed interval up to the retry budget.  Exhaustion returns `Busy`;
    /// any other error aborts immediately.  Every attempt re-enters the
    /// full send path, so the peer re-reads the ring indexes (their state
    /// is unspecified after a failed send).
    pub fn send_fw_message(&self, area: CommsArea, msg: &[u8]) -> Result<(), SecError> {
        if !area.host_writes() || msg.is_empty() {
            return Err(SecError::InvalidParameters);
        }
        let mut attempts = 0;
        loop {
            match self.try_send_fw(area, msg) {
                Err(SecError::Busy) => {
                    if attempts == self.retry.max_retries {
                        log::warn!(
                            "firmware {area:?} ring still busy after {attempts} retries"
                        );
                        return Err(SecError::Busy);
                    }
                    attempts += 1;
                    self.delay.wait_ms(self.retry.interval_ms);
                }
                other => return other,
            }
        }
    }

    /// Test hook: inspect the transport under the lock.
    #[cfg(test)]
    pub(crate) fn with_transport<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().transport)
    }

    fn try_send_fw(&self, area: CommsArea, msg: &[u8]) -> Result<(), SecError> {
        let args = SendFwMessageArgs {
            area: area.to_wire(),
            msg_size: msg.len() as u32,
        };
        let mut arg_bytes = [0u8; 8];
        args.write_to(&mut arg_bytes[..])
            .map_err(|_| SecError::GenericFailure)?;
        let mut aux = msg.to_vec();
        self.call_with_buf(Endpoint::SendFwMessage, &mut arg_bytes, &mut aux)
    }
}

/// Exclusive hold on the shared message buffer.  Dropping the guard
/// releases the channel; there is no other way to release it.
#[must_use = "dropping the guard releases the channel"]
pub struct MsgBufGuard<'a, T: SecureTransport> {
    inner: SpinLockGuard<'a, ChanInner<T>>,
    endpoint: Endpoint,
    size: usize,
}

impl<T: SecureTransport> fmt::Debug for MsgBufGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgBufGuard")
            .field("endpoint", &self.endpoint)
            .field("size", &self.size)
            .finish()
    }
}

impl<T: SecureTransport> MsgBufGuard<'_, T> {
    /// The acquired window of the shared buffer.
    pub fn buffer(&mut self) -> &mut [u8] {
        &mut self.inner.shared[..self.size]
    }

    /// Copies `msg` into the shared buffer, performs the cross-boundary
    /// call, and copies the (possibly mutated) result back into `msg`.
    pub fn send(&mut self, msg: &mut [u8]) -> Result<(), SecError> {
        self.exchange(msg, None)
    }

    /// As [`MsgBufGuard::send`], with a second payload region appended
    /// after the message.  Both regions are copied back out after the
    /// call.
    pub fn send_with_buf(&mut self, msg: &mut [u8], aux: &mut [u8]) -> Result<(), SecError> {
        self.exchange(msg, Some(aux))
    }

    fn exchange(&mut self, msg: &mut [u8], aux: Option<&mut [u8]>) -> Result<(), SecError> {
        let aux_len = aux.as_ref().map_or(0, |a| a.len());
        if msg.len() + aux_len > self.size {
            return Err(SecError::InvalidParameters);
        }

        let endpoint = self.endpoint;
        let id = session_id(&mut self.inner)?;

        let ChanInner {
            transport,
            session,
            shared,
        } = &mut *self.inner;
        let (sess, _) = session.as_mut().ok_or(SecError::Fatal)?;

        let (shared_msg, shared_rest) = shared.split_at_mut(msg.len());
        shared_msg.copy_from_slice(msg);
        let result = match aux {
            Some(aux) => {
                let shared_aux = &mut shared_rest[..aux.len()];
                shared_aux.copy_from_slice(aux);
                let r = transport.invoke(sess, id, endpoint, shared_msg, Some(shared_aux));
                aux.copy_from_slice(shared_aux);
                r
            }
            None => transport.invoke(sess, id, endpoint, shared_msg, None),
        };
        msg.copy_from_slice(shared_msg);
        result
    }
}
