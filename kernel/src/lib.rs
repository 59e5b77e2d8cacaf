// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! REE-side core of the VXD video-decode driver.
//!
//! Decode commands never touch the protected hardware from here; they are
//! marshalled through a mutex-serialized shared buffer and a synchronous
//! cross-boundary call into the secure peer, which re-issues them against
//! the physical core.  Firmware responses travel the other way through the
//! Completed comms ring, fetched in bounded batches by the interrupt
//! reader and handed to the decode stack through a host message queue.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod channel;
pub mod core;
pub mod irq;
pub mod locking;
pub mod queue;

pub use crate::core::VxdCore;
pub use channel::{
    Delay, MsgBufGuard, RetryPolicy, SecureChannel, SecureTransport, SessionPolicy,
    SHARED_BUF_SIZE,
};
pub use irq::{InterruptReader, IrqDrain};
pub use queue::HostMsgQueue;
