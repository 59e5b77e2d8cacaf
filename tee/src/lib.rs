// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Secure-side peer of the VXD driver.
//!
//! The REE driver never touches the protected register banks directly; it
//! forwards endpoint calls across the trust boundary, and this crate
//! re-issues the equivalent register and DMA operations against the
//! physical core.  The pieces are the endpoint [`dispatch::Dispatcher`],
//! the per-core [`core::SecureCore`] hardware operations, and the
//! [`mtxio`] ring-buffer engine shared with MTX firmware.

#![no_std]

extern crate alloc;

pub mod core;
pub mod dispatch;
pub mod handlemap;
pub mod mtxio;
pub mod secmem;

pub use crate::core::SecureCore;
pub use dispatch::Dispatcher;
pub use handlemap::{Handle, HandleMap};
pub use mtxio::CommsRing;
pub use secmem::SecureMem;
