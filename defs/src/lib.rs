// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Wire-level definitions shared between the REE driver and its secure-side
//! peer: endpoint identifiers and argument layouts, the firmware comms-area
//! geometry, the packed message header word, and the numeric result codes
//! that carry the error taxonomy across the trust boundary.
//!
//! Everything in this crate is layout-stable by construction; both worlds
//! compile against the same definitions, and every struct that crosses the
//! boundary is plain-old-data with explicit reserved fields instead of
//! implicit padding.

#![no_std]

pub mod comms;
pub mod endpoint;
pub mod error;
pub mod msg;
pub mod regio;
pub mod regs;
pub mod status;

pub use comms::CommsArea;
pub use endpoint::Endpoint;
pub use error::SecError;
pub use msg::MtxMsgHeader;
pub use regio::{MemRegion, RegIo};
pub use status::IntStatusWord;
