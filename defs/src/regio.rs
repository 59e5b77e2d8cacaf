// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Word-granularity register and device-memory access.
//!
//! Both worlds drive hardware exclusively through this trait: the secure
//! peer for the full register file, the REE driver for the banks left open
//! to it.  Tests substitute a word-map fake.

use crate::comms::CommsArea;
use crate::error::SecError;

/// Register banks and device-local memory regions of the decode core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemRegion {
    /// VEC local RAM window holding the Control comms area.
    VlrControl,
    /// VEC local RAM window holding the Decode comms area.
    VlrDecode,
    /// VEC local RAM window holding the Completed comms area.
    VlrCompleted,
    /// MTX microcontroller bank (core RAM access port, soft reset, enable).
    Mtx,
    /// System control bank (identification, clocks, reset, interrupts, MMU).
    Sys,
    /// DMA engine bank.
    Dma,
}

impl MemRegion {
    /// The VLR window hosting `area`.
    pub const fn for_area(area: CommsArea) -> MemRegion {
        match area {
            CommsArea::Control => MemRegion::VlrControl,
            CommsArea::Decode => MemRegion::VlrDecode,
            CommsArea::Completed => MemRegion::VlrCompleted,
        }
    }

    /// Wire encoding used inside `ReadNRegistersArgs`.
    pub const fn to_wire(self) -> u32 {
        match self {
            MemRegion::VlrControl => 0,
            MemRegion::VlrDecode => 1,
            MemRegion::VlrCompleted => 2,
            MemRegion::Mtx => 3,
            MemRegion::Sys => 4,
            MemRegion::Dma => 5,
        }
    }

    pub const fn from_wire(raw: u32) -> Option<MemRegion> {
        match raw {
            0 => Some(MemRegion::VlrControl),
            1 => Some(MemRegion::VlrDecode),
            2 => Some(MemRegion::VlrCompleted),
            3 => Some(MemRegion::Mtx),
            4 => Some(MemRegion::Sys),
            5 => Some(MemRegion::Dma),
            _ => None,
        }
    }
}

/// Word read/write at `(region, byte offset)` granularity.
pub trait RegIo {
    fn read(&self, region: MemRegion, offset: u32) -> u32;
    fn write(&mut self, region: MemRegion, offset: u32, value: u32);

    /// Read-modify-write under `mask`.
    fn write_masked(&mut self, region: MemRegion, offset: u32, value: u32, mask: u32) {
        let old = self.read(region, offset);
        self.write(region, offset, (old & !mask) | (value & mask));
    }
}

/// Polls `(region, offset)` until `(value & mask) == expected`, giving up
/// after `iters` reads.
pub fn poll_eq(
    io: &impl RegIo,
    region: MemRegion,
    offset: u32,
    mask: u32,
    expected: u32,
    iters: u32,
) -> Result<(), SecError> {
    for _ in 0..iters {
        if io.read(region, offset) & mask == expected {
            return Ok(());
        }
    }
    Err(SecError::Timeout)
}
