// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Layout of the three firmware comms areas in VEC local RAM.
//!
//! Each area is a circular word buffer with a small header at the base of
//! its VLR region.  The header fields are written only by the side that
//! owns them: the host advances the Control/Decode write index and the
//! Completed read index; firmware advances the rest.

/// Byte offset of the capacity field (in words) within an area's region.
pub const HDR_CAPACITY: u32 = 0;
/// Byte offset of the read index (in words).
pub const HDR_RD_INDEX: u32 = 4;
/// Byte offset of the write index (in words).
pub const HDR_WR_INDEX: u32 = 8;
/// Byte offset of the first payload word.
pub const HDR_PAYLOAD: u32 = 12;

/// Byte offset of payload word `word` within an area's region.
pub const fn payload_offset(word: u32) -> u32 {
    HDR_PAYLOAD + word * 4
}

/// One of the three fixed comms areas.  Control and Decode are written by
/// the host and drained by firmware; Completed flows the other way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommsArea {
    Control,
    Decode,
    Completed,
}

impl CommsArea {
    /// Ring capacity in words.  Programmed into the area header exactly
    /// once at firmware-load time; every later header write re-derives the
    /// value from this constant so a stray caller can never resize a ring.
    pub const fn capacity(self) -> u32 {
        match self {
            CommsArea::Control => 64,
            CommsArea::Decode => 1024,
            CommsArea::Completed => 1024,
        }
    }

    /// Wire encoding used inside `SendFwMessageArgs`.
    pub const fn to_wire(self) -> u32 {
        match self {
            CommsArea::Control => 0,
            CommsArea::Decode => 1,
            CommsArea::Completed => 2,
        }
    }

    pub const fn from_wire(raw: u32) -> Option<CommsArea> {
        match raw {
            0 => Some(CommsArea::Control),
            1 => Some(CommsArea::Decode),
            2 => Some(CommsArea::Completed),
            _ => None,
        }
    }

    /// Whether the host is the producer for this area.
    pub const fn host_writes(self) -> bool {
        matches!(self, CommsArea::Control | CommsArea::Decode)
    }
}
