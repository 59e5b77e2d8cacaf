// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

use bitfield_struct::bitfield;
use bitflags::bitflags;

/// Interrupt status word reported by `HandleInterrupts`.  Mirrors the
/// core's interrupt status register; `mtx_msg` is also synthesized by the
/// REE-side batch reader when it resumes a partially-forwarded batch
/// without touching hardware.
#[bitfield(u32)]
pub struct IntStatusWord {
    pub mtx_msg: bool,
    pub mmu_fault: bool,
    pub dma_complete: bool,
    pub watchdog: bool,
    #[bits(28)]
    rsvd: u32,
}

bitflags! {
    /// Per-block clock gates of the decode core.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CoreClocks: u32 {
        const CORE = 1 << 0;
        const MTX = 1 << 1;
        const VDEB = 1 << 2;
        const VDMC = 1 << 3;
        const VEC = 1 << 4;
        const DMA = 1 << 5;
    }
}

impl CoreClocks {
    /// Everything that must be running for normal decode operation.
    pub const fn run_set() -> CoreClocks {
        CoreClocks::all()
    }

    /// The minimal set left running while the core idles.
    pub const fn idle_set() -> CoreClocks {
        CoreClocks::CORE
    }
}
