// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Register offsets of the decode core, by bank.  Only the registers this
//! crate programs are listed; codec-specific banks are out of scope.

/// System control bank (`MemRegion::Sys`).
pub mod sys {
    /// Core identification signature.
    pub const SIGNATURE: u32 = 0x000;
    /// Core revision.
    pub const REVISION: u32 = 0x004;
    /// Per-block clock gates; see `CoreClocks`.
    pub const CLOCK_GATE: u32 = 0x010;
    /// Soft-reset request; hardware clears the bit when the reset settles.
    pub const RESET: u32 = 0x014;
    /// Raw interrupt status.
    pub const INT_STATUS: u32 = 0x020;
    /// Write-one-to-clear interrupt acknowledge.
    pub const INT_CLEAR: u32 = 0x024;
    /// Interrupt line enables.
    pub const INT_ENABLE: u32 = 0x028;
    /// MMU page directory base address.
    pub const MMU_DIR_BASE: u32 = 0x040;
    /// MMU control; bit 0 enables address translation.
    pub const MMU_CONTROL: u32 = 0x044;
    /// MMU TLB flush request; hardware clears the bit on completion.
    pub const MMU_FLUSH: u32 = 0x048;

    /// Expected `SIGNATURE & SIGNATURE_MASK` for a supported core.
    pub const SIGNATURE_VALUE: u32 = 0x0586_0000;
    pub const SIGNATURE_MASK: u32 = 0xffff_0000;

    pub const RESET_REQUEST: u32 = 1;
    pub const MMU_FLUSH_REQUEST: u32 = 1;
    pub const MMU_ENABLE: u32 = 1;
}

/// MTX microcontroller bank (`MemRegion::Mtx`).
pub mod mtx {
    /// Nonzero starts the microcontroller.
    pub const ENABLE: u32 = 0x000;
    /// Soft-reset request; hardware clears the bit when done.
    pub const SOFT_RESET: u32 = 0x008;
    /// Core RAM access port: auto-incrementing word address.
    pub const RAM_ADDR: u32 = 0x100;
    /// Core RAM access port: data window.
    pub const RAM_DATA: u32 = 0x104;
    /// Core RAM access port: bit 0 set while a transfer is in flight.
    pub const RAM_STATUS: u32 = 0x108;

    pub const ENABLE_RUN: u32 = 1;
    pub const SOFT_RESET_REQUEST: u32 = 1;
    /// Address-port flag selecting auto-increment on each data access.
    pub const RAM_ADDR_AUTO_INC: u32 = 1 << 31;
    pub const RAM_TRANSFER_BUSY: u32 = 1;
}

/// DMA engine bank (`MemRegion::Dma`).
pub mod dma {
    /// Physical address of the first linked-list descriptor.
    pub const LIST_ADDR: u32 = 0x00;
    /// Transfer length in words.
    pub const COUNT: u32 = 0x04;
    /// Bit 0 starts the transfer.
    pub const CONTROL: u32 = 0x08;
    /// Bit 0 set while the transfer is in flight.
    pub const STATUS: u32 = 0x0c;

    pub const CONTROL_GO: u32 = 1;
    pub const STATUS_BUSY: u32 = 1;
}

/// Iteration budget for register polls.  Each poll is a posted register
/// read, so the budget bounds the bus traffic of a stuck wait.
pub const POLL_ITERS: u32 = 1000;
