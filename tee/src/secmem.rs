// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

use vdecdefs::SecError;

/// Maps secure physical memory into the secure CPU's address space on
/// demand.  The returned mapping unmaps itself when dropped, so a handler
/// cannot leak a window on an error path.
pub trait SecureMem {
    type Mapping: AsRef<[u8]>;

    /// Maps `size` bytes at physical address `phys`.  Fails with
    /// `InvalidParameters` for a zero-sized or unmappable range and
    /// `OutOfMemory` when the mapping cannot be backed.
    fn map(&mut self, phys: u64, size: usize) -> Result<Self::Mapping, SecError>;
}
