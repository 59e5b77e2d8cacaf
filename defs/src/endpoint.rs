// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Endpoint identifiers and their fixed-layout argument structures.
//!
//! An endpoint call carries exactly one argument struct, copied wholesale
//! into the shared message buffer on the way in and back out on the way
//! back; some endpoints additionally carry an auxiliary payload region
//! (firmware blobs, register read results, message batches).  The secure
//! side validates that the received size matches the endpoint's argument
//! struct exactly, so these layouts are part of the wire contract and must
//! never contain implicit padding.

use core::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Operation selector for a cross-boundary call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Endpoint {
    StreamCreate = 0,
    StreamDestroy = 1,
    StreamSubmitBuf = 2,
    StreamPreParse = 3,
    CoreInit = 4,
    CoreDeInit = 5,
    CoreReset = 6,
    SendFwMessage = 7,
    HandleInterrupts = 8,
    GetCoreState = 9,
    PrepareFirmware = 10,
    LoadCoreFirmware = 11,
    ReadNRegisters = 12,
}

impl Endpoint {
    pub const fn from_u32(raw: u32) -> Option<Endpoint> {
        match raw {
            0 => Some(Endpoint::StreamCreate),
            1 => Some(Endpoint::StreamDestroy),
            2 => Some(Endpoint::StreamSubmitBuf),
            3 => Some(Endpoint::StreamPreParse),
            4 => Some(Endpoint::CoreInit),
            5 => Some(Endpoint::CoreDeInit),
            6 => Some(Endpoint::CoreReset),
            7 => Some(Endpoint::SendFwMessage),
            8 => Some(Endpoint::HandleInterrupts),
            9 => Some(Endpoint::GetCoreState),
            10 => Some(Endpoint::PrepareFirmware),
            11 => Some(Endpoint::LoadCoreFirmware),
            12 => Some(Endpoint::ReadNRegisters),
            _ => None,
        }
    }

    /// Exact size of this endpoint's argument struct.  Dispatch rejects
    /// any message whose size differs from this value.
    pub const fn arg_size(self) -> usize {
        match self {
            Endpoint::StreamCreate => size_of::<StreamCreateArgs>(),
            Endpoint::StreamDestroy => size_of::<StreamDestroyArgs>(),
            Endpoint::StreamSubmitBuf => size_of::<StreamSubmitBufArgs>(),
            Endpoint::StreamPreParse => size_of::<StreamPreParseArgs>(),
            Endpoint::CoreInit => size_of::<CoreInitArgs>(),
            Endpoint::CoreDeInit => size_of::<CoreDeInitArgs>(),
            Endpoint::CoreReset => size_of::<CoreResetArgs>(),
            Endpoint::SendFwMessage => size_of::<SendFwMessageArgs>(),
            Endpoint::HandleInterrupts => size_of::<HandleInterruptsArgs>(),
            Endpoint::GetCoreState => size_of::<GetCoreStateArgs>(),
            Endpoint::PrepareFirmware => size_of::<PrepareFirmwareArgs>(),
            Endpoint::LoadCoreFirmware => size_of::<LoadCoreFirmwareArgs>(),
            Endpoint::ReadNRegisters => size_of::<ReadNRegistersArgs>(),
        }
    }

    /// Whether this endpoint carries an auxiliary payload region in
    /// addition to its argument struct.
    pub const fn takes_aux_buffer(self) -> bool {
        matches!(
            self,
            Endpoint::SendFwMessage
                | Endpoint::HandleInterrupts
                | Endpoint::PrepareFirmware
                | Endpoint::ReadNRegisters
        )
    }
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StreamCreateArgs {
    /// Physical address of the stream context handed over by the caller.
    pub ctx_phys: u64,
    pub ctx_size: u32,
    pub flags: u32,
    /// Filled in by the secure side: handle for the created stream.
    pub stream_handle: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StreamDestroyArgs {
    pub stream_handle: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StreamSubmitBufArgs {
    pub buf_phys: u64,
    pub buf_size: u32,
    pub stream_handle: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StreamPreParseArgs {
    pub bitstream_phys: u64,
    pub bitstream_size: u32,
    pub stream_handle: u32,
    /// Filled in by the secure side: number of parse units found.
    pub units_found: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CoreInitArgs {
    pub mmu_base_phys: u64,
    pub flags: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CoreDeInitArgs {
    pub flags: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CoreResetArgs {
    pub flags: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SendFwMessageArgs {
    /// `CommsArea::to_wire` value; only Control and Decode are legal.
    pub area: u32,
    /// Size in bytes of the message carried in the auxiliary buffer.
    pub msg_size: u32,
}

/// Largest number of ring words one `HandleInterrupts` call may carry in
/// its auxiliary buffer.  Both sides size their transfer buffers from
/// this, so a single batch is bounded at 1 KiB regardless of how full the
/// Completed ring is.
pub const MAX_INT_TRANSFER_WORDS: usize = 256;

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct HandleInterruptsArgs {
    /// Filled in by the secure side: raw interrupt status word.
    pub int_status: u32,
    /// Filled in by the secure side: words written to the auxiliary buffer.
    pub words_out: u32,
    /// Filled in by the secure side: nonzero if the Completed ring still
    /// holds unread messages after this transfer.
    pub more_pending: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct GetCoreStateArgs {
    pub state: CoreStateWire,
}

/// Snapshot of core identification and comms progress, filled in by the
/// secure side on `GetCoreState`.
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CoreStateWire {
    pub core_id: u32,
    pub core_rev: u32,
    pub clocks: u32,
    pub int_status: u32,
    pub completed_rd: u32,
    pub completed_wr: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct PrepareFirmwareArgs {
    pub blob_phys: u64,
    pub blob_size: u32,
    /// Declared length of the firmware text in words; must match the blob.
    pub word_count: u32,
}

/// `LoadCoreFirmwareArgs::load_mode` values.
pub const FW_LOAD_DIRECT: u32 = 0;
pub const FW_LOAD_DMA: u32 = 1;

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct LoadCoreFirmwareArgs {
    pub load_mode: u32,
    pub rsvd: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ReadNRegistersArgs {
    /// `MemRegion` wire encoding of the register bank to read.
    pub region: u32,
    /// Byte offset of the first register.
    pub offset: u32,
    /// Number of consecutive registers to read; `count * 4` must fit the
    /// auxiliary buffer.
    pub count: u32,
    pub rsvd: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_sizes_are_stable() {
        // These sizes are the wire contract; a change here breaks the
        // exact-size validation on the secure side.
        assert_eq!(Endpoint::StreamCreate.arg_size(), 24);
        assert_eq!(Endpoint::StreamDestroy.arg_size(), 8);
        assert_eq!(Endpoint::StreamSubmitBuf.arg_size(), 16);
        assert_eq!(Endpoint::StreamPreParse.arg_size(), 24);
        assert_eq!(Endpoint::CoreInit.arg_size(), 16);
        assert_eq!(Endpoint::CoreDeInit.arg_size(), 8);
        assert_eq!(Endpoint::CoreReset.arg_size(), 8);
        assert_eq!(Endpoint::SendFwMessage.arg_size(), 8);
        assert_eq!(Endpoint::HandleInterrupts.arg_size(), 16);
        assert_eq!(Endpoint::GetCoreState.arg_size(), 24);
        assert_eq!(Endpoint::PrepareFirmware.arg_size(), 16);
        assert_eq!(Endpoint::LoadCoreFirmware.arg_size(), 8);
        assert_eq!(Endpoint::ReadNRegisters.arg_size(), 16);
    }

    #[test]
    fn endpoint_round_trip() {
        for raw in 0..13 {
            let ep = Endpoint::from_u32(raw).unwrap();
            assert_eq!(ep as u32, raw);
        }
        assert!(Endpoint::from_u32(13).is_none());
    }
}
