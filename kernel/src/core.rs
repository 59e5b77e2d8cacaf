// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Driver-facing view of one decode core.
//!
//! Everything that touches protected state goes through the secure
//! channel as an endpoint call; the only direct hardware access from here
//! is the VLR window and the MMU flush register, which stay open to the
//! normal world.  Completion traffic is pulled by the interrupt reader
//! and handed out through [`VxdCore::pop_message`].

use crate::channel::{Delay, SecureChannel, SecureTransport};
use crate::irq::{InterruptReader, IrqDrain};
use crate::queue::HostMsgQueue;

use alloc::vec;
use alloc::vec::Vec;
use vdecdefs::endpoint::{
    CoreDeInitArgs, CoreInitArgs, CoreResetArgs, CoreStateWire, GetCoreStateArgs,
    LoadCoreFirmwareArgs, PrepareFirmwareArgs, ReadNRegistersArgs, StreamCreateArgs,
    StreamDestroyArgs, StreamPreParseArgs, StreamSubmitBufArgs,
};
use vdecdefs::regio::poll_eq;
use vdecdefs::regs::{sys, POLL_ITERS};
use vdecdefs::{CommsArea, Endpoint, MemRegion, RegIo, SecError};
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// One decode core as seen by the REE driver.
pub struct VxdCore<T: SecureTransport, D: Delay, R: RegIo> {
    chan: SecureChannel<T, D>,
    io: R,
    reader: InterruptReader,
    queue: HostMsgQueue,
}

impl<T: SecureTransport, D: Delay, R: RegIo> core::fmt::Debug for VxdCore<T, D, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VxdCore")
            .field("chan", &self.chan)
            .field("queued", &self.queue.len())
            .field("irq_pending", &self.reader.pending())
            .finish_non_exhaustive()
    }
}

impl<T: SecureTransport, D: Delay, R: RegIo> VxdCore<T, D, R> {
    pub fn new(chan: SecureChannel<T, D>, io: R) -> VxdCore<T, D, R> {
        VxdCore {
            chan,
            io,
            reader: InterruptReader::new(),
            queue: HostMsgQueue::new(),
        }
    }

    pub fn channel(&self) -> &SecureChannel<T, D> {
        &self.chan
    }

    /// Round-trips one argument struct through `endpoint` and returns the
    /// peer-updated copy.
    fn call<A: FromBytes + IntoBytes + Immutable>(
        &self,
        endpoint: Endpoint,
        args: A,
    ) -> Result<A, SecError> {
        let mut bytes = args.as_bytes().to_vec();
        self.chan.call(endpoint, &mut bytes)?;
        A::read_from_bytes(&bytes).map_err(|_| SecError::GenericFailure)
    }

    /// Brings the core up: clocks, MMU, interrupt enables, comms areas.
    pub fn initialise(&self, mmu_base_phys: u64, flags: u32) -> Result<(), SecError> {
        self.call(
            Endpoint::CoreInit,
            CoreInitArgs {
                mmu_base_phys,
                flags,
                rsvd: 0,
            },
        )?;
        log::info!("core initialised, mmu base {mmu_base_phys:#x}");
        Ok(())
    }

    pub fn deinitialise(&self, flags: u32) -> Result<(), SecError> {
        self.call(Endpoint::CoreDeInit, CoreDeInitArgs { flags, rsvd: 0 })?;
        Ok(())
    }

    /// Full core reset; the peer re-initialises the comms areas, so any
    /// staged messages are gone afterwards.
    pub fn reset(&mut self, flags: u32) -> Result<(), SecError> {
        self.call(Endpoint::CoreReset, CoreResetArgs { flags, rsvd: 0 })?;
        self.reader = InterruptReader::new();
        self.queue = HostMsgQueue::new();
        Ok(())
    }

    /// Hands the firmware text to the peer for validation and staging.
    /// `blob` must be the complete image; its word count travels in the
    /// arguments so the peer can cross-check the payload length.
    pub fn prepare_firmware(&self, blob_phys: u64, blob: &[u8]) -> Result<(), SecError> {
        if blob.is_empty() || blob.len() % 4 != 0 {
            return Err(SecError::InvalidParameters);
        }
        let mut args = PrepareFirmwareArgs {
            blob_phys,
            blob_size: blob.len() as u32,
            word_count: (blob.len() / 4) as u32,
        }
        .as_bytes()
        .to_vec();
        let mut aux = blob.to_vec();
        self.chan
            .call_with_buf(Endpoint::PrepareFirmware, &mut args, &mut aux)
    }

    /// Loads staged firmware into the MTX and starts it.  `mode` selects
    /// the register-port or DMA upload path (`FW_LOAD_DIRECT` /
    /// `FW_LOAD_DMA`).
    pub fn load_core_firmware(&self, mode: u32) -> Result<(), SecError> {
        self.call(
            Endpoint::LoadCoreFirmware,
            LoadCoreFirmwareArgs {
                load_mode: mode,
                rsvd: 0,
            },
        )?;
        log::info!("firmware running, load mode {mode}");
        Ok(())
    }

    /// Sends one firmware message into the Control or Decode ring, with
    /// the channel's bounded busy-retry.
    pub fn send_firmware_message(&self, area: CommsArea, msg: &[u8]) -> Result<(), SecError> {
        self.chan.send_fw_message(area, msg)
    }

    /// Services one interrupt: pulls (or resumes) a completion batch and
    /// forwards it to the message queue.  Call again until
    /// [`IrqDrain::empty`] to observe everything the firmware posted.
    pub fn handle_interrupts(&mut self) -> Result<IrqDrain, SecError> {
        self.reader.service(&self.chan, &mut self.queue)
    }

    /// Whether completion traffic is known to be waiting.
    pub fn interrupts_pending(&self) -> bool {
        self.reader.pending()
    }

    /// Oldest forwarded firmware message, if any.
    pub fn pop_message(&mut self) -> Option<Vec<u32>> {
        self.queue.pop_msg()
    }

    pub fn get_core_state(&self) -> Result<CoreStateWire, SecError> {
        let args = self.call(Endpoint::GetCoreState, GetCoreStateArgs::default())?;
        Ok(args.state)
    }

    /// Creates a decode stream on the peer and returns its handle.
    pub fn create_stream(
        &self,
        ctx_phys: u64,
        ctx_size: u32,
        flags: u32,
    ) -> Result<u32, SecError> {
        let args = self.call(
            Endpoint::StreamCreate,
            StreamCreateArgs {
                ctx_phys,
                ctx_size,
                flags,
                stream_handle: 0,
                rsvd: 0,
            },
        )?;
        Ok(args.stream_handle)
    }

    pub fn destroy_stream(&self, stream_handle: u32) -> Result<(), SecError> {
        self.call(
            Endpoint::StreamDestroy,
            StreamDestroyArgs {
                stream_handle,
                rsvd: 0,
            },
        )?;
        Ok(())
    }

    pub fn submit_stream_buf(
        &self,
        stream_handle: u32,
        buf_phys: u64,
        buf_size: u32,
    ) -> Result<(), SecError> {
        self.call(
            Endpoint::StreamSubmitBuf,
            StreamSubmitBufArgs {
                buf_phys,
                buf_size,
                stream_handle,
            },
        )?;
        Ok(())
    }

    /// Pre-parses a bitstream segment on the peer; returns the number of
    /// parse units found.
    pub fn pre_parse_stream(
        &self,
        stream_handle: u32,
        bitstream_phys: u64,
        bitstream_size: u32,
    ) -> Result<u32, SecError> {
        let args = self.call(
            Endpoint::StreamPreParse,
            StreamPreParseArgs {
                bitstream_phys,
                bitstream_size,
                stream_handle,
                units_found: 0,
                rsvd: 0,
            },
        )?;
        Ok(args.units_found)
    }

    /// Direct read from a VLR comms window.  The VLR stays mapped into
    /// the normal world, so this does not cross the boundary.
    pub fn read_vlr(&self, area: CommsArea, offset: u32) -> u32 {
        self.io.read(MemRegion::for_area(area), offset)
    }

    pub fn write_vlr(&mut self, area: CommsArea, offset: u32, value: u32) {
        self.io.write(MemRegion::for_area(area), offset, value);
    }

    /// Requests an MMU TLB flush and waits for the hardware to clear the
    /// request bit.
    pub fn flush_mmu_cache(&mut self) -> Result<(), SecError> {
        self.io
            .write(MemRegion::Sys, sys::MMU_FLUSH, sys::MMU_FLUSH_REQUEST);
        poll_eq(
            &self.io,
            MemRegion::Sys,
            sys::MMU_FLUSH,
            sys::MMU_FLUSH_REQUEST,
            0,
            POLL_ITERS,
        )
    }

    /// Reads `count` consecutive registers through the peer and logs
    /// them.  Diagnostic path; the values are also returned.
    pub fn dump_registers(
        &self,
        region: MemRegion,
        offset: u32,
        count: u32,
    ) -> Result<Vec<u32>, SecError> {
        if count == 0 {
            return Err(SecError::InvalidParameters);
        }
        let mut args = ReadNRegistersArgs {
            region: region.to_wire(),
            offset,
            count,
            rsvd: 0,
        }
        .as_bytes()
        .to_vec();
        let mut aux = vec![0u8; count as usize * 4];
        self.chan
            .call_with_buf(Endpoint::ReadNRegisters, &mut args, &mut aux)?;
        let words: Vec<u32> = aux
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        for (i, word) in words.iter().enumerate() {
            log::debug!(
                "{region:?}[{:#05x}] = {word:#010x}",
                offset + i as u32 * 4
            );
        }
        Ok(words)
    }

    /// Releases this core's secure id per the channel's session policy.
    pub fn release(&self) {
        self.chan.release_id();
    }
}
