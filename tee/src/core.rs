// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Hardware-facing operations of one secure core context.  Everything the
//! dispatcher routes ends up here: lifecycle and reset, firmware staging
//! and load, comms ring traffic, register reads and the stream handlers.

use crate::handlemap::{Handle, HandleMap};
use crate::mtxio::CommsRing;
use vdecdefs::regs::{dma, mtx, sys, POLL_ITERS};
use crate::secmem::SecureMem;

use alloc::vec::Vec;
use core::fmt;
use vdecdefs::endpoint::{
    CoreInitArgs, CoreStateWire, PrepareFirmwareArgs, StreamCreateArgs, StreamPreParseArgs,
    StreamSubmitBufArgs, FW_LOAD_DIRECT, FW_LOAD_DMA,
};
use vdecdefs::msg::words_for;
use vdecdefs::regio::{poll_eq, MemRegion, RegIo};
use vdecdefs::status::CoreClocks;
use vdecdefs::{CommsArea, SecError};

/// Firmware staged by `PrepareFirmware`, waiting for a load request.
#[derive(Debug)]
struct StagedFirmware {
    text: Vec<u32>,
    blob_phys: u64,
}

/// Per-stream bookkeeping.  The context mapping stays alive for the
/// stream's lifetime; buffer and bitstream mappings are transient per
/// call.
struct StreamCtx<M: SecureMem> {
    _ctx: M::Mapping,
    flags: u32,
    submitted: u32,
}

impl<M: SecureMem> fmt::Debug for StreamCtx<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCtx")
            .field("flags", &self.flags)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

/// One hardware core as seen from the secure world.
pub struct SecureCore<R: RegIo, M: SecureMem> {
    io: R,
    mem: M,
    control: CommsRing,
    decode: CommsRing,
    completed: CommsRing,
    streams: HandleMap<StreamCtx<M>>,
    firmware: Option<StagedFirmware>,
    initialised: bool,
}

impl<R: RegIo, M: SecureMem> fmt::Debug for SecureCore<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCore")
            .field("streams", &self.streams.len())
            .field("staged_firmware", &self.firmware.is_some())
            .field("initialised", &self.initialised)
            .finish_non_exhaustive()
    }
}

impl<R: RegIo, M: SecureMem> SecureCore<R, M> {
    pub fn new(io: R, mem: M) -> SecureCore<R, M> {
        SecureCore {
            io,
            mem,
            control: CommsRing::new(CommsArea::Control),
            decode: CommsRing::new(CommsArea::Decode),
            completed: CommsRing::new(CommsArea::Completed),
            streams: HandleMap::new(),
            firmware: None,
            initialised: false,
        }
    }

    /// Direct access to the register fabric.  Used by the firmware side of
    /// the comms protocol (and by test harnesses standing in for it).
    pub fn io_mut(&mut self) -> &mut R {
        &mut self.io
    }

    fn check_signature(&self) -> Result<(), SecError> {
        let sig = self.io.read(MemRegion::Sys, sys::SIGNATURE);
        if sig & sys::SIGNATURE_MASK != sys::SIGNATURE_VALUE {
            log::error!("unsupported core signature {sig:#010x}");
            return Err(SecError::UnexpectedState);
        }
        Ok(())
    }

    pub fn initialise(&mut self, args: &CoreInitArgs) -> Result<(), SecError> {
        self.check_signature()?;
        self.io
            .write(MemRegion::Sys, sys::CLOCK_GATE, CoreClocks::run_set().bits());
        self.io.write(
            MemRegion::Sys,
            sys::MMU_DIR_BASE,
            (args.mmu_base_phys >> 12) as u32,
        );
        self.io
            .write(MemRegion::Sys, sys::MMU_CONTROL, sys::MMU_ENABLE);
        self.io.write(MemRegion::Sys, sys::INT_ENABLE, !0);
        self.initialised = true;
        log::info!("core initialised, mmu base {:#x}", args.mmu_base_phys);
        Ok(())
    }

    pub fn deinitialise(&mut self) -> Result<(), SecError> {
        self.io.write(MemRegion::Sys, sys::INT_ENABLE, 0);
        self.io.write(MemRegion::Mtx, mtx::ENABLE, 0);
        self.io
            .write(MemRegion::Sys, sys::CLOCK_GATE, CoreClocks::idle_set().bits());
        self.initialised = false;
        log::info!("core deinitialised");
        Ok(())
    }

    /// Soft reset.  Clocks must run for the reset to propagate; the
    /// request bit self-clears when the core settles.
    pub fn reset(&mut self) -> Result<(), SecError> {
        self.io
            .write(MemRegion::Sys, sys::CLOCK_GATE, CoreClocks::run_set().bits());
        self.io
            .write(MemRegion::Sys, sys::RESET, sys::RESET_REQUEST);
        poll_eq(
            &self.io,
            MemRegion::Sys,
            sys::RESET,
            sys::RESET_REQUEST,
            0,
            POLL_ITERS,
        )?;
        self.io.write(MemRegion::Sys, sys::INT_CLEAR, !0);
        Ok(())
    }

    /// Maps and validates the firmware image, keeping a staged copy for
    /// the subsequent load request.
    pub fn prepare_firmware(
        &mut self,
        args: &PrepareFirmwareArgs,
        blob: &[u8],
    ) -> Result<(), SecError> {
        if args.blob_size as usize != blob.len() || blob.is_empty() {
            return Err(SecError::InvalidParameters);
        }
        if args.word_count as usize != words_for(blob.len()) {
            return Err(SecError::InvalidParameters);
        }
        // The mapping only validates the caller's physical range; the
        // image itself travels in the shared buffer.
        let _window = self.mem.map(args.blob_phys, args.blob_size as usize)?;

        let mut text = Vec::with_capacity(args.word_count as usize);
        for chunk in blob.chunks(4) {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            text.push(u32::from_le_bytes(bytes));
        }
        self.firmware = Some(StagedFirmware {
            text,
            blob_phys: args.blob_phys,
        });
        log::info!("firmware staged: {} words", args.word_count);
        Ok(())
    }

    /// Loads the staged firmware into MTX core RAM and starts the
    /// microcontroller.  The comms area headers are programmed here, once,
    /// before the firmware can observe them.
    pub fn load_firmware(&mut self, load_mode: u32) -> Result<(), SecError> {
        let fw = self.firmware.as_ref().ok_or(SecError::UnexpectedState)?;

        self.io
            .write(MemRegion::Mtx, mtx::SOFT_RESET, mtx::SOFT_RESET_REQUEST);
        poll_eq(
            &self.io,
            MemRegion::Mtx,
            mtx::SOFT_RESET,
            mtx::SOFT_RESET_REQUEST,
            0,
            POLL_ITERS,
        )?;

        match load_mode {
            FW_LOAD_DIRECT => {
                self.io
                    .write(MemRegion::Mtx, mtx::RAM_ADDR, mtx::RAM_ADDR_AUTO_INC);
                for word in &fw.text {
                    self.io.write(MemRegion::Mtx, mtx::RAM_DATA, *word);
                }
                poll_eq(
                    &self.io,
                    MemRegion::Mtx,
                    mtx::RAM_STATUS,
                    mtx::RAM_TRANSFER_BUSY,
                    0,
                    POLL_ITERS,
                )?;
            }
            FW_LOAD_DMA => {
                self.io.write(
                    MemRegion::Dma,
                    dma::LIST_ADDR,
                    (fw.blob_phys >> 4) as u32,
                );
                self.io
                    .write(MemRegion::Dma, dma::COUNT, fw.text.len() as u32);
                self.io
                    .write(MemRegion::Dma, dma::CONTROL, dma::CONTROL_GO);
                poll_eq(
                    &self.io,
                    MemRegion::Dma,
                    dma::STATUS,
                    dma::STATUS_BUSY,
                    0,
                    POLL_ITERS,
                )?;
            }
            _ => return Err(SecError::InvalidParameters),
        }

        self.control.init(&mut self.io);
        self.decode.init(&mut self.io);
        self.completed.init(&mut self.io);

        self.io.write(MemRegion::Mtx, mtx::ENABLE, mtx::ENABLE_RUN);
        log::info!(
            "firmware loaded ({} words, mode {load_mode})",
            fw.text.len()
        );
        Ok(())
    }

    /// Writes one host-to-firmware message into the requested ring.
    pub fn send_fw_msg(&mut self, area: CommsArea, msg: &[u8]) -> Result<(), SecError> {
        let ring = match area {
            CommsArea::Control => &self.control,
            CommsArea::Decode => &self.decode,
            CommsArea::Completed => return Err(SecError::InvalidParameters),
        };
        ring.send_msg(&mut self.io, msg)
    }

    /// Reads and acknowledges the interrupt status, then drains as much of
    /// the Completed ring as `dest` can hold.  Returns `(status, words,
    /// more_pending)`.
    pub fn drain_completed(&mut self, dest: &mut [u32]) -> Result<(u32, usize, bool), SecError> {
        let status = self.io.read(MemRegion::Sys, sys::INT_STATUS);
        self.io.write(MemRegion::Sys, sys::INT_CLEAR, status);
        let (words, more) = self.completed.process_msgs(&mut self.io, dest)?;
        Ok((status, words, more))
    }

    pub fn read_registers(
        &self,
        region: MemRegion,
        offset: u32,
        dest: &mut [u32],
    ) -> Result<(), SecError> {
        for (i, slot) in dest.iter_mut().enumerate() {
            *slot = self.io.read(region, offset + (i as u32) * 4);
        }
        Ok(())
    }

    pub fn get_state(&self) -> Result<CoreStateWire, SecError> {
        let (rd, wr) = self.completed.indexes(&self.io)?;
        Ok(CoreStateWire {
            core_id: self.io.read(MemRegion::Sys, sys::SIGNATURE),
            core_rev: self.io.read(MemRegion::Sys, sys::REVISION),
            clocks: self.io.read(MemRegion::Sys, sys::CLOCK_GATE),
            int_status: self.io.read(MemRegion::Sys, sys::INT_STATUS),
            completed_rd: rd,
            completed_wr: wr,
        })
    }

    /// Requests a TLB flush and waits for the self-clearing request bit.
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

    pub fn stream_create(&mut self, args: &mut StreamCreateArgs) -> Result<(), SecError> {
        if args.ctx_phys == 0 || args.ctx_size == 0 {
            return Err(SecError::InvalidParameters);
        }
        let ctx = self.mem.map(args.ctx_phys, args.ctx_size as usize)?;
        let handle = self.streams.insert(StreamCtx {
            _ctx: ctx,
            flags: args.flags,
            submitted: 0,
        });
        args.stream_handle = handle.raw();
        log::info!("stream {:#010x} created", handle.raw());
        Ok(())
    }

    pub fn stream_destroy(&mut self, handle: u32) -> Result<(), SecError> {
        let ctx = self
            .streams
            .remove(Handle::from_raw(handle))
            .ok_or(SecError::InvalidParameters)?;
        log::info!(
            "stream {handle:#010x} destroyed after {} buffers",
            ctx.submitted
        );
        Ok(())
    }

    /// Maps the submitted buffer for the duration of the call.  The
    /// decode work itself is queued through the Decode comms area by the
    /// caller; this handler only validates and accounts the buffer.
    pub fn stream_submit_buf(&mut self, args: &StreamSubmitBufArgs) -> Result<(), SecError> {
        if args.buf_phys == 0 || args.buf_size == 0 {
            return Err(SecError::InvalidParameters);
        }
        let stream = self
            .streams
            .get_mut(Handle::from_raw(args.stream_handle))
            .ok_or(SecError::InvalidParameters)?;
        stream.submitted += 1;
        let _buf = self.mem.map(args.buf_phys, args.buf_size as usize)?;
        Ok(())
    }

    /// Maps the bitstream so the secure parser can walk it.  The parser
    /// proper sits above this layer; a mapped, non-empty bitstream counts
    /// as one parse unit here.
    pub fn stream_pre_parse(&mut self, args: &mut StreamPreParseArgs) -> Result<(), SecError> {
        if args.bitstream_phys == 0 || args.bitstream_size == 0 {
            return Err(SecError::InvalidParameters);
        }
        let stream = self
            .streams
            .get(Handle::from_raw(args.stream_handle))
            .ok_or(SecError::InvalidParameters)?;
        log::debug!(
            "pre-parse on stream {:#010x} (flags {:#x})",
            args.stream_handle,
            stream.flags
        );
        let window = self.mem.map(args.bitstream_phys, args.bitstream_size as usize)?;
        args.units_found = if window.as_ref().is_empty() { 0 } else { 1 };
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }
}
