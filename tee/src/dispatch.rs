// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Endpoint dispatcher: the secure-world entry point for REE calls.
//!
//! A call arrives as `(secure id, endpoint, message, optional payload)`.
//! The id resolves through a generation-checked map to a core context;
//! the message size must equal the endpoint's argument struct exactly,
//! and payload-bearing endpoints must carry a payload consistent with the
//! fields inside the message.  Validation happens before any handler runs,
//! so a rejected call has no side effects.  There is no retry at this
//! layer; `Busy` propagates to the one REE-side retry site.

use crate::core::SecureCore;
use crate::handlemap::{Handle, HandleMap};
use crate::secmem::SecureMem;

use vdecdefs::endpoint::{
    CoreDeInitArgs, CoreInitArgs, CoreResetArgs, GetCoreStateArgs, HandleInterruptsArgs,
    LoadCoreFirmwareArgs, PrepareFirmwareArgs, ReadNRegistersArgs, SendFwMessageArgs,
    StreamCreateArgs, StreamDestroyArgs, StreamPreParseArgs, StreamSubmitBufArgs,
};
use vdecdefs::regio::{MemRegion, RegIo};
use vdecdefs::{CommsArea, Endpoint, SecError};

use alloc::vec;
use zerocopy::{FromBytes, IntoBytes};

/// Routes endpoint calls to per-core contexts.
#[derive(Debug)]
pub struct Dispatcher<R: RegIo, M: SecureMem> {
    cores: HandleMap<SecureCore<R, M>>,
}

impl<R: RegIo, M: SecureMem> Dispatcher<R, M> {
    pub const fn new() -> Dispatcher<R, M> {
        Dispatcher {
            cores: HandleMap::new(),
        }
    }

    /// Registers a core context and returns the secure id the REE side
    /// will address it by.
    pub fn register_core(&mut self, core: SecureCore<R, M>) -> u32 {
        let id = self.cores.insert(core).raw();
        log::info!("core registered, secure id {id:#010x}");
        id
    }

    /// Tears down a core context.  Stale ids fail like any other lookup.
    pub fn release_core(&mut self, secure_id: u32) -> Result<(), SecError> {
        self.cores
            .remove(Handle::from_raw(secure_id))
            .map(|_| ())
            .ok_or(SecError::InvalidParameters)
    }

    /// Access to a registered core, for the firmware side of the comms
    /// protocol (interrupt injection, completion posting) and tests.
    pub fn core_mut(&mut self, secure_id: u32) -> Option<&mut SecureCore<R, M>> {
        self.cores.get_mut(Handle::from_raw(secure_id))
    }

    /// The endpoint entry point.  `msg` is updated in place with any
    /// output fields; `aux` likewise for payload-bearing endpoints.
    pub fn dispatch(
        &mut self,
        secure_id: u32,
        endpoint: u32,
        msg: &mut [u8],
        aux: Option<&mut [u8]>,
    ) -> Result<(), SecError> {
        let endpoint = Endpoint::from_u32(endpoint).ok_or(SecError::InvalidParameters)?;
        if msg.len() != endpoint.arg_size() {
            return Err(SecError::InvalidParameters);
        }
        if endpoint.takes_aux_buffer() && aux.as_ref().is_none_or(|b| b.is_empty()) {
            return Err(SecError::InvalidParameters);
        }
        let core = self
            .cores
            .get_mut(Handle::from_raw(secure_id))
            .ok_or(SecError::InvalidParameters)?;

        match endpoint {
            Endpoint::StreamCreate => {
                let mut args = StreamCreateArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.stream_create(&mut args)?;
                args.write_to(msg).map_err(|_| SecError::InvalidParameters)
            }
            Endpoint::StreamDestroy => {
                let args = StreamDestroyArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.stream_destroy(args.stream_handle)
            }
            Endpoint::StreamSubmitBuf => {
                let args = StreamSubmitBufArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.stream_submit_buf(&args)
            }
            Endpoint::StreamPreParse => {
                let mut args = StreamPreParseArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.stream_pre_parse(&mut args)?;
                args.write_to(msg).map_err(|_| SecError::InvalidParameters)
            }
            Endpoint::CoreInit => {
                let args =
                    CoreInitArgs::read_from_bytes(msg).map_err(|_| SecError::InvalidParameters)?;
                core.initialise(&args)
            }
            Endpoint::CoreDeInit => {
                let _args = CoreDeInitArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.deinitialise()
            }
            Endpoint::CoreReset => {
                let _args =
                    CoreResetArgs::read_from_bytes(msg).map_err(|_| SecError::InvalidParameters)?;
                core.reset()
            }
            Endpoint::SendFwMessage => {
                let args = SendFwMessageArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                let aux = aux.ok_or(SecError::InvalidParameters)?;
                let area = CommsArea::from_wire(args.area).ok_or(SecError::InvalidParameters)?;
                if args.msg_size == 0 || args.msg_size as usize > aux.len() {
                    return Err(SecError::InvalidParameters);
                }
                core.send_fw_msg(area, &aux[..args.msg_size as usize])
            }
            Endpoint::HandleInterrupts => {
                let mut args = HandleInterruptsArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                let aux = aux.ok_or(SecError::InvalidParameters)?;
                let mut dest = vec![0u32; aux.len() / 4];
                let (status, words, more) = core.drain_completed(&mut dest)?;
                for (i, word) in dest[..words].iter().enumerate() {
                    aux[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
                }
                args.int_status = status;
                args.words_out = words as u32;
                args.more_pending = more as u32;
                args.write_to(msg).map_err(|_| SecError::InvalidParameters)
            }
            Endpoint::GetCoreState => {
                let mut args = GetCoreStateArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                args.state = core.get_state()?;
                args.write_to(msg).map_err(|_| SecError::InvalidParameters)
            }
            Endpoint::PrepareFirmware => {
                let args = PrepareFirmwareArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                let aux = aux.ok_or(SecError::InvalidParameters)?;
                if args.blob_size as usize > aux.len() {
                    return Err(SecError::InvalidParameters);
                }
                core.prepare_firmware(&args, &aux[..args.blob_size as usize])
            }
            Endpoint::LoadCoreFirmware => {
                let args = LoadCoreFirmwareArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                core.load_firmware(args.load_mode)
            }
            Endpoint::ReadNRegisters => {
                let args = ReadNRegistersArgs::read_from_bytes(msg)
                    .map_err(|_| SecError::InvalidParameters)?;
                let aux = aux.ok_or(SecError::InvalidParameters)?;
                let region =
                    MemRegion::from_wire(args.region).ok_or(SecError::InvalidParameters)?;
                if args.count == 0 || args.count as usize * 4 > aux.len() {
                    return Err(SecError::InvalidParameters);
                }
                let mut dest = vec![0u32; args.count as usize];
                core.read_registers(region, args.offset, &mut dest)?;
                for (i, word) in dest.iter().enumerate() {
                    aux[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
                }
                Ok(())
            }
        }
    }
}

impl<R: RegIo, M: SecureMem> Default for Dispatcher<R, M> {
    fn default() -> Self {
        Self::new()
    }
}
