// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Interrupt batch reader.
//!
//! Firmware completions arrive through the Completed comms ring on the
//! secure side; one `HandleInterrupts` call pulls a bounded batch of ring
//! words across the boundary.  The batch is then forwarded to the host
//! message queue one whole message at a time.  The queue may refuse a
//! message mid-batch, so the reader keeps the batch and a resume offset
//! across calls; a resumed call forwards the residue without touching the
//! peer at all.  "Nothing left" means both no local residue and the peer
//! reporting its ring drained.

use crate::channel::{Delay, SecureChannel, SecureTransport};
use crate::queue::HostMsgQueue;

use alloc::vec;
use alloc::vec::Vec;
use vdecdefs::endpoint::{HandleInterruptsArgs, MAX_INT_TRANSFER_WORDS};
use vdecdefs::msg::words_for;
use vdecdefs::{Endpoint, IntStatusWord, MtxMsgHeader, SecError};
use zerocopy::FromBytes;

/// Outcome of one [`InterruptReader::service`] pass.
#[derive(Clone, Copy, Debug)]
pub struct IrqDrain {
    /// Interrupt status for this pass.  Synthesized (message bit only)
    /// when the pass forwarded a retained batch instead of fetching.
    pub status: IntStatusWord,
    /// True when neither side holds undelivered messages: the local
    /// batch is fully forwarded and the peer reported its ring empty.
    pub empty: bool,
}

/// Pulls completion batches from the secure peer and forwards them to the
/// host message queue, with partial-batch resumption.
#[derive(Debug, Default)]
pub struct InterruptReader {
    batch: Vec<u32>,
    /// Word offset of the next unforwarded message in `batch`.
    resume: usize,
    /// Peer reported unread words in its Completed ring after the last
    /// fetch.
    peer_more: bool,
}

impl InterruptReader {
    pub fn new() -> InterruptReader {
        InterruptReader::default()
    }

    /// Whether another [`InterruptReader::service`] call has work to do.
    pub fn pending(&self) -> bool {
        self.resume < self.batch.len() || self.peer_more
    }

    /// One service pass: forward the retained batch if one exists,
    /// otherwise fetch a fresh batch from the peer and forward that.
    /// Stops (retaining position) as soon as the queue refuses a message.
    pub fn service<T: SecureTransport, D: Delay>(
        &mut self,
        chan: &SecureChannel<T, D>,
        queue: &mut HostMsgQueue,
    ) -> Result<IrqDrain, SecError> {
        let status = if self.resume < self.batch.len() {
            // Residue pass: the hardware already signalled these words,
            // so report only the message bit and skip the peer entirely.
            IntStatusWord::new().with_mtx_msg(true)
        } else {
            self.fetch(chan)?
        };

        self.forward(queue)?;
        Ok(IrqDrain {
            status,
            empty: !self.pending(),
        })
    }

    fn fetch<T: SecureTransport, D: Delay>(
        &mut self,
        chan: &SecureChannel<T, D>,
    ) -> Result<IntStatusWord, SecError> {
        let mut msg = [0u8; size_of::<HandleInterruptsArgs>()];
        let mut aux = vec![0u8; MAX_INT_TRANSFER_WORDS * 4];
        chan.call_with_buf(Endpoint::HandleInterrupts, &mut msg, &mut aux)?;
        let args =
            HandleInterruptsArgs::read_from_bytes(&msg).map_err(|_| SecError::GenericFailure)?;

        let words = (args.words_out as usize).min(MAX_INT_TRANSFER_WORDS);
        self.batch.clear();
        self.batch.extend(
            aux[..words * 4]
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
        self.resume = 0;
        self.peer_more = args.more_pending != 0;
        Ok(IntStatusWord::from(args.int_status))
    }

    /// Forwards whole messages from the retained batch until the batch is
    /// exhausted or the queue refuses one.
    fn forward(&mut self, queue: &mut HostMsgQueue) -> Result<(), SecError> {
        while self.resume < self.batch.len() {
            let header = MtxMsgHeader::from(self.batch[self.resume]);
            let words = words_for(header.size() as usize);
            if words == 0 || self.resume + words > self.batch.len() {
                log::error!(
                    "malformed completion at word {}: id {:#04x} size {}",
                    self.resume,
                    header.msg_id(),
                    header.size()
                );
                self.batch.clear();
                self.resume = 0;
                return Err(SecError::GenericFailure);
            }
            if !queue.push_msg(&self.batch[self.resume..self.resume + words]) {
                // Queue full; keep the rest for the next pass.
                return Ok(());
            }
            self.resume += words;
        }
        self.batch.clear();
        self.resume = 0;
        Ok(())
    }
}
