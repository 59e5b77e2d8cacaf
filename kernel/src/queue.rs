// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Host-side message queue between the interrupt reader and the decode
//! stack.
//!
//! Messages pulled out of the Completed ring are staged here whole; the
//! decode stack pops them one at a time.  A fixed word buffer holds the
//! payloads and a fixed descriptor table tracks their order, so a refused
//! push is the reader's signal to stop draining and resume later.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use core::num::Wrapping;

/// Payload capacity of the queue, in 32-bit words.
pub const QUEUE_WORDS: usize = 1024;
/// Maximum number of queued messages.
pub const QUEUE_DESCRIPTORS: usize = 32;

#[derive(Clone, Copy, Debug)]
struct MsgDesc {
    offset: usize,
    words: usize,
}

impl MsgDesc {
    fn overlaps(&self, offset: usize, words: usize) -> bool {
        offset < self.offset + self.words && self.offset < offset + words
    }
}

/// Bounded queue of whole firmware messages.
#[derive(Debug)]
pub struct HostMsgQueue {
    buf: Vec<u32>,
    descs: VecDeque<MsgDesc>,
    /// Next write position; wraps to 0 when a message would not fit at
    /// the buffer tail, so stored messages are always contiguous.
    wr: usize,
    dropped: Wrapping<u64>,
}

impl Default for HostMsgQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMsgQueue {
    pub fn new() -> HostMsgQueue {
        HostMsgQueue {
            buf: vec![0u32; QUEUE_WORDS],
            descs: VecDeque::with_capacity(QUEUE_DESCRIPTORS),
            wr: 0,
            dropped: Wrapping(0),
        }
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Stages one whole message.  Returns `false` without side effects
    /// when the descriptor table is full or the words would land on a
    /// message not yet popped; the caller retries after the consumer
    /// catches up.
    pub fn push_msg(&mut self, msg: &[u32]) -> bool {
        if msg.is_empty() || msg.len() > QUEUE_WORDS {
            return false;
        }
        if self.descs.len() == QUEUE_DESCRIPTORS {
            log::debug!("message queue descriptor table full");
            return false;
        }

        let offset = if self.wr + msg.len() > QUEUE_WORDS {
            0
        } else {
            self.wr
        };
        if self
            .descs
            .iter()
            .any(|d| d.overlaps(offset, msg.len()))
        {
            log::debug!(
                "message queue out of space for {} words at {offset}",
                msg.len()
            );
            return false;
        }

        self.buf[offset..offset + msg.len()].copy_from_slice(msg);
        self.descs.push_back(MsgDesc {
            offset,
            words: msg.len(),
        });
        self.wr = offset + msg.len();
        true
    }

    /// Pops the oldest queued message.
    pub fn pop_msg(&mut self) -> Option<Vec<u32>> {
        let desc = self.descs.pop_front()?;
        Some(self.buf[desc.offset..desc.offset + desc.words].to_vec())
    }

    /// Records a message the reader had to discard (queue refused it and
    /// the caller chose not to resume).  Diagnostic only.
    pub fn note_dropped(&mut self) {
        self.dropped += 1;
        log::warn!("firmware message dropped, {} total", self.dropped);
    }

    /// Messages discarded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q = HostMsgQueue::new();
        assert!(q.push_msg(&[1, 2, 3]));
        assert!(q.push_msg(&[4]));
        assert!(q.push_msg(&[5, 6]));
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_msg().unwrap(), [1, 2, 3]);
        assert_eq!(q.pop_msg().unwrap(), [4]);
        assert_eq!(q.pop_msg().unwrap(), [5, 6]);
        assert!(q.pop_msg().is_none());
    }

    #[test]
    fn empty_and_oversize_refused() {
        let mut q = HostMsgQueue::new();
        assert!(!q.push_msg(&[]));
        let huge = std::vec![0u32; QUEUE_WORDS + 1];
        assert!(!q.push_msg(&huge));
        assert!(q.is_empty());
    }

    #[test]
    fn descriptor_table_limit() {
        let mut q = HostMsgQueue::new();
        for i in 0..QUEUE_DESCRIPTORS as u32 {
            assert!(q.push_msg(&[i]));
        }
        assert!(!q.push_msg(&[99]));
        assert_eq!(q.pop_msg().unwrap(), [0]);
        assert!(q.push_msg(&[99]));
    }

    #[test]
    fn tail_wrap_keeps_messages_contiguous() {
        let mut q = HostMsgQueue::new();
        let a = std::vec![1u32; QUEUE_WORDS - 2];
        assert!(q.push_msg(&a));
        // Three words do not fit at the tail; they must go to offset 0,
        // which is still occupied.
        assert!(!q.push_msg(&[7, 8, 9]));
        assert_eq!(q.pop_msg().unwrap().len(), QUEUE_WORDS - 2);
        assert!(q.push_msg(&[7, 8, 9]));
        assert_eq!(q.pop_msg().unwrap(), [7, 8, 9]);
    }

    #[test]
    fn full_buffer_rejects_until_popped() {
        let mut q = HostMsgQueue::new();
        let half = std::vec![0xaau32; QUEUE_WORDS / 2];
        assert!(q.push_msg(&half));
        assert!(q.push_msg(&half));
        // Buffer exactly full; a wrap to 0 would land on the first
        // message.
        assert!(!q.push_msg(&[1]));
        assert_eq!(q.pop_msg().unwrap().len(), QUEUE_WORDS / 2);
        assert!(q.push_msg(&[1]));
        assert_eq!(q.pop_msg().unwrap().len(), QUEUE_WORDS / 2);
        assert_eq!(q.pop_msg().unwrap(), [1]);
    }

    #[test]
    fn dropped_counter_advances() {
        let mut q = HostMsgQueue::new();
        assert_eq!(q.dropped(), 0);
        q.note_dropped();
        q.note_dropped();
        assert_eq!(q.dropped(), 2);
    }
}
