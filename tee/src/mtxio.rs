// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Firmware comms ring engine.
//!
//! Each comms area is a bounded circular word buffer in VEC local RAM with
//! a `{capacity, read_index, write_index}` header.  Mutual exclusion comes
//! entirely from protocol discipline: each side only ever advances the one
//! index it owns, and the channel mutex upstream guarantees at most one
//! in-flight submission per direction.  Messages never wrap silently on
//! the producer side; a padding message consumes the tail of the ring so
//! the next real message starts at word 0.
//!
//! Postcondition on any `Err` from [`CommsRing::send_msg`]: the write
//! index is unspecified (a padding message may already have been emitted
//! and persisted).  Callers must re-read the header before retrying, which
//! the retry site does by re-entering the full send path.

use vdecdefs::comms::{payload_offset, HDR_CAPACITY, HDR_RD_INDEX, HDR_WR_INDEX};
use vdecdefs::msg::{
    is_completed_id, padding_header, words_for, MSGID_FW_PADDING, MSGID_HOST_PADDING,
};
use vdecdefs::regio::{MemRegion, RegIo};
use vdecdefs::{CommsArea, MtxMsgHeader, SecError};

/// One comms area.  The capacity is fixed at construction from the area's
/// geometry constant; header writes always re-derive it from there, so a
/// corrupted or caller-supplied size can never stick.
#[derive(Clone, Copy, Debug)]
pub struct CommsRing {
    area: CommsArea,
    region: MemRegion,
    capacity: u32,
}

impl CommsRing {
    pub const fn new(area: CommsArea) -> CommsRing {
        CommsRing {
            area,
            region: MemRegion::for_area(area),
            capacity: area.capacity(),
        }
    }

    /// Test-only constructor with a reduced ring, for exercising the
    /// wraparound paths without kilobytes of traffic.
    #[cfg(test)]
    pub(crate) const fn with_capacity(area: CommsArea, capacity: u32) -> CommsRing {
        CommsRing {
            area,
            region: MemRegion::for_area(area),
            capacity,
        }
    }

    pub const fn area(&self) -> CommsArea {
        self.area
    }

    /// Programs the header.  Called once at firmware-load time; the
    /// capacity written is the geometry constant regardless of what any
    /// caller believes it should be.
    pub fn init(&self, io: &mut impl RegIo) {
        io.write(self.region, HDR_CAPACITY, self.capacity);
        io.write(self.region, HDR_RD_INDEX, 0);
        io.write(self.region, HDR_WR_INDEX, 0);
    }

    fn header(&self, io: &impl RegIo) -> Result<(u32, u32), SecError> {
        let capacity = io.read(self.region, HDR_CAPACITY);
        if capacity != self.capacity {
            log::error!(
                "comms {:?}: capacity field corrupt ({} != {})",
                self.area,
                capacity,
                self.capacity
            );
            return Err(SecError::UnexpectedState);
        }
        let rd = io.read(self.region, HDR_RD_INDEX);
        let wr = io.read(self.region, HDR_WR_INDEX);
        if rd >= capacity || wr >= capacity {
            log::error!("comms {:?}: index out of range (rd={rd} wr={wr})", self.area);
            return Err(SecError::UnexpectedState);
        }
        Ok((rd, wr))
    }

    /// Emits a padding message covering `capacity - wr` words and resets
    /// the write index to 0.  Fails with `Busy` when the reader still owns
    /// the tail; padding respects the same non-overwrite rule as real
    /// messages.
    fn send_pad(&self, io: &mut impl RegIo, rd: u32, wr: u32) -> Result<(), SecError> {
        if rd > wr {
            return Err(SecError::Busy);
        }
        let pad_words = self.capacity - wr;
        let hdr = padding_header(MSGID_HOST_PADDING, pad_words);
        io.write(self.region, payload_offset(wr), hdr.into());
        io.write(self.region, HDR_WR_INDEX, 0);
        Ok(())
    }

    /// Writes one host-to-firmware message (Control and Decode areas
    /// only).  `msg` must start with its [`MtxMsgHeader`] word; a length
    /// that is not a 4-byte multiple is zero-filled to the word boundary.
    pub fn send_msg(&self, io: &mut impl RegIo, msg: &[u8]) -> Result<(), SecError> {
        debug_assert!(self.area.host_writes());
        let words = words_for(msg.len()) as u32;
        if words == 0 {
            return Err(SecError::InvalidParameters);
        }
        if words > self.capacity {
            // Will never fit, no matter how much the reader drains.
            return Err(SecError::GenericFailure);
        }

        let (rd, mut wr) = self.header(io)?;

        if wr + words > self.capacity {
            self.send_pad(io, rd, wr)?;
            wr = 0;
        }
        if wr < rd && wr + words > rd {
            return Err(SecError::Busy);
        }

        for (i, chunk) in msg.chunks(4).enumerate() {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            io.write(
                self.region,
                payload_offset(wr + i as u32),
                u32::from_le_bytes(bytes),
            );
        }

        wr += words;
        if wr == self.capacity {
            wr = 0;
        }
        io.write(self.region, HDR_WR_INDEX, wr);
        Ok(())
    }

    /// Drains firmware-to-host messages (Completed area only) into `dest`,
    /// stopping when the ring is empty or the next message would not fit.
    /// Returns the words written and whether unread data remains.
    ///
    /// Padding messages are consumed, never copied out.  A message that
    /// straddles the end of the ring is copied in two pieces.
    pub fn process_msgs(
        &self,
        io: &mut impl RegIo,
        dest: &mut [u32],
    ) -> Result<(usize, bool), SecError> {
        debug_assert!(!self.area.host_writes());
        let (mut rd, wr) = self.header(io)?;
        let mut written = 0usize;

        while rd != wr {
            let hdr = MtxMsgHeader::from(io.read(self.region, payload_offset(rd)));
            let words = words_for(hdr.size() as usize) as u32;

            if hdr.msg_id() == MSGID_FW_PADDING {
                // Padding always runs exactly to the end of the ring.
                if words == 0 || rd + words != self.capacity {
                    log::error!(
                        "comms {:?}: bad padding at rd={rd} ({words} words)",
                        self.area
                    );
                    return Err(SecError::UnexpectedState);
                }
                rd = 0;
                io.write(self.region, HDR_RD_INDEX, rd);
                continue;
            }

            if !is_completed_id(hdr.msg_id()) {
                log::error!(
                    "comms {:?}: unknown message id {:#04x} at rd={rd}",
                    self.area,
                    hdr.msg_id()
                );
                return Err(SecError::UnexpectedState);
            }

            let unread = if wr >= rd {
                wr - rd
            } else {
                self.capacity - rd + wr
            };
            if words == 0 || words > unread {
                // The message claims more data than the producer has
                // published; the sides have desynchronized.
                log::error!(
                    "comms {:?}: message overruns write index (rd={rd} wr={wr} words={words})",
                    self.area
                );
                return Err(SecError::UnexpectedState);
            }

            if dest.len() - written < words as usize {
                return Ok((written, true));
            }

            let first = words.min(self.capacity - rd);
            for i in 0..first {
                dest[written + i as usize] = io.read(self.region, payload_offset(rd + i));
            }
            for i in 0..(words - first) {
                dest[written + (first + i) as usize] = io.read(self.region, payload_offset(i));
            }
            written += words as usize;

            rd = (rd + words) % self.capacity;
            io.write(self.region, HDR_RD_INDEX, rd);
        }

        Ok((written, false))
    }

    /// Current `(read_index, write_index)`, with the corruption checks of
    /// a normal access.
    pub fn indexes(&self, io: &impl RegIo) -> Result<(u32, u32), SecError> {
        self.header(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use alloc::vec::Vec;
    use vdecdefs::msg::MSGID_COMPLETED_FIRST;

    /// Word-map fake of the device memory.
    #[derive(Debug, Default)]
    struct MapIo {
        words: BTreeMap<(u32, u32), u32>,
    }

    impl RegIo for MapIo {
        fn read(&self, region: MemRegion, offset: u32) -> u32 {
            *self.words.get(&(region.to_wire(), offset)).unwrap_or(&0)
        }

        fn write(&mut self, region: MemRegion, offset: u32, value: u32) {
            self.words.insert((region.to_wire(), offset), value);
        }
    }

    fn msg_bytes(id: u8, payload: &[u32]) -> Vec<u8> {
        let size = (payload.len() as u16 + 1) * 4;
        let hdr: u32 = MtxMsgHeader::new().with_size(size).with_msg_id(id).into();
        let mut out = hdr.to_le_bytes().to_vec();
        for w in payload {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// Plays firmware: appends a completion message to the Completed ring,
    /// padding the tail when the message would not fit linearly only if
    /// `pad` is requested; otherwise lets it straddle.
    fn fw_post(ring: &CommsRing, io: &mut MapIo, msg: &[u32], pad: bool) {
        let cap = ring.capacity;
        let rd = io.read(ring.region, HDR_RD_INDEX);
        let mut wr = io.read(ring.region, HDR_WR_INDEX);
        let words = msg.len() as u32;
        if pad && wr + words > cap {
            assert!(rd <= wr, "pad would overwrite unread data");
            let hdr = padding_header(MSGID_FW_PADDING, cap - wr);
            io.write(ring.region, payload_offset(wr), hdr.into());
            wr = 0;
        }
        for (i, w) in msg.iter().enumerate() {
            io.write(ring.region, payload_offset((wr + i as u32) % cap), *w);
        }
        io.write(ring.region, HDR_WR_INDEX, (wr + words) % cap);
    }

    fn completion(id: u8, payload: &[u32]) -> Vec<u32> {
        let size = (payload.len() as u16 + 1) * 4;
        let hdr: u32 = MtxMsgHeader::new().with_size(size).with_msg_id(id).into();
        let mut v = vec![hdr];
        v.extend_from_slice(payload);
        v
    }

    #[test]
    fn send_then_firmware_reads_in_order() {
        let ring = CommsRing::with_capacity(CommsArea::Decode, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        let a = msg_bytes(0x10, &[0xa1, 0xa2]);
        let b = msg_bytes(0x11, &[0xb1]);
        ring.send_msg(&mut io, &a).unwrap();
        ring.send_msg(&mut io, &b).unwrap();

        // Firmware view: the words sit back to back from word 0.
        let hdr = MtxMsgHeader::from(io.read(ring.region, payload_offset(0)));
        assert_eq!(hdr.msg_id(), 0x10);
        assert_eq!(hdr.size(), 12);
        assert_eq!(io.read(ring.region, payload_offset(1)), 0xa1);
        assert_eq!(io.read(ring.region, payload_offset(2)), 0xa2);
        let hdr = MtxMsgHeader::from(io.read(ring.region, payload_offset(3)));
        assert_eq!(hdr.msg_id(), 0x11);
        assert_eq!(io.read(ring.region, HDR_WR_INDEX), 5);
    }

    #[test]
    fn oversized_message_rejected_outright() {
        let ring = CommsRing::with_capacity(CommsArea::Control, 8);
        let mut io = MapIo::default();
        ring.init(&mut io);
        let huge = msg_bytes(0x10, &[0; 8]);
        assert_eq!(ring.send_msg(&mut io, &huge), Err(SecError::GenericFailure));
    }

    #[test]
    fn capacity_corruption_detected() {
        let ring = CommsRing::with_capacity(CommsArea::Control, 8);
        let mut io = MapIo::default();
        ring.init(&mut io);
        io.write(ring.region, HDR_CAPACITY, 9);
        let m = msg_bytes(0x10, &[]);
        assert_eq!(ring.send_msg(&mut io, &m), Err(SecError::UnexpectedState));
    }

    #[test]
    fn pad_then_wrap_spec_example() {
        // capacity=16: A (5 words), B (5 words), then C (10 words) does
        // not fit in the remaining 6 words.  C's send emits a 6-word pad,
        // wraps the write index to 0 and lands C at words 0..10.
        let ring = CommsRing::with_capacity(CommsArea::Decode, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        let a = msg_bytes(0x10, &[0xa1, 0xa2, 0xa3, 0xa4]);
        let b = msg_bytes(0x11, &[0xb1, 0xb2, 0xb3, 0xb4]);
        let c = msg_bytes(0x12, &[0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9]);
        ring.send_msg(&mut io, &a).unwrap();
        ring.send_msg(&mut io, &b).unwrap();

        // Reader has consumed A and B.
        io.write(ring.region, HDR_RD_INDEX, 10);
        ring.send_msg(&mut io, &c).unwrap();

        // The pad at word 10 declares exactly the remaining 6 words.
        let pad = MtxMsgHeader::from(io.read(ring.region, payload_offset(10)));
        assert_eq!(pad.msg_id(), MSGID_HOST_PADDING);
        assert_eq!(pad.size(), 6 * 4);

        // C occupies words 0..10 and the write index followed it.
        let hdr = MtxMsgHeader::from(io.read(ring.region, payload_offset(0)));
        assert_eq!(hdr.msg_id(), 0x12);
        assert_eq!(io.read(ring.region, payload_offset(9)), 0xc9);
        assert_eq!(io.read(ring.region, HDR_WR_INDEX), 10);
    }

    #[test]
    fn pad_blocked_by_unread_tail() {
        let ring = CommsRing::with_capacity(CommsArea::Decode, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        // Reader is behind the writer with unread data in the tail:
        // rd=12 > wr=10, so the pad would overwrite words 12..16.
        io.write(ring.region, HDR_WR_INDEX, 10);
        io.write(ring.region, HDR_RD_INDEX, 12);
        let c = msg_bytes(0x12, &[0; 9]);
        assert_eq!(ring.send_msg(&mut io, &c), Err(SecError::Busy));
    }

    #[test]
    fn no_overwrite_after_wrap() {
        let ring = CommsRing::with_capacity(CommsArea::Decode, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        // Reader sits at word 4 with everything before it unread; a
        // 10-word message wrapping to word 0 would cross it.
        io.write(ring.region, HDR_WR_INDEX, 12);
        io.write(ring.region, HDR_RD_INDEX, 4);
        let c = msg_bytes(0x12, &[0; 9]);
        assert_eq!(ring.send_msg(&mut io, &c), Err(SecError::Busy));
        // The pad was already emitted: write index state is unspecified
        // on error, and here it observably moved to 0.
        assert_eq!(io.read(ring.region, HDR_WR_INDEX), 0);
    }

    #[test]
    fn busy_without_wrap_when_reader_ahead() {
        let ring = CommsRing::with_capacity(CommsArea::Decode, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);
        io.write(ring.region, HDR_WR_INDEX, 2);
        io.write(ring.region, HDR_RD_INDEX, 5);
        // 4 words from wr=2 would cross rd=5.
        let m = msg_bytes(0x10, &[0; 3]);
        assert_eq!(ring.send_msg(&mut io, &m), Err(SecError::Busy));
        // 3 words exactly reach rd and are allowed.
        let m = msg_bytes(0x10, &[0; 2]);
        ring.send_msg(&mut io, &m).unwrap();
        assert_eq!(io.read(ring.region, HDR_WR_INDEX), 5);
    }

    #[test]
    fn receive_fifo_across_padding() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        let m1 = completion(MSGID_COMPLETED_FIRST, &[1, 2, 3, 4]);
        let m2 = completion(0x90, &[5, 6, 7, 8]);
        let m3 = completion(0x91, &[9]);
        fw_post(&ring, &mut io, &m1, true);
        fw_post(&ring, &mut io, &m2, true);

        let mut dest = [0u32; 32];
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 10);
        assert!(!more);
        assert_eq!(&dest[..5], &m1[..]);
        assert_eq!(&dest[5..10], &m2[..]);

        // Third message needs a pad (6 words left, message is 2 words --
        // fits; force the pad by posting a 7-word message instead).
        let big = completion(0x92, &[11, 12, 13, 14, 15, 16]);
        fw_post(&ring, &mut io, &big, true);
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 7);
        assert!(!more);
        assert_eq!(&dest[..7], &big[..]);

        fw_post(&ring, &mut io, &m3, true);
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 2);
        assert!(!more);
        assert_eq!(&dest[..2], &m3[..]);
    }

    #[test]
    fn receive_straddling_message_split_copied() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);

        // Advance both indexes to 12, then post a 6-word message with no
        // padding so it straddles the end of the ring.
        io.write(ring.region, HDR_RD_INDEX, 12);
        io.write(ring.region, HDR_WR_INDEX, 12);
        let m = completion(0x85, &[21, 22, 23, 24, 25]);
        fw_post(&ring, &mut io, &m, false);
        assert_eq!(io.read(ring.region, HDR_WR_INDEX), 2);

        let mut dest = [0u32; 16];
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 6);
        assert!(!more);
        assert_eq!(&dest[..6], &m[..]);
        assert_eq!(io.read(ring.region, HDR_RD_INDEX), 2);
    }

    #[test]
    fn receive_stops_at_dest_capacity_and_reports_more() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 32);
        let mut io = MapIo::default();
        ring.init(&mut io);

        for i in 0..4 {
            let m = completion(0x88, &[i, i + 1, i + 2]);
            fw_post(&ring, &mut io, &m, true);
        }

        // Room for two 4-word messages per call.
        let mut dest = [0u32; 9];
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 8);
        assert!(more);
        let (n, more) = ring.process_msgs(&mut io, &mut dest).unwrap();
        assert_eq!(n, 8);
        assert!(!more);
    }

    #[test]
    fn receive_rejects_unknown_id() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);
        let bogus = completion(0x10, &[0]); // host-direction id in fw ring
        fw_post(&ring, &mut io, &bogus, true);
        let mut dest = [0u32; 8];
        assert_eq!(
            ring.process_msgs(&mut io, &mut dest),
            Err(SecError::UnexpectedState)
        );
    }

    #[test]
    fn receive_rejects_message_overrunning_write_index() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);
        // Header claims 8 words but the producer only published 2.
        let hdr: u32 = MtxMsgHeader::new()
            .with_size(32)
            .with_msg_id(0x85)
            .into();
        io.write(ring.region, payload_offset(0), hdr);
        io.write(ring.region, HDR_WR_INDEX, 2);
        let mut dest = [0u32; 16];
        assert_eq!(
            ring.process_msgs(&mut io, &mut dest),
            Err(SecError::UnexpectedState)
        );
    }

    #[test]
    fn receive_rejects_short_padding() {
        let ring = CommsRing::with_capacity(CommsArea::Completed, 16);
        let mut io = MapIo::default();
        ring.init(&mut io);
        // Padding that does not reach the end of the ring.
        io.write(ring.region, HDR_RD_INDEX, 10);
        io.write(ring.region, HDR_WR_INDEX, 2);
        let pad = padding_header(MSGID_FW_PADDING, 4);
        io.write(ring.region, payload_offset(10), pad.into());
        let mut dest = [0u32; 16];
        assert_eq!(
            ring.process_msgs(&mut io, &mut dest),
            Err(SecError::UnexpectedState)
        );
    }
}
