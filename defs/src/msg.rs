// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

use bitfield_struct::bitfield;

/// First word of every firmware comms message.  `size` is the message size
/// in bytes and is rounded up to a 4-byte multiple by all producers, so a
/// message always occupies a whole number of ring words.
#[bitfield(u32)]
pub struct MtxMsgHeader {
    pub size: u16,
    pub msg_id: u8,
    rsvd: u8,
}

/// Padding id for the host-to-firmware direction (Control/Decode areas).
pub const MSGID_HOST_PADDING: u8 = 0x00;

/// Padding id for the firmware-to-host direction (Completed area).
pub const MSGID_FW_PADDING: u8 = 0x80;

/// Inclusive id range for real completion messages.
pub const MSGID_COMPLETED_FIRST: u8 = 0x81;
pub const MSGID_COMPLETED_LAST: u8 = 0xbf;

/// Whether `id` is a payload-bearing firmware-to-host message id.
pub const fn is_completed_id(id: u8) -> bool {
    id >= MSGID_COMPLETED_FIRST && id <= MSGID_COMPLETED_LAST
}

/// Number of 32-bit ring words needed to carry `bytes` bytes.
pub const fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(4)
}

/// Builds the header word for a padding message spanning `words` ring
/// words, in the direction selected by `msg_id`.
pub fn padding_header(msg_id: u8, words: u32) -> MtxMsgHeader {
    MtxMsgHeader::new()
        .with_size((words * 4) as u16)
        .with_msg_id(msg_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_size_and_id() {
        let hdr = MtxMsgHeader::new().with_size(20).with_msg_id(0x87);
        let word: u32 = hdr.into();
        assert_eq!(word & 0xffff, 20);
        assert_eq!((word >> 16) & 0xff, 0x87);
        let back = MtxMsgHeader::from(word);
        assert_eq!(back.size(), 20);
        assert_eq!(back.msg_id(), 0x87);
    }

    #[test]
    fn word_rounding() {
        assert_eq!(words_for(0), 0);
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(4), 1);
        assert_eq!(words_for(5), 2);
        assert_eq!(words_for(20), 5);
    }

    #[test]
    fn completed_id_range() {
        assert!(!is_completed_id(MSGID_FW_PADDING));
        assert!(is_completed_id(MSGID_COMPLETED_FIRST));
        assert!(is_completed_id(MSGID_COMPLETED_LAST));
        assert!(!is_completed_id(0xc0));
        assert!(!is_completed_id(MSGID_HOST_PADDING));
    }
}
