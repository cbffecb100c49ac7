//! MD01 (metadata chunk id 1) registry: object list, object metadata, and
//! the multi-frame static-metadata accumulation buffer.
//!
//! Grounded on the reference decoder's `MD01` struct and its
//! `parse_md_chunk_list`/`parse_md01`/`parse_multi_frame_md`/
//! `parse_static_md_params`/`is_suitable_for_render`/`parse_ch_mask_params`
//! functions (`dtsuhd_common.c`, Tables 6-6, 7-4, 7-7, 7-8, 7-9, 7-18,
//! 7-22, 7-26). Structured like `flac::decoder`'s subframe dispatch: one
//! top-level entry point per chunk, delegating to small per-table helpers.

use crate::bitreader::BitReader;
use crate::object::{MDObject, RepType};
use crate::vlc;

const TABLE_OBJECT_LIST_COUNT: [u8; 4] = [3, 4, 6, 8];
const TABLE_STATIC_MD_PACKETS: [u8; 4] = [0, 6, 9, 12];
const TABLE_STATIC_MD_PACKET_SIZE: [u8; 4] = [5, 7, 9, 11];
const TABLE_REJECT_PAYLOAD: [u8; 4] = [8, 10, 12, 14];
const TABLE_OBJECT_IMPORTANCE_1: [u8; 4] = [1, 4, 4, 8];
const TABLE_OBJECT_IMPORTANCE_2: [u8; 4] = [3, 3, 4, 8];

/// ETSI TS 103 491 Table 7-27: the 14-entry channel-mask shorthand table.
const CH_MASK_TABLE: [u32; 14] = [
    0x000001, 0x000002, 0x000006, 0x00000F, 0x00001F, 0x00084B, 0x00002F, 0x00802F, 0x00486B,
    0x00886B, 0x03FBFB, 0x000003, 0x000007, 0x000843,
];

/// One MD01 (chunk id 1) registry, identified by `chunk_id` (always 1 in
/// practice, kept distinct to mirror the reference decoder's lookup key).
pub struct Md01 {
    pub chunk_id: u32,
    object: [MDObject; 257],
    object_list: Vec<u32>,
    packets_acquired: u32,
    static_md_extracted: bool,
    static_md_packets: u32,
    static_md_packet_size: u32,
    static_md_update_flag: bool,
    /// Accumulation buffer for multi-frame static metadata. Its capacity is
    /// a high-water mark: it only grows, mirroring the reference decoder's
    /// `buf`/`buf_bytes` pair, which is reallocated only when a sync frame
    /// demands more space than already allocated.
    buf: Vec<u8>,
    /// Bit position of the accumulation buffer's reader. This is not reset
    /// between the first-packet preview parse and the final-packet full
    /// parse within one sync-frame epoch — only a new sync frame resets it
    /// to zero. See the crate's design notes on this persistence.
    buf_bit_pos: usize,
}

impl Md01 {
    pub fn new(chunk_id: u32) -> Self {
        Md01 {
            chunk_id,
            object: [MDObject::default(); 257],
            object_list: Vec::new(),
            packets_acquired: 0,
            static_md_extracted: false,
            static_md_packets: 0,
            static_md_packet_size: 0,
            static_md_update_flag: false,
            buf: Vec::new(),
            buf_bit_pos: 0,
        }
    }

    pub fn object(&self, id: usize) -> &MDObject {
        &self.object[id]
    }

    pub fn object_list(&self) -> &[u32] {
        &self.object_list
    }

    /// Table 6-6: the object-list for this MD01 chunk.
    pub fn parse_chunk_list(&mut self, gb: &mut BitReader, full_channel_mix_flag: bool) -> Option<()> {
        if full_channel_mix_flag {
            self.object_list.clear();
            self.object_list.push(256);
        } else {
            let count = vlc::get_bits_var(gb, &TABLE_OBJECT_LIST_COUNT, true)?;
            self.object_list.clear();
            for _ in 0..count {
                let wide = gb.get_bits1()?;
                let id = gb.get_bits(if wide { 8 } else { 4 })?;
                self.object_list.push(id);
            }
        }
        Some(())
    }

    /// Reads from the live frame bitstream while the accumulation buffer is
    /// still empty (the full-channel-mix case never allocates one); once
    /// populated, reads from the accumulation buffer at its persisted
    /// position instead, mirroring `get_bits_md01`.
    fn get_bits(&mut self, frame_gb: &mut BitReader, n: u32) -> Option<u32> {
        if self.buf.is_empty() {
            frame_gb.get_bits(n)
        } else {
            let total_bits = self.buf.len() * 8;
            let mut reader = BitReader::new(&self.buf, total_bits);
            reader.seek_to_bit(self.buf_bit_pos)?;
            let value = reader.get_bits(n)?;
            self.buf_bit_pos = reader.get_bits_count();
            Some(value)
        }
    }

    fn skip_bits(&mut self, frame_gb: &mut BitReader, n: u32) -> Option<()> {
        if n == 0 {
            return Some(());
        }
        self.get_bits(frame_gb, n).map(|_| ())
    }

    /// Table 7-9.
    fn skip_mp_param_set(&mut self, frame_gb: &mut BitReader, nominal_flag: bool) -> Option<()> {
        self.skip_bits(frame_gb, 6)?;
        if !nominal_flag {
            self.skip_bits(frame_gb, 5)?;
        }
        self.skip_bits(frame_gb, if nominal_flag { 2 } else { 4 })?;
        Some(())
    }

    /// Table 7-8.
    fn parse_static_md_params(
        &mut self,
        frame_gb: &mut BitReader,
        full_channel_mix_flag: bool,
        only_first: bool,
    ) -> Option<()> {
        let mut nominal_flag = true;
        if !full_channel_mix_flag {
            nominal_flag = self.get_bits(frame_gb, 1)? != 0;
        }

        let loudness_sets = if nominal_flag {
            if !full_channel_mix_flag && self.get_bits(frame_gb, 1)? != 0 {
                3
            } else {
                1
            }
        } else {
            self.get_bits(frame_gb, 4)? + 1
        };

        for _ in 0..loudness_sets {
            self.skip_mp_param_set(frame_gb, nominal_flag)?;
        }

        if only_first {
            return Some(());
        }

        if !nominal_flag {
            self.get_bits(frame_gb, 1)?;
        }

        for _ in 0..3 {
            if self.get_bits(frame_gb, 1)? != 0 && self.get_bits(frame_gb, 4)? == 15 {
                self.get_bits(frame_gb, 15)?;
            }
            if self.get_bits(frame_gb, 1)? != 0 {
                self.get_bits(frame_gb, 36)?;
            }
        }

        if !full_channel_mix_flag {
            let total_bits = (self.static_md_packets * self.static_md_packet_size * 8) as usize;
            let remaining = total_bits.saturating_sub(self.buf_bit_pos);
            self.skip_bits(frame_gb, remaining as u32)?;
        }
        self.static_md_extracted = true;

        Some(())
    }

    /// Table 7-7: accumulates one packet of static metadata per frame,
    /// (re)initializing the accumulation buffer on sync frames.
    pub fn parse_multi_frame_md(
        &mut self,
        gb: &mut BitReader,
        is_sync_frame: bool,
        full_channel_mix_flag: bool,
    ) -> Option<()> {
        if is_sync_frame {
            self.packets_acquired = 0;
            if full_channel_mix_flag {
                self.static_md_packets = 1;
                self.static_md_packet_size = 0;
            } else {
                self.static_md_packets = vlc::get_bits_var(gb, &TABLE_STATIC_MD_PACKETS, true)? + 1;
                self.static_md_packet_size =
                    vlc::get_bits_var(gb, &TABLE_STATIC_MD_PACKET_SIZE, true)? + 3;
            }

            let n = (self.static_md_packets * self.static_md_packet_size) as usize;
            if n > self.buf.len() {
                self.buf.resize(n, 0);
            }
            self.buf_bit_pos = 0;

            self.static_md_update_flag = if self.static_md_packets > 1 {
                gb.get_bits1()?
            } else {
                true
            };
        }

        if self.packets_acquired < self.static_md_packets {
            let base = (self.packets_acquired * self.static_md_packet_size) as usize;
            for i in 0..self.static_md_packet_size as usize {
                self.buf[base + i] = gb.get_bits(8)? as u8;
            }
            self.packets_acquired += 1;

            if self.packets_acquired == self.static_md_packets {
                if self.static_md_update_flag || !self.static_md_extracted {
                    self.parse_static_md_params(gb, full_channel_mix_flag, false)?;
                }
            } else if self.packets_acquired == 1
                && (self.static_md_update_flag || !self.static_md_extracted)
            {
                self.parse_static_md_params(gb, full_channel_mix_flag, true)?;
            }
        }

        Some(())
    }

    /// Table 7-18: `true` if suitable for render (proceed), `false` if
    /// rejected (reject payload already consumed).
    fn is_suitable_for_render(gb: &mut BitReader, object_id: u32) -> Option<bool> {
        if object_id >= 224 || gb.get_bits1()? {
            return Some(true);
        }
        gb.skip_bits(1)?;
        let reject_bits = vlc::get_bits_var(gb, &TABLE_REJECT_PAYLOAD, true)?;
        gb.skip_bits(reject_bits)?;
        Some(false)
    }

    /// Table 7-26.
    fn parse_ch_mask_params(gb: &mut BitReader, object: &mut MDObject) -> Option<()> {
        let ch_index = if object.rep_type == Some(RepType::Binaural) {
            1
        } else {
            gb.get_bits(4)?
        };

        object.ch_activity_mask = match ch_index {
            14 => gb.get_bits(16)?,
            15 => gb.get_bits(32)?,
            _ => CH_MASK_TABLE[ch_index as usize],
        };
        Some(())
    }

    /// Table 7-22.
    fn parse_object_metadata(
        gb: &mut BitReader,
        object: &mut MDObject,
        start_frame_flag: bool,
        object_id: u32,
        interactive_obj_limits_present: bool,
    ) -> Option<()> {
        if object_id != 256 {
            gb.skip_bits(1)?;
        }

        if !start_frame_flag {
            return Some(());
        }

        let rep_type = RepType::from_code(gb.get_bits(3)?)?;
        object.rep_type = Some(rep_type);

        let ch_mask_object_flag = rep_type.is_channel_mask_based();
        let object_3d_metadata_flag = rep_type.is_3d_object();

        if ch_mask_object_flag {
            if object_id != 256 {
                gb.skip_bits(3)?; // object importance level
                if gb.get_bits1()? {
                    gb.skip_bits(if gb.get_bits1()? { 3 } else { 5 })?;
                }

                vlc::get_bits_var(gb, &TABLE_OBJECT_IMPORTANCE_1, true)?;
                vlc::get_bits_var(gb, &TABLE_OBJECT_IMPORTANCE_2, true)?;

                if gb.get_bits1()? {
                    gb.skip_bits(8)?;
                }

                if gb.get_bits1()? && interactive_obj_limits_present && gb.get_bits1()? {
                    gb.skip_bits(5 + 6 * object_3d_metadata_flag as u32)?;
                }
            }

            Md01::parse_ch_mask_params(gb, object)?;
        }

        Some(())
    }

    /// Table 7-4: one MD01 chunk's body, for presentation `pres_index`.
    pub fn parse(
        &mut self,
        gb: &mut BitReader,
        pres_index: usize,
        selectable: bool,
        is_sync_frame: bool,
        full_channel_mix_flag: bool,
        interactive_obj_limits_present: bool,
    ) -> Option<()> {
        if selectable {
            for _ in 0..4 {
                if gb.get_bits1()? {
                    gb.skip_bits(5)?;
                }
            }

            if gb.get_bits1()? {
                self.parse_multi_frame_md(gb, is_sync_frame, full_channel_mix_flag)?;
            }
        }

        self.object = [MDObject::default(); 257];
        if !full_channel_mix_flag && gb.get_bits1()? {
            gb.skip_bits(11)?;
        }

        for &id in &self.object_list.clone() {
            if !Md01::is_suitable_for_render(gb, id)? {
                continue;
            }

            let id_usize = id as usize;
            self.object[id_usize].pres_index = pres_index;
            let mut start_flag = false;
            if !self.object[id_usize].started {
                if id != 256 {
                    gb.skip_bits(1)?;
                }
                self.object[id_usize].started = true;
                start_flag = true;
            }

            if !(224..=255).contains(&id) {
                let mut object = self.object[id_usize];
                Md01::parse_object_metadata(
                    gb,
                    &mut object,
                    start_flag,
                    id,
                    interactive_obj_limits_present,
                )?;
                self.object[id_usize] = object;
            }

            break;
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mix_chunk_list_is_single_sentinel() {
        let mut md01 = Md01::new(1);
        let data = [0u8];
        let mut gb = BitReader::new(&data, 0);
        md01.parse_chunk_list(&mut gb, true).unwrap();
        assert_eq!(md01.object_list(), &[256]);
    }

    #[test]
    fn rejects_by_consuming_reject_payload() {
        // object_id < 224, accept bit = 0, reserved bit, then vlc reject size.
        // accept bit(0) reserved(0) vlc-code(000 -> bucket0 width 8) => 1+1+1+8=11 bits
        let data = [0b0_0_000_000u8, 0b0000_0000];
        let mut gb = BitReader::new(&data, 16);
        let suitable = Md01::is_suitable_for_render(&mut gb, 10).unwrap();
        assert!(!suitable);
    }

    #[test]
    fn high_object_ids_always_suitable() {
        let data = [0u8];
        let mut gb = BitReader::new(&data, 8);
        assert!(Md01::is_suitable_for_render(&mut gb, 224).unwrap());
    }

    #[test]
    fn ch_mask_from_table_for_small_index() {
        let mut object = MDObject::default();
        object.rep_type = Some(RepType::ChannelMaskBased);
        // 4-bit ch_index = 0 -> table[0] = 0x000001
        let data = [0b0000_0000u8];
        let mut gb = BitReader::new(&data, 8);
        Md01::parse_ch_mask_params(&mut gb, &mut object).unwrap();
        assert_eq!(object.ch_activity_mask, 0x000001);
    }

    #[test]
    fn binaural_forces_ch_index_one() {
        let mut object = MDObject::default();
        object.rep_type = Some(RepType::Binaural);
        let data = [0xFFu8];
        let mut gb = BitReader::new(&data, 8);
        Md01::parse_ch_mask_params(&mut gb, &mut object).unwrap();
        assert_eq!(object.ch_activity_mask, CH_MASK_TABLE[1]);
    }
}
