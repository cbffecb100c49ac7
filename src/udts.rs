//! `udts` box: a compact serialization of a [`Descriptor`] used by the
//! codec-parameters sink that owns decoder configuration (MP4 Sample Entry
//! style). Grounded on `wav::chunks`'s chunk-header read/write pattern,
//! adapted from byte-aligned RIFF chunks to the bit-packed layout this box
//! actually uses.

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::channels::Channels;
use crate::descriptor::Descriptor;
use crate::errors::{malformed, Result};

const BOX_TAG: [u8; 4] = *b"udts";

/// Serializes `descriptor` into a `udts` box, patching the leading 32-bit
/// size field to the final byte length.
pub fn write_udts_box(descriptor: &Descriptor) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_bits(0, 32); // size placeholder, patched below
    for byte in BOX_TAG {
        w.put_bits(u32::from(byte), 8);
    }
    w.put_bits(descriptor.decoder_profile_code, 6);
    w.put_bits(descriptor.frame_duration_code, 2);
    w.put_bits(descriptor.max_payload_code, 3);
    w.put_bits(descriptor.num_pres_code, 5);
    w.put_bits(descriptor.channel_mask, 32);
    w.put_bits(descriptor.base_sample_freq_code as u32, 1);
    w.put_bits(descriptor.sample_rate_mod, 2);
    w.put_bits(descriptor.rep_type, 3);
    w.put_bits(0, 3);
    w.put_bits(0, 1);
    w.put_bits(0, descriptor.num_pres_code + 1);

    let mut bytes = w.into_bytes();
    let size = bytes.len() as u32;
    bytes[0..4].copy_from_slice(&size.to_be_bytes());
    bytes
}

/// Parses a `udts` box previously produced by [`write_udts_box`].
pub fn read_udts_box(bytes: &[u8]) -> Result<Descriptor> {
    if bytes.len() < 12 {
        return malformed("udts box truncated before fixed header");
    }

    let size = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    if size != bytes.len() {
        return malformed("udts box size field does not match buffer length");
    }
    if bytes[4..8] != BOX_TAG {
        return malformed("udts box tag mismatch");
    }

    let total_bits = bytes.len() * 8;
    let mut gb = BitReader::new(bytes, total_bits);
    if gb.seek_to_bit(8 * 8).is_none() {
        return malformed("udts box truncated before payload");
    }

    let field = |gb: &mut BitReader, n: u32| gb.get_bits(n).ok_or(());

    let decoder_profile_code = match field(&mut gb, 6) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading decoder_profile_code"),
    };
    let frame_duration_code = match field(&mut gb, 2) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading frame_duration_code"),
    };
    let max_payload_code = match field(&mut gb, 3) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading max_payload_code"),
    };
    let num_pres_code = match field(&mut gb, 5) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading num_pres_code"),
    };
    let channel_mask_bits = match field(&mut gb, 32) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading channel_mask"),
    };
    let base_sample_freq_code = match field(&mut gb, 1) {
        Ok(v) => v != 0,
        Err(_) => return malformed("udts box truncated reading base_sample_freq_code"),
    };
    let sample_rate_mod = match field(&mut gb, 2) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading sample_rate_mod"),
    };
    let rep_type = match field(&mut gb, 3) {
        Ok(v) => v,
        Err(_) => return malformed("udts box truncated reading rep_type"),
    };

    Ok(Descriptor {
        coding_name: [b'u', b'd', b't', b's', 0],
        base_sample_freq_code,
        channel_count: channel_mask_bits.count_ones() as usize,
        decoder_profile_code,
        frame_duration_code,
        max_payload_code,
        num_pres_code,
        rep_type,
        sample_rate: 0,
        sample_rate_mod,
        sample_size: 16,
        channel_mask: channel_mask_bits,
        // The box's fixed header has only one 32-bit channel_mask slot
        // (ETSI numbering); the target-ecosystem mask isn't round-tripped.
        external_channel_mask: Channels::empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_descriptor() -> Descriptor {
        Descriptor {
            coding_name: *b"dtsx\0",
            base_sample_freq_code: true,
            channel_count: 3,
            decoder_profile_code: 1,
            frame_duration_code: 2,
            max_payload_code: 0,
            num_pres_code: 1,
            rep_type: 0,
            sample_rate: 48000,
            sample_rate_mod: 0,
            sample_size: 16,
            channel_mask: 0x00000001 | 0x00000006,
            external_channel_mask: Channels::FRONT_CENTRE | Channels::FRONT_LEFT | Channels::FRONT_RIGHT,
        }
    }

    #[test]
    fn roundtrips_a_descriptor() {
        let original = sample_descriptor();
        let bytes = write_udts_box(&original);
        let decoded = read_udts_box(&bytes).unwrap();

        assert_eq!(decoded.decoder_profile_code, original.decoder_profile_code);
        assert_eq!(decoded.frame_duration_code, original.frame_duration_code);
        assert_eq!(decoded.max_payload_code, original.max_payload_code);
        assert_eq!(decoded.num_pres_code, original.num_pres_code);
        assert_eq!(decoded.channel_mask, original.channel_mask);
        assert_eq!(decoded.channel_count, decoded.channel_mask.count_ones() as usize);
        assert_eq!(decoded.base_sample_freq_code, original.base_sample_freq_code);
        assert_eq!(decoded.sample_rate_mod, original.sample_rate_mod);
        assert_eq!(decoded.rep_type, original.rep_type);
    }

    /// The box's `channel_mask` field must carry ETSI numbering, not the
    /// target-ecosystem mask. Build a descriptor from a pair of activity
    /// bits whose ETSI values are genuinely distinct but whose
    /// target-ecosystem labels collide (`0x000020`/`0x140000` both say
    /// `TOP_FRONT_LEFT|TOP_FRONT_RIGHT`; `0x008000`/`0x080000` both say
    /// `TOP_BACK_LEFT|TOP_BACK_RIGHT`), and check the serialized field
    /// against the true ETSI values from the reference activity-map table
    /// rather than a value that was only ever round-tripped against itself.
    #[test]
    fn serializes_etsi_channel_mask_not_external() {
        let (channel_mask, external_channel_mask, channel_count) =
            crate::channels::activity_mask_to_channels(0x000020 | 0x140000 | 0x008000 | 0x080000);
        assert_eq!(channel_mask, 0x0000A000 | 0x30000000 | 0x01800000 | 0xC0000000);
        assert_eq!(
            external_channel_mask,
            Channels::TOP_FRONT_LEFT
                | Channels::TOP_FRONT_RIGHT
                | Channels::TOP_BACK_LEFT
                | Channels::TOP_BACK_RIGHT
        );
        assert_eq!(channel_count, 8);

        let mut descriptor = sample_descriptor();
        descriptor.channel_mask = channel_mask;
        descriptor.external_channel_mask = external_channel_mask;
        descriptor.channel_count = channel_count;

        let bytes = write_udts_box(&descriptor);
        let decoded = read_udts_box(&bytes).unwrap();
        assert_eq!(decoded.channel_mask, channel_mask);
        assert_eq!(decoded.channel_count, channel_count);
    }

    #[test]
    fn size_field_matches_buffer_length() {
        let bytes = write_udts_box(&sample_descriptor());
        let size = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(size as usize, bytes.len());
    }

    #[test]
    fn rejects_truncated_box() {
        let bytes = write_udts_box(&sample_descriptor());
        assert!(read_udts_box(&bytes[..8]).is_err());
    }

    #[test]
    fn rejects_wrong_tag() {
        let mut bytes = write_udts_box(&sample_descriptor());
        bytes[4] = b'x';
        assert!(read_udts_box(&bytes).is_err());
    }
}
