//! Variable-length code decoding.
//!
//! The frame format reuses one scheme, driven by a small per-field lookup
//! table, everywhere it needs a variable-width integer: chunk counts, chunk
//! byte sizes, presentation counts, object-list bit widths, and more each
//! pick their own table but share the same decode shape. Grounded on the
//! reference decoder's `get_bits_var` (`dtsuhd_common.c`), generalized from
//! its four-entry tables to a `[u8; 4]` parameter so each call site names
//! its own table inline instead of sharing global statics.

use crate::bitreader::BitReader;

const BITS_USED: [u32; 8] = [1, 1, 1, 1, 2, 2, 3, 3];
const INDEX_TABLE: [usize; 8] = [0, 0, 0, 0, 1, 1, 2, 3];

/// Decodes one variable-length value using a 4-entry field-width table.
///
/// `table[i]` gives the number of extra bits read once the code selects
/// bucket `i`; a table entry of `0` means that bucket contributes no extra
/// bits (the code alone determines the value, always `0` for that bucket).
///
/// When `add` is `true`, each bucket's value is offset by the sum of
/// `1 << table[j]` for every bucket `j` before it, so wider buckets extend
/// rather than overlap the range covered by narrower ones. Most call sites
/// pass `true`; a handful of payload-size fields pass `false` to read a bare
/// width-`table[index]` integer with no offset.
pub fn get_bits_var(gb: &mut BitReader, table: &[u8; 4], add: bool) -> Option<u32> {
    let code = gb.show_bits(3)? as usize;
    let index = INDEX_TABLE[code];
    gb.skip_bits(BITS_USED[code])?;

    let width = table[index];
    if width == 0 {
        return Some(0);
    }

    let mut value: u32 = 0;
    if add {
        for &w in &table[..index] {
            value += 1u32 << w;
        }
    }
    value += gb.get_bits_long(u32::from(width))?;
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_smallest_bucket() {
        // table2468 style: { 2, 4, 6, 8 }
        let table = [2u8, 4, 6, 8];
        // Top bit 0 selects code in {0,1,2,3} -> index 0, consuming only 1
        // bit; the next 2 bits (bits 1-2) are then read as the value.
        let data = [0b010_00000u8];
        let mut gb = BitReader::new(&data, 8);
        assert_eq!(get_bits_var(&mut gb, &table, true), Some(0b10));
    }

    #[test]
    fn offsets_wider_buckets_when_adding() {
        let table = [2u8, 4, 6, 8];
        // code = 0b100 selects index_table[4] = 1, consuming only the first
        // 2 of those 3 peeked bits; the third peeked bit is re-read as part
        // of the following 4-bit value field (bits 2..6 = 0101).
        let data = [0b1001_0100u8];
        let mut gb = BitReader::new(&data, 8);
        let v = get_bits_var(&mut gb, &table, true).unwrap();
        assert_eq!(v, 4 + 0b0101);
    }

    #[test]
    fn zero_width_bucket_yields_zero() {
        let table = [0u8, 2, 4, 5];
        let data = [0u8];
        let mut gb = BitReader::new(&data, 8);
        assert_eq!(get_bits_var(&mut gb, &table, true), Some(0));
    }

    #[test]
    fn truncated_stream_is_none() {
        let table = [4u8, 8, 16, 32];
        let data = [0b111_00000u8];
        let mut gb = BitReader::new(&data, 8);
        // code 0b111 selects index 3, needs 32 bits we don't have.
        assert_eq!(get_bits_var(&mut gb, &table, true), None);
    }
}
