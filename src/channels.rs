//! Channel position bit mask and the activity-mask-to-channel-mask mapping.
//!
//! The `Channels` bitflags layout extends a smaller WAVEFORMATEX-style speaker
//! mask with the handful of positions (top-side, bottom-front, surround-direct)
//! Table 7-28's activity mask needs but that smaller mask never did. A 32-bit
//! mask has no room left above 25 flags, so this one widens to `u64`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// A bit mask of speaker positions present in a signal.
    pub struct Channels: u64 {
        const FRONT_CENTRE          = 0x0000_0000_0000_0001;
        const FRONT_LEFT            = 0x0000_0000_0000_0002;
        const FRONT_RIGHT           = 0x0000_0000_0000_0004;
        const SIDE_LEFT             = 0x0000_0000_0000_0008;
        const SIDE_RIGHT            = 0x0000_0000_0000_0010;
        const LOW_FREQUENCY         = 0x0000_0000_0000_0020;
        const BACK_CENTRE           = 0x0000_0000_0000_0040;
        const BACK_LEFT             = 0x0000_0000_0000_0080;
        const BACK_RIGHT            = 0x0000_0000_0000_0100;
        const TOP_FRONT_CENTRE      = 0x0000_0000_0000_0200;
        const TOP_CENTRE            = 0x0000_0000_0000_0400;
        const FRONT_LEFT_CENTRE     = 0x0000_0000_0000_0800;
        const FRONT_RIGHT_CENTRE    = 0x0000_0000_0000_1000;
        const FRONT_LEFT_WIDE       = 0x0000_0000_0000_2000;
        const FRONT_RIGHT_WIDE      = 0x0000_0000_0000_4000;
        const SURROUND_DIRECT_LEFT  = 0x0000_0000_0000_8000;
        const SURROUND_DIRECT_RIGHT = 0x0000_0000_0001_0000;
        const LOW_FREQUENCY_2       = 0x0000_0000_0002_0000;
        const TOP_SIDE_LEFT         = 0x0000_0000_0004_0000;
        const TOP_SIDE_RIGHT        = 0x0000_0000_0008_0000;
        const TOP_BACK_CENTRE       = 0x0000_0000_0010_0000;
        const TOP_BACK_LEFT         = 0x0000_0000_0020_0000;
        const TOP_BACK_RIGHT        = 0x0000_0000_0040_0000;
        const BOTTOM_FRONT_CENTRE   = 0x0000_0000_0080_0000;
        const BOTTOM_FRONT_LEFT     = 0x0000_0000_0100_0000;
        const BOTTOM_FRONT_RIGHT    = 0x0000_0000_0200_0000;
        const TOP_FRONT_LEFT        = 0x0000_0000_0400_0000;
        const TOP_FRONT_RIGHT       = 0x0000_0000_0800_0000;
    }
}

impl Default for Channels {
    fn default() -> Self {
        Channels::empty()
    }
}

impl Channels {
    /// Number of speaker positions set in the mask.
    pub fn count(self) -> usize {
        self.bits.count_ones() as usize
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#066b}", self.bits)
    }
}

/// One row of Table 7-28: an object's channel-activity-mask bit maps to both
/// an ETSI-numbered channel mask and a separate target-ecosystem (ffmpeg)
/// channel mask. The two columns are genuinely distinct bit layouts, not
/// just distinct types: row 18 and row 6 below both carry ffmpeg bits
/// `TOP_FRONT_LEFT|TOP_FRONT_RIGHT`, but row 18's ETSI `channel_mask` is
/// `0x30000000`, not row 6's `0x0000A000`. `external_bits` is a raw
/// `Channels` bit pattern rather than `Channels` itself, since `bitflags`
/// 1.x's constructors are not `const fn` and this table is built at compile
/// time.
struct ActivityMapEntry {
    activity_mask: u32,
    channel_mask: u32,
    external_bits: u64,
}

/// ETSI TS 103 491 Table 7-28, transcribed verbatim from the reference
/// decoder's `activity_map` (`dtsuhd_common.c`, `extract_object_info`).
/// Order matches the source table; later rows OR into bits earlier rows
/// already set rather than replacing them, so row order does not matter for
/// correctness but is kept for traceability against the source.
const ACTIVITY_MAP: &[ActivityMapEntry] = &[
    ActivityMapEntry {
        activity_mask: 0x000001,
        channel_mask: 0x00000001,
        external_bits: Channels::FRONT_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000002,
        channel_mask: 0x00000006,
        external_bits: Channels::FRONT_LEFT.bits | Channels::FRONT_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000004,
        channel_mask: 0x00000018,
        external_bits: Channels::SIDE_LEFT.bits | Channels::SIDE_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000008,
        channel_mask: 0x00000020,
        external_bits: Channels::LOW_FREQUENCY.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000010,
        channel_mask: 0x00000040,
        external_bits: Channels::BACK_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000020,
        channel_mask: 0x0000A000,
        external_bits: Channels::TOP_FRONT_LEFT.bits | Channels::TOP_FRONT_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000040,
        channel_mask: 0x00000180,
        external_bits: Channels::BACK_LEFT.bits | Channels::BACK_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000080,
        channel_mask: 0x00004000,
        external_bits: Channels::TOP_FRONT_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000100,
        channel_mask: 0x00080000,
        external_bits: Channels::TOP_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000200,
        channel_mask: 0x00001800,
        external_bits: Channels::FRONT_LEFT_CENTRE.bits | Channels::FRONT_RIGHT_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000400,
        channel_mask: 0x00060000,
        external_bits: Channels::FRONT_LEFT_WIDE.bits | Channels::FRONT_RIGHT_WIDE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x000800,
        channel_mask: 0x00000600,
        external_bits: Channels::SURROUND_DIRECT_LEFT.bits | Channels::SURROUND_DIRECT_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x001000,
        channel_mask: 0x00010000,
        external_bits: Channels::LOW_FREQUENCY_2.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x002000,
        channel_mask: 0x00300000,
        external_bits: Channels::TOP_SIDE_LEFT.bits | Channels::TOP_SIDE_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x004000,
        channel_mask: 0x00400000,
        external_bits: Channels::TOP_BACK_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x008000,
        channel_mask: 0x01800000,
        external_bits: Channels::TOP_BACK_LEFT.bits | Channels::TOP_BACK_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x010000,
        channel_mask: 0x02000000,
        external_bits: Channels::BOTTOM_FRONT_CENTRE.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x020000,
        channel_mask: 0x0C000000,
        external_bits: Channels::BOTTOM_FRONT_LEFT.bits | Channels::BOTTOM_FRONT_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x140000,
        channel_mask: 0x30000000,
        external_bits: Channels::TOP_FRONT_LEFT.bits | Channels::TOP_FRONT_RIGHT.bits,
    },
    ActivityMapEntry {
        activity_mask: 0x080000,
        channel_mask: 0xC0000000,
        external_bits: Channels::TOP_BACK_LEFT.bits | Channels::TOP_BACK_RIGHT.bits,
    },
];

/// Expands a 24-bit channel-activity mask into its ETSI-numbered channel
/// mask, its target-ecosystem speaker-position mask, and the ETSI mask's
/// channel count, following Table 7-28. The two masks are independent
/// accumulations: a bit in `activity_mask` ORs its row's `channel_mask` into
/// the first return value and its row's `external_bits` into the second,
/// so a pair of activity bits whose rows share one column but differ in the
/// other (e.g. `0x000020` and `0x140000`) still contributes two distinct
/// bits on the column where they differ.
pub fn activity_mask_to_channels(activity_mask: u32) -> (u32, Channels, usize) {
    let mut channel_mask: u32 = 0;
    let mut external = Channels::empty();
    for entry in ACTIVITY_MAP {
        if entry.activity_mask & activity_mask != 0 {
            channel_mask |= entry.channel_mask;
            external |= Channels::from_bits_truncate(entry.external_bits);
        }
    }
    let count = channel_mask.count_ones() as usize;
    (channel_mask, external, count)
}
