//! Stream descriptor: the summary of a sync frame's default audio program,
//! assembled for the container demuxer that owns `Parser`.
//!
//! Modeled on a "decoded stream summary" struct and its `Display` impl, and
//! grounded on the reference decoder's
//! `DTSUHDDescriptorInfo`/`update_descriptor`/`find_default_audio`/
//! `extract_object_info` (`dtsuhd_common.c`, Table 7-28).

use std::fmt;

use crate::channels::{self, Channels};
use crate::md01::Md01;
use crate::object::MDObject;

/// Stream information produced from a sync frame, mirroring
/// `DTSUHDDescriptorInfo`.
#[derive(Clone, Debug, Default)]
pub struct Descriptor {
    pub coding_name: [u8; 5],
    pub base_sample_freq_code: bool,
    pub channel_count: usize,
    pub decoder_profile_code: u32,
    pub frame_duration_code: u32,
    pub max_payload_code: u32,
    pub num_pres_code: u32,
    pub rep_type: u32,
    pub sample_rate: u32,
    pub sample_rate_mod: u32,
    pub sample_size: u32,
    /// ETSI TS 103 491 numbering (Table 7-28's `channel_mask` column).
    /// `channel_count` is this mask's popcount.
    pub channel_mask: u32,
    /// Target-ecosystem numbering (Table 7-28's `ffmpeg_channel_mask`
    /// column), carried alongside `channel_mask` rather than derived from
    /// it since the two columns are independent bit layouts.
    pub external_channel_mask: Channels,
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = String::from_utf8_lossy(&self.coding_name[..4]);
        writeln!(f, "| Coding Name:           {}", name)?;
        writeln!(f, "| Sample Rate:           {}", self.sample_rate)?;
        writeln!(f, "| Channel(s):            {}", self.channel_count)?;
        writeln!(f, "| Channel Mask:          {:#034b}", self.channel_mask)?;
        writeln!(f, "| External Channel Mask: {}", self.external_channel_mask)?;
        Ok(())
    }
}

/// Table 7-4/7-18: scan MD01s in insertion order; within each, the object
/// with the smallest `pres_index` among started, selectable objects wins;
/// ties broken by smallest object id, since slots are walked in id order.
pub fn find_default_audio<'a>(
    md01s: &'a [Md01],
    selectable: &[bool; 256],
) -> Option<&'a MDObject> {
    for md01 in md01s {
        let mut best: Option<(usize, usize)> = None; // (pres_index, object_id)
        for id in 0..257 {
            let object = md01.object(id);
            if object.started && selectable[object.pres_index] {
                match best {
                    Some((best_pres, _)) if object.pres_index >= best_pres => {}
                    _ => best = Some((object.pres_index, id)),
                }
            }
        }
        if let Some((_, id)) = best {
            return Some(md01.object(id));
        }
    }
    None
}

/// Table 6-12/6-17: assembles the descriptor for a sync frame's default
/// audio program.
#[allow(clippy::too_many_arguments)]
pub fn build(
    major_version: u32,
    sample_rate: u32,
    sample_rate_mod: u32,
    frame_duration_code: u32,
    num_audio_pres: usize,
    md01s: &[Md01],
    selectable: &[bool; 256],
) -> Descriptor {
    let mut descriptor = Descriptor::default();

    let coding_name: &[u8; 5] = if major_version > 2 { b"dtsy\0" } else { b"dtsx\0" };
    descriptor.coding_name = *coding_name;
    descriptor.base_sample_freq_code = sample_rate == 48000;
    descriptor.decoder_profile_code = major_version - 2;
    descriptor.frame_duration_code = frame_duration_code;
    descriptor.max_payload_code = (major_version > 2) as u32;
    descriptor.num_pres_code = num_audio_pres as u32 - 1;
    descriptor.sample_rate = sample_rate;
    descriptor.sample_rate_mod = sample_rate_mod;
    descriptor.sample_size = 16;

    if let Some(object) = find_default_audio(md01s, selectable) {
        let (channel_mask, external_channel_mask, channel_count) =
            channels::activity_mask_to_channels(object.ch_activity_mask);
        descriptor.channel_mask = channel_mask;
        descriptor.external_channel_mask = external_channel_mask;
        descriptor.channel_count = channel_count;
        descriptor.rep_type = object.rep_type.map(rep_type_code).unwrap_or(0);
    }

    descriptor
}

fn rep_type_code(rep_type: crate::object::RepType) -> u32 {
    use crate::object::RepType::*;
    match rep_type {
        ChannelMaskBased => 0,
        Matrix2dChannelMaskBased => 1,
        Matrix3dChannelMaskBased => 2,
        Binaural => 3,
        Ambisonic => 4,
        AudioTracks => 5,
        Object3dSingleSourcePerWaveform => 6,
        Object3dMonoSingleSourcePerWaveform => 7,
    }
}
