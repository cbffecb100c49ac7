//! Per-object metadata state tracked inside an MD01 chunk.
//!
//! Grounded on the reference decoder's `MDObject`/`enum RepType`
//! (`dtsuhd_common.c`). An object is addressed by an id in `0..=256`
//! (256 is the full-channel-mix sentinel object), and accumulates state
//! across frames until the next sync frame resets it.

/// How an object's channel activity mask should be interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepType {
    ChannelMaskBased,
    Matrix2dChannelMaskBased,
    Matrix3dChannelMaskBased,
    Binaural,
    Ambisonic,
    AudioTracks,
    Object3dSingleSourcePerWaveform,
    Object3dMonoSingleSourcePerWaveform,
}

impl RepType {
    /// Decodes the 3-bit representation-type field (Table 7-22).
    pub fn from_code(code: u32) -> Option<RepType> {
        match code {
            0 => Some(RepType::ChannelMaskBased),
            1 => Some(RepType::Matrix2dChannelMaskBased),
            2 => Some(RepType::Matrix3dChannelMaskBased),
            3 => Some(RepType::Binaural),
            4 => Some(RepType::Ambisonic),
            5 => Some(RepType::AudioTracks),
            6 => Some(RepType::Object3dSingleSourcePerWaveform),
            7 => Some(RepType::Object3dMonoSingleSourcePerWaveform),
            _ => None,
        }
    }

    /// True for the four representation types that carry a channel-activity
    /// mask directly (Table 7-22's `ch_mask_object_flag`).
    pub fn is_channel_mask_based(self) -> bool {
        matches!(
            self,
            RepType::ChannelMaskBased
                | RepType::Matrix2dChannelMaskBased
                | RepType::Matrix3dChannelMaskBased
                | RepType::Binaural
        )
    }

    /// True for the two 3D representation types (Table 7-22's
    /// `object_3d_metadata_flag`).
    pub fn is_3d_object(self) -> bool {
        matches!(
            self,
            RepType::Object3dSingleSourcePerWaveform | RepType::Object3dMonoSingleSourcePerWaveform
        )
    }
}

/// Per-object state tracked inside one MD01 chunk; object id `256` is the
/// full-channel-mix sentinel object.
#[derive(Copy, Clone, Debug, Default)]
pub struct MDObject {
    /// Seen since the last sync-frame reset.
    pub started: bool,
    pub pres_index: usize,
    pub rep_type: Option<RepType>,
    pub ch_activity_mask: u32,
}
