//! Pick results and the pick-id codec.
//!
//! A pick id squeezes a 56-bit entity uid and an 8-bit entity type into the two
//! 32-bit channels of the ID buffer:
//!
//! - low word: `uid & 0xFFFF_FFFF`
//! - high word: `((uid >> 32) & 0x00FF_FFFF) | (type << 24)`
//!
//! The all-zero pixel is the background. Document uids start at 1 (see
//! [`crate::uid::UidGenerator`]), so a real entity never encodes to zero.

use crate::entity::RenderEntityType;

/// Identifier of a document entity.
pub type EntityUid = u64;

/// Bits of an [`EntityUid`] that survive a trip through the pick buffer.
pub const UID_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Result of a pick: the unit of selection and hover.
///
/// Equality and hashing cover the `(uid, entity_type)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PickResult {
    /// The entity uid (56 significant bits).
    pub uid: EntityUid,
    /// The entity type.
    pub entity_type: RenderEntityType,
}

/// Key identifying the entity that owns a draw range.
pub type EntityKey = PickResult;

impl PickResult {
    /// The "nothing" sentinel: uid 0, type `None`.
    pub const NONE: PickResult = PickResult {
        uid: 0,
        entity_type: RenderEntityType::None,
    };

    /// Creates a new pick result.
    #[must_use]
    pub const fn new(uid: EntityUid, entity_type: RenderEntityType) -> Self {
        Self { uid, entity_type }
    }

    /// Returns true if this names a real entity.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.uid != 0 && self.entity_type != RenderEntityType::None
    }

    /// Packs this result into its 64-bit pick id.
    #[must_use]
    pub fn pick_id(&self) -> u64 {
        encode_pick_id(self.uid, self.entity_type)
    }

    /// Packs this result into the two words written to the ID buffer.
    #[must_use]
    pub fn pick_words(&self) -> [u32; 2] {
        pack_pick_id(self.uid, self.entity_type)
    }
}

/// Packs `(uid, type)` into `[low, high]` ID-buffer words.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn pack_pick_id(uid: EntityUid, entity_type: RenderEntityType) -> [u32; 2] {
    let low = (uid & 0xFFFF_FFFF) as u32;
    let high = ((uid >> 32) & 0x00FF_FFFF) as u32 | ((entity_type.as_u8() as u32) << 24);
    [low, high]
}

/// Unpacks ID-buffer words into a pick result.
///
/// Type bytes outside the enum decode to `None`; callers check
/// [`PickResult::is_hit`] before using the result.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn unpack_pick_id(low: u32, high: u32) -> PickResult {
    let uid = (low as u64) | (((high & 0x00FF_FFFF) as u64) << 32);
    let entity_type = RenderEntityType::from_u8((high >> 24) as u8);
    PickResult { uid, entity_type }
}

/// Packs `(uid, type)` into a single 64-bit pick id (`high << 32 | low`).
#[must_use]
pub const fn encode_pick_id(uid: EntityUid, entity_type: RenderEntityType) -> u64 {
    let [low, high] = pack_pick_id(uid, entity_type);
    ((high as u64) << 32) | low as u64
}

/// Unpacks a 64-bit pick id.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn decode_pick_id(pick_id: u64) -> PickResult {
    unpack_pick_id(pick_id as u32, (pick_id >> 32) as u32)
}

/// Decodes an ID-buffer pixel, mapping background and malformed ids to `None`.
#[must_use]
pub fn decode_hit(pick_id: u64) -> Option<PickResult> {
    if pick_id == 0 {
        return None;
    }
    let result = decode_pick_id(pick_id);
    result.is_hit().then_some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_word_layout() {
        let uid = 0x00AB_CDEF_1234_5678;
        let [low, high] = pack_pick_id(uid, RenderEntityType::Face);
        assert_eq!(low, 0x1234_5678);
        assert_eq!(high, 0x03AB_CDEF);
    }

    #[test]
    fn test_uid_is_truncated_to_56_bits() {
        let uid = 0xFF00_0000_0000_0001;
        let decoded = decode_pick_id(encode_pick_id(uid, RenderEntityType::Edge));
        assert_eq!(decoded.uid, 1);
        assert_eq!(decoded.entity_type, RenderEntityType::Edge);
    }

    #[test]
    fn test_background_decodes_to_no_hit() {
        assert_eq!(decode_hit(0), None);
        assert_eq!(decode_hit(encode_pick_id(0, RenderEntityType::None)), None);
        assert!(!decode_pick_id(0).is_hit());
        assert!(!PickResult::default().is_hit());
        assert_eq!(PickResult::default(), PickResult::NONE);
    }

    #[test]
    fn test_invalid_type_byte_is_not_a_hit() {
        let id = (u64::from(200_u32 << 24) << 32) | 7;
        let result = decode_pick_id(id);
        assert_eq!(result.uid, 7);
        assert_eq!(result.entity_type, RenderEntityType::None);
        assert_eq!(decode_hit(id), None);
    }

    #[test]
    fn test_real_entity_never_encodes_to_zero() {
        for t in RenderEntityType::ALL {
            assert_ne!(encode_pick_id(1, t), 0);
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip(uid in 0..=UID_MASK, type_index in 0usize..RenderEntityType::ALL.len()) {
            let entity_type = RenderEntityType::ALL[type_index];
            let [low, high] = pack_pick_id(uid, entity_type);
            prop_assert_eq!(unpack_pick_id(low, high), PickResult::new(uid, entity_type));
            prop_assert_eq!(decode_pick_id(encode_pick_id(uid, entity_type)), PickResult::new(uid, entity_type));
        }

        #[test]
        fn prop_roundtrip_masks_high_byte(uid in any::<u64>(), type_byte in 0u8..=16) {
            let entity_type = RenderEntityType::from_u8(type_byte);
            let decoded = decode_pick_id(encode_pick_id(uid, entity_type));
            prop_assert_eq!(decoded.uid, uid & UID_MASK);
            prop_assert_eq!(decoded.entity_type, entity_type);
        }
    }
}
