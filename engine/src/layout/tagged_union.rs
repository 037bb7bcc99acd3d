//! Tagged union view: `[u8 tag][padding to max-variant-alignment][variant payload]`.
//!
//! Unlike the pool-backed collection views, a union's bytes live inline in
//! its containing struct; only a variant that itself contains dynamic data
//! (e.g. a string) needs the allocator, to free/reallocate that data when
//! the variant changes.
//!
//! The allocator does not zero fresh memory, so the tag byte can't use a
//! variant's own index 0 to mean "nothing written yet" - storage reads
//! whatever garbage the pool handed back. Instead the stored byte is the
//! real tag plus one, with `0` reserved as the uninitialized sentinel; a
//! union therefore supports at most 255 variants.

use crate::alloc::Allocator;

use super::error::LayoutError;

const TAG_FIELD_SIZE: usize = 1;
const UNINIT_TAG: u8 = 0;

/// A view over an inline tagged-union region. `payload_offset` is
/// `align_up(1, max_variant_alignment)`; `variant_sizes[tag]` is that
/// variant's payload size.
pub struct TaggedUnionView<'a> {
    bytes: &'a mut [u8],
    payload_offset: usize,
    variant_sizes: &'a [usize],
}

impl<'a> TaggedUnionView<'a> {
    pub fn new(bytes: &'a mut [u8], payload_offset: usize, variant_sizes: &'a [usize]) -> Self {
        Self { bytes, payload_offset, variant_sizes }
    }

    /// Stamp a freshly carved union slot as uninitialized. The allocator does
    /// not zero new memory, so whoever carves out a union's backing bytes
    /// (e.g. a struct schema laying out a new instance) must call this once
    /// before the first [`write_variant`](Self::write_variant), or the tag
    /// byte may accidentally read back as a spurious initialized variant.
    pub fn mark_uninitialized(bytes: &mut [u8]) {
        bytes[0] = UNINIT_TAG;
    }

    fn raw_tag(&self) -> u8 {
        self.bytes[0]
    }

    /// Whether `write_variant` has ever been called on this storage. Fresh,
    /// never-written storage reads as uninitialized regardless of the
    /// garbage byte the allocator handed back.
    pub fn is_initialized(&self) -> bool {
        self.raw_tag() != UNINIT_TAG
    }

    pub fn tag(&self) -> u32 {
        self.raw_tag().wrapping_sub(1) as u32
    }

    /// Borrow the current variant's payload bytes, validating the stored
    /// tag against the known variant set.
    pub fn payload(&self) -> Result<&[u8], LayoutError> {
        let tag = self.tag();
        let size = *self.variant_sizes.get(tag as usize).ok_or(LayoutError::InvalidTag {
            tag,
            variant_count: self.variant_sizes.len() as u32,
        })?;
        Ok(&self.bytes[self.payload_offset..self.payload_offset + size])
    }

    /// Switch to `new_tag` with `payload`, first invoking `free_old` with
    /// the current tag and payload bytes so dynamic data in the outgoing
    /// variant is released before it is overwritten.
    pub fn write_variant(
        &mut self,
        alloc: &mut Allocator,
        new_tag: u32,
        payload: &[u8],
        free_old: impl FnOnce(&mut Allocator, u32, &[u8]),
    ) -> Result<(), LayoutError> {
        let new_size = *self.variant_sizes.get(new_tag as usize).ok_or(LayoutError::InvalidTag {
            tag: new_tag,
            variant_count: self.variant_sizes.len() as u32,
        })?;
        debug_assert_eq!(payload.len(), new_size);

        if self.is_initialized() {
            let old_tag = self.tag();
            if let Some(&old_size) = self.variant_sizes.get(old_tag as usize) {
                let old_payload = self.bytes[self.payload_offset..self.payload_offset + old_size].to_vec();
                free_old(alloc, old_tag, &old_payload);
            }
        }

        self.bytes[0] = new_tag as u8 + 1;
        let max_payload = self.bytes.len() - self.payload_offset;
        self.bytes[self.payload_offset..].fill(0);
        self.bytes[self.payload_offset..self.payload_offset + new_size.min(max_payload)].copy_from_slice(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Allocator;

    #[test]
    fn switching_variant_updates_tag_and_payload() {
        let mut alloc = Allocator::new(256);
        let variant_sizes = [4usize, 8usize];
        let mut storage = vec![0u8; 1 + 8];

        let mut view = TaggedUnionView::new(&mut storage, 1, &variant_sizes);
        view.write_variant(&mut alloc, 0, &11u32.to_le_bytes(), |_, _, _| {}).unwrap();
        assert_eq!(view.tag(), 0);
        assert_eq!(u32::from_le_bytes(view.payload().unwrap().try_into().unwrap()), 11);

        view.write_variant(&mut alloc, 1, &99u64.to_le_bytes(), |_, _, _| {}).unwrap();
        assert_eq!(view.tag(), 1);
        assert_eq!(u64::from_le_bytes(view.payload().unwrap().try_into().unwrap()), 99);
    }

    #[test]
    fn switching_variant_frees_old_dynamic_data() {
        let mut alloc = Allocator::new(256);
        let variant_sizes = [4usize, 4usize];
        let mut storage = vec![0u8; 1 + 4];
        let mut freed_tags = Vec::new();

        let mut view = TaggedUnionView::new(&mut storage, 1, &variant_sizes);
        view.write_variant(&mut alloc, 0, &1u32.to_le_bytes(), |_, tag, _| freed_tags.push(tag)).unwrap();
        view.write_variant(&mut alloc, 1, &2u32.to_le_bytes(), |_, tag, _| freed_tags.push(tag)).unwrap();

        assert_eq!(freed_tags, vec![0]);
    }

    #[test]
    fn first_write_over_marked_storage_does_not_free() {
        let mut alloc = Allocator::new(256);
        let variant_sizes = [4usize, 4usize];
        let mut storage = vec![0xAAu8; 1 + 4];
        TaggedUnionView::mark_uninitialized(&mut storage);
        let mut freed_tags = Vec::new();

        let mut view = TaggedUnionView::new(&mut storage, 1, &variant_sizes);
        view.write_variant(&mut alloc, 0, &1u32.to_le_bytes(), |_, tag, _| freed_tags.push(tag)).unwrap();

        assert!(freed_tags.is_empty());
    }

    #[test]
    fn unknown_tag_read_fails() {
        let variant_sizes = [4usize];
        let mut storage = vec![5u8, 0, 0, 0, 0];
        let view = TaggedUnionView::new(&mut storage, 1, &variant_sizes);
        assert!(matches!(view.payload(), Err(LayoutError::InvalidTag { .. })));
    }
}
