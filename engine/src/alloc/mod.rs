//! A TLSF (Two-Level Segregated Fit) allocator over a single contiguous byte
//! pool. Every component and view backing in the engine is ultimately
//! carved out of one of these pools.
//!
//! # Block layout
//!
//! Physical blocks are packed end to end in the pool with no gaps. Each
//! block begins with an 8-byte header:
//!
//! ```text
//! [ prev_phys_block_offset: u32 ][ size_with_flags: u32 ][ payload... ]
//! ```
//!
//! `size_with_flags` packs the payload size in the high bits and two status
//! bits in the low bits: bit 0 is "this block is free", bit 1 is "the
//! physical predecessor is free". A free block additionally stores its
//! free-list links at the start of its payload:
//!
//! ```text
//! [ next_free: u32 ][ prev_free: u32 ]
//! ```
//!
//! `u32::MAX` is used as the "no link" sentinel for both physical and free
//! links, since header offset `0` is always a valid block (the pool's first
//! block) and payload offset `0` never occurs (every payload sits after an
//! 8-byte header).
//!
//! # Free list indexing
//!
//! Free blocks are indexed by `(fli, sli)` per the classic TLSF mapping:
//! small sizes (`< SMALL_BLOCK_SIZE`) get a single first-level bucket
//! subdivided linearly; larger sizes get one first-level bucket per power
//! of two, subdivided logarithmically into `SL_INDEX_COUNT` bands. Two
//! bitmaps (`fl_bitmap`, `sl_bitmap`) let `find_suitable_block` jump directly
//! to the first non-empty list at or above a given size class.

mod error;

use std::collections::HashMap;

pub use error::AllocError;

/// Payload alignment in bytes. Every user pointer returned by `allocate`
/// addresses memory aligned to this boundary.
pub const ALIGN_SIZE: usize = 8;

/// log2 of the number of second-level buckets per first-level class.
pub const SL_INDEX_COUNT_LOG2: usize = 5;
/// Number of second-level buckets per first-level class.
pub const SL_INDEX_COUNT: usize = 1 << SL_INDEX_COUNT_LOG2;

/// Sizes below this use a single, linearly-subdivided first-level class.
pub const SMALL_BLOCK_SIZE: usize = 256;

/// log2(SMALL_BLOCK_SIZE); the first large-size first-level index offset.
const FL_INDEX_SHIFT: usize = 8;
/// Number of first-level classes, covering payloads up to ~2^32 bytes.
const FL_INDEX_COUNT: usize = 25;

const BLOCK_HEADER_SIZE: usize = 8;
const FREE_BLOCK_LINKS_SIZE: usize = 8;
/// Smallest payload a block can have once split off; must be able to hold
/// the free-list links.
pub const MIN_PHYSICAL_BLOCK_SIZE: usize = FREE_BLOCK_LINKS_SIZE;

const THIS_FREE: u32 = 1 << 0;
const PREV_FREE: u32 = 1 << 1;
const SIZE_MASK: u32 = !(THIS_FREE | PREV_FREE);

const NULL_LINK: u32 = u32::MAX;

const _: () = assert!(ALIGN_SIZE == SMALL_BLOCK_SIZE / SL_INDEX_COUNT);
const _: () = assert!(MIN_PHYSICAL_BLOCK_SIZE % ALIGN_SIZE == 0);
const _: () = assert!(FL_INDEX_COUNT > 0);

/// A user pointer into an allocator's pool: the byte offset of a block's
/// payload. `0` is the reserved null pointer, returned by `allocate` on
/// out-of-memory and accepted (as a no-op) by `free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ptr(u32);

impl Ptr {
    pub const NULL: Ptr = Ptr(0);

    /// Wrap a raw pool offset, as stored in a control block.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Ptr(raw)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn offset(self) -> usize {
        self.0 as usize
    }

    /// The raw offset, suitable for storing back into a control block.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// A pointer `delta` bytes past `ptr`, within the same allocation.
    #[inline]
    pub fn offset_by(ptr: Ptr, delta: usize) -> Ptr {
        Ptr(ptr.0 + delta as u32)
    }
}

/// Information about a single physical block, yielded by `walk_pool`.
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub offset: usize,
    pub payload_size: usize,
    pub is_free: bool,
}

struct AllocMeta {
    owner: u32,
    parent: Option<Ptr>,
    children: Vec<Ptr>,
}

/// A TLSF allocator managing one contiguous byte pool.
pub struct Allocator {
    pool: Vec<u8>,
    fl_bitmap: u32,
    sl_bitmap: [u32; FL_INDEX_COUNT],
    free_lists: [[u32; SL_INDEX_COUNT]; FL_INDEX_COUNT],
    meta: HashMap<Ptr, AllocMeta>,
}

fn floor_log2(size: usize) -> usize {
    debug_assert!(size > 0);
    usize::BITS as usize - 1 - size.leading_zeros() as usize
}

fn align_up(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

/// Classifies an exact block size into its `(fli, sli)` home list.
fn mapping_insert(size: usize) -> (usize, usize) {
    if size < SMALL_BLOCK_SIZE {
        (0, size / (SMALL_BLOCK_SIZE / SL_INDEX_COUNT))
    } else {
        let fl = floor_log2(size);
        let sli = (size >> (fl - SL_INDEX_COUNT_LOG2)) ^ (1 << SL_INDEX_COUNT_LOG2);
        let fli = fl - (FL_INDEX_SHIFT - 1);
        (fli, sli)
    }
}

/// Classifies a requested size, rounding up within its class first so the
/// returned list is guaranteed to contain a block big enough to satisfy it.
fn mapping_search(size: usize) -> (usize, usize) {
    if size >= SMALL_BLOCK_SIZE {
        let fl = floor_log2(size);
        let round = (1usize << (fl - SL_INDEX_COUNT_LOG2)) - 1;
        mapping_insert(size + round)
    } else {
        mapping_insert(size)
    }
}

impl Allocator {
    /// Create a new allocator over a pool of `size` bytes, consisting of a
    /// single free block spanning the whole pool.
    pub fn new(size: usize) -> Self {
        debug_assert!(size <= 1 << 32, "pool size must fit a 32-bit offset space");
        let mut pool = vec![0u8; size];
        let payload = size - BLOCK_HEADER_SIZE;

        let mut allocator = Self {
            pool: Vec::new(),
            fl_bitmap: 0,
            sl_bitmap: [0; FL_INDEX_COUNT],
            free_lists: [[NULL_LINK; SL_INDEX_COUNT]; FL_INDEX_COUNT],
            meta: HashMap::new(),
        };
        write_header(&mut pool, 0, NULL_LINK, payload, true, false);
        allocator.pool = pool;
        allocator.insert_free_block(0, payload);
        allocator
    }

    /// Total pool size in bytes, including all block headers.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Allocate `size` bytes, returning a user pointer aligned to
    /// `ALIGN_SIZE`. `owner` is an opaque caller-defined tag (e.g. a
    /// schema id) recorded for diagnostics; `parent` links this allocation
    /// as a child so that freeing `parent` also frees it.
    pub fn allocate(&mut self, size: usize, owner: u32, parent: Option<Ptr>) -> Result<Ptr, AllocError> {
        if size == 0 {
            return Ok(Ptr::NULL);
        }
        let payload_needed = align_up(size.max(MIN_PHYSICAL_BLOCK_SIZE), ALIGN_SIZE);
        let (fli, sli) = mapping_search(payload_needed);

        let Some((found_fli, found_sli)) = self.find_suitable_block(fli, sli) else {
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: self.total_free(),
            });
        };

        let header_offset = self.free_lists[found_fli][found_sli];
        self.remove_free_block(header_offset, found_fli, found_sli);

        let block_size = read_size(&self.pool, header_offset);
        self.use_block(header_offset, block_size, payload_needed);

        let ptr = Ptr((header_offset + BLOCK_HEADER_SIZE as u32) as u32);
        self.meta.insert(
            ptr,
            AllocMeta {
                owner,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(parent_ptr) = parent
            && let Some(parent_meta) = self.meta.get_mut(&parent_ptr)
        {
            parent_meta.children.push(ptr);
        }
        Ok(ptr)
    }

    /// Free `ptr`, recursively freeing every tracked child allocation first.
    /// Idempotent on the null pointer.
    pub fn free(&mut self, ptr: Ptr) {
        if ptr.is_null() {
            return;
        }
        let children = self
            .meta
            .remove(&ptr)
            .map(|m| m.children)
            .unwrap_or_default();
        for child in children {
            self.free(child);
        }

        let header_offset = ptr.0 - BLOCK_HEADER_SIZE as u32;
        self.release_block(header_offset);
    }

    /// Grow or shrink an existing allocation, preserving its contents up to
    /// `min(old_size, new_size)` and its parent/child relationships.
    pub fn reallocate(
        &mut self,
        ptr: Ptr,
        new_size: usize,
        owner: u32,
        parent: Option<Ptr>,
    ) -> Result<Ptr, AllocError> {
        if ptr.is_null() {
            return self.allocate(new_size, owner, parent);
        }
        let header_offset = ptr.0 - BLOCK_HEADER_SIZE as u32;
        let old_payload = read_size(&self.pool, header_offset);
        let needed = align_up(new_size.max(MIN_PHYSICAL_BLOCK_SIZE), ALIGN_SIZE);

        if needed <= old_payload {
            return Ok(ptr);
        }

        // Try to grow in place by absorbing a free physical successor.
        if let Some(next_offset) = self.next_physical(header_offset, old_payload)
            && is_free(&self.pool, next_offset)
        {
            let next_size = read_size(&self.pool, next_offset);
            if old_payload + BLOCK_HEADER_SIZE + next_size >= needed {
                let (nfli, nsli) = mapping_insert(next_size);
                self.remove_free_block(next_offset, nfli, nsli);
                let combined = old_payload + BLOCK_HEADER_SIZE + next_size;
                self.use_block(header_offset, combined, needed);
                return Ok(ptr);
            }
        }

        // Fall back to allocate + copy + free, then reparent children.
        let new_ptr = self.allocate(new_size, owner, parent)?;
        let copy_len = old_payload.min(needed);
        let (src, dst) = (ptr.offset(), new_ptr.offset());
        self.pool.copy_within(src..src + copy_len, dst);

        if let Some(mut old_meta) = self.meta.remove(&ptr) {
            for child in &old_meta.children {
                if let Some(child_meta) = self.meta.get_mut(child) {
                    child_meta.parent = Some(new_ptr);
                }
            }
            if let Some(new_meta) = self.meta.get_mut(&new_ptr) {
                new_meta.children.append(&mut old_meta.children);
            }
        }
        self.release_block(header_offset);
        Ok(new_ptr)
    }

    /// Borrow `len` bytes of an allocation's payload starting at `ptr`.
    pub fn read_bytes(&self, ptr: Ptr, len: usize) -> &[u8] {
        let start = ptr.offset();
        &self.pool[start..start + len]
    }

    /// Overwrite an allocation's payload starting at `ptr` with `data`.
    /// `data` must fit within the allocation backing `ptr`.
    pub fn write_bytes(&mut self, ptr: Ptr, data: &[u8]) {
        let start = ptr.offset();
        self.pool[start..start + data.len()].copy_from_slice(data);
    }

    /// Read a little-endian `u32` at `byte_offset` within `ptr`'s payload.
    pub fn read_u32(&self, ptr: Ptr, byte_offset: usize) -> u32 {
        let start = ptr.offset() + byte_offset;
        u32::from_le_bytes(self.pool[start..start + 4].try_into().unwrap())
    }

    /// Write a little-endian `u32` at `byte_offset` within `ptr`'s payload.
    pub fn write_u32(&mut self, ptr: Ptr, byte_offset: usize, value: u32) {
        let start = ptr.offset() + byte_offset;
        self.pool[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Size in bytes of the payload backing `ptr`, or `0` for the null pointer.
    pub fn payload_size(&self, ptr: Ptr) -> usize {
        if ptr.is_null() {
            return 0;
        }
        read_size(&self.pool, ptr.0 - BLOCK_HEADER_SIZE as u32)
    }

    /// Move `ptr`'s parent-tracking entry to a new parent, e.g. when a
    /// container is rebuilt (rehashed, resized) and its child allocations
    /// are re-threaded under the replacement rather than copied.
    pub fn reparent(&mut self, ptr: Ptr, new_parent: Option<Ptr>) {
        let old_parent = self.meta.get(&ptr).and_then(|m| m.parent);
        if let Some(old) = old_parent
            && let Some(old_meta) = self.meta.get_mut(&old)
        {
            old_meta.children.retain(|c| *c != ptr);
        }
        if let Some(meta) = self.meta.get_mut(&ptr) {
            meta.parent = new_parent;
        }
        if let Some(new) = new_parent
            && let Some(new_meta) = self.meta.get_mut(&new)
        {
            new_meta.children.push(ptr);
        }
    }

    /// Enumerate every physical block (used and free) in pool order.
    pub fn walk_pool(&self, mut visitor: impl FnMut(BlockInfo)) {
        let mut offset = 0u32;
        while (offset as usize) < self.pool.len() {
            let size = read_size(&self.pool, offset);
            let free = is_free(&self.pool, offset);
            visitor(BlockInfo {
                offset: offset as usize,
                payload_size: size,
                is_free: free,
            });
            offset += (BLOCK_HEADER_SIZE + size) as u32;
        }
    }

    fn total_free(&self) -> usize {
        let mut total = 0;
        self.walk_pool(|b| {
            if b.is_free {
                total += b.payload_size;
            }
        });
        total
    }

    fn next_physical(&self, header_offset: u32, payload_size: usize) -> Option<u32> {
        let next = header_offset as usize + BLOCK_HEADER_SIZE + payload_size;
        if next < self.pool.len() { Some(next as u32) } else { None }
    }

    fn prev_physical(&self, header_offset: u32) -> Option<u32> {
        let prev = read_prev_phys(&self.pool, header_offset);
        if prev == NULL_LINK { None } else { Some(prev) }
    }

    /// Mark a free block (found via the free lists) used, splitting off the
    /// remainder if it is large enough to stand alone.
    fn use_block(&mut self, header_offset: u32, block_payload: usize, needed: usize) {
        let remainder = block_payload.saturating_sub(needed + BLOCK_HEADER_SIZE);
        if remainder >= MIN_PHYSICAL_BLOCK_SIZE {
            write_header(&mut self.pool, header_offset, read_prev_phys(&self.pool, header_offset), needed, false, prev_free_bit(&self.pool, header_offset));
            let split_offset = header_offset + BLOCK_HEADER_SIZE as u32 + needed as u32;
            write_header(&mut self.pool, split_offset, header_offset, remainder, true, false);
            if let Some(next_next) = self.next_physical(split_offset, remainder) {
                set_prev_free(&mut self.pool, next_next, true);
            }
            self.insert_free_block(split_offset, remainder);
        } else {
            write_header(&mut self.pool, header_offset, read_prev_phys(&self.pool, header_offset), block_payload, false, prev_free_bit(&self.pool, header_offset));
        }
        if let Some(next) = self.next_physical(header_offset, read_size(&self.pool, header_offset)) {
            set_prev_free(&mut self.pool, next, false);
        }
    }

    /// Release a used block back to the pool, coalescing with free physical
    /// neighbours before reinserting into the free lists.
    fn release_block(&mut self, header_offset: u32) {
        let mut offset = header_offset;
        let mut size = read_size(&self.pool, offset);

        if prev_free_bit(&self.pool, offset)
            && let Some(prev_offset) = self.prev_physical(offset)
        {
            let prev_size = read_size(&self.pool, prev_offset);
            let (pfli, psli) = mapping_insert(prev_size);
            self.remove_free_block(prev_offset, pfli, psli);
            size += BLOCK_HEADER_SIZE + prev_size;
            offset = prev_offset;
        }

        if let Some(next_offset) = self.next_physical(offset, size)
            && is_free(&self.pool, next_offset)
        {
            let next_size = read_size(&self.pool, next_offset);
            let (nfli, nsli) = mapping_insert(next_size);
            self.remove_free_block(next_offset, nfli, nsli);
            size += BLOCK_HEADER_SIZE + next_size;
        }

        let prev_phys = read_prev_phys(&self.pool, offset);
        write_header(&mut self.pool, offset, prev_phys, size, true, prev_free_bit(&self.pool, offset));
        if let Some(next) = self.next_physical(offset, size) {
            set_prev_free(&mut self.pool, next, true);
        }
        self.insert_free_block(offset, size);
    }

    fn insert_free_block(&mut self, header_offset: u32, payload_size: usize) {
        let (fli, sli) = mapping_insert(payload_size);
        let head = self.free_lists[fli][sli];
        write_free_links(&mut self.pool, header_offset, head, NULL_LINK);
        if head != NULL_LINK {
            write_free_prev(&mut self.pool, head, header_offset);
        }
        self.free_lists[fli][sli] = header_offset;
        self.sl_bitmap[fli] |= 1 << sli;
        self.fl_bitmap |= 1 << fli;
    }

    fn remove_free_block(&mut self, header_offset: u32, fli: usize, sli: usize) {
        let (next, prev) = read_free_links(&self.pool, header_offset);
        if prev != NULL_LINK {
            write_free_next(&mut self.pool, prev, next);
        } else {
            self.free_lists[fli][sli] = next;
        }
        if next != NULL_LINK {
            write_free_prev(&mut self.pool, next, prev);
        }
        if self.free_lists[fli][sli] == NULL_LINK {
            self.sl_bitmap[fli] &= !(1 << sli);
            if self.sl_bitmap[fli] == 0 {
                self.fl_bitmap &= !(1 << fli);
            }
        }
    }

    fn find_suitable_block(&self, fli: usize, sli: usize) -> Option<(usize, usize)> {
        let sl_map = self.sl_bitmap[fli] & (!0u32 << sli);
        if sl_map != 0 {
            return Some((fli, sl_map.trailing_zeros() as usize));
        }
        let fl_map = self.fl_bitmap & (!0u32 << (fli + 1));
        if fl_map == 0 {
            return None;
        }
        let fli2 = fl_map.trailing_zeros() as usize;
        let sli2 = self.sl_bitmap[fli2].trailing_zeros() as usize;
        Some((fli2, sli2))
    }
}

#[inline]
fn read_size(pool: &[u8], header_offset: u32) -> usize {
    let raw = u32::from_le_bytes(pool[header_offset as usize + 4..header_offset as usize + 8].try_into().unwrap());
    (raw & SIZE_MASK) as usize
}

#[inline]
fn is_free(pool: &[u8], header_offset: u32) -> bool {
    let raw = u32::from_le_bytes(pool[header_offset as usize + 4..header_offset as usize + 8].try_into().unwrap());
    raw & THIS_FREE != 0
}

#[inline]
fn prev_free_bit(pool: &[u8], header_offset: u32) -> bool {
    let raw = u32::from_le_bytes(pool[header_offset as usize + 4..header_offset as usize + 8].try_into().unwrap());
    raw & PREV_FREE != 0
}

#[inline]
fn set_prev_free(pool: &mut [u8], header_offset: u32, free: bool) {
    let idx = header_offset as usize + 4;
    let mut raw = u32::from_le_bytes(pool[idx..idx + 4].try_into().unwrap());
    if free {
        raw |= PREV_FREE;
    } else {
        raw &= !PREV_FREE;
    }
    pool[idx..idx + 4].copy_from_slice(&raw.to_le_bytes());
}

#[inline]
fn read_prev_phys(pool: &[u8], header_offset: u32) -> u32 {
    u32::from_le_bytes(pool[header_offset as usize..header_offset as usize + 4].try_into().unwrap())
}

#[inline]
fn write_header(pool: &mut [u8], header_offset: u32, prev_phys: u32, payload_size: usize, free: bool, prev_free: bool) {
    let idx = header_offset as usize;
    pool[idx..idx + 4].copy_from_slice(&prev_phys.to_le_bytes());
    let mut raw = payload_size as u32;
    if free {
        raw |= THIS_FREE;
    }
    if prev_free {
        raw |= PREV_FREE;
    }
    pool[idx + 4..idx + 8].copy_from_slice(&raw.to_le_bytes());
}

#[inline]
fn read_free_links(pool: &[u8], header_offset: u32) -> (u32, u32) {
    let payload = header_offset as usize + BLOCK_HEADER_SIZE;
    let next = u32::from_le_bytes(pool[payload..payload + 4].try_into().unwrap());
    let prev = u32::from_le_bytes(pool[payload + 4..payload + 8].try_into().unwrap());
    (next, prev)
}

#[inline]
fn write_free_links(pool: &mut [u8], header_offset: u32, next: u32, prev: u32) {
    let payload = header_offset as usize + BLOCK_HEADER_SIZE;
    pool[payload..payload + 4].copy_from_slice(&next.to_le_bytes());
    pool[payload + 4..payload + 8].copy_from_slice(&prev.to_le_bytes());
}

#[inline]
fn write_free_next(pool: &mut [u8], header_offset: u32, next: u32) {
    let payload = header_offset as usize + BLOCK_HEADER_SIZE;
    pool[payload..payload + 4].copy_from_slice(&next.to_le_bytes());
}

#[inline]
fn write_free_prev(pool: &mut [u8], header_offset: u32, prev: u32) {
    let payload = header_offset as usize + BLOCK_HEADER_SIZE + 4;
    pool[payload..payload + 4].copy_from_slice(&prev.to_le_bytes());
}
