//! Hash map / hash set view: a chained table over a separately-allocated
//! bucket array, with individually-allocated entry nodes
//! `[next_in_bucket_ptr][key][value]`. Rehashing on load factor ≥ 0.75
//! doubles the bucket count and re-threads existing entry nodes without
//! reallocating them.

use crate::alloc::{AllocError, Allocator, Ptr};

use super::error::LayoutError;

const REHASH_LOAD_FACTOR_NUM: usize = 3;
const REHASH_LOAD_FACTOR_DEN: usize = 4;
const INITIAL_BUCKET_COUNT: usize = 8; // 2^3, keeps the "2^k buckets" invariant
const NEXT_FIELD_SIZE: usize = 4;

/// FNV-1a over raw key bytes — the "documented integer hash" for keys that
/// are not themselves structured (those instead provide their own digest
/// ahead of the call, hashed the same way).
fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// A view over a chained hash table. `value_size == 0` makes this a hash
/// set (entries store only a key).
pub struct HashTableView<'a> {
    alloc: &'a mut Allocator,
    control: &'a mut u32,
    key_size: usize,
    value_size: usize,
}

impl<'a> HashTableView<'a> {
    pub fn new(alloc: &'a mut Allocator, control: &'a mut u32, key_size: usize, value_size: usize) -> Result<Self, LayoutError> {
        if *control != 0 && (*control as usize) % crate::alloc::ALIGN_SIZE != 0 {
            return Err(LayoutError::Misaligned {
                offset: *control as usize,
                alignment: crate::alloc::ALIGN_SIZE,
            });
        }
        Ok(Self { alloc, control, key_size, value_size })
    }

    fn table_ptr(&self) -> Ptr {
        Ptr::new(*self.control)
    }

    fn bucket_count(&self) -> usize {
        let ptr = self.table_ptr();
        if ptr.is_null() { 0 } else { self.alloc.read_u32(ptr, 0) as usize }
    }

    fn entry_count(&self) -> usize {
        let ptr = self.table_ptr();
        if ptr.is_null() { 0 } else { self.alloc.read_u32(ptr, 4) as usize }
    }

    fn bucket_head(&self, bucket: usize) -> Ptr {
        let ptr = self.table_ptr();
        Ptr::new(self.alloc.read_u32(ptr, 8 + bucket * 4))
    }

    fn set_bucket_head(&mut self, bucket: usize, head: Ptr) {
        let ptr = self.table_ptr();
        self.alloc.write_u32(ptr, 8 + bucket * 4, head.raw());
    }

    fn entry_size(&self) -> usize {
        NEXT_FIELD_SIZE + self.key_size + self.value_size
    }

    fn entry_next(&self, entry: Ptr) -> Ptr {
        Ptr::new(self.alloc.read_u32(entry, 0))
    }

    fn entry_key<'b>(&'b self, entry: Ptr) -> &'b [u8] {
        &self.alloc.read_bytes(entry, self.entry_size())[NEXT_FIELD_SIZE..NEXT_FIELD_SIZE + self.key_size]
    }

    fn entry_value<'b>(&'b self, entry: Ptr) -> &'b [u8] {
        let start = NEXT_FIELD_SIZE + self.key_size;
        &self.alloc.read_bytes(entry, self.entry_size())[start..start + self.value_size]
    }

    pub fn len(&self) -> usize {
        self.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_table(&mut self, owner: u32) -> Result<(), AllocError> {
        if !self.table_ptr().is_null() {
            return Ok(());
        }
        let needed = 8 + INITIAL_BUCKET_COUNT * 4;
        let ptr = self.alloc.allocate(needed, owner, None)?;
        self.alloc.write_u32(ptr, 0, INITIAL_BUCKET_COUNT as u32);
        self.alloc.write_u32(ptr, 4, 0);
        for b in 0..INITIAL_BUCKET_COUNT {
            self.alloc.write_u32(ptr, 8 + b * 4, 0);
        }
        *self.control = ptr.raw();
        Ok(())
    }

    fn find_entry(&self, key: &[u8]) -> Option<Ptr> {
        if self.table_ptr().is_null() {
            return None;
        }
        let bucket = (hash_bytes(key) as usize) % self.bucket_count();
        let mut entry = self.bucket_head(bucket);
        while !entry.is_null() {
            if self.entry_key(entry) == key {
                return Some(entry);
            }
            entry = self.entry_next(entry);
        }
        None
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let entry = self.find_entry(key)?;
        Some(self.entry_value(entry))
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find_entry(key).is_some()
    }

    /// Insert or overwrite `key -> value`, rehashing first if the load
    /// factor would exceed 3/4.
    pub fn set(&mut self, owner: u32, key: &[u8], value: &[u8]) -> Result<(), AllocError> {
        debug_assert_eq!(key.len(), self.key_size);
        debug_assert_eq!(value.len(), self.value_size);
        self.ensure_table(owner)?;

        if let Some(entry) = self.find_entry(key) {
            let start = NEXT_FIELD_SIZE + self.key_size;
            self.alloc.write_bytes(Ptr::offset_by(entry, start), value);
            return Ok(());
        }

        if (self.entry_count() + 1) * REHASH_LOAD_FACTOR_DEN >= self.bucket_count() * REHASH_LOAD_FACTOR_NUM {
            self.rehash(owner, self.bucket_count() * 2)?;
        }

        let entry_size = self.entry_size();
        let entry = self.alloc.allocate(entry_size, owner, Some(self.table_ptr()))?;
        let bucket = (hash_bytes(key) as usize) % self.bucket_count();
        let head = self.bucket_head(bucket);
        self.alloc.write_u32(entry, 0, head.raw());
        self.alloc.write_bytes(Ptr::offset_by(entry, NEXT_FIELD_SIZE), key);
        self.alloc.write_bytes(Ptr::offset_by(entry, NEXT_FIELD_SIZE + self.key_size), value);
        self.set_bucket_head(bucket, entry);

        let table = self.table_ptr();
        let count = self.entry_count();
        self.alloc.write_u32(table, 4, (count + 1) as u32);
        Ok(())
    }

    /// Remove `key`, unlinking its node from its bucket's chain without
    /// freeing other nodes.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        if self.table_ptr().is_null() {
            return false;
        }
        let bucket = (hash_bytes(key) as usize) % self.bucket_count();
        let mut prev: Option<Ptr> = None;
        let mut entry = self.bucket_head(bucket);
        while !entry.is_null() {
            let next = self.entry_next(entry);
            if self.entry_key(entry) == key {
                match prev {
                    Some(p) => self.alloc.write_u32(p, 0, next.raw()),
                    None => self.set_bucket_head(bucket, next),
                }
                self.alloc.free(entry);
                let table = self.table_ptr();
                let count = self.entry_count();
                self.alloc.write_u32(table, 4, (count - 1) as u32);
                return true;
            }
            prev = Some(entry);
            entry = next;
        }
        false
    }

    /// Reuse existing entry nodes while doubling the bucket count: re-thread
    /// each node into the new, larger bucket array instead of reallocating.
    fn rehash(&mut self, owner: u32, new_bucket_count: usize) -> Result<(), AllocError> {
        let old_bucket_count = self.bucket_count();
        let mut nodes = Vec::new();
        for b in 0..old_bucket_count {
            let mut entry = self.bucket_head(b);
            while !entry.is_null() {
                let next = self.entry_next(entry);
                nodes.push(entry);
                entry = next;
            }
        }

        let needed = 8 + new_bucket_count * 4;
        let new_table = self.alloc.allocate(needed, owner, None)?;
        self.alloc.write_u32(new_table, 0, new_bucket_count as u32);
        self.alloc.write_u32(new_table, 4, self.entry_count() as u32);
        for b in 0..new_bucket_count {
            self.alloc.write_u32(new_table, 8 + b * 4, 0);
        }

        let old_table = self.table_ptr();
        *self.control = new_table.raw();

        for entry in nodes {
            let key = self.entry_key(entry).to_vec();
            let bucket = (hash_bytes(&key) as usize) % new_bucket_count;
            let head = self.bucket_head(bucket);
            self.alloc.write_u32(entry, 0, head.raw());
            self.set_bucket_head(bucket, entry);
            // Entry nodes are reparented onto the new table so that freeing
            // the old table does not cascade-free the nodes we just reused.
            self.alloc.reparent(entry, Some(new_table));
        }

        self.alloc.free(old_table);
        Ok(())
    }

    /// Iterate `(key, value)` pairs; order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        let bucket_count = self.bucket_count();
        (0..bucket_count).flat_map(move |b| {
            let mut entries = Vec::new();
            let mut entry = self.bucket_head(b);
            while !entry.is_null() {
                entries.push(entry);
                entry = self.entry_next(entry);
            }
            entries.into_iter().map(move |e| (self.entry_key(e), self.entry_value(e)))
        })
    }

    pub fn free(&mut self) {
        self.alloc.free(self.table_ptr());
        *self.control = 0;
    }
}
