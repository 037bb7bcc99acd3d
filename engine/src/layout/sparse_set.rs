//! Sparse set of `u32`: a dense, insertion-ordered array paired with a
//! value → dense-index map, giving O(1) contains/insert/remove via
//! swap-and-pop.
//!
//! The dense array is pool-backed (it is the part whose order and contents
//! are a testable property); the sparse index map is plain process memory,
//! since it is never itself serialized as component data — only `dense`'s
//! layout is part of a schema's binary contract.

use std::collections::HashMap;

use crate::alloc::{AllocError, Allocator};

use super::array::ArrayView;
use super::error::LayoutError;

pub struct SparseSetView<'a> {
    dense: ArrayView<'a>,
    sparse: &'a mut HashMap<u32, u32>,
}

impl<'a> SparseSetView<'a> {
    pub fn new(alloc: &'a mut Allocator, control: &'a mut u32, sparse: &'a mut HashMap<u32, u32>) -> Result<Self, LayoutError> {
        Ok(Self { dense: ArrayView::new(alloc, control, 4)?, sparse })
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn contains(&self, value: u32) -> bool {
        self.sparse.contains_key(&value)
    }

    /// Insert `value`, appending to the dense array. No-op if already present.
    pub fn insert(&mut self, owner: u32, value: u32) -> Result<(), AllocError> {
        if self.sparse.contains_key(&value) {
            return Ok(());
        }
        let index = self.dense.len() as u32;
        self.dense.push(owner, &value.to_le_bytes())?;
        self.sparse.insert(value, index);
        Ok(())
    }

    /// Remove `value` via swap-and-pop with the last dense element.
    pub fn remove(&mut self, value: u32) -> bool {
        let Some(index) = self.sparse.remove(&value) else {
            return false;
        };
        let last_index = self.dense.len() as u32 - 1;
        if index != last_index {
            let last_value = u32::from_le_bytes(self.dense.get(last_index as usize).unwrap().try_into().unwrap());
            self.dense.set(index as usize, &last_value.to_le_bytes());
            self.sparse.insert(last_value, index);
        }
        self.dense.pop();
        true
    }

    /// Iterate the dense array in its current (insertion-modulo-swap) order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.dense.iter().map(|b| u32::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn free(&mut self) {
        self.dense.free(|_, _| {});
        self.sparse.clear();
    }
}
