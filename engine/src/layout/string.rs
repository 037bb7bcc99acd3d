//! Dynamic string view: `[u32 length][utf-8 bytes]` in a single heap region.

use crate::alloc::{AllocError, Allocator, Ptr};

use super::error::LayoutError;

const LENGTH_FIELD_SIZE: usize = 4;

/// A view over a dynamic string control block (a single pool pointer).
/// An empty string holds a null pointer rather than an allocated
/// zero-length region.
pub struct StringView<'a> {
    alloc: &'a mut Allocator,
    control: &'a mut u32,
}

impl<'a> StringView<'a> {
    /// Bind a view to `control`, the pointer field stored in the owning
    /// struct. Fails if `control` is non-null but misaligned.
    pub fn new(alloc: &'a mut Allocator, control: &'a mut u32) -> Result<Self, LayoutError> {
        if *control != 0 && (*control as usize) % crate::alloc::ALIGN_SIZE != 0 {
            return Err(LayoutError::Misaligned {
                offset: *control as usize,
                alignment: crate::alloc::ALIGN_SIZE,
            });
        }
        Ok(Self { alloc, control })
    }

    /// Read the string out of the pool. Returns an empty string for a null
    /// control pointer.
    pub fn read(&self) -> String {
        let ptr = Ptr::new(*self.control);
        if ptr.is_null() {
            return String::new();
        }
        let len = self.alloc.read_u32(ptr, 0) as usize;
        let bytes = self.alloc.read_bytes(ptr, LENGTH_FIELD_SIZE + len);
        String::from_utf8_lossy(&bytes[LENGTH_FIELD_SIZE..]).into_owned()
    }

    /// Write `s`, reallocating the backing region to fit. Writing an empty
    /// string frees any existing allocation and resets the control pointer
    /// to null.
    pub fn write(&mut self, owner: u32, s: &str) -> Result<(), AllocError> {
        let old_ptr = Ptr::new(*self.control);
        if s.is_empty() {
            self.alloc.free(old_ptr);
            *self.control = 0;
            return Ok(());
        }
        let needed = LENGTH_FIELD_SIZE + s.len();
        let new_ptr = if old_ptr.is_null() {
            self.alloc.allocate(needed, owner, None)?
        } else {
            self.alloc.reallocate(old_ptr, needed, owner, None)?
        };
        self.alloc.write_u32(new_ptr, 0, s.len() as u32);
        self.alloc.write_bytes(Ptr::offset_by(new_ptr, LENGTH_FIELD_SIZE), s.as_bytes());
        *self.control = new_ptr.raw();
        Ok(())
    }

    /// Release the backing allocation, resetting the control pointer to null.
    pub fn free(&mut self) {
        self.alloc.free(Ptr::new(*self.control));
        *self.control = 0;
    }

    /// Deep-copy `src`'s contents into `self`, reallocating from `self`'s
    /// allocator.
    pub fn copy_from(&mut self, owner: u32, src: &StringView) -> Result<(), AllocError> {
        self.write(owner, &src.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut alloc = Allocator::new(4096);
        let mut control = 0u32;
        let mut view = StringView::new(&mut alloc, &mut control).unwrap();

        view.write(0, "hello, world").unwrap();
        assert_eq!(view.read(), "hello, world");
    }

    #[test]
    fn empty_string_uses_null_pointer() {
        let mut alloc = Allocator::new(4096);
        let mut control = 0u32;
        let mut view = StringView::new(&mut alloc, &mut control).unwrap();

        view.write(0, "non-empty").unwrap();
        assert_ne!(control, 0);
        view.write(0, "").unwrap();
        assert_eq!(control, 0);
        assert_eq!(view.read(), "");
    }

    #[test]
    fn rewriting_shorter_string_shrinks_in_place_or_reallocates() {
        let mut alloc = Allocator::new(4096);
        let mut control = 0u32;
        let mut view = StringView::new(&mut alloc, &mut control).unwrap();

        view.write(0, "a longer initial string").unwrap();
        view.write(0, "short").unwrap();
        assert_eq!(view.read(), "short");
    }

    #[test]
    fn misaligned_control_pointer_is_rejected() {
        let mut alloc = Allocator::new(4096);
        let mut control = 3u32;
        let result = StringView::new(&mut alloc, &mut control);
        assert!(matches!(result, Err(LayoutError::Misaligned { .. })));
    }
}
