//! Fixed-size backing storage for tensor payloads

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use bytemuck::Pod;

use super::TensorError;

/// Alignment of pinned buffers. Page alignment keeps a pinned payload from
/// sharing its first page with unrelated heap data when it is page-locked.
pub const PINNED_ALIGNMENT: usize = 4096;

/// Heap buffer that never grows, shrinks, or moves.
///
/// Every `RawBuffer` has a stable address for its whole lifetime. A pinned
/// buffer is additionally page-aligned and, on Unix, page-locked with `mlock`
/// when the process is allowed to; if locking is refused the buffer stays
/// address-stable and [`RawBuffer::is_locked`] reports `false`.
pub struct RawBuffer<T> {
    ptr: NonNull<T>,
    len: usize,
    pinned: bool,
    locked: bool,
    _owns: PhantomData<T>,
}

// The buffer uniquely owns its allocation, like a `Box<[T]>`.
unsafe impl<T: Send> Send for RawBuffer<T> {}
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

impl<T: Pod> RawBuffer<T> {
    /// Allocate `len` zeroed elements
    pub fn zeroed(len: usize, pinned: bool) -> Result<Self, TensorError> {
        // SAFETY: zeroed memory is a valid bit pattern for any `Pod` type.
        unsafe { Self::allocate(len, pinned, true) }
    }

    /// Allocate `len` elements without initializing them.
    ///
    /// # Safety
    ///
    /// The contents are unspecified. Every element must be written before it
    /// is read through [`as_slice`](Self::as_slice) or any view built on it.
    pub unsafe fn uninit(len: usize, pinned: bool) -> Result<Self, TensorError> {
        Self::allocate(len, pinned, false)
    }

    /// Allocate `len` elements, each set to `value`
    pub fn filled(len: usize, value: T, pinned: bool) -> Result<Self, TensorError> {
        // SAFETY: every element is written below before the buffer escapes.
        let buffer = unsafe { Self::allocate(len, pinned, false)? };
        // SAFETY: `ptr` covers `len` elements; writing through `MaybeUninit`
        // never reads the uninitialized contents.
        let slots = unsafe {
            slice::from_raw_parts_mut(buffer.ptr.as_ptr() as *mut MaybeUninit<T>, buffer.len)
        };
        for slot in slots {
            slot.write(value);
        }
        Ok(buffer)
    }

    /// Allocate a buffer holding a copy of `data`
    pub fn from_slice(data: &[T], pinned: bool) -> Result<Self, TensorError> {
        // SAFETY: the copy below initializes all `data.len()` elements.
        let buffer = unsafe { Self::allocate(data.len(), pinned, false)? };
        // SAFETY: both ranges are `data.len()` elements long and the fresh
        // allocation cannot overlap `data`.
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), buffer.ptr.as_ptr(), data.len()) };
        Ok(buffer)
    }

    unsafe fn allocate(len: usize, pinned: bool, zeroed: bool) -> Result<Self, TensorError> {
        let layout = Self::layout(len, pinned)?;

        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
                pinned,
                locked: false,
                _owns: PhantomData,
            });
        }

        let raw = if zeroed {
            alloc::alloc_zeroed(layout)
        } else {
            alloc::alloc(layout)
        };

        let ptr = NonNull::new(raw as *mut T).ok_or(TensorError::AllocationFailed {
            bytes: layout.size(),
        })?;

        let locked = pinned && lock_pages(raw, layout.size());

        tracing::trace!(
            bytes = layout.size(),
            pinned,
            locked,
            "Allocated tensor buffer"
        );

        Ok(Self {
            ptr,
            len,
            pinned,
            locked,
            _owns: PhantomData,
        })
    }

    fn layout(len: usize, pinned: bool) -> Result<Layout, TensorError> {
        let size = mem::size_of::<T>()
            .checked_mul(len)
            .ok_or(TensorError::AllocationFailed { bytes: usize::MAX })?;

        let align = if pinned {
            PINNED_ALIGNMENT.max(mem::align_of::<T>())
        } else {
            mem::align_of::<T>()
        };

        Layout::from_size_align(size, align).map_err(|_| TensorError::AllocationFailed { bytes: size })
    }

    /// Allocate a new buffer with the same contents and pinning
    pub fn try_clone(&self) -> Result<Self, TensorError> {
        Self::from_slice(self.as_slice(), self.pinned)
    }
}

impl<T> RawBuffer<T> {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffer was allocated pinned
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Whether the pages backing this buffer are locked in physical memory
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Start of the buffer; stable for the buffer's lifetime
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Mutable start of the buffer; stable for the buffer's lifetime
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Elements as a slice
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` elements, initialized by every safe
        // constructor and by the caller's contract for `uninit`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Elements as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as for `as_slice`, and `&mut self` guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        let size = mem::size_of::<T>() * self.len;
        if size == 0 {
            return;
        }

        let align = if self.pinned {
            PINNED_ALIGNMENT.max(mem::align_of::<T>())
        } else {
            mem::align_of::<T>()
        };

        if self.locked {
            unlock_pages(self.ptr.as_ptr() as *mut u8, size);
        }

        // SAFETY: this is the layout the allocation was made with; size and
        // alignment were validated by `Layout::from_size_align` at that time.
        unsafe {
            let layout = Layout::from_size_align_unchecked(size, align);
            alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout);
        }
    }
}

impl<T> Deref for RawBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for RawBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len", &self.len)
            .field("pinned", &self.pinned)
            .field("locked", &self.locked)
            .finish()
    }
}

#[cfg(unix)]
fn lock_pages(ptr: *mut u8, bytes: usize) -> bool {
    // SAFETY: the range is a live allocation owned by the caller.
    let rc = unsafe { libc::mlock(ptr as *const libc::c_void, bytes) };
    if rc != 0 {
        tracing::debug!(
            bytes,
            error = %std::io::Error::last_os_error(),
            "Could not page-lock pinned buffer, keeping it address-stable only"
        );
        return false;
    }
    true
}

#[cfg(not(unix))]
fn lock_pages(_ptr: *mut u8, _bytes: usize) -> bool {
    false
}

#[cfg(unix)]
fn unlock_pages(ptr: *mut u8, bytes: usize) {
    // SAFETY: the range was locked by `lock_pages` and is still allocated.
    let rc = unsafe { libc::munlock(ptr as *const libc::c_void, bytes) };
    if rc != 0 {
        tracing::debug!(
            bytes,
            error = %std::io::Error::last_os_error(),
            "munlock failed"
        );
    }
}

#[cfg(not(unix))]
fn unlock_pages(_ptr: *mut u8, _bytes: usize) {}
