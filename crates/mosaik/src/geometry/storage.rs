//! CPU-side mirror of a GPU buffer.

/// A vector whose backing store only grows.
///
/// `capacity` is the number of initialized elements (what the GPU buffer
/// was sized for); `len` is how many of them are in use. Growing keeps
/// existing contents and default-fills the rest.
#[derive(Debug, Clone, Default)]
pub struct GrowableStorage<T> {
    data: Vec<T>,
    len: usize,
}

impl<T: Copy + Default> GrowableStorage<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Grow to at least `capacity` elements. Returns true if it grew.
    pub fn ensure_capacity(&mut self, capacity: usize) -> bool {
        if capacity <= self.data.len() {
            return false;
        }
        self.data.resize(capacity, T::default());
        true
    }

    /// Mark the first `len` elements as in use, growing if needed.
    pub fn set_len(&mut self, len: usize) {
        self.ensure_capacity(len);
        self.len = len;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..self.len]
    }

    /// Every initialized element, used or not.
    pub fn as_capacity_slice(&self) -> &[T] {
        &self.data
    }

    /// Drop all contents and capacity.
    pub fn reset(&mut self) {
        self.data = Vec::new();
        self.len = 0;
    }
}
