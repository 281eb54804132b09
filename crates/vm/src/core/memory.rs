/// The [`Memory`] struct represents the byte-addressed memory of a single frame.
///
/// Memory only grows, in 32-byte words. Callers are expected to charge
/// [`Memory::expansion_cost`] before touching a new region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    /// Vector storing memory data
    pub memory: Vec<u8>,
}

impl Memory {
    /// Creates a new, empty [`Memory`]
    pub fn new() -> Memory {
        Memory { memory: Vec::with_capacity(1024) }
    }

    /// Gets the current size of the memory in bytes.
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let memory = Memory::new();
    /// assert_eq!(memory.size(), 0);
    /// ```
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Extends the memory so that `offset..offset + size` is addressable, rounding up to a whole
    /// word. A zero `size` never extends.
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.extend(0, 33);
    /// assert_eq!(memory.size(), 64);
    /// ```
    pub fn extend(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }

        let new_mem_size = offset.saturating_add(size).saturating_add(31) / 32 * 32;
        if new_mem_size > self.size() {
            self.memory.resize(new_mem_size, 0u8);
        }
    }

    /// Store `value` in a `size` byte slot at `offset`. Shorter values are left-padded with
    /// zeros, longer ones are truncated to their first `size` bytes.
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, 32, &[0xff]);
    /// assert_eq!(memory.read(31, 1), vec![0xff]);
    /// assert_eq!(memory.read(0, 31), vec![0u8; 31]);
    /// ```
    pub fn store(&mut self, offset: usize, size: usize, value: &[u8]) {
        if size == 0 {
            return;
        }
        self.extend(offset, size);

        let slot = &mut self.memory[offset..offset + size];
        if value.len() >= size {
            slot.copy_from_slice(&value[..size]);
        } else {
            let pad = size - value.len();
            slot[..pad].fill(0);
            slot[pad..].copy_from_slice(value);
        }
    }

    /// Copy `data` verbatim to `offset`, leaving the bytes after it untouched.
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, 4, &[1, 2, 3, 4]);
    /// memory.write(1, &[9, 9]);
    /// assert_eq!(memory.read(0, 4), vec![1, 9, 9, 4]);
    /// ```
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.extend(offset, data.len());
        self.memory[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Read `size` bytes at `offset`. Reads past the end of memory are padded with zeros.
    pub fn read(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut value = vec![0u8; size];
        if offset < self.size() {
            let end = offset.saturating_add(size).min(self.size());
            value[..end - offset].copy_from_slice(&self.memory[offset..end]);
        }
        value
    }

    /// Calculate the cost of the memory allocated so far
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, 32, &[0xff]);
    /// assert_eq!(memory.memory_cost(), 3);
    /// ```
    pub fn memory_cost(&self) -> u64 {
        words_cost(self.size().div_ceil(32) as u128)
    }

    /// Calculate the cost of extending the memory to cover `offset..offset + size`
    ///
    /// ```
    /// use sleipnir_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, 32, &[0xff]);
    /// assert_eq!(memory.expansion_cost(0, 32), 0);
    /// assert_eq!(memory.expansion_cost(0, 64), 3);
    /// assert_eq!(memory.expansion_cost(usize::MAX, 0), 0);
    /// ```
    pub fn expansion_cost(&self, offset: usize, size: usize) -> u64 {
        if size == 0 {
            return 0;
        }

        let new_words = (offset as u128 + size as u128).div_ceil(32);
        words_cost(new_words).saturating_sub(self.memory_cost())
    }
}

// 3 gas per word plus the quadratic term
fn words_cost(words: u128) -> u64 {
    let cost = (words * words / 512).saturating_add(3 * words);
    u64::try_from(cost).unwrap_or(u64::MAX)
}
