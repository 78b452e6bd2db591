use serde::{Deserialize, Serialize};

use crate::constrain::{self, Word};

/// Flat cell memory. Every access wraps the address into range and every
/// store is masked to the cell width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMemory")]
pub struct Memory {
    cells: Vec<Word>,
    bits: u32,
}

/// Unchecked shape of a serialized [`Memory`].
#[derive(Deserialize)]
struct RawMemory {
    cells: Vec<Word>,
    bits: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("memory has no cells")]
    Empty,
    #[error("cell width of {0} bits is outside 1..=32")]
    Width(u32),
}

impl TryFrom<RawMemory> for Memory {
    type Error = MemoryError;

    fn try_from(raw: RawMemory) -> Result<Self, Self::Error> {
        if raw.cells.is_empty() {
            return Err(MemoryError::Empty);
        }
        if !(1..=32).contains(&raw.bits) {
            return Err(MemoryError::Width(raw.bits));
        }
        let mut memory = Memory::new(raw.cells.len(), raw.bits);
        memory.load(&raw.cells);
        Ok(memory)
    }
}

impl Memory {
    pub fn new(addresses: usize, bits: u32) -> Self {
        Self {
            cells: vec![0; addresses],
            bits,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    fn index(&self, addr: Word) -> usize {
        constrain::address(self.cells.len(), addr) as usize
    }

    pub fn read(&self, addr: Word) -> Word {
        self.cells[self.index(addr)]
    }

    pub fn write(&mut self, addr: Word, val: Word) {
        let off = self.index(addr);
        self.cells[off] = constrain::memory_value(self.bits, val);
    }

    /// Overwrite every cell: `values` fill from address 0 (masked), the rest is zeroed.
    /// Values past the end of memory are ignored.
    pub fn load(&mut self, values: &[Word]) {
        let bits = self.bits;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            *cell = values
                .get(i)
                .map_or(0, |&v| constrain::memory_value(bits, v));
        }
    }
}
