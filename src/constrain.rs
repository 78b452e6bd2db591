//! Width masking and address wrap shared by registers and memory.

/// Machine word. Stored values are always non-negative; intermediate
/// arithmetic in instruction effects may go negative before it is masked.
pub type Word = i64;

#[inline]
fn mask(bits: u32) -> Word {
    (1 << bits) - 1
}

/// Keep the low `bits` bits of `value` (two's complement, so `-1` becomes all ones).
#[inline]
pub fn register_value(bits: u32, value: Word) -> Word {
    value & mask(bits)
}

#[inline]
pub fn memory_value(bits: u32, value: Word) -> Word {
    value & mask(bits)
}

/// Wrap `value` into `0..addresses`, negative inputs included.
#[inline]
pub fn address(addresses: usize, value: Word) -> Word {
    let n = addresses as Word;
    ((value % n) + n) % n
}
