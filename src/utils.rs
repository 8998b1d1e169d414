use std::ops::{BitAnd, Shl, Shr};

use num::Integer;

/// Make an n_bits-long mask (all ones)
pub fn mask<T>(n_bits: T) -> T
where
    T: Integer + Shl<Output = T>,
{
    (T::one() << n_bits) - T::one()
}

/// Obtain value[end:start] (verilog notation) from value
pub fn extract_field<T>(value: T, end: T, start: T) -> T
where
    T: Copy + Integer + Shl<Output = T> + Shr<Output = T> + BitAnd<Output = T>,
{
    mask(end - start + T::one()) & (value >> start)
}

/// Reinterpret the bit pattern of an unsigned word as signed, without
/// changing any bits. Used at the handful of sites (signed compares, SRA,
/// signed multiply/divide) that need a two's-complement view of a register.
pub fn interpret_u32_as_signed(value: u32) -> i32 {
    i32::from_ne_bytes(value.to_ne_bytes())
}

/// The inverse of [`interpret_u32_as_signed`]: reinterpret a signed word as
/// unsigned for storage back into a register.
pub fn interpret_i32_as_unsigned(value: i32) -> u32 {
    u32::from_ne_bytes(i32::from(value).to_ne_bytes())
}

/// Sign-extend the low `n_bits` of `value` to a full 32-bit word: if bit
/// `n_bits - 1` is set, every bit above it is set to one, otherwise they are
/// left zero. This is idempotent: re-extending an already-extended value
/// from the same `n_bits` is a no-op, since its high bits already agree
/// with the sign bit.
pub fn sign_extend(value: u32, n_bits: u32) -> u32 {
    let sign_bit_position = n_bits - 1;
    let sign_bit = 1 & (value >> sign_bit_position);
    if sign_bit == 1 {
        let sign_extension = 0xffff_ffff - mask(sign_bit_position);
        value | sign_extension
    } else {
        value
    }
}
