//! Wide-multiply helpers (spec component 2).
//!
//! Computes the high 32 bits of a 32x32 product in each of the three
//! signedness combinations the M extension needs (`mulh`, `mulhsu`,
//! `mulhu`), built entirely out of 32-bit arithmetic on 16-bit partial
//! products. No step here widens to a 64-bit integer; that is the point of
//! these helpers existing as a separate module rather than `(a as u64 * b as
//! u64) >> 32`.

/// Split a 32-bit word into (high 16 bits, low 16 bits).
fn halves(x: u32) -> (u32, u32) {
    (x >> 16, x & 0xffff)
}

/// Unsigned 32x32 -> 64 multiply, built from four 16x16 -> 32 partial
/// products, returned as (low 32 bits, high 32 bits).
///
/// `z0..z3` are each a product of two 16-bit values, so none can exceed
/// `0xffff * 0xffff`, which fits in 32 bits without overflow. Their cross
/// terms (`z1`, `z2`) are summed at bit position 16, and the two places that
/// sum can carry out of 32 bits (`s` itself, and low + `s << 16`) are each
/// tracked explicitly and folded into the high word.
fn mul_wide_u(a: u32, b: u32) -> (u32, u32) {
    let (a1, a0) = halves(a);
    let (b1, b0) = halves(b);

    let z0 = a0 * b0;
    let z1 = a0 * b1;
    let z2 = a1 * b0;
    let z3 = a1 * b1;

    let (s, carry_s) = z1.overflowing_add(z2);
    let (low, carry_low) = z0.overflowing_add(s << 16);
    let high = z3
        .wrapping_add(s >> 16)
        .wrapping_add((carry_s as u32) << 16)
        .wrapping_add(carry_low as u32);
    (low, high)
}

/// Two's-complement negation of the 64-bit pair (low, high), computed
/// without ever assembling a 64-bit value: NOT(low) + 1 carries into the
/// high word exactly when low was zero.
fn negate_wide(low: u32, high: u32) -> (u32, u32) {
    let negated_low = low.wrapping_neg();
    let carry = u32::from(low == 0);
    let negated_high = (!high).wrapping_add(carry);
    (negated_low, negated_high)
}

/// unsigned x unsigned high: `mulhu(a, b)`.
pub fn mulhu(a: u32, b: u32) -> u32 {
    mul_wide_u(a, b).1
}

/// signed x signed high: `mulh(a, b)`. Magnitudes are taken via
/// two's-complement negation (which leaves `i32::MIN` unchanged, as
/// required), multiplied unsigned, then the conceptual 64-bit product is
/// negated back if the operand signs differed.
pub fn mulh(a: u32, b: u32) -> u32 {
    let a_neg = (a as i32) < 0;
    let b_neg = (b as i32) < 0;
    let a_mag = if a_neg { a.wrapping_neg() } else { a };
    let b_mag = if b_neg { b.wrapping_neg() } else { b };
    let (low, high) = mul_wide_u(a_mag, b_mag);
    if a_neg != b_neg {
        negate_wide(low, high).1
    } else {
        high
    }
}

/// signed x unsigned high: `mulhsu(a, b)`. Only `a`'s magnitude is
/// extracted, and the product is negated back only when `a` was negative.
pub fn mulhsu(a: u32, b: u32) -> u32 {
    let a_neg = (a as i32) < 0;
    let a_mag = if a_neg { a.wrapping_neg() } else { a };
    let (low, high) = mul_wide_u(a_mag, b);
    if a_neg {
        negate_wide(low, high).1
    } else {
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: [(u32, u32); 6] = [
        (0, 0),
        (1, 0xffff_ffff),
        (0x8000_0000, 0x8000_0000),
        (0x8000_0000, 0xffff_ffff),
        (0x7fff_ffff, 0x7fff_ffff),
        (0xffff_ffff, 0xffff_ffff),
    ];

    fn ref_mulhu(a: u32, b: u32) -> u32 {
        (((a as u64) * (b as u64)) >> 32) as u32
    }

    fn ref_mulh(a: u32, b: u32) -> u32 {
        (((a as i32 as i64) * (b as i32 as i64)) >> 32) as u32
    }

    fn ref_mulhsu(a: u32, b: u32) -> u32 {
        (((a as i32 as i64) * (b as u64 as i64)) >> 32) as u32
    }

    #[test]
    fn mul_wide_u_low_matches_wrapping_mul() {
        for &(a, b) in &CASES {
            assert_eq!(mul_wide_u(a, b).0, a.wrapping_mul(b));
        }
    }

    #[test]
    fn mulhu_matches_64_bit_reference() {
        for &(a, b) in &CASES {
            assert_eq!(mulhu(a, b), ref_mulhu(a, b), "a={a:#x} b={b:#x}");
        }
        let mut state = 0x1234_5678u32;
        for _ in 0..2000 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let b = state.rotate_left(11);
            assert_eq!(mulhu(state, b), ref_mulhu(state, b));
        }
    }

    #[test]
    fn mulh_matches_64_bit_reference() {
        for &(a, b) in &CASES {
            assert_eq!(mulh(a, b), ref_mulh(a, b), "a={a:#x} b={b:#x}");
        }
        let mut state = 0x0bad_f00du32;
        for _ in 0..2000 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let b = state.rotate_left(7) ^ 0xdead_0000;
            assert_eq!(mulh(state, b), ref_mulh(state, b));
        }
    }

    #[test]
    fn mulhsu_matches_64_bit_reference() {
        for &(a, b) in &CASES {
            assert_eq!(mulhsu(a, b), ref_mulhsu(a, b), "a={a:#x} b={b:#x}");
        }
        let mut state = 0x5eed_5eedu32;
        for _ in 0..2000 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let b = state.rotate_left(3);
            assert_eq!(mulhsu(state, b), ref_mulhsu(state, b));
        }
    }
}
