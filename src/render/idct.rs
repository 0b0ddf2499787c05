// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Dequantization and the 8x8 inverse DCT (AAN float variant). The
//! quantizer entries are folded together with the AAN scale factors once
//! per component, so the per-block work is one multiply per coefficient
//! plus the butterfly passes.

use crate::coefficients::BLOCK_SIZE;
use crate::headers::quant::QuantTable;

const SQRT_2: f32 = 1.414213562;

/// AAN per-frequency scale factors: `cos(k*pi/16) * sqrt(2)` for k > 0.
const AAN_SCALE: [f32; 8] = [
    1.0, 1.387039845, 1.306562965, 1.175875602, 1.0, 0.785694958, 0.541196100, 0.275899379,
];

/// Folds a quantization table with the AAN scales and the 1/8 output
/// normalization of the 2D transform.
pub fn prescale(table: &QuantTable) -> [f32; BLOCK_SIZE] {
    let mut out = [0f32; BLOCK_SIZE];
    for row in 0..8 {
        for col in 0..8 {
            out[row * 8 + col] =
                table.values[row * 8 + col] as f32 * AAN_SCALE[row] * AAN_SCALE[col] * 0.125;
        }
    }
    out
}

fn idct1d(v: [f32; 8]) -> [f32; 8] {
    // Even part.
    let tmp10 = v[0] + v[4];
    let tmp11 = v[0] - v[4];
    let tmp13 = v[2] + v[6];
    let tmp12 = (v[2] - v[6]) * SQRT_2 - tmp13;
    let e0 = tmp10 + tmp13;
    let e3 = tmp10 - tmp13;
    let e1 = tmp11 + tmp12;
    let e2 = tmp11 - tmp12;
    // Odd part.
    let z13 = v[5] + v[3];
    let z10 = v[5] - v[3];
    let z11 = v[1] + v[7];
    let z12 = v[1] - v[7];
    let o7 = z11 + z13;
    let t11 = (z11 - z13) * SQRT_2;
    let z5 = (z10 + z12) * 1.847759065;
    let t10 = 1.082392200 * z12 - z5;
    let t12 = -2.613125930 * z10 + z5;
    let o6 = t12 - o7;
    let o5 = t11 - o6;
    let o4 = t10 - o5;
    [
        e0 + o7,
        e1 + o6,
        e2 + o5,
        e3 - o4,
        e3 + o4,
        e2 - o5,
        e1 - o6,
        e0 - o7,
    ]
}

/// Dequantizes one block with a [`prescale`]d table, transforms it, and
/// writes level-shifted samples clamped to `0..=255` at `out` with the
/// given row stride.
pub fn idct_block(coefficients: &[i32], dequant: &[f32; BLOCK_SIZE], out: &mut [u8], stride: usize) {
    let mut tmp = [0f32; BLOCK_SIZE];
    for (t, (&c, &d)) in tmp.iter_mut().zip(coefficients.iter().zip(dequant.iter())) {
        *t = c as f32 * d;
    }
    for col in 0..8 {
        let column = std::array::from_fn(|i| tmp[i * 8 + col]);
        let transformed = idct1d(column);
        for (i, value) in transformed.into_iter().enumerate() {
            tmp[i * 8 + col] = value;
        }
    }
    for row in 0..8 {
        let transformed = idct1d(std::array::from_fn(|i| tmp[row * 8 + i]));
        for (col, value) in transformed.into_iter().enumerate() {
            out[row * stride + col] = (value + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn identity_quant() -> QuantTable {
        QuantTable {
            values: [1u16; BLOCK_SIZE],
        }
    }

    /// Direct cosine-sum reference transform, including the level shift.
    fn reference_idct(coefficients: &[i32], quant: &QuantTable) -> [u8; BLOCK_SIZE] {
        let c = |k: usize| {
            if k == 0 {
                1.0 / f64::sqrt(2.0)
            } else {
                1.0
            }
        };
        let mut out = [0u8; BLOCK_SIZE];
        for y in 0..8 {
            for x in 0..8 {
                let mut acc = 0.0f64;
                for v in 0..8 {
                    for u in 0..8 {
                        let coef = coefficients[v * 8 + u] as f64
                            * quant.values[v * 8 + u] as f64;
                        acc += c(u) * c(v) * coef
                            * ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos()
                            * ((2 * y + 1) as f64 * v as f64 * std::f64::consts::PI / 16.0).cos();
                    }
                }
                out[y * 8 + x] = (acc / 4.0 + 128.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }

    fn run_fast(coefficients: &[i32], quant: &QuantTable) -> [u8; BLOCK_SIZE] {
        let dequant = prescale(quant);
        let mut out = [0u8; BLOCK_SIZE];
        idct_block(coefficients, &dequant, &mut out, 8);
        out
    }

    #[test]
    fn dc_only_block_is_flat() {
        let mut coefficients = [0i32; BLOCK_SIZE];
        assert_eq!(run_fast(&coefficients, &identity_quant()), [128; BLOCK_SIZE]);
        coefficients[0] = 16;
        assert_eq!(run_fast(&coefficients, &identity_quant()), [130; BLOCK_SIZE]);
    }

    #[test]
    fn matches_reference_within_one_lsb() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x1dc7);
        let quant = identity_quant();
        for _ in 0..64 {
            let coefficients: [i32; BLOCK_SIZE] =
                std::array::from_fn(|_| rng.gen_range(-512..=512));
            let fast = run_fast(&coefficients, &quant);
            let slow = reference_idct(&coefficients, &quant);
            for (f, s) in fast.iter().zip(slow.iter()) {
                assert!(
                    (*f as i32 - *s as i32).abs() <= 1,
                    "fast {f} vs reference {s}"
                );
            }
        }
    }

    #[test]
    fn respects_quantizer() {
        let mut coefficients = [0i32; BLOCK_SIZE];
        coefficients[0] = 2;
        let quant = QuantTable {
            values: std::array::from_fn(|i| if i == 0 { 8 } else { 1 }),
        };
        // DC of 2 with divisor 8: 2 * 8 / 8 = 2 above mid-gray.
        assert_eq!(run_fast(&coefficients, &quant), [130; BLOCK_SIZE]);
    }
}
