/// 8-point DCT-II basis, `0.5 * c(u) * cos((2x + 1) * u * pi / 16)` in Q13.
const BASIS: [[i64; 8]; 8] = [
    [2896, 2896, 2896, 2896, 2896, 2896, 2896, 2896],
    [4017, 3406, 2276, 799, -799, -2276, -3406, -4017],
    [3784, 1567, -1567, -3784, -3784, -1567, 1567, 3784],
    [3406, -799, -4017, -2276, 2276, 4017, 799, -3406],
    [2896, -2896, -2896, 2896, 2896, -2896, -2896, 2896],
    [2276, -4017, 799, 3406, -3406, -799, 4017, -2276],
    [1567, -3784, 3784, -1567, -1567, 3784, -3784, 1567],
    [799, -2276, 3406, -4017, 4017, -3406, 2276, -799],
];

// First pass keeps 3 fractional bits, second pass removes the rest.
const PASS1_SHIFT: u32 = 10;
const PASS2_SHIFT: u32 = 16;

const COEFF_MIN: i16 = -2048;
const COEFF_MAX: i16 = 2047;

fn round_shift(v: i64, shift: u32) -> i64 {
    (v + (1 << (shift - 1))) >> shift
}

/// Forward 2-D DCT of an 8x8 block in natural (row-major) order, in place.
pub fn fdct(block: &mut [i16; 64]) {
    let mut tmp = [0i64; 64];
    for y in 0..8 {
        let row = &block[y * 8..y * 8 + 8];
        for u in 0..8 {
            let sum: i64 = (0..8).map(|x| row[x] as i64 * BASIS[u][x]).sum();
            tmp[y * 8 + u] = round_shift(sum, PASS1_SHIFT);
        }
    }
    for u in 0..8 {
        for v in 0..8 {
            let sum: i64 = (0..8).map(|y| tmp[y * 8 + u] * BASIS[v][y]).sum();
            block[v * 8 + u] = round_shift(sum, PASS2_SHIFT).clamp(i16::MIN as i64, i16::MAX as i64) as i16;
        }
    }
}

/// Inverse 2-D DCT, in place. Coefficients are saturated to the 12-bit
/// range first.
pub fn idct(block: &mut [i16; 64]) {
    let mut tmp = [0i64; 64];
    for v in 0..8 {
        let row: [i64; 8] =
            std::array::from_fn(|u| block[v * 8 + u].clamp(COEFF_MIN, COEFF_MAX) as i64);
        for x in 0..8 {
            let sum: i64 = (0..8).map(|u| row[u] * BASIS[u][x]).sum();
            tmp[v * 8 + x] = round_shift(sum, PASS1_SHIFT);
        }
    }
    for x in 0..8 {
        for y in 0..8 {
            let sum: i64 = (0..8).map(|v| tmp[v * 8 + x] * BASIS[v][y]).sum();
            block[y * 8 + x] = round_shift(sum, PASS2_SHIFT).clamp(i16::MIN as i64, i16::MAX as i64) as i16;
        }
    }
}
