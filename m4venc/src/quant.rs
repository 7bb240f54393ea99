const RECIPROCAL_SHIFT: u32 = 24;

const fn build_reciprocals() -> [u64; 32] {
    let mut table = [0u64; 32];
    let mut q = 1;
    while q < 32 {
        table[q] = (1u64 << RECIPROCAL_SHIFT) / (2 * q as u64) + 1;
        q += 1;
    }
    table
}

/// `floor(2^24 / 2q) + 1`, exact division by `2q` for every i16 magnitude.
const RECIPROCALS: [u64; 32] = build_reciprocals();

const LEVEL_MIN: i32 = -2048;
const LEVEL_MAX: i32 = 2047;

pub fn dc_scaler(quant: u8, is_luma: bool) -> i32 {
    let q = quant as i32;
    if q < 5 {
        8
    } else if is_luma {
        match q {
            5..=8 => 2 * q,
            9..=24 => q + 8,
            _ => 2 * q - 16,
        }
    } else if q < 25 {
        (q + 13) / 2
    } else {
        q - 6
    }
}

fn div_2q(magnitude: i32, quant: u8) -> i32 {
    ((magnitude as u64 * RECIPROCALS[quant as usize]) >> RECIPROCAL_SHIFT) as i32
}

/// `sign(c) * round(|c| / 2q)`, saturated to the 12-bit level range.
fn quantize_ac(coeff: i16, quant: u8) -> i16 {
    let magnitude = (coeff as i32).abs();
    let level = div_2q(magnitude + quant as i32, quant);
    let level = if coeff < 0 { -level } else { level };
    level.clamp(LEVEL_MIN, LEVEL_MAX) as i16
}

/// Quantizes an intra block in place. The DC is divided by the DC scaler and
/// kept unsigned; AC coefficients are rounded to the nearest level.
pub fn quantize_intra(block: &mut [i16; 64], quant: u8, dc_scaler: i32) {
    debug_assert!((1..=31).contains(&quant));
    let dc = (block[0] as i32 + dc_scaler / 2) / dc_scaler;
    block[0] = dc.clamp(0, 255) as i16;
    for coeff in block.iter_mut().skip(1) {
        *coeff = quantize_ac(*coeff, quant);
    }
}

/// Quantizes an inter block in place. Returns true if any level is nonzero.
pub fn quantize_inter(block: &mut [i16; 64], quant: u8) -> bool {
    debug_assert!((1..=31).contains(&quant));
    let dead_zone = 2 * quant as i32;
    let mut coded = false;
    for coeff in block.iter_mut() {
        if (*coeff as i32).abs() < dead_zone {
            *coeff = 0;
        } else {
            *coeff = quantize_ac(*coeff, quant);
            coded |= *coeff != 0;
        }
    }
    coded
}

fn dequantize_level(level: i16, quant: u8) -> i16 {
    if level == 0 {
        return 0;
    }
    let q = quant as i32;
    let magnitude = q * (2 * (level as i32).abs() + 1) - i32::from(q % 2 == 0);
    let value = if level < 0 { -magnitude } else { magnitude };
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

pub fn dequantize_intra(block: &mut [i16; 64], quant: u8, dc_scaler: i32) {
    block[0] = (block[0] as i32 * dc_scaler) as i16;
    for coeff in block.iter_mut().skip(1) {
        *coeff = dequantize_level(*coeff, quant);
    }
}

pub fn dequantize_inter(block: &mut [i16; 64], quant: u8) {
    for coeff in block.iter_mut() {
        *coeff = dequantize_level(*coeff, quant);
    }
}
