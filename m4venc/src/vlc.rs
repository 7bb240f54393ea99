use crate::bitwriter::BitWriter;
use crate::macroblock::MbMode;

/// Variable-length coding of macroblock syntax elements.
///
/// The macroblock encoder decides every value; implementations only decide
/// how each one is spelled in the bitstream.
pub trait EntropyCoder {
    /// MCBPC of an intra macroblock in an I-VOP.
    fn put_mcbpc_intra(&mut self, bw: &mut BitWriter, cbpc: u8, mode: MbMode);
    /// MCBPC of any coded macroblock in a P-VOP.
    fn put_mcbpc_inter(&mut self, bw: &mut BitWriter, cbpc: u8, mode: MbMode);
    /// `cbpy` is the luma pattern as coded for intra macroblocks; inter
    /// macroblocks use the inverted pattern.
    fn put_cbpy(&mut self, bw: &mut BitWriter, cbpy: u8, intra: bool);
    /// Differential intra DC, size category plus magnitude bits.
    fn put_intra_dc(&mut self, bw: &mut BitWriter, diff: i32, luma: bool);
    /// One motion vector data code in `[-32, 32]`.
    fn put_mv_code(&mut self, bw: &mut BitWriter, code: i32);
    /// One (run, level, last) event of a block's coefficients.
    fn put_coefficient(&mut self, bw: &mut BitWriter, run: u8, level: i32, last: bool, mode: MbMode);
}

#[derive(Clone, Copy)]
struct Vlc {
    code: u16,
    len: u8,
}

const fn vlc(code: u16, len: u8) -> Vlc {
    Vlc { code, len }
}

const MCBPC_INTRA: [Vlc; 4] = [vlc(1, 1), vlc(1, 3), vlc(2, 3), vlc(3, 3)];

/// Indexed by `mb_type * 4 + cbpc`.
const MCBPC_INTER: [Vlc; 20] = [
    vlc(1, 1), vlc(3, 4), vlc(2, 4), vlc(5, 6),
    vlc(3, 3), vlc(7, 7), vlc(6, 7), vlc(5, 9),
    vlc(2, 3), vlc(5, 7), vlc(4, 7), vlc(5, 8),
    vlc(3, 5), vlc(4, 8), vlc(3, 8), vlc(3, 7),
    vlc(4, 6), vlc(4, 9), vlc(3, 9), vlc(2, 9),
];

const CBPY: [Vlc; 16] = [
    vlc(3, 4), vlc(5, 5), vlc(4, 5), vlc(9, 4),
    vlc(3, 5), vlc(7, 4), vlc(2, 6), vlc(11, 4),
    vlc(2, 5), vlc(3, 6), vlc(5, 4), vlc(10, 4),
    vlc(4, 4), vlc(8, 4), vlc(6, 4), vlc(3, 2),
];

const DC_SIZE_LUMA: [Vlc; 13] = [
    vlc(3, 3), vlc(3, 2), vlc(2, 2), vlc(2, 3), vlc(1, 3), vlc(1, 4), vlc(1, 5),
    vlc(1, 6), vlc(1, 7), vlc(1, 8), vlc(1, 9), vlc(1, 10), vlc(1, 11),
];

const DC_SIZE_CHROMA: [Vlc; 13] = [
    vlc(3, 2), vlc(2, 2), vlc(1, 2), vlc(1, 3), vlc(1, 4), vlc(1, 5), vlc(1, 6),
    vlc(1, 7), vlc(1, 8), vlc(1, 9), vlc(1, 10), vlc(1, 11), vlc(1, 12),
];

/// Motion vector data magnitudes 0..=32, sign bit not included.
const MV: [Vlc; 33] = [
    vlc(1, 1), vlc(1, 2), vlc(1, 3), vlc(1, 4), vlc(3, 6), vlc(5, 7), vlc(4, 7),
    vlc(3, 7), vlc(11, 9), vlc(10, 9), vlc(9, 9), vlc(17, 10), vlc(16, 10),
    vlc(15, 10), vlc(14, 10), vlc(13, 10), vlc(12, 10), vlc(11, 10), vlc(10, 10),
    vlc(9, 10), vlc(8, 10), vlc(7, 10), vlc(6, 10), vlc(5, 10), vlc(4, 10),
    vlc(7, 11), vlc(6, 11), vlc(5, 11), vlc(4, 11), vlc(3, 11), vlc(2, 11),
    vlc(3, 12), vlc(2, 12),
];

/// Largest level with its own code for each run, not-last events.
const INTER_MAX_LEVEL: [u8; 27] = [
    12, 6, 4, 3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

/// Same for last events.
const INTER_MAX_LEVEL_LAST: [u8; 41] = {
    let mut t = [1u8; 41];
    t[0] = 3;
    t[1] = 2;
    t
};

const INTER_LAST_BASE: usize = 58;

/// Inter TCOEF codes ordered by (last, run, level), sign bit not included.
const INTER_TCOEF: [Vlc; 102] = [
    // last = 0
    vlc(0x2, 2), vlc(0xf, 4), vlc(0x15, 6), vlc(0x17, 7), vlc(0x1f, 8), vlc(0x25, 9),
    vlc(0x24, 9), vlc(0x21, 10), vlc(0x20, 10), vlc(0x7, 11), vlc(0x6, 11), vlc(0x20, 11),
    vlc(0x6, 3), vlc(0x14, 6), vlc(0x1e, 8), vlc(0xf, 10), vlc(0x21, 11), vlc(0x50, 12),
    vlc(0xe, 4), vlc(0x1d, 8), vlc(0xe, 10), vlc(0x51, 12),
    vlc(0xd, 5), vlc(0x23, 9), vlc(0xd, 10),
    vlc(0xc, 5), vlc(0x22, 9), vlc(0x52, 12),
    vlc(0xb, 5), vlc(0xc, 10), vlc(0x53, 12),
    vlc(0x13, 6), vlc(0xb, 10), vlc(0x54, 12),
    vlc(0x12, 6), vlc(0xa, 10),
    vlc(0x11, 6), vlc(0x9, 10),
    vlc(0x10, 6), vlc(0x8, 10),
    vlc(0x16, 7), vlc(0x55, 12),
    vlc(0x15, 7), vlc(0x14, 7), vlc(0x1c, 8), vlc(0x1b, 8), vlc(0x21, 9), vlc(0x20, 9),
    vlc(0x1f, 9), vlc(0x1e, 9), vlc(0x1d, 9), vlc(0x1c, 9), vlc(0x1b, 9), vlc(0x1a, 9),
    vlc(0x22, 11), vlc(0x23, 11), vlc(0x56, 12), vlc(0x57, 12),
    // last = 1
    vlc(0x7, 4), vlc(0x19, 9), vlc(0x5, 11),
    vlc(0xf, 6), vlc(0x4, 11),
    vlc(0xe, 6), vlc(0xd, 6), vlc(0xc, 6), vlc(0x13, 7), vlc(0x12, 7), vlc(0x11, 7),
    vlc(0x10, 7), vlc(0x1a, 8), vlc(0x19, 8), vlc(0x18, 8), vlc(0x17, 8), vlc(0x16, 8),
    vlc(0x15, 8), vlc(0x14, 8), vlc(0x13, 8), vlc(0x18, 9), vlc(0x17, 9), vlc(0x16, 9),
    vlc(0x15, 9), vlc(0x14, 9), vlc(0x13, 9), vlc(0x12, 9), vlc(0x11, 9), vlc(0x7, 10),
    vlc(0x6, 10), vlc(0x5, 10), vlc(0x4, 10), vlc(0x24, 11), vlc(0x25, 11), vlc(0x26, 11),
    vlc(0x27, 11), vlc(0x58, 12), vlc(0x59, 12), vlc(0x5a, 12), vlc(0x5b, 12), vlc(0x5c, 12),
    vlc(0x5d, 12), vlc(0x5e, 12), vlc(0x5f, 12),
];

const ESCAPE: Vlc = vlc(0x3, 7);

fn inter_tcoef_index(run: u8, level: u32, last: bool) -> Option<usize> {
    let (max_levels, base): (&[u8], usize) = if last {
        (&INTER_MAX_LEVEL_LAST, INTER_LAST_BASE)
    } else {
        (&INTER_MAX_LEVEL, 0)
    };
    let run = run as usize;
    let max = *max_levels.get(run)? as u32;
    if level == 0 || level > max {
        return None;
    }
    let offset: usize = max_levels[..run].iter().map(|&m| m as usize).sum();
    Some(base + offset + level as usize - 1)
}

fn put(bw: &mut BitWriter, v: Vlc) {
    bw.put_bits(v.code as u32, v.len as u32);
}

/// Bits spent on one motion vector component difference, used as the rate
/// term of the motion search.
pub fn mv_bits(component: i32, fcode: u8) -> i32 {
    let mut component = component.abs();
    if component == 0 {
        return 1;
    }
    if fcode == 1 {
        return MV[component.min(32) as usize].len as i32 + 1;
    }
    let shift = fcode as i32 - 1;
    component = (component + (1 << shift) - 1) >> shift;
    MV[component.min(32) as usize].len as i32 + 1 + shift
}

/// The MPEG-4 part 2 VLC tables. Events without an inter TCOEF code, and
/// all intra AC events, are sent with the fixed-length escape.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mpeg4Vlc;

impl Mpeg4Vlc {
    fn put_escape(bw: &mut BitWriter, run: u8, level: i32, last: bool) {
        put(bw, ESCAPE);
        bw.put_bits(0b11, 2);
        bw.put_bit(last);
        bw.put_bits(run as u32, 6);
        bw.put_bit(true);
        bw.put_bits(level.clamp(-2047, 2047) as u32 & 0xfff, 12);
        bw.put_bit(true);
    }
}

impl EntropyCoder for Mpeg4Vlc {
    fn put_mcbpc_intra(&mut self, bw: &mut BitWriter, cbpc: u8, mode: MbMode) {
        debug_assert_eq!(mode, MbMode::Intra);
        put(bw, MCBPC_INTRA[(cbpc & 3) as usize]);
    }

    fn put_mcbpc_inter(&mut self, bw: &mut BitWriter, cbpc: u8, mode: MbMode) {
        put(bw, MCBPC_INTER[mode.mb_type() * 4 + (cbpc & 3) as usize]);
    }

    fn put_cbpy(&mut self, bw: &mut BitWriter, cbpy: u8, intra: bool) {
        let index = if intra { cbpy & 15 } else { !cbpy & 15 };
        put(bw, CBPY[index as usize]);
    }

    fn put_intra_dc(&mut self, bw: &mut BitWriter, diff: i32, luma: bool) {
        let size = (32 - diff.unsigned_abs().leading_zeros()).min(12);
        let table = if luma { &DC_SIZE_LUMA } else { &DC_SIZE_CHROMA };
        put(bw, table[size as usize]);
        if size == 0 {
            return;
        }
        let magnitude = if diff < 0 { diff + (1 << size) - 1 } else { diff };
        bw.put_bits(magnitude as u32, size);
        if size > 8 {
            bw.put_bit(true);
        }
    }

    fn put_mv_code(&mut self, bw: &mut BitWriter, code: i32) {
        debug_assert!(code.abs() <= 32, "mv code {code} out of range");
        if code == 0 {
            bw.put_bit(true);
            return;
        }
        put(bw, MV[code.unsigned_abs().min(32) as usize]);
        bw.put_bit(code < 0);
    }

    fn put_coefficient(&mut self, bw: &mut BitWriter, run: u8, level: i32, last: bool, mode: MbMode) {
        debug_assert!(level != 0);
        let index = match mode {
            MbMode::Intra => None,
            _ => inter_tcoef_index(run, level.unsigned_abs(), last),
        };
        match index {
            Some(index) => {
                put(bw, INTER_TCOEF[index]);
                bw.put_bit(level < 0);
            }
            None => Self::put_escape(bw, run, level, last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(f: impl FnOnce(&mut Mpeg4Vlc, &mut BitWriter)) -> String {
        let mut bw = BitWriter::new();
        f(&mut Mpeg4Vlc, &mut bw);
        let n = bw.position_in_bits();
        let bytes = bw.finish();
        (0..n)
            .map(|i| if bytes[i / 8] >> (7 - i % 8) & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn tcoef_index_layout() {
        assert_eq!(inter_tcoef_index(0, 1, false), Some(0));
        assert_eq!(inter_tcoef_index(0, 12, false), Some(11));
        assert_eq!(inter_tcoef_index(0, 13, false), None);
        assert_eq!(inter_tcoef_index(1, 1, false), Some(12));
        assert_eq!(inter_tcoef_index(26, 1, false), Some(57));
        assert_eq!(inter_tcoef_index(27, 1, false), None);
        assert_eq!(inter_tcoef_index(0, 1, true), Some(58));
        assert_eq!(inter_tcoef_index(1, 2, true), Some(62));
        assert_eq!(inter_tcoef_index(40, 1, true), Some(101));
        assert_eq!(inter_tcoef_index(41, 1, true), None);
    }

    #[test]
    fn inter_coefficients_use_table_and_sign() {
        let mode = MbMode::Inter;
        assert_eq!(bits(|c, bw| c.put_coefficient(bw, 0, 1, false, mode)), "100");
        assert_eq!(bits(|c, bw| c.put_coefficient(bw, 0, -1, false, mode)), "101");
        assert_eq!(bits(|c, bw| c.put_coefficient(bw, 1, 1, false, mode)), "1100");
        assert_eq!(bits(|c, bw| c.put_coefficient(bw, 0, 1, true, mode)), "01110");
    }

    #[test]
    fn escape_carries_last_run_and_twos_complement_level() {
        let out = bits(|c, bw| c.put_coefficient(bw, 5, -300, true, MbMode::Intra));
        assert_eq!(out, "000001111100010111110110101001");
        // too large for the table
        let out = bits(|c, bw| c.put_coefficient(bw, 0, 13, false, MbMode::Inter));
        assert_eq!(out, "000001111000000010000000011011");
    }

    #[test]
    fn intra_dc_size_and_magnitude() {
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, 0, true)), "011");
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, 0, false)), "11");
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, 3, true)), "1011");
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, -3, true)), "1000");
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, -1, false)), "100");
        // size 9 gets a trailing marker
        assert_eq!(bits(|c, bw| c.put_intra_dc(bw, 256, true)), "000000011000000001");
    }

    #[test]
    fn mv_codes() {
        assert_eq!(bits(|c, bw| c.put_mv_code(bw, 0)), "1");
        assert_eq!(bits(|c, bw| c.put_mv_code(bw, 1)), "010");
        assert_eq!(bits(|c, bw| c.put_mv_code(bw, -1)), "011");
        assert_eq!(bits(|c, bw| c.put_mv_code(bw, 4)), "0000110");
    }

    #[test]
    fn mcbpc_and_cbpy() {
        assert_eq!(bits(|c, bw| c.put_mcbpc_intra(bw, 0, MbMode::Intra)), "1");
        assert_eq!(bits(|c, bw| c.put_mcbpc_intra(bw, 3, MbMode::Intra)), "011");
        assert_eq!(bits(|c, bw| c.put_mcbpc_inter(bw, 0, MbMode::Inter)), "1");
        assert_eq!(bits(|c, bw| c.put_mcbpc_inter(bw, 0, MbMode::Inter4V)), "010");
        assert_eq!(bits(|c, bw| c.put_mcbpc_inter(bw, 0, MbMode::Intra)), "00011");
        assert_eq!(bits(|c, bw| c.put_cbpy(bw, 15, true)), "11");
        assert_eq!(bits(|c, bw| c.put_cbpy(bw, 0, false)), "11");
        assert_eq!(bits(|c, bw| c.put_cbpy(bw, 0, true)), "0011");
    }

    #[test]
    fn mv_bits_grows_with_magnitude_and_fcode() {
        assert_eq!(mv_bits(0, 1), 1);
        assert_eq!(mv_bits(1, 1), 3);
        assert_eq!(mv_bits(-1, 1), 3);
        assert_eq!(mv_bits(40, 1), 13);
        // fcode 2 halves the magnitude, rounding up, and adds a residual bit
        assert_eq!(mv_bits(2, 2), 4);
        assert_eq!(mv_bits(3, 2), 4 + 1);
        assert!(mv_bits(8, 1) > mv_bits(2, 1));
    }
}
