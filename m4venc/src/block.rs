use log::trace;

use crate::bitwriter::BitWriter;
use crate::dct::{fdct, idct};
use crate::macroblock::MbMode;
use crate::plane::{Component, Plane, PlaneSet};
use crate::predict::{AcDcPrediction, AcPredDirection, predict_acdc, predict_mv};
use crate::quant::{dc_scaler, dequantize_inter, dequantize_intra, quantize_inter, quantize_intra};
use crate::scan::{ZIGZAG, scan_for};
use crate::vlc::EntropyCoder;
use crate::vop::{Vop, VopType};

/// Per-frame bit and motion statistics gathered while coding macroblocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    /// Bits spent on coefficients and intra DC.
    pub text_bits: u64,
    /// Bits spent on motion vector differentials.
    pub mv_bits: u64,
    /// Sum of squared folded vector differentials.
    pub mv_sum: u64,
    pub mv_upper: u32,
    pub mv_lower: u32,
    /// Vector spread of the previous frame, used for f-code hysteresis.
    pub prev_sigma: Option<f32>,
}

impl Statistics {
    /// Clears the per-frame counters, keeping `prev_sigma`.
    pub fn begin_frame(&mut self) {
        *self = Self {
            prev_sigma: self.prev_sigma,
            ..Self::default()
        };
    }

    /// Root mean square of the coded vector differentials.
    pub fn sigma(&self) -> f32 {
        let count = (self.mv_upper + self.mv_lower).max(1);
        (self.mv_sum as f64 / count as f64).sqrt() as f32
    }
}

fn block_origin(mbx: usize, mby: usize, block: usize) -> (Component, isize, isize) {
    let (component, bx, by) = Component::of_block(block);
    if component.is_luma() {
        (component, mbx as isize * 16 + bx, mby as isize * 16 + by)
    } else {
        (component, mbx as isize * 8, mby as isize * 8)
    }
}

fn load_block(plane: &Plane, x: isize, y: isize) -> [i16; 64] {
    let mut block = [0i16; 64];
    for (row, out) in block.chunks_exact_mut(8).enumerate() {
        for (dst, &src) in out.iter_mut().zip(plane.row(x, y + row as isize, 8)) {
            *dst = src as i16;
        }
    }
    block
}

fn load_residual(source: &Plane, prediction: &Plane, x: isize, y: isize) -> [i16; 64] {
    let mut block = [0i16; 64];
    for (row, out) in block.chunks_exact_mut(8).enumerate() {
        let y = y + row as isize;
        let pairs = source.row(x, y, 8).iter().zip(prediction.row(x, y, 8));
        for (dst, (&s, &p)) in out.iter_mut().zip(pairs) {
            *dst = s as i16 - p as i16;
        }
    }
    block
}

fn store_block(plane: &mut Plane, x: isize, y: isize, block: &[i16; 64]) {
    for (row, values) in block.chunks_exact(8).enumerate() {
        for (dst, &v) in plane.row_mut(x, y + row as isize, 8).iter_mut().zip(values) {
            *dst = v.clamp(0, 255) as u8;
        }
    }
}

fn add_block(plane: &mut Plane, x: isize, y: isize, block: &[i16; 64]) {
    for (row, values) in block.chunks_exact(8).enumerate() {
        for (dst, &v) in plane.row_mut(x, y + row as isize, 8).iter_mut().zip(values) {
            *dst = (*dst as i16 + v).clamp(0, 255) as u8;
        }
    }
}

/// Level at natural position `index` after subtracting the AC prediction.
fn predicted_level(levels: &[i16; 64], pred: &AcDcPrediction, index: usize) -> i32 {
    let level = levels[index] as i32;
    match pred.direction {
        AcPredDirection::Vertical if (1..8).contains(&index) => level - pred.ac[index - 1] as i32,
        AcPredDirection::Horizontal if index % 8 == 0 && index > 0 => {
            level - pred.ac[index / 8 - 1] as i32
        }
        _ => level,
    }
}

fn intra_cbp(levels: &[[i16; 64]; 6], preds: &[AcDcPrediction; 6]) -> u8 {
    (0..6).fold(0, |cbp, block| {
        let coded = (1..64).any(|i| predicted_level(&levels[block], &preds[block], i) != 0);
        if coded { cbp | 1 << (5 - block) } else { cbp }
    })
}

fn inter_cbp(levels: &[[i16; 64]; 6]) -> u8 {
    (0..6).fold(0, |cbp, block| {
        if levels[block].iter().any(|&l| l != 0) {
            cbp | 1 << (5 - block)
        } else {
            cbp
        }
    })
}

/// Emits the (run, level, last) events of one block walking `scan` from
/// `first`.
fn put_events(
    coder: &mut dyn EntropyCoder,
    bw: &mut BitWriter,
    scan: &[usize; 64],
    first: usize,
    mode: MbMode,
    level_at: impl Fn(usize) -> i32,
) {
    let mut run = 0u8;
    let mut pending: Option<(u8, i32)> = None;
    for &index in &scan[first..] {
        let level = level_at(index);
        if level == 0 {
            run += 1;
            continue;
        }
        if let Some((r, l)) = pending {
            coder.put_coefficient(bw, r, l, false, mode);
        }
        pending = Some((run, level));
        run = 0;
    }
    if let Some((r, l)) = pending {
        coder.put_coefficient(bw, r, l, true, mode);
    }
}

/// Codes the macroblocks of one VOP into a bit writer, reconstructing each
/// one into the VOP's planes as it goes.
pub struct MacroblockEncoder<'a> {
    pub vop: &'a mut Vop,
    pub source: &'a PlaneSet,
    pub bw: &'a mut BitWriter,
    pub coder: &'a mut dyn EntropyCoder,
    pub stats: &'a mut Statistics,
    pub quant: u8,
    pub fcode: u8,
    pub trace: bool,
}

impl MacroblockEncoder<'_> {
    pub fn encode_intra(&mut self, mbx: usize, mby: usize) {
        let start = self.bw.position_in_bits();
        let quant = self.quant;

        let mut levels = [[0i16; 64]; 6];
        let mut metric = 0;
        let mut preds = [AcDcPrediction {
            direction: AcPredDirection::None,
            dc: 0,
            ac: [0; 7],
            metric: 0,
        }; 6];
        for block in 0..6 {
            let (component, x, y) = block_origin(mbx, mby, block);
            let scaler = dc_scaler(quant, component.is_luma());
            let mut coefs = load_block(self.source.plane(component), x, y);
            fdct(&mut coefs);
            quantize_intra(&mut coefs, quant, scaler);
            preds[block] = predict_acdc(self.vop, mbx, mby, block, &coefs, scaler);
            metric += preds[block].metric;
            levels[block] = coefs;
        }
        if metric < 0 {
            for pred in &mut preds {
                pred.direction = AcPredDirection::None;
            }
        }

        let cbp = intra_cbp(&levels, &preds);
        self.vop.mb_mut(mbx, mby).cbp = cbp;
        match self.vop.vop_type {
            VopType::Intra => self.coder.put_mcbpc_intra(self.bw, cbp & 3, MbMode::Intra),
            VopType::Predicted => self.coder.put_mcbpc_inter(self.bw, cbp & 3, MbMode::Intra),
        }
        self.bw.put_bit(preds[0].direction != AcPredDirection::None);
        self.coder.put_cbpy(self.bw, cbp >> 2, true);

        for block in 0..6 {
            let (component, x, y) = block_origin(mbx, mby, block);
            let (block_levels, pred) = (&levels[block], &preds[block]);
            let dc_diff = block_levels[0] as i32 - pred.dc as i32;
            self.coder.put_intra_dc(self.bw, dc_diff, component.is_luma());
            if cbp & 1 << (5 - block) != 0 {
                put_events(
                    self.coder,
                    self.bw,
                    scan_for(pred.direction),
                    1,
                    MbMode::Intra,
                    |i| predicted_level(block_levels, pred, i),
                );
            }

            let mut coefs = *block_levels;
            dequantize_intra(&mut coefs, quant, dc_scaler(quant, component.is_luma()));
            idct(&mut coefs);
            store_block(self.vop.planes.plane_mut(component), x, y, &coefs);
        }

        let bits = self.bw.position_in_bits() - start;
        self.stats.text_bits += bits as u64;
        if self.trace {
            trace!(
                "mb ({mbx},{mby}) intra cbp={cbp:06b} ac_pred={:?} bits={bits}",
                preds[0].direction
            );
        }
    }

    /// Codes a macroblock of a P-VOP whose prediction has already been
    /// written into the VOP's planes.
    pub fn encode_inter(&mut self, mbx: usize, mby: usize) {
        let mb = *self.vop.mb(mbx, mby);
        if mb.mode == MbMode::Intra {
            self.bw.put_bit(false);
            self.encode_intra(mbx, mby);
            return;
        }

        let quant = self.quant;
        let mut levels = [[0i16; 64]; 6];
        for (block, out) in levels.iter_mut().enumerate() {
            let (component, x, y) = block_origin(mbx, mby, block);
            let mut coefs = load_residual(
                self.source.plane(component),
                self.vop.planes.plane(component),
                x,
                y,
            );
            fdct(&mut coefs);
            quantize_inter(&mut coefs, quant);
            *out = coefs;
        }
        let cbp = inter_cbp(&levels);
        self.vop.mb_mut(mbx, mby).cbp = cbp;

        if cbp == 0 && mb.mode == MbMode::Inter && mb.mvs[0].is_zero() {
            self.bw.put_bit(true);
            if self.trace {
                trace!("mb ({mbx},{mby}) skipped");
            }
            return;
        }
        self.bw.put_bit(false);
        self.coder.put_mcbpc_inter(self.bw, cbp & 3, mb.mode);
        self.coder.put_cbpy(self.bw, cbp >> 2, false);

        let vectors = if mb.mode == MbMode::Inter4V { 4 } else { 1 };
        for block in 0..vectors {
            let d = mb.mvs[block] - predict_mv(self.vop, mbx, mby, block);
            self.put_mv_data(d.x);
            self.put_mv_data(d.y);
        }

        for (block, block_levels) in levels.iter_mut().enumerate() {
            if cbp & 1 << (5 - block) == 0 {
                continue;
            }
            let start = self.bw.position_in_bits();
            let coded = *block_levels;
            put_events(self.coder, self.bw, &ZIGZAG, 0, mb.mode, |i| coded[i] as i32);
            self.stats.text_bits += (self.bw.position_in_bits() - start) as u64;

            let (component, x, y) = block_origin(mbx, mby, block);
            dequantize_inter(block_levels, quant);
            idct(block_levels);
            add_block(self.vop.planes.plane_mut(component), x, y, block_levels);
        }

        if self.trace {
            trace!(
                "mb ({mbx},{mby}) {:?} cbp={cbp:06b} mv=({},{})",
                mb.mode,
                mb.mvs[0].x,
                mb.mvs[0].y
            );
        }
    }

    /// Folds one vector differential component into the f-code range and
    /// writes it as `mv_data` plus residual bits.
    fn put_mv_data(&mut self, value: i32) {
        let scale = 1i32 << (self.fcode - 1);
        let high = 32 * scale - 1;
        let low = -32 * scale;
        let range = 64 * scale;

        let mut value = value;
        if value < low {
            value += range;
        }
        if value > high {
            value -= range;
        }

        self.stats.mv_sum += (value * value) as u64;
        if value.abs() >= high / 2 {
            self.stats.mv_upper += 1;
        } else {
            self.stats.mv_lower += 1;
        }

        let start = self.bw.position_in_bits();
        if scale == 1 || value == 0 {
            self.coder.put_mv_code(self.bw, value);
        } else {
            let magnitude = value.abs();
            let residual = (magnitude - 1) % scale;
            let data = (magnitude - 1 - residual) / scale + 1;
            self.coder.put_mv_code(self.bw, data * value.signum());
            self.bw.put_bits(residual as u32, self.fcode as u32 - 1);
        }
        self.stats.mv_bits += (self.bw.position_in_bits() - start) as u64;
    }
}
