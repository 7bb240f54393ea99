use crate::halfpel::RefPlanes;
use crate::macroblock::{MbMode, MotionVector};
use crate::plane::{Component, Plane, PlaneSet};
use crate::predict::predict_mv;
use crate::sad::{sad_block, sad_deviation_mb, sad_macroblock};
use crate::vlc::mv_bits;
use crate::vop::Vop;

pub const MV_MAX_ERROR: i32 = 4096 * 256;
/// Margin by which the intra deviation must beat the inter cost.
pub const FAVOR_INTER: i32 = 432;
/// Bias towards one vector per macroblock, scaled by the quantizer.
pub const MV16X16_BIAS: i32 = 5;
pub const MV_SIZE_WEIGHT: i32 = 4;
/// Weight of the vector rate term in search costs, 16x16 and 8x8 alike.
const RATE_WEIGHT: i32 = 2;
const ZERO_VECTOR_THRESHOLD: i32 = 96;
const ZERO_VECTOR_BONUS: i32 = 129;
/// Searched blocks stay this far inside the luma border, which keeps every
/// half-pel and derived chroma read inside the padding.
const SEARCH_MARGIN: isize = 8;

const CHROMA_ROUNDING: [i32; 16] = [0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2];

#[derive(Clone, Copy)]
struct DiamondPoint {
    x: i32,
    y: i32,
    /// First point of the next ring after moving onto this one.
    start: usize,
}

const fn point(x: i32, y: i32, start: usize) -> DiamondPoint {
    DiamondPoint { x, y, start }
}

const LARGE_DIAMOND: [DiamondPoint; 8] = [
    point(0, 2, 6),
    point(1, 1, 0),
    point(2, 0, 0),
    point(1, -1, 2),
    point(0, -2, 2),
    point(-1, -1, 4),
    point(-2, 0, 4),
    point(-1, 1, 6),
];

const SMALL_DIAMOND: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Per-frame motion search settings.
#[derive(Debug, Clone, Copy)]
pub struct MotionParams {
    pub fcode: u8,
    pub quant: u8,
    pub quality: u8,
}

fn rate_cost(d: MotionVector, fcode: u8) -> i32 {
    RATE_WEIGHT * (mv_bits(d.x, fcode) + mv_bits(d.y, fcode))
}

fn vector_size(d: MotionVector, fcode: u8) -> i32 {
    MV_SIZE_WEIGHT * (mv_bits(d.x, fcode) + mv_bits(d.y, fcode))
}

/// Allowed full-pel steps around half the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchWindow {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl SearchWindow {
    fn new(x: isize, y: isize, size: usize, pred: MotionVector, fcode: u8, luma: &Plane) -> Self {
        let range = 16 << (fcode - 1);
        let high = range - 3;
        let low = -range + 2;
        let (px, py) = (pred.x / 2, pred.y / 2);
        let edge = luma.edge() as isize;
        let lowest = -(edge - SEARCH_MARGIN);
        let right = (luma.aligned_width() as isize + edge - SEARCH_MARGIN - size as isize) as i32;
        let bottom = (luma.aligned_height() as isize + edge - SEARCH_MARGIN - size as isize) as i32;
        Self {
            min_x: (-range).max(low - px).max(lowest as i32 - x as i32 - px),
            max_x: range.min(high - px).min(right - x as i32 - px),
            min_y: (-range).max(low - py).max(lowest as i32 - y as i32 - py),
            max_y: range.min(high - py).min(bottom - y as i32 - py),
        }
    }

    fn contains(&self, (x, y): (i32, i32)) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[derive(Debug, Clone, Copy)]
struct Best {
    /// Full-pel step relative to half the predictor.
    step: (i32, i32),
    sad: i32,
    delta: i32,
}

impl Best {
    fn cost(&self) -> i32 {
        self.sad + self.delta
    }
}

/// One block being matched: where it may move and how a displacement is
/// scored.
struct Matcher<F> {
    pred: MotionVector,
    window: SearchWindow,
    quant: i32,
    fcode: u8,
    sad: F,
}

impl<F: Fn(MotionVector, i32) -> i32> Matcher<F> {
    fn vector(&self, step: (i32, i32)) -> MotionVector {
        self.pred + MotionVector::new(2 * step.0, 2 * step.1)
    }

    /// Scores `step` and takes it if it beats `best`.
    fn try_step(&self, step: (i32, i32), best: &mut Best) -> bool {
        if !self.window.contains(step) {
            return false;
        }
        let sad = (self.sad)(self.vector(step), best.cost());
        let delta = rate_cost(MotionVector::new(2 * step.0, 2 * step.1), self.fcode) * self.quant;
        if sad + delta < best.cost() {
            *best = Best { step, sad, delta };
            return true;
        }
        false
    }

    /// Large diamond descent from `seed` until the centre wins, then one
    /// small diamond ring. Reports whether `watch` was scored on the way.
    fn diamond_search(&self, seed: (i32, i32), watch: (i32, i32)) -> (Best, bool) {
        let mut best = Best {
            step: seed,
            sad: MV_MAX_ERROR,
            delta: 0,
        };
        let mut watched = false;
        let mut centre = seed;
        let mut start = 0;
        let mut count = LARGE_DIAMOND.len();
        loop {
            let mut direction = None;
            for i in 0..count {
                let index = (start + i) % LARGE_DIAMOND.len();
                let p = LARGE_DIAMOND[index];
                let step = (centre.0 + p.x, centre.1 + p.y);
                watched |= step == watch;
                if self.try_step(step, &mut best) {
                    direction = Some(index);
                }
            }
            let Some(direction) = direction else {
                break;
            };
            count = if best.step.0 == centre.0 || best.step.1 == centre.1 { 5 } else { 3 };
            start = LARGE_DIAMOND[direction].start;
            centre = best.step;
        }
        for (dx, dy) in SMALL_DIAMOND {
            let step = (centre.0 + dx, centre.1 + dy);
            watched |= step == watch;
            self.try_step(step, &mut best);
        }
        (best, watched)
    }

    /// Checks the eight half-pel neighbours of `centre`.
    fn refine_half_pel(&self, centre: MotionVector, sad: &mut i32, cost: &mut i32) -> MotionVector {
        let mut best = centre;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let v = centre + MotionVector::new(dx, dy);
                let candidate = (self.sad)(v, *cost);
                let delta = rate_cost(v - self.pred, self.fcode) * self.quant;
                if candidate + delta < *cost {
                    best = v;
                    *sad = candidate;
                    *cost = candidate + delta;
                }
            }
        }
        best
    }
}

/// Best whole-macroblock vector and its SAD.
pub fn search16(
    src: &Plane,
    refs: &RefPlanes,
    mbx: usize,
    mby: usize,
    pred: MotionVector,
    params: MotionParams,
) -> (MotionVector, i32) {
    let quality = params.quality;
    let matcher = Matcher {
        pred,
        window: SearchWindow::new(
            mbx as isize * 16,
            mby as isize * 16,
            16,
            pred,
            params.fcode,
            &refs.full.y,
        ),
        quant: params.quant as i32,
        fcode: params.fcode,
        sad: |v, threshold| sad_macroblock(src, refs, mbx, mby, v, threshold, quality),
    };

    let zero_step = (-pred.x / 2, -pred.y / 2);
    let (mut best, zero_visited) = matcher.diamond_search((0, 0), zero_step);
    if quality > 4 && !zero_visited && zero_step != (0, 0) {
        let (second, _) = matcher.diamond_search(zero_step, zero_step);
        if second.cost() <= best.cost() {
            best = second;
        }
    }

    let mut mv = matcher.vector(best.step);
    let mut sad = best.sad;
    let mut cost = best.cost();

    let mut zero_sad = sad_macroblock(src, refs, mbx, mby, MotionVector::ZERO, MV_MAX_ERROR, quality);
    if zero_sad <= ZERO_VECTOR_THRESHOLD * params.quant as i32 {
        zero_sad -= ZERO_VECTOR_BONUS;
    }
    let zero_cost = zero_sad + rate_cost(pred, params.fcode) * params.quant as i32;
    if zero_cost < cost {
        mv = MotionVector::ZERO;
        sad = zero_sad;
        cost = zero_cost;
    }

    if quality > 3 {
        mv = matcher.refine_half_pel(mv, &mut sad, &mut cost);
    }
    (mv, sad)
}

/// Best vector for luma block `block` of the macroblock, starting from the
/// whole-macroblock vector.
#[allow(clippy::too_many_arguments)]
pub fn search8(
    src: &Plane,
    refs: &RefPlanes,
    mbx: usize,
    mby: usize,
    block: usize,
    pred: MotionVector,
    start: MotionVector,
    params: MotionParams,
) -> (MotionVector, i32) {
    let x = mbx as isize * 16 + 8 * (block & 1) as isize;
    let y = mby as isize * 16 + 8 * (block >> 1) as isize;
    let matcher = Matcher {
        pred,
        window: SearchWindow::new(x, y, 8, pred, params.fcode, &refs.full.y),
        quant: params.quant as i32,
        fcode: params.fcode,
        sad: |v, threshold| sad_block(src, refs, x, y, v, threshold),
    };
    let seed = ((start.x - pred.x) / 2, (start.y - pred.y) / 2);
    let (best, _) = matcher.diamond_search(seed, seed);
    let mut mv = matcher.vector(best.step);
    let mut sad = best.sad;
    let mut cost = best.cost();
    if params.quality > 4 {
        mv = matcher.refine_half_pel(mv, &mut sad, &mut cost);
    }
    (mv, sad)
}

/// Chroma displacement for a single luma vector component.
pub fn chroma_from_single(d: i32) -> i32 {
    if d % 4 == 0 { d / 2 } else { (d >> 1) | 1 }
}

/// Chroma displacement from the sum of four luma vector components.
pub fn chroma_from_sum(sum: i32) -> i32 {
    if sum == 0 {
        return 0;
    }
    let magnitude = sum.abs();
    sum.signum() * (CHROMA_ROUNDING[(magnitude % 16) as usize] + (magnitude / 16) * 2)
}

/// Copies one 8x8 block at `(x, y)` of `component` from the reference
/// displaced by `d`.
fn compensate_block(
    dst: &mut PlaneSet,
    refs: &RefPlanes,
    component: Component,
    x: isize,
    y: isize,
    d: MotionVector,
) {
    let (plane, dx, dy) = refs.select(component, d.x, d.y);
    let out = dst.plane_mut(component);
    for row in 0..8 {
        out.row_mut(x, y + row, 8)
            .copy_from_slice(plane.row(x + dx, y + dy + row, 8));
    }
}

/// Builds the motion-compensated prediction of an inter macroblock in
/// `planes`. Intra macroblocks are left alone.
pub fn compensate_macroblock(
    planes: &mut PlaneSet,
    refs: &RefPlanes,
    mbx: usize,
    mby: usize,
    mode: MbMode,
    mvs: &[MotionVector; 4],
) {
    let chroma = match mode {
        MbMode::Intra => return,
        MbMode::Inter => MotionVector::new(chroma_from_single(mvs[0].x), chroma_from_single(mvs[0].y)),
        MbMode::Inter4V => {
            let sum = mvs.iter().fold(MotionVector::ZERO, |acc, &v| acc + v);
            MotionVector::new(chroma_from_sum(sum.x), chroma_from_sum(sum.y))
        }
    };
    let (x, y) = (mbx as isize * 16, mby as isize * 16);
    for (block, &mv) in mvs.iter().enumerate() {
        let (_, bx, by) = Component::of_block(block);
        compensate_block(planes, refs, Component::Y, x + bx, y + by, mv);
    }
    let (cx, cy) = (mbx as isize * 8, mby as isize * 8);
    compensate_block(planes, refs, Component::U, cx, cy, chroma);
    compensate_block(planes, refs, Component::V, cx, cy, chroma);
}

/// Chooses a mode and vectors for every macroblock of `current` against
/// `refs`, and writes the motion-compensated prediction of each inter
/// macroblock into `current`.
///
/// Returns the fraction of macroblocks that fell back to intra.
pub fn motion_estimate_compensate(
    current: &mut Vop,
    refs: &RefPlanes,
    source: &PlaneSet,
    params: MotionParams,
) -> f32 {
    let q = params.quant as i32;
    let mut intra = 0usize;
    for mby in 0..current.mb_height() {
        for mbx in 0..current.mb_width() {
            let pred = predict_mv(current, mbx, mby, 0);
            let (mv16, sad16) = search16(&source.y, refs, mbx, mby, pred, params);

            let mut sad8 = 0;
            let mut mv_size = -vector_size(mv16 - pred, params.fcode);
            if params.quality > 3 {
                for block in 0..4 {
                    let pred = predict_mv(current, mbx, mby, block);
                    let (mv, sad) = search8(&source.y, refs, mbx, mby, block, pred, mv16, params);
                    current.mb_mut(mbx, mby).mvs[block] = mv;
                    mv_size += vector_size(mv - pred, params.fcode);
                    sad8 += sad;
                }
            }
            let deviation = sad_deviation_mb(&source.y, mbx, mby);

            let mb = current.mb_mut(mbx, mby);
            let cost = if params.quality <= 3 || sad16 < sad8 + MV16X16_BIAS * q + mv_size * q / 4 {
                mb.mode = MbMode::Inter;
                mb.set_single_vector(mv16);
                sad16
            } else {
                mb.mode = MbMode::Inter4V;
                sad8
            };
            if deviation < cost - FAVOR_INTER {
                mb.mode = MbMode::Intra;
                mb.set_single_vector(MotionVector::ZERO);
                intra += 1;
            }
            let (mode, mvs) = (mb.mode, mb.mvs);
            compensate_macroblock(&mut current.planes, refs, mbx, mby, mode, &mvs);
        }
    }
    intra as f32 / current.macroblocks().len() as f32
}
