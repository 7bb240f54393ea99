use crate::macroblock::{DEFAULT_PREDICTION, MbMode, MotionVector, PredictionValues};
use crate::vop::Vop;

/// Median of three, as used for motion vector prediction.
fn median(a: i32, b: i32, c: i32) -> i32 {
    a.max(b).min(b.max(c).min(a.max(c)))
}

/// Neighbours `(block, dx, dy)` whose vectors feed the median for each of
/// the four luma blocks.
const MV_CANDIDATES: [[(usize, isize, isize); 3]; 4] = [
    [(1, -1, 0), (2, 0, -1), (2, 1, -1)],
    [(0, 0, 0), (3, 0, -1), (2, 1, -1)],
    [(3, -1, 0), (0, 0, 0), (1, 0, 0)],
    [(2, 0, 0), (0, 0, 0), (1, 0, 0)],
];

/// Predicted vector for luma block `block` of macroblock `(mbx, mby)`.
///
/// Only causal neighbours are read, so this can run while the grid is
/// being filled in raster order.
pub fn predict_mv(vop: &Vop, mbx: usize, mby: usize, block: usize) -> MotionVector {
    debug_assert!(block < 4);
    if mby == 0 && block < 2 {
        return match (block, mbx) {
            (0, 0) => MotionVector::ZERO,
            (0, _) => vop.mb(mbx - 1, 0).mvs[1],
            _ => vop.mb(mbx, 0).mvs[0],
        };
    }

    let [p1, p2, p3] = MV_CANDIDATES[block].map(|(vec, dx, dy)| {
        vop.neighbour(mbx as isize + dx, mby as isize + dy)
            .map_or(MotionVector::ZERO, |mb| mb.mvs[vec])
    });
    MotionVector::new(median(p1.x, p2.x, p3.x), median(p1.y, p2.y, p3.y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcPredDirection {
    None,
    /// Predict the first row from the block above.
    Vertical,
    /// Predict the first column from the block to the left.
    Horizontal,
}

#[derive(Debug, Clone, Copy)]
pub struct AcDcPrediction {
    pub direction: AcPredDirection,
    pub dc: i16,
    /// First row (vertical) or first column (horizontal) of the neighbour.
    pub ac: [i16; 7],
    /// Gain from AC prediction, `S2 - S1`.
    pub metric: i32,
}

fn div_round(a: i32, b: i32) -> i32 {
    if a > 0 { (a + b / 2) / b } else { (a - b / 2) / b }
}

/// Left, top and diagonal neighbour block for each of the six blocks.
#[derive(Clone, Copy)]
enum Source {
    Left(usize),
    Top(usize),
    Diag(usize),
    Current(usize),
}

const ACDC_NEIGHBOURS: [[Source; 3]; 6] = [
    [Source::Left(1), Source::Top(2), Source::Diag(3)],
    [Source::Current(0), Source::Top(3), Source::Top(2)],
    [Source::Left(3), Source::Current(0), Source::Left(1)],
    [Source::Current(2), Source::Current(1), Source::Current(0)],
    [Source::Left(4), Source::Top(4), Source::Diag(4)],
    [Source::Left(5), Source::Top(5), Source::Diag(5)],
];

fn intra_history(vop: &Vop, mbx: isize, mby: isize) -> Option<&[PredictionValues; 6]> {
    vop.neighbour(mbx, mby)
        .filter(|mb| mb.mode == MbMode::Intra)
        .map(|mb| &mb.pred_values)
}

/// Chooses the AC/DC prediction direction for one block of an intra
/// macroblock and records the block's own levels for later neighbours.
///
/// `levels` are the quantized coefficients in natural order.
pub fn predict_acdc(
    vop: &mut Vop,
    mbx: usize,
    mby: usize,
    block: usize,
    levels: &[i16; 64],
    dc_scaler: i32,
) -> AcDcPrediction {
    let (x, y) = (mbx as isize, mby as isize);
    let [left, top, diag] = {
        let current = &vop.mb(mbx, mby).pred_values;
        ACDC_NEIGHBOURS[block].map(|source| match source {
            Source::Left(b) => intra_history(vop, x - 1, y).map(|h| h[b]),
            Source::Top(b) => intra_history(vop, x, y - 1).map(|h| h[b]),
            Source::Diag(b) => intra_history(vop, x - 1, y - 1).map(|h| h[b]),
            Source::Current(b) => Some(current[b]),
        })
    };
    let left = left.unwrap_or(DEFAULT_PREDICTION);
    let top = top.unwrap_or(DEFAULT_PREDICTION);
    let diag = diag.unwrap_or(DEFAULT_PREDICTION);

    let (l0, t0, d0) = (left[0] as i32, top[0] as i32, diag[0] as i32);
    let (direction, dc, ac): (_, _, [i16; 7]) = if (l0 - d0).abs() < (t0 - d0).abs() {
        (
            AcPredDirection::Vertical,
            div_round(t0, dc_scaler),
            std::array::from_fn(|i| top[1 + i]),
        )
    } else {
        (
            AcPredDirection::Horizontal,
            div_round(l0, dc_scaler),
            std::array::from_fn(|i| left[8 + i]),
        )
    };

    let mut s1 = 0i32;
    let mut s2 = 0i32;
    for i in 1..8 {
        let actual = match direction {
            AcPredDirection::Vertical => levels[i],
            _ => levels[i * 8],
        } as i32;
        s1 += (ac[i - 1] as i32 - actual).abs();
        s2 += actual.abs();
    }

    let history = &mut vop.mb_mut(mbx, mby).pred_values[block];
    history[0] = (levels[0] as i32 * dc_scaler) as i16;
    for i in 1..8 {
        history[i] = levels[i];
        history[i + 7] = levels[i * 8];
    }

    AcDcPrediction {
        direction,
        dc: dc as i16,
        ac,
        metric: s2 - s1,
    }
}
