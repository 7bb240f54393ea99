use std::ops::{Add, Sub};

/// Motion vector in half-pel units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MotionVector {
    pub x: i32,
    pub y: i32,
}

impl MotionVector {
    pub const ZERO: MotionVector = MotionVector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Add for MotionVector {
    type Output = MotionVector;

    fn add(self, rhs: MotionVector) -> MotionVector {
        MotionVector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for MotionVector {
    type Output = MotionVector;

    fn sub(self, rhs: MotionVector) -> MotionVector {
        MotionVector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MbMode {
    #[default]
    Inter,
    Inter4V,
    Intra,
}

impl MbMode {
    /// Macroblock type as used to index the MCBPC tables.
    pub fn mb_type(self) -> usize {
        match self {
            MbMode::Inter => 0,
            MbMode::Inter4V => 2,
            MbMode::Intra => 3,
        }
    }
}

/// Slot 0 is `dc * dc_scaler`, 1..8 the first row and 8..15 the first
/// column of quantized AC levels.
pub type PredictionValues = [i16; 15];

pub const DEFAULT_PREDICTION: PredictionValues = {
    let mut v = [0i16; 15];
    v[0] = 1024;
    v
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macroblock {
    pub mvs: [MotionVector; 4],
    pub mode: MbMode,
    pub dquant: i8,
    pub cbp: u8,
    pub pred_values: [PredictionValues; 6],
}

impl Default for Macroblock {
    fn default() -> Self {
        Self {
            mvs: [MotionVector::ZERO; 4],
            mode: MbMode::Inter,
            dquant: 0,
            cbp: 0,
            pred_values: [DEFAULT_PREDICTION; 6],
        }
    }
}

impl Macroblock {
    pub fn set_single_vector(&mut self, mv: MotionVector) {
        self.mvs = [mv; 4];
    }

    pub fn is_skipped(&self) -> bool {
        self.mode == MbMode::Inter && self.cbp == 0 && self.mvs[0].is_zero()
    }
}
