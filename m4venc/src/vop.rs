use crate::error::EncoderError;
use crate::macroblock::Macroblock;
use crate::plane::PlaneSet;

pub const LUMA_EDGE: usize = 32;
pub const CHROMA_EDGE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VopType {
    Intra,
    Predicted,
}

impl VopType {
    pub fn coding_type(self) -> u32 {
        match self {
            VopType::Intra => 0,
            VopType::Predicted => 1,
        }
    }
}

/// One coded picture: padded planes plus the macroblock grid describing how
/// each macroblock was coded.
#[derive(Debug)]
pub struct Vop {
    pub planes: PlaneSet,
    macroblocks: Vec<Macroblock>,
    width: usize,
    height: usize,
    mb_width: usize,
    mb_height: usize,
    pub vop_type: VopType,
}

impl Vop {
    pub fn new(width: usize, height: usize) -> Result<Self, EncoderError> {
        let planes = PlaneSet::new(width, height, LUMA_EDGE, CHROMA_EDGE)?;
        let mb_width = width.div_ceil(16);
        let mb_height = height.div_ceil(16);
        let count = mb_width * mb_height;
        let mut macroblocks = Vec::new();
        macroblocks
            .try_reserve_exact(count)
            .map_err(|_| EncoderError::OutOfMemory {
                bytes: count * std::mem::size_of::<Macroblock>(),
            })?;
        macroblocks.resize(count, Macroblock::default());
        Ok(Self {
            planes,
            macroblocks,
            width,
            height,
            mb_width,
            mb_height,
            vop_type: VopType::Intra,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    pub fn mb_height(&self) -> usize {
        self.mb_height
    }

    pub fn macroblocks(&self) -> &[Macroblock] {
        &self.macroblocks
    }

    pub fn macroblocks_mut(&mut self) -> &mut [Macroblock] {
        &mut self.macroblocks
    }

    pub fn mb(&self, mbx: usize, mby: usize) -> &Macroblock {
        &self.macroblocks[mby * self.mb_width + mbx]
    }

    pub fn mb_mut(&mut self, mbx: usize, mby: usize) -> &mut Macroblock {
        &mut self.macroblocks[mby * self.mb_width + mbx]
    }

    /// Neighbour lookup; `None` outside the grid.
    pub fn neighbour(&self, mbx: isize, mby: isize) -> Option<&Macroblock> {
        if mbx < 0 || mby < 0 || mbx >= self.mb_width as isize || mby >= self.mb_height as isize
        {
            return None;
        }
        Some(self.mb(mbx as usize, mby as usize))
    }

    pub fn set_edges(&mut self) {
        self.planes.set_edges();
    }

    /// Exchanges pixel data only. Each VOP keeps its own macroblock grid.
    pub fn swap_planes(a: &mut Vop, b: &mut Vop) {
        debug_assert_eq!((a.width, a.height), (b.width, b.height));
        std::mem::swap(&mut a.planes, &mut b.planes);
    }
}
