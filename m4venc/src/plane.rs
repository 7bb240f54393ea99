use crate::error::EncoderError;

/// One padded sample plane.
///
/// Pixel (0,0) of the active picture lives at `origin`; coordinates are
/// signed so that reads into the border are explicit. Every access is
/// slice-checked.
#[derive(Debug, Clone)]
pub struct Plane {
    data: Vec<u8>,
    stride: usize,
    rows: usize,
    edge: usize,
    width: usize,
    height: usize,
    aligned_width: usize,
    aligned_height: usize,
    origin: usize,
}

pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>, EncoderError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| EncoderError::OutOfMemory { bytes: len })?;
    data.resize(len, 0);
    Ok(data)
}

impl Plane {
    pub fn new(
        width: usize,
        height: usize,
        aligned_width: usize,
        aligned_height: usize,
        edge: usize,
    ) -> Result<Self, EncoderError> {
        debug_assert!(aligned_width >= width && aligned_height >= height);
        let stride = aligned_width + 2 * edge;
        let rows = aligned_height + 2 * edge;
        let data = alloc_zeroed(stride * rows)?;
        Ok(Self {
            data,
            stride,
            rows,
            edge,
            width,
            height,
            aligned_width,
            aligned_height,
            origin: edge * stride + edge,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn aligned_width(&self) -> usize {
        self.aligned_width
    }

    pub fn aligned_height(&self) -> usize {
        self.aligned_height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Index into the backing buffer of the sample at `(x, y)`.
    #[inline]
    pub fn offset(&self, x: isize, y: isize) -> usize {
        let edge = self.edge as isize;
        debug_assert!(
            x >= -edge
                && y >= -edge
                && x < (self.aligned_width + self.edge) as isize
                && y < (self.aligned_height + self.edge) as isize,
            "({x}, {y}) outside padded plane"
        );
        (self.origin as isize + y * self.stride as isize + x) as usize
    }

    #[inline]
    pub fn at(&self, x: isize, y: isize) -> u8 {
        self.data[self.offset(x, y)]
    }

    #[inline]
    pub fn row(&self, x: isize, y: isize, len: usize) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + len]
    }

    #[inline]
    pub fn row_mut(&mut self, x: isize, y: isize, len: usize) -> &mut [u8] {
        let start = self.offset(x, y);
        &mut self.data[start..start + len]
    }

    /// Copies `width x height` samples from a tightly packed buffer.
    pub fn copy_from(&mut self, src: &[u8], src_stride: usize) {
        let width = self.width;
        for y in 0..self.height {
            let src_row = &src[y * src_stride..y * src_stride + width];
            self.row_mut(0, y as isize, width).copy_from_slice(src_row);
        }
    }

    /// Replicates the outermost active samples into every sample outside
    /// the `width x height` picture, including the macroblock alignment
    /// slack.
    pub fn set_edges(&mut self) {
        let edge = self.edge as isize;
        let width = self.width as isize;
        let height = self.height as isize;
        let right = (self.aligned_width + self.edge) as isize;

        for y in 0..height {
            let left = self.at(0, y);
            self.row_mut(-edge, y, self.edge).fill(left);
            let last = self.at(width - 1, y);
            let tail = (right - width) as usize;
            if tail > 0 {
                self.row_mut(width, y, tail).fill(last);
            }
        }

        let top = self.offset(-edge, 0);
        for y in -edge..0 {
            let dst = self.offset(-edge, y);
            self.data.copy_within(top..top + self.stride, dst);
        }
        let bottom = self.offset(-edge, height - 1);
        let bottom_rows = (self.rows as isize - edge - height) as usize;
        for i in 0..bottom_rows {
            let dst = self.offset(-edge, height + i as isize);
            self.data.copy_within(bottom..bottom + self.stride, dst);
        }
    }
}

/// Luma and both chroma planes of one picture.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

impl PlaneSet {
    pub fn new(
        width: usize,
        height: usize,
        luma_edge: usize,
        chroma_edge: usize,
    ) -> Result<Self, EncoderError> {
        let aligned_width = width.div_ceil(16) * 16;
        let aligned_height = height.div_ceil(16) * 16;
        Ok(Self {
            y: Plane::new(width, height, aligned_width, aligned_height, luma_edge)?,
            u: Plane::new(
                width / 2,
                height / 2,
                aligned_width / 2,
                aligned_height / 2,
                chroma_edge,
            )?,
            v: Plane::new(
                width / 2,
                height / 2,
                aligned_width / 2,
                aligned_height / 2,
                chroma_edge,
            )?,
        })
    }

    pub fn plane(&self, component: Component) -> &Plane {
        match component {
            Component::Y => &self.y,
            Component::U => &self.u,
            Component::V => &self.v,
        }
    }

    pub fn plane_mut(&mut self, component: Component) -> &mut Plane {
        match component {
            Component::Y => &mut self.y,
            Component::U => &mut self.u,
            Component::V => &mut self.v,
        }
    }

    pub fn set_edges(&mut self) {
        self.y.set_edges();
        self.u.set_edges();
        self.v.set_edges();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Y,
    U,
    V,
}

impl Component {
    /// Plane and block offset inside the macroblock for block index 0..6.
    pub fn of_block(block: usize) -> (Component, isize, isize) {
        match block {
            0 => (Component::Y, 0, 0),
            1 => (Component::Y, 8, 0),
            2 => (Component::Y, 0, 8),
            3 => (Component::Y, 8, 8),
            4 => (Component::U, 0, 0),
            _ => (Component::V, 0, 0),
        }
    }

    pub fn is_luma(self) -> bool {
        self == Component::Y
    }
}
