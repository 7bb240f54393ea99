use crate::error::EncoderError;
use crate::plane::{Component, Plane, PlaneSet};
use crate::vop::{CHROMA_EDGE, LUMA_EDGE};

/// Scratch planes holding the half-pel shifted copies of a reference
/// picture. Allocated once per encoder.
#[derive(Debug)]
pub struct HalfpelPlanes {
    pub h: PlaneSet,
    pub v: PlaneSet,
    pub hv: PlaneSet,
}

impl HalfpelPlanes {
    pub fn new(width: usize, height: usize) -> Result<Self, EncoderError> {
        Ok(Self {
            h: PlaneSet::new(width, height, LUMA_EDGE, CHROMA_EDGE)?,
            v: PlaneSet::new(width, height, LUMA_EDGE, CHROMA_EDGE)?,
            hv: PlaneSet::new(width, height, LUMA_EDGE, CHROMA_EDGE)?,
        })
    }
}

/// Fills `h`, `v` and `hv` from `src` over the whole padded area. Samples
/// beyond the last column or row reuse the edge sample.
pub fn interpolate_plane(src: &Plane, h: &mut Plane, v: &mut Plane, hv: &mut Plane, rounding: u8) {
    let stride = src.stride();
    let data = src.data();
    let rows = data.len() / stride;
    let r = rounding as u16;

    let h_out = h.data_mut();
    let v_out = v.data_mut();
    let hv_out = hv.data_mut();
    for row in 0..rows {
        let line = &data[row * stride..(row + 1) * stride];
        let below = &data[(row + 1).min(rows - 1) * stride..][..stride];
        for x in 0..stride {
            let next = (x + 1).min(stride - 1);
            let a = line[x] as u16;
            let b = line[next] as u16;
            let c = below[x] as u16;
            let d = below[next] as u16;
            let i = row * stride + x;
            h_out[i] = ((a + b + 1 - r) >> 1) as u8;
            v_out[i] = ((a + c + 1 - r) >> 1) as u8;
            hv_out[i] = ((a + b + c + d + 2 - r) >> 2) as u8;
        }
    }
}

/// Interpolates every plane of `src`, or only its chroma planes when luma
/// half-pel positions will never be searched.
pub fn interpolate(src: &PlaneSet, out: &mut HalfpelPlanes, rounding: u8, chroma_only: bool) {
    let components: &[Component] = if chroma_only {
        &[Component::U, Component::V]
    } else {
        &[Component::Y, Component::U, Component::V]
    };
    for &component in components {
        let HalfpelPlanes { h, v, hv } = &mut *out;
        interpolate_plane(
            src.plane(component),
            h.plane_mut(component),
            v.plane_mut(component),
            hv.plane_mut(component),
            rounding,
        );
    }
}

/// The reference picture and its three half-pel companions.
#[derive(Clone, Copy)]
pub struct RefPlanes<'a> {
    pub full: &'a PlaneSet,
    pub h: &'a PlaneSet,
    pub v: &'a PlaneSet,
    pub hv: &'a PlaneSet,
}

impl<'a> RefPlanes<'a> {
    pub fn new(full: &'a PlaneSet, halfpel: &'a HalfpelPlanes) -> Self {
        Self {
            full,
            h: &halfpel.h,
            v: &halfpel.v,
            hv: &halfpel.hv,
        }
    }

    /// Resolves a half-pel displacement to the plane holding that phase and
    /// the full-pel offset into it.
    pub fn select(&self, component: Component, dx: i32, dy: i32) -> (&'a Plane, isize, isize) {
        let set = match (dx & 1 != 0, dy & 1 != 0) {
            (false, false) => self.full,
            (true, false) => self.h,
            (false, true) => self.v,
            (true, true) => self.hv,
        };
        (
            set.plane(component),
            (dx >> 1) as isize,
            (dy >> 1) as isize,
        )
    }
}
