use crate::halfpel::RefPlanes;
use crate::macroblock::MotionVector;
use crate::plane::{Component, Plane, PlaneSet};

/// Row and column step used for 16x16 matching at a given search quality.
pub fn subsample_step(quality: u8) -> usize {
    match quality {
        1 => 4,
        2 => 2,
        _ => 1,
    }
}

/// Sum of absolute differences between a `size x size` region of `src` at
/// `(x, y)` and of `reference` at `(rx, ry)`, sampling every `step`-th row
/// and column and scaling the result back up.
///
/// Stops as soon as the scaled partial sum exceeds `threshold`.
#[allow(clippy::too_many_arguments)]
pub fn sad_region(
    src: &Plane,
    reference: &Plane,
    x: isize,
    y: isize,
    rx: isize,
    ry: isize,
    size: usize,
    step: usize,
    threshold: i32,
) -> i32 {
    let scale = (step * step) as i32;
    let mut sum = 0i32;
    for row in (0..size).step_by(step) {
        let s = src.row(x, y + row as isize, size);
        let r = reference.row(rx, ry + row as isize, size);
        sum += s
            .iter()
            .zip(r)
            .step_by(step)
            .map(|(&a, &b)| (a as i32 - b as i32).abs())
            .sum::<i32>();
        if sum * scale > threshold {
            break;
        }
    }
    sum * scale
}

/// SAD of the 8x8 luma block at pixel `(x, y)` against the reference
/// displaced by half-pel vector `v`.
pub fn sad_block(src: &Plane, refs: &RefPlanes, x: isize, y: isize, v: MotionVector, threshold: i32) -> i32 {
    let (plane, dx, dy) = refs.select(Component::Y, v.x, v.y);
    sad_region(src, plane, x, y, x + dx, y + dy, 8, 1, threshold)
}

/// SAD of macroblock `(mbx, mby)` against the reference displaced by `v`.
/// Qualities 1 and 2 subsample.
pub fn sad_macroblock(
    src: &Plane,
    refs: &RefPlanes,
    mbx: usize,
    mby: usize,
    v: MotionVector,
    threshold: i32,
    quality: u8,
) -> i32 {
    let (plane, dx, dy) = refs.select(Component::Y, v.x, v.y);
    let (x, y) = (mbx as isize * 16, mby as isize * 16);
    sad_region(src, plane, x, y, x + dx, y + dy, 16, subsample_step(quality), threshold)
}

/// Sum of absolute deviations of the macroblock's luma from its own mean.
pub fn sad_deviation_mb(src: &Plane, mbx: usize, mby: usize) -> i32 {
    let (x, y) = (mbx as isize * 16, mby as isize * 16);
    let rows: [&[u8]; 16] = std::array::from_fn(|r| src.row(x, y + r as isize, 16));
    let total: i32 = rows.iter().flat_map(|r| r.iter()).map(|&p| p as i32).sum();
    let mean = total / 256;
    rows.iter()
        .flat_map(|r| r.iter())
        .map(|&p| (p as i32 - mean).abs())
        .sum()
}

/// Mean absolute difference between two pictures over all three planes.
pub fn mad_image(a: &PlaneSet, b: &PlaneSet) -> f64 {
    let mut total = 0u64;
    for component in [Component::Y, Component::U, Component::V] {
        let (pa, pb) = (a.plane(component), b.plane(component));
        for y in 0..pa.height() as isize {
            let ra = pa.row(0, y, pa.width());
            let rb = pb.row(0, y, pa.width());
            total += ra
                .iter()
                .zip(rb)
                .map(|(&p, &q)| (p as i32 - q as i32).unsigned_abs() as u64)
                .sum::<u64>();
        }
    }
    let samples = a.y.width() * a.y.height() * 3 / 2;
    if samples == 0 {
        return 0.0;
    }
    total as f64 / samples as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halfpel::{HalfpelPlanes, interpolate};
    use crate::vop::{CHROMA_EDGE, LUMA_EDGE};

    fn filled(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> PlaneSet {
        let mut set = PlaneSet::new(width, height, LUMA_EDGE, CHROMA_EDGE).unwrap();
        let luma: Vec<u8> = (0..width * height).map(|i| f(i % width, i / width)).collect();
        set.y.copy_from(&luma, width);
        let chroma = vec![128u8; width * height / 4];
        set.u.copy_from(&chroma, width / 2);
        set.v.copy_from(&chroma, width / 2);
        set.set_edges();
        set
    }

    #[test]
    fn identical_blocks_have_zero_sad() {
        let set = filled(32, 32, |x, y| (x * 3 + y * 5) as u8);
        let halfpel = HalfpelPlanes::new(32, 32).unwrap();
        let refs = RefPlanes::new(&set, &halfpel);
        assert_eq!(sad_macroblock(&set.y, &refs, 1, 1, MotionVector::ZERO, i32::MAX, 5), 0);
        assert_eq!(sad_block(&set.y, &refs, 8, 8, MotionVector::ZERO, i32::MAX), 0);
    }

    #[test]
    fn full_pel_displacement_matches_shifted_content() {
        let src = filled(32, 32, |x, _| ((x + 2) * 4) as u8);
        let reference = filled(32, 32, |x, _| (x * 4) as u8);
        let halfpel = HalfpelPlanes::new(32, 32).unwrap();
        let refs = RefPlanes::new(&reference, &halfpel);
        // src(x) == reference(x + 2) everywhere in the first macroblock
        assert_eq!(sad_macroblock(&src.y, &refs, 0, 0, MotionVector::new(4, 0), i32::MAX, 5), 0);
        assert_eq!(sad_macroblock(&src.y, &refs, 0, 0, MotionVector::ZERO, i32::MAX, 5), 8 * 256);
    }

    #[test]
    fn half_pel_uses_interpolated_plane() {
        let set = filled(32, 32, |x, _| (x * 4) as u8);
        let mut halfpel = HalfpelPlanes::new(32, 32).unwrap();
        interpolate(&set, &mut halfpel, 0, false);
        let src = filled(32, 32, |x, _| (x * 4 + 2) as u8);
        let refs = RefPlanes::new(&set, &halfpel);
        assert_eq!(sad_macroblock(&src.y, &refs, 0, 0, MotionVector::new(1, 0), i32::MAX, 5), 0);
    }

    #[test]
    fn early_exit_stops_above_threshold() {
        let src = filled(16, 16, |_, _| 100);
        let reference = filled(16, 16, |_, _| 0);
        let halfpel = HalfpelPlanes::new(16, 16).unwrap();
        let refs = RefPlanes::new(&reference, &halfpel);
        let full = sad_macroblock(&src.y, &refs, 0, 0, MotionVector::ZERO, i32::MAX, 5);
        assert_eq!(full, 25600);
        let partial = sad_macroblock(&src.y, &refs, 0, 0, MotionVector::ZERO, 1000, 5);
        assert_eq!(partial, 1600);
    }

    #[test]
    fn subsampling_scales_back_up() {
        let src = filled(16, 16, |_, _| 10);
        let reference = filled(16, 16, |_, _| 0);
        let halfpel = HalfpelPlanes::new(16, 16).unwrap();
        let refs = RefPlanes::new(&reference, &halfpel);
        for quality in 1..=5 {
            assert_eq!(
                sad_macroblock(&src.y, &refs, 0, 0, MotionVector::ZERO, i32::MAX, quality),
                2560,
                "quality {quality}"
            );
        }
    }

    #[test]
    fn deviation_of_flat_block_is_zero() {
        let set = filled(16, 16, |_, _| 77);
        assert_eq!(sad_deviation_mb(&set.y, 0, 0), 0);
        let stripes = filled(16, 16, |x, _| if x % 2 == 0 { 0 } else { 100 });
        assert_eq!(sad_deviation_mb(&stripes.y, 0, 0), 256 * 50);
    }

    #[test]
    fn deviation_reads_every_row_of_the_macroblock() {
        // only the lower right macroblock has alternating rows
        let set = filled(32, 32, |x, y| {
            if x >= 16 && y >= 16 && y % 2 == 1 { 40 } else { 0 }
        });
        assert_eq!(sad_deviation_mb(&set.y, 0, 1), 0);
        assert_eq!(sad_deviation_mb(&set.y, 1, 0), 0);
        assert_eq!(sad_deviation_mb(&set.y, 1, 1), 256 * 20);
    }

    #[test]
    fn mad_counts_all_planes() {
        let a = filled(16, 16, |_, _| 10);
        let b = filled(16, 16, |_, _| 13);
        // luma differs by 3 everywhere, chroma is equal
        let expected = (256.0 * 3.0) / 384.0;
        assert!((mad_image(&a, &b) - expected).abs() < 1e-9);
        assert_eq!(mad_image(&a, &a), 0.0);
    }
}
