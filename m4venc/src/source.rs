use crate::error::EncoderError;
use crate::plane::PlaneSet;
use crate::y4m::FramePixels;

/// Copies `frame` into the unpadded, macroblock-aligned source planes and
/// replicates the last row and column into the alignment slack.
pub fn load_source(dst: &mut PlaneSet, frame: &FramePixels) -> Result<(), EncoderError> {
    let (width, height) = (dst.y.width(), dst.y.height());
    if frame.width as usize != width || frame.height as usize != height {
        return Err(EncoderError::DimensionMismatch {
            expected_w: width as u32,
            expected_h: height as u32,
            got_w: frame.width,
            got_h: frame.height,
        });
    }

    let luma = width * height;
    let chroma = (width / 2) * (height / 2);
    if frame.y.len() < luma || frame.u.len() < chroma || frame.v.len() < chroma {
        return Err(EncoderError::FrameTooShort {
            expected: luma + 2 * chroma,
            actual: frame.y.len() + frame.u.len() + frame.v.len(),
        });
    }

    dst.y.copy_from(&frame.y, width);
    dst.u.copy_from(&frame.u, width / 2);
    dst.v.copy_from(&frame.v, width / 2);
    dst.set_edges();
    Ok(())
}
