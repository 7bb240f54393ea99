use crate::error::EncoderError;
use crate::y4m::FramePixels;

/// Layout of raw pictures handed to [`crate::Encoder::encode_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    /// Packed `R, G, B` bytes, top row first.
    Rgb24,
    /// Planar 4:2:0, Y then U then V.
    Yuv420,
}

impl Colorspace {
    pub fn frame_size(self, width: usize, height: usize) -> usize {
        match self {
            Colorspace::Rgb24 => width * height * 3,
            Colorspace::Yuv420 => width * height * 3 / 2,
        }
    }
}

fn luma(r: i32, g: i32, b: i32) -> u8 {
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8
}

fn chroma_u(r: i32, g: i32, b: i32) -> u8 {
    (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8
}

fn chroma_v(r: i32, g: i32, b: i32) -> u8 {
    (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8
}

/// BT.601 studio-range conversion. Chroma is computed from the average
/// colour of each 2x2 block. Dimensions must be even.
pub fn rgb24_to_yuv420(rgb: &[u8], width: usize, height: usize) -> FramePixels {
    debug_assert!(width % 2 == 0 && height % 2 == 0);
    debug_assert!(rgb.len() >= width * height * 3);
    let mut frame = FramePixels::solid(width as u32, height as u32, 0, 128, 128);
    let pixel = |x: usize, y: usize| {
        let i = (y * width + x) * 3;
        (rgb[i] as i32, rgb[i + 1] as i32, rgb[i + 2] as i32)
    };

    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = pixel(x, y);
            frame.y[y * width + x] = luma(r, g, b);
        }
    }

    let chroma_width = width / 2;
    for cy in 0..height / 2 {
        for cx in 0..chroma_width {
            let (mut r, mut g, mut b) = (0, 0, 0);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (pr, pg, pb) = pixel(2 * cx + dx, 2 * cy + dy);
                r += pr;
                g += pg;
                b += pb;
            }
            let (r, g, b) = ((r + 2) >> 2, (g + 2) >> 2, (b + 2) >> 2);
            frame.u[cy * chroma_width + cx] = chroma_u(r, g, b);
            frame.v[cy * chroma_width + cx] = chroma_v(r, g, b);
        }
    }
    frame
}

/// Interprets a raw buffer as a `width x height` picture.
pub fn frame_from_raw(
    data: &[u8],
    colorspace: Colorspace,
    width: usize,
    height: usize,
) -> Result<FramePixels, EncoderError> {
    let expected = colorspace.frame_size(width, height);
    if data.len() < expected {
        return Err(EncoderError::FrameTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(match colorspace {
        Colorspace::Rgb24 => rgb24_to_yuv420(data, width, height),
        Colorspace::Yuv420 => {
            let luma = width * height;
            let chroma = luma / 4;
            FramePixels {
                y: data[..luma].to_vec(),
                u: data[luma..luma + chroma].to_vec(),
                v: data[luma + chroma..luma + 2 * chroma].to_vec(),
                width: width as u32,
                height: height as u32,
            }
        }
    })
}
