#![forbid(unsafe_code)]

pub mod bitwriter;
pub mod block;
pub mod colorspace;
pub mod dct;
pub mod encoder;
pub mod error;
pub mod halfpel;
pub mod header;
pub mod macroblock;
pub mod motion;
pub mod packet;
pub mod plane;
pub mod predict;
pub mod profile;
pub mod quant;
pub mod rc;
pub mod sad;
pub mod scan;
pub mod source;
pub mod vlc;
pub mod vop;
pub mod y4m;

pub use block::Statistics;
pub use colorspace::Colorspace;
pub use encoder::{Encoder, EncoderConfig};
pub use error::{EncoderError, Status, Y4mError};
pub use macroblock::{MbMode, MotionVector};
pub use packet::{FrameType, Packet};
pub use rc::{RateControl, RateControlStats, RatePolicy};
pub use vlc::{EntropyCoder, Mpeg4Vlc};
pub use y4m::FramePixels;

/// Encodes a sequence of equally sized pictures into one elementary stream.
pub fn encode(frames: &[FramePixels], config: &EncoderConfig) -> Result<Vec<u8>, EncoderError> {
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let mut enc = Encoder::new(first.width, first.height, config.clone())?;
    let mut output = Vec::new();
    for pixels in frames {
        let packet = enc.encode_frame(pixels)?;
        output.extend_from_slice(&packet.data);
    }
    Ok(output)
}

/// Encodes a single solid-colour picture.
pub fn encode_solid(
    width: u32,
    height: u32,
    y: u8,
    u: u8,
    v: u8,
) -> Result<Vec<u8>, EncoderError> {
    let pixels = FramePixels::solid(width, height, y, u, v);
    encode(std::slice::from_ref(&pixels), &EncoderConfig::default())
}
