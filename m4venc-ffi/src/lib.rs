use std::ptr;

use m4venc::{Colorspace, EncoderConfig, FrameType, Status};

pub const M4V_ENC_OK: i32 = Status::Ok as i32;
pub const M4V_ENC_FAIL: i32 = Status::Fail as i32;
pub const M4V_ENC_MEMORY: i32 = Status::Memory as i32;
pub const M4V_ENC_BAD_FORMAT: i32 = Status::BadFormat as i32;

pub const M4V_ENC_CSP_RGB24: i32 = 0;
pub const M4V_ENC_CSP_YV12: i32 = 1;

pub struct M4vEncoder {
    inner: m4venc::Encoder,
}

/// Creation parameters. Non-positive tunables select their defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct M4vEncParam {
    pub x_dim: i32,
    pub y_dim: i32,
    pub framerate: f32,
    pub bitrate: i64,
    pub rc_period: i32,
    pub rc_reaction_period: i32,
    pub rc_reaction_ratio: i32,
    pub max_quantizer: i32,
    pub min_quantizer: i32,
    /// 0 selects the default; negative never forces a key frame.
    pub max_key_interval: i32,
    pub quality: i32,
}

#[repr(C)]
#[derive(Debug)]
pub struct M4vEncFrame {
    /// Input picture in `colorspace` layout, `x_dim` by `y_dim`.
    pub image: *const u8,
    pub bitstream: *mut u8,
    pub bitstream_capacity: usize,
    /// Bytes written to `bitstream`.
    pub length: usize,
    pub colorspace: i32,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct M4vEncResult {
    pub is_key_frame: i32,
}

impl From<&M4vEncParam> for EncoderConfig {
    fn from(param: &M4vEncParam) -> Self {
        EncoderConfig {
            framerate: param.framerate as f64,
            bitrate: param.bitrate,
            rc_period: param.rc_period,
            rc_reaction_period: param.rc_reaction_period,
            rc_reaction_ratio: param.rc_reaction_ratio,
            min_quantizer: param.min_quantizer,
            max_quantizer: param.max_quantizer,
            max_key_interval: match param.max_key_interval {
                n if n < 0 => usize::MAX,
                n => n as usize,
            },
            quality: param.quality,
            ..EncoderConfig::default()
        }
    }
}

fn colorspace_from(value: i32) -> Option<Colorspace> {
    match value {
        M4V_ENC_CSP_RGB24 => Some(Colorspace::Rgb24),
        M4V_ENC_CSP_YV12 => Some(Colorspace::Yuv420),
        _ => None,
    }
}

/// Creates an encoder and stores it in `*handle`.
///
/// # Safety
///
/// `param` must point to a valid `M4vEncParam` and `handle` to writable
/// storage for one pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn m4venc_create(
    param: *const M4vEncParam,
    handle: *mut *mut M4vEncoder,
) -> i32 {
    if param.is_null() || handle.is_null() {
        return M4V_ENC_FAIL;
    }

    let param = unsafe { &*param };
    let width = u32::try_from(param.x_dim).unwrap_or(0);
    let height = u32::try_from(param.y_dim).unwrap_or(0);

    match m4venc::Encoder::new(width, height, EncoderConfig::from(param)) {
        Ok(inner) => {
            unsafe { *handle = Box::into_raw(Box::new(M4vEncoder { inner })) };
            M4V_ENC_OK
        }
        Err(e) => {
            unsafe { *handle = ptr::null_mut() };
            e.status() as i32
        }
    }
}

/// # Safety
///
/// `handle` must come from [`m4venc_create`] and not have been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn m4venc_free(handle: *mut M4vEncoder) -> i32 {
    if handle.is_null() {
        return M4V_ENC_FAIL;
    }
    drop(unsafe { Box::from_raw(handle) });
    M4V_ENC_OK
}

/// Encodes one picture into `frame.bitstream`. On failure `frame.length`
/// is 0 and the encoder has not consumed the picture.
///
/// # Safety
///
/// `handle` must be live, `frame.image` must hold a full picture in the
/// declared colorspace and `frame.bitstream` must be writable for
/// `frame.bitstream_capacity` bytes. `result` may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn m4venc_encode(
    handle: *mut M4vEncoder,
    frame: *mut M4vEncFrame,
    result: *mut M4vEncResult,
) -> i32 {
    if handle.is_null() || frame.is_null() {
        return M4V_ENC_FAIL;
    }
    let enc = unsafe { &mut *handle };
    let frame = unsafe { &mut *frame };
    frame.length = 0;
    if frame.image.is_null() || frame.bitstream.is_null() {
        return M4V_ENC_FAIL;
    }
    let Some(colorspace) = colorspace_from(frame.colorspace) else {
        return M4V_ENC_BAD_FORMAT;
    };

    let size = colorspace.frame_size(enc.inner.width() as usize, enc.inner.height() as usize);
    let image = unsafe { std::slice::from_raw_parts(frame.image, size) };
    let packet = match enc
        .inner
        .encode_raw_within(image, colorspace, frame.bitstream_capacity)
    {
        Ok(packet) => packet,
        Err(e) => return e.status() as i32,
    };

    let out = unsafe { std::slice::from_raw_parts_mut(frame.bitstream, packet.data.len()) };
    out.copy_from_slice(&packet.data);
    frame.length = packet.data.len();

    if !result.is_null() {
        unsafe {
            (*result).is_key_frame = i32::from(packet.frame_type == FrameType::Key);
        }
    }
    M4V_ENC_OK
}
