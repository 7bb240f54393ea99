use std::ptr;

use m4venc_ffi::{
    M4V_ENC_BAD_FORMAT, M4V_ENC_CSP_RGB24, M4V_ENC_CSP_YV12, M4V_ENC_FAIL, M4V_ENC_OK,
    M4vEncFrame, M4vEncParam, M4vEncResult, M4vEncoder, m4venc_create, m4venc_encode, m4venc_free,
};

fn param(width: i32, height: i32) -> M4vEncParam {
    M4vEncParam {
        x_dim: width,
        y_dim: height,
        framerate: 25.0,
        bitrate: 500_000,
        rc_period: 50,
        rc_reaction_period: 10,
        rc_reaction_ratio: 10,
        max_quantizer: 15,
        min_quantizer: 2,
        max_key_interval: 0,
        quality: 5,
    }
}

fn create(param: &M4vEncParam) -> *mut M4vEncoder {
    let mut handle: *mut M4vEncoder = ptr::null_mut();
    let status = unsafe { m4venc_create(param, &mut handle) };
    assert_eq!(status, M4V_ENC_OK);
    assert!(!handle.is_null());
    handle
}

fn encode(
    handle: *mut M4vEncoder,
    image: &[u8],
    colorspace: i32,
    out: &mut [u8],
) -> (i32, usize, M4vEncResult) {
    let mut frame = M4vEncFrame {
        image: image.as_ptr(),
        bitstream: out.as_mut_ptr(),
        bitstream_capacity: out.len(),
        length: 0,
        colorspace,
    };
    let mut result = M4vEncResult::default();
    let status = unsafe { m4venc_encode(handle, &mut frame, &mut result) };
    (status, frame.length, result)
}

fn yuv(width: usize, height: usize, luma: u8) -> Vec<u8> {
    let mut image = vec![luma; width * height];
    image.extend(vec![128u8; width * height / 2]);
    image
}

#[test]
fn encode_solid_frames() {
    let handle = create(&param(64, 48));
    let image = yuv(64, 48, 90);
    let mut out = vec![0u8; 64 * 1024];

    let (status, length, result) = encode(handle, &image, M4V_ENC_CSP_YV12, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert_eq!(result.is_key_frame, 1);
    assert!(length > 0);
    assert_eq!(&out[..4], &[0x00, 0x00, 0x01, 0x00]);
    let key_length = length;

    let (status, length, result) = encode(handle, &image, M4V_ENC_CSP_YV12, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert_eq!(result.is_key_frame, 0);
    assert!(length < key_length);

    assert_eq!(unsafe { m4venc_free(handle) }, M4V_ENC_OK);
}

#[test]
fn encode_rgb_frame() {
    let handle = create(&param(32, 32));
    let image = vec![200u8; 32 * 32 * 3];
    let mut out = vec![0u8; 16 * 1024];
    let (status, length, result) = encode(handle, &image, M4V_ENC_CSP_RGB24, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert_eq!(result.is_key_frame, 1);
    assert!(length > 0);
    unsafe { m4venc_free(handle) };
}

#[test]
fn invalid_dimensions_are_bad_format() {
    for (w, h) in [(0, 16), (17, 16), (16, -2), (736, 576), (720, 578)] {
        let mut handle: *mut M4vEncoder = ptr::null_mut();
        let status = unsafe { m4venc_create(&param(w, h), &mut handle) };
        assert_eq!(status, M4V_ENC_BAD_FORMAT, "{w}x{h}");
        assert!(handle.is_null());
    }
}

#[test]
fn largest_picture_is_accepted() {
    let handle = create(&param(720, 576));
    unsafe { m4venc_free(handle) };
}

#[test]
fn null_pointers_fail() {
    let mut handle: *mut M4vEncoder = ptr::null_mut();
    assert_eq!(unsafe { m4venc_create(ptr::null(), &mut handle) }, M4V_ENC_FAIL);
    assert_eq!(unsafe { m4venc_create(&param(16, 16), ptr::null_mut()) }, M4V_ENC_FAIL);
    assert_eq!(unsafe { m4venc_free(ptr::null_mut()) }, M4V_ENC_FAIL);

    let handle = create(&param(16, 16));
    let mut result = M4vEncResult::default();
    assert_eq!(
        unsafe { m4venc_encode(handle, ptr::null_mut(), &mut result) },
        M4V_ENC_FAIL
    );

    let mut out = vec![0u8; 1024];
    let mut frame = M4vEncFrame {
        image: ptr::null(),
        bitstream: out.as_mut_ptr(),
        bitstream_capacity: out.len(),
        length: 0,
        colorspace: M4V_ENC_CSP_YV12,
    };
    assert_eq!(
        unsafe { m4venc_encode(handle, &mut frame, &mut result) },
        M4V_ENC_FAIL
    );

    // the failed calls must not have consumed a frame
    let (status, _, result) = encode(handle, &yuv(16, 16, 50), M4V_ENC_CSP_YV12, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert_eq!(result.is_key_frame, 1);
    unsafe { m4venc_free(handle) };
}

#[test]
fn small_bitstream_buffer_fails() {
    let handle = create(&param(32, 32));
    let image = yuv(32, 32, 70);
    let mut small = vec![0u8; 4];
    let (status, length, _) = encode(handle, &image, M4V_ENC_CSP_YV12, &mut small);
    assert_eq!(status, M4V_ENC_FAIL);
    assert_eq!(length, 0);

    // the rejected picture was not consumed, so the retry is still the key frame
    let mut out = vec![0u8; 64 * 1024];
    let (status, length, result) = encode(handle, &image, M4V_ENC_CSP_YV12, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert!(length > 4);
    assert_eq!(result.is_key_frame, 1);
    assert_eq!(&out[..4], &[0x00, 0x00, 0x01, 0x00]);

    let (status, _, result) = encode(handle, &image, M4V_ENC_CSP_YV12, &mut out);
    assert_eq!(status, M4V_ENC_OK);
    assert_eq!(result.is_key_frame, 0);
    unsafe { m4venc_free(handle) };
}

#[test]
fn failed_encode_clears_length() {
    let handle = create(&param(16, 16));
    let mut out = vec![0u8; 1024];
    let short = [0u8; 10];
    let mut frame = M4vEncFrame {
        image: short.as_ptr(),
        bitstream: out.as_mut_ptr(),
        bitstream_capacity: out.len(),
        length: 77,
        colorspace: 9,
    };
    assert_eq!(
        unsafe { m4venc_encode(handle, &mut frame, ptr::null_mut()) },
        M4V_ENC_BAD_FORMAT
    );
    assert_eq!(frame.length, 0);
    unsafe { m4venc_free(handle) };
}

#[test]
fn unknown_colorspace_is_bad_format() {
    let handle = create(&param(16, 16));
    let mut out = vec![0u8; 1024];
    let (status, _, _) = encode(handle, &yuv(16, 16, 0), 9, &mut out);
    assert_eq!(status, M4V_ENC_BAD_FORMAT);
    unsafe { m4venc_free(handle) };
}
