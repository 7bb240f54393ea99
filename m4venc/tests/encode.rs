use m4venc::{
    Colorspace, Encoder, EncoderConfig, EncoderError, FramePixels, FrameType, MbMode, MotionVector,
};

fn texture(x: u32, y: u32) -> u8 {
    (20 + x.min(15).pow(2) * 3 / 4 + ((y * 5) % 16) * 3) as u8
}

/// Texture that slides left by one pixel per frame.
fn sliding(width: u32, height: u32, t: u32) -> FramePixels {
    FramePixels::from_luma_fn(width, height, |x, y| {
        let u = x + t;
        (20 + (u * u / 4) % 180 + (y * 7) % 30) as u8
    })
}

#[test]
fn first_frame_is_key() {
    let mut enc = Encoder::new(32, 32, EncoderConfig::default()).unwrap();
    let packet = enc
        .encode_frame(&FramePixels::solid(32, 32, 100, 128, 128))
        .unwrap();
    assert_eq!(packet.frame_type, FrameType::Key);
    assert!(packet.is_key_frame());
    assert_eq!(packet.frame_number, 0);
    assert!(enc.macroblocks().iter().all(|mb| mb.mode == MbMode::Intra));
}

#[test]
fn static_scene_skips_every_macroblock() {
    let frame = FramePixels::solid(48, 32, 100, 128, 128);
    let mut enc = Encoder::new(48, 32, EncoderConfig::default()).unwrap();
    let key = enc.encode_frame(&frame).unwrap();
    let delta = enc.encode_frame(&frame).unwrap();

    assert_eq!(delta.frame_type, FrameType::Delta);
    assert_eq!(enc.macroblocks().len(), 6);
    assert!(enc.macroblocks().iter().all(|mb| mb.is_skipped()));
    assert!(delta.data.len() < key.data.len());
    assert_eq!(enc.statistics().mv_bits, 0);
    assert_eq!(enc.statistics().text_bits, 0);
}

#[test]
fn static_scene_reconstruction_is_exact() {
    let frame = FramePixels::solid(32, 32, 100, 90, 160);
    let mut enc = Encoder::new(32, 32, EncoderConfig::default()).unwrap();
    enc.encode_frame(&frame).unwrap();
    enc.encode_frame(&frame).unwrap();
    let recon = enc.reconstruction();
    assert_eq!(recon.y.at(17, 9), 100);
    assert_eq!(recon.u.at(3, 12), 90);
    assert_eq!(recon.v.at(15, 0), 160);
}

#[test]
fn shifted_texture_is_found_by_motion_search() {
    let mut enc = Encoder::new(16, 16, EncoderConfig::default()).unwrap();
    let first = FramePixels::from_luma_fn(16, 16, texture);
    let second = FramePixels::from_luma_fn(16, 16, |x, y| texture(x + 4, y));

    assert!(enc.encode_frame(&first).unwrap().is_key_frame());
    let packet = enc.encode_frame(&second).unwrap();
    assert_eq!(packet.frame_type, FrameType::Delta);

    let mb = &enc.macroblocks()[0];
    assert_eq!(mb.mode, MbMode::Inter);
    assert_eq!(mb.mvs[0], MotionVector::new(8, 0));
}

#[test]
fn shifted_texture_is_found_at_every_quality() {
    for quality in 1..=5 {
        let config = EncoderConfig {
            quality,
            ..Default::default()
        };
        let mut enc = Encoder::new(16, 16, config).unwrap();
        enc.encode_frame(&FramePixels::from_luma_fn(16, 16, texture))
            .unwrap();
        enc.encode_frame(&FramePixels::from_luma_fn(16, 16, |x, y| texture(x + 4, y)))
            .unwrap();
        assert_eq!(
            enc.macroblocks()[0].mvs[0],
            MotionVector::new(8, 0),
            "quality {quality}"
        );
    }
}

#[test]
fn key_frames_follow_max_key_interval() {
    let interval = 4;
    let config = EncoderConfig {
        max_key_interval: interval,
        ..Default::default()
    };
    let mut enc = Encoder::new(32, 32, config).unwrap();

    let keys: Vec<u64> = (0..3 * interval as u32 + 1)
        .map(|t| enc.encode_frame(&sliding(32, 32, t)).unwrap())
        .filter(|p| p.is_key_frame())
        .map(|p| p.frame_number)
        .collect();
    assert_eq!(keys, vec![0, 4, 8, 12]);
}

#[test]
fn sliding_texture_codes_small_vectors() {
    let mut enc = Encoder::new(32, 32, EncoderConfig::default()).unwrap();
    for t in 0..4 {
        let packet = enc.encode_frame(&sliding(32, 32, t)).unwrap();
        assert_eq!(packet.is_key_frame(), t == 0);
    }
    assert!(enc.statistics().mv_sum > 0);
    assert!(enc.macroblocks().iter().all(|mb| mb.mode != MbMode::Intra));
    assert_eq!(enc.fcode(), 1);
}

#[test]
fn scene_change_is_coded_as_key_frame() {
    let mut enc = Encoder::new(32, 32, EncoderConfig::default()).unwrap();
    assert!(enc.encode_frame(&sliding(32, 32, 0)).unwrap().is_key_frame());
    // flat blocks against a textured reference prefer intra coding
    let packet = enc
        .encode_frame(&FramePixels::solid(32, 32, 16, 128, 128))
        .unwrap();
    assert!(packet.is_key_frame());
    assert_eq!(packet.frame_number, 1);
    assert!(enc.macroblocks().iter().all(|mb| mb.mode == MbMode::Intra));
}

#[test]
fn rgb_input_is_converted() {
    let mut enc = Encoder::new(16, 16, EncoderConfig::default()).unwrap();
    let rgb = vec![255u8; Colorspace::Rgb24.frame_size(16, 16)];
    let packet = enc.encode_raw(&rgb, Colorspace::Rgb24).unwrap();
    assert!(packet.is_key_frame());
    assert_eq!(enc.reconstruction().y.at(5, 5), 235);
}

#[test]
fn invalid_dimensions_are_rejected() {
    assert!(matches!(
        Encoder::new(17, 16, EncoderConfig::default()),
        Err(EncoderError::InvalidDimensions {
            width: 17,
            height: 16
        })
    ));
}

#[test]
fn frame_numbers_increase() {
    let mut enc = Encoder::new(16, 16, EncoderConfig::default()).unwrap();
    let frame = FramePixels::solid(16, 16, 60, 128, 128);
    for n in 0..5 {
        assert_eq!(enc.encode_frame(&frame).unwrap().frame_number, n);
    }
}
