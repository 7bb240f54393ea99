use log::{debug, info};

use crate::bitwriter::BitWriter;
use crate::block::{MacroblockEncoder, Statistics};
use crate::colorspace::{Colorspace, frame_from_raw};
use crate::error::EncoderError;
use crate::halfpel::{HalfpelPlanes, RefPlanes, interpolate};
use crate::header::{HeaderParams, write_fixed_header};
use crate::macroblock::{Macroblock, MbMode};
use crate::motion::{MotionParams, motion_estimate_compensate};
use crate::packet::{FrameType, Packet};
use crate::plane::PlaneSet;
use crate::profile::{Profiler, Stage};
use crate::rc::{RateControl, RateControlParams, RateControlStats, RatePolicy};
use crate::sad::mad_image;
use crate::source::load_source;
use crate::vlc::{EntropyCoder, Mpeg4Vlc};
use crate::vop::{Vop, VopType};
use crate::y4m::FramePixels;

pub const MAX_WIDTH: u32 = 720;
pub const MAX_HEIGHT: u32 = 576;

/// Delta frames with more intra macroblocks than this are recoded as key
/// frames.
const INTRA_THRESHOLD: f32 = 0.5;
const INITIAL_QUANT: u8 = 4;
const INITIAL_FCODE: u8 = 2;

/// Encoder settings. Out-of-range values are replaced by defaults in
/// [`EncoderConfig::normalized`] rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub framerate: f64,
    /// Target bits per second.
    pub bitrate: i64,
    pub rc_period: i32,
    pub rc_reaction_period: i32,
    pub rc_reaction_ratio: i32,
    pub min_quantizer: i32,
    pub max_quantizer: i32,
    /// Distance between forced key frames. 0 selects the default and
    /// `usize::MAX` disables forcing.
    pub max_key_interval: usize,
    /// Motion search effort, 1 (fastest) to 5.
    pub quality: i32,
    /// Log every macroblock at trace level.
    pub trace_macroblocks: bool,
    /// Feed the rate policy the mean absolute difference between the source
    /// and the previous reconstruction.
    pub mad_hint: bool,
    pub profile: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            framerate: 25.0,
            bitrate: 910_000,
            rc_period: 50,
            rc_reaction_period: 10,
            rc_reaction_ratio: 10,
            min_quantizer: 2,
            max_quantizer: 15,
            max_key_interval: 250,
            quality: 5,
            trace_macroblocks: false,
            mad_hint: false,
            profile: false,
        }
    }
}

impl EncoderConfig {
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let mut c = self;
        if c.framerate.is_nan() || c.framerate <= 0.0 {
            c.framerate = defaults.framerate;
        }
        if c.bitrate <= 0 {
            c.bitrate = defaults.bitrate;
        }
        if c.rc_period <= 0 {
            c.rc_period = defaults.rc_period;
        }
        if c.rc_reaction_period <= 0 {
            c.rc_reaction_period = defaults.rc_reaction_period;
        }
        if c.rc_reaction_ratio <= 0 {
            c.rc_reaction_ratio = defaults.rc_reaction_ratio;
        }
        if !(1..=31).contains(&c.min_quantizer) {
            c.min_quantizer = defaults.min_quantizer;
        }
        if !(1..=31).contains(&c.max_quantizer) {
            c.max_quantizer = defaults.max_quantizer;
        }
        if c.max_key_interval == 0 {
            c.max_key_interval = defaults.max_key_interval;
        }
        if c.max_quantizer < c.min_quantizer {
            c.max_quantizer = c.min_quantizer;
        }
        if !(1..=5).contains(&c.quality) {
            c.quality = defaults.quality;
        }
        c
    }

    fn rate_control_params(&self, initial_quant: u8) -> RateControlParams {
        RateControlParams {
            initial_quant,
            min_quant: self.min_quantizer as u8,
            max_quant: self.max_quantizer as u8,
            bitrate: self.bitrate as u64,
            framerate: self.framerate,
            period: self.rc_period as u32,
            reaction_period: self.rc_reaction_period as u32,
            reaction_ratio: self.rc_reaction_ratio as u32,
        }
    }
}

/// Next f-code given this frame's vector spread. Grows when vectors use
/// more than a third of the range, shrinks only after two frames below a
/// sixth.
pub fn next_fcode(fcode: u8, sigma: f32, prev_sigma: Option<f32>) -> u8 {
    let range = 1i32 << (3 + fcode);
    let (grow, shrink) = ((range / 3) as f32, (range / 6) as f32);
    if sigma > grow && fcode <= 3 {
        fcode + 1
    } else if sigma < shrink && prev_sigma.is_some_and(|p| p < shrink) && fcode >= 2 {
        fcode - 1
    } else {
        fcode
    }
}

/// Per-frame state a coded frame changes before it is committed.
#[derive(Debug, Clone, Copy)]
struct FrameState {
    quant: u8,
    fcode: u8,
    rounding: u8,
    frame_num: usize,
    stats: Statistics,
}

pub struct Encoder {
    config: EncoderConfig,
    width: u32,
    height: u32,
    quant: u8,
    fcode: u8,
    rounding: u8,
    /// Frames since the last key frame.
    frame_num: usize,
    frames_encoded: u64,
    current: Vop,
    reference: Vop,
    source: PlaneSet,
    halfpel: HalfpelPlanes,
    rate: Box<dyn RatePolicy + Send>,
    coder: Box<dyn EntropyCoder + Send>,
    stats: Statistics,
    profiler: Profiler,
}

impl Encoder {
    pub fn new(width: u32, height: u32, config: EncoderConfig) -> Result<Self, EncoderError> {
        let config = config.normalized();
        let initial = initial_quant(&config);
        let rate = RateControl::new(config.rate_control_params(initial));
        Self::with_policies(width, height, config, Box::new(rate), Box::new(Mpeg4Vlc))
    }

    /// Builds an encoder around a custom rate policy and entropy coder.
    pub fn with_policies(
        width: u32,
        height: u32,
        config: EncoderConfig,
        rate: Box<dyn RatePolicy + Send>,
        coder: Box<dyn EntropyCoder + Send>,
    ) -> Result<Self, EncoderError> {
        if width == 0
            || height == 0
            || width % 2 != 0
            || height % 2 != 0
            || width > MAX_WIDTH
            || height > MAX_HEIGHT
        {
            return Err(EncoderError::InvalidDimensions { width, height });
        }
        let config = config.normalized();
        let (w, h) = (width as usize, height as usize);

        Ok(Self {
            quant: initial_quant(&config),
            fcode: INITIAL_FCODE,
            rounding: 0,
            frame_num: 0,
            frames_encoded: 0,
            current: Vop::new(w, h)?,
            reference: Vop::new(w, h)?,
            source: PlaneSet::new(w, h, 0, 0)?,
            halfpel: HalfpelPlanes::new(w, h)?,
            rate,
            coder,
            stats: Statistics::default(),
            profiler: Profiler::new(config.profile),
            config,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode_raw(&mut self, data: &[u8], colorspace: Colorspace) -> Result<Packet, EncoderError> {
        self.encode_raw_within(data, colorspace, usize::MAX)
    }

    /// Like [`Encoder::encode_raw`], but fails with
    /// [`EncoderError::OutputTooSmall`] when the coded frame exceeds
    /// `capacity` bytes. A rejected frame leaves the encoder as it was, so
    /// the same picture can be retried.
    pub fn encode_raw_within(
        &mut self,
        data: &[u8],
        colorspace: Colorspace,
        capacity: usize,
    ) -> Result<Packet, EncoderError> {
        let frame = frame_from_raw(data, colorspace, self.width as usize, self.height as usize)?;
        self.encode_frame_within(&frame, capacity)
    }

    pub fn encode_frame(&mut self, pixels: &FramePixels) -> Result<Packet, EncoderError> {
        self.encode_frame_within(pixels, usize::MAX)
    }

    pub fn encode_frame_within(
        &mut self,
        pixels: &FramePixels,
        capacity: usize,
    ) -> Result<Packet, EncoderError> {
        load_source(&mut self.source, pixels)?;
        let started = self.profiler.start();
        let saved = self.frame_state();

        let (w, h) = (self.width as usize, self.height as usize);
        let mut bw = BitWriter::with_capacity(w * h / 2);
        let force_key = self.frame_num == 0 || self.frame_num >= self.config.max_key_interval;
        let (frame_type, bits) = if force_key {
            (FrameType::Key, self.encode_key_frame(&mut bw))
        } else {
            self.encode_delta_frame(&mut bw)
        };

        let data = bw.finish();
        if data.len() > capacity {
            self.restore_frame_state(saved);
            debug!(
                "frame {} needs {} bytes, output holds {capacity}",
                self.frames_encoded,
                data.len()
            );
            return Err(EncoderError::OutputTooSmall {
                needed: data.len(),
                capacity,
            });
        }

        self.rate.update(bits);
        self.advance_frame();

        debug!(
            "frame {} {:?} q={} fcode={} bytes={}",
            self.frames_encoded,
            frame_type,
            self.quant,
            self.fcode,
            data.len()
        );
        let packet = Packet {
            data,
            frame_type,
            frame_number: self.frames_encoded,
            quant: self.quant,
        };
        self.frames_encoded += 1;
        self.profiler.record(Stage::Frame, started);
        Ok(packet)
    }

    fn frame_state(&self) -> FrameState {
        FrameState {
            quant: self.quant,
            fcode: self.fcode,
            rounding: self.rounding,
            frame_num: self.frame_num,
            stats: self.stats,
        }
    }

    /// Undoes a coded frame that was not delivered. The reference planes
    /// are only replaced by `advance_frame`, and `current` is rewritten by
    /// the next frame.
    fn restore_frame_state(&mut self, saved: FrameState) {
        self.quant = saved.quant;
        self.fcode = saved.fcode;
        self.rounding = saved.rounding;
        self.frame_num = saved.frame_num;
        self.stats = saved.stats;
    }

    /// Makes the frame just coded the reference for the next one. Only the
    /// planes move; macroblock history stays with `current`.
    fn advance_frame(&mut self) {
        Vop::swap_planes(&mut self.current, &mut self.reference);
        self.frame_num += 1;
    }

    fn next_quantizer(&mut self) -> u8 {
        let distortion = if self.config.mad_hint {
            mad_image(&self.source, &self.reference.planes)
        } else {
            0.0
        };
        let (min, max) = (self.config.min_quantizer as u8, self.config.max_quantizer as u8);
        self.rate.get_quantizer(distortion).clamp(min, max)
    }

    fn write_header(&self, bw: &mut BitWriter, vop_type: VopType) {
        write_fixed_header(
            bw,
            &HeaderParams {
                width: self.width,
                height: self.height,
                vop_type,
                rounding: self.rounding,
                quant: self.quant,
                fcode: self.fcode,
            },
        );
    }

    /// Codes every macroblock of `current` and returns the bits written.
    fn code_macroblocks(&mut self, bw: &mut BitWriter, intra: bool) -> u64 {
        let started = self.profiler.start();
        let start = bw.position_in_bits();
        let (mb_width, mb_height) = (self.current.mb_width(), self.current.mb_height());
        let mut mb_encoder = MacroblockEncoder {
            vop: &mut self.current,
            source: &self.source,
            bw: &mut *bw,
            coder: &mut *self.coder,
            stats: &mut self.stats,
            quant: self.quant,
            fcode: self.fcode,
            trace: self.config.trace_macroblocks,
        };
        for mby in 0..mb_height {
            for mbx in 0..mb_width {
                if intra {
                    mb_encoder.encode_intra(mbx, mby);
                } else {
                    mb_encoder.encode_inter(mbx, mby);
                }
            }
        }
        self.profiler.record(Stage::Coding, started);
        (bw.position_in_bits() - start) as u64
    }

    fn encode_key_frame(&mut self, bw: &mut BitWriter) -> u64 {
        self.frame_num = 0;
        self.rounding = 1;
        self.quant = self.next_quantizer();
        self.current.vop_type = VopType::Intra;
        self.write_header(bw, VopType::Intra);

        self.stats.begin_frame();
        for mb in self.current.macroblocks_mut() {
            *mb = Macroblock {
                mode: MbMode::Intra,
                ..Macroblock::default()
            };
        }
        let bits = self.code_macroblocks(bw, true);

        self.stats.prev_sigma = None;
        self.fcode = INITIAL_FCODE;
        bits
    }

    fn encode_delta_frame(&mut self, bw: &mut BitWriter) -> (FrameType, u64) {
        self.reference.set_edges();
        self.rounding = 1 - self.rounding;
        let quality = self.config.quality as u8;

        let started = self.profiler.start();
        interpolate(&self.reference.planes, &mut self.halfpel, self.rounding, quality <= 3);
        self.profiler.record(Stage::Interpolate, started);

        let started = self.profiler.start();
        let refs = RefPlanes::new(&self.reference.planes, &self.halfpel);
        let params = MotionParams {
            fcode: self.fcode,
            quant: self.quant,
            quality,
        };
        let intra_fraction = motion_estimate_compensate(&mut self.current, &refs, &self.source, params);
        self.profiler.record(Stage::Motion, started);

        if intra_fraction > INTRA_THRESHOLD {
            info!(
                "frame {}: {:.0}% intra macroblocks, coding as key frame",
                self.frames_encoded,
                intra_fraction * 100.0
            );
            return (FrameType::Key, self.encode_key_frame(bw));
        }

        self.quant = self.next_quantizer();
        self.current.vop_type = VopType::Predicted;
        self.write_header(bw, VopType::Predicted);

        self.stats.begin_frame();
        let bits = self.code_macroblocks(bw, false);

        let sigma = self.stats.sigma();
        let fcode = next_fcode(self.fcode, sigma, self.stats.prev_sigma);
        if fcode != self.fcode {
            info!("mv sigma {sigma:.2}: fcode {} -> {fcode}", self.fcode);
            self.fcode = fcode;
        }
        self.stats.prev_sigma = Some(sigma);
        (FrameType::Delta, bits)
    }

    /// Macroblocks of the most recently coded frame.
    pub fn macroblocks(&self) -> &[Macroblock] {
        self.current.macroblocks()
    }

    /// Reconstruction of the most recently coded frame.
    pub fn reconstruction(&self) -> &PlaneSet {
        &self.reference.planes
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn fcode(&self) -> u8 {
        self.fcode
    }

    pub fn quantizer(&self) -> u8 {
        self.quant
    }

    pub fn profile(&self) -> &Profiler {
        &self.profiler
    }

    pub fn rate_control_stats(&self) -> Option<RateControlStats> {
        self.rate.stats()
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        if self.profiler.is_enabled() {
            info!("encoder profile\n{}", self.profiler.summary());
        }
    }
}

fn initial_quant(config: &EncoderConfig) -> u8 {
    (INITIAL_QUANT as i32).clamp(config.min_quantizer, config.max_quantizer) as u8
}
