/// Chooses the quantizer for each frame from the bits earlier frames used.
pub trait RatePolicy {
    /// Quantizer for the next frame. `distortion` is a mean absolute
    /// difference hint, or 0 when the encoder does not compute one.
    fn get_quantizer(&mut self, distortion: f64) -> u8;
    /// Bits the last frame produced after its header.
    fn update(&mut self, bits: u64);
    /// Snapshot for inspection, if the policy keeps one.
    fn stats(&self) -> Option<RateControlStats> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateControlParams {
    pub initial_quant: u8,
    pub min_quant: u8,
    pub max_quant: u8,
    pub bitrate: u64,
    pub framerate: f64,
    /// Frames averaged by the long-term rate estimate.
    pub period: u32,
    /// Frames averaged by the short-term rate estimate.
    pub reaction_period: u32,
    /// The short-term rate may stray `1 / ratio` from target before the
    /// quantizer moves.
    pub reaction_ratio: u32,
}

/// Two-speed feedback loop: a short-term average drives quantizer steps, and
/// the long-term average shifts the short-term target to pay back earlier
/// over- or undershoot.
#[derive(Debug, Clone)]
pub struct RateControl {
    quant: u8,
    min_quant: u8,
    max_quant: u8,
    target_bits_per_frame: f64,
    average_bits: f64,
    reaction_bits: f64,
    average_delta: f64,
    reaction_delta: f64,
    tolerance: f64,
    frames_encoded: u64,
}

impl RateControl {
    pub fn new(params: RateControlParams) -> Self {
        let target_bits_per_frame = params.bitrate as f64 / params.framerate.max(1e-3);
        let min_quant = params.min_quant.clamp(1, 31);
        let max_quant = params.max_quant.clamp(min_quant, 31);
        Self {
            quant: params.initial_quant.clamp(min_quant, max_quant),
            min_quant,
            max_quant,
            target_bits_per_frame,
            average_bits: target_bits_per_frame,
            reaction_bits: target_bits_per_frame,
            average_delta: 1.0 / params.period.max(1) as f64,
            reaction_delta: 1.0 / params.reaction_period.max(1) as f64,
            tolerance: 1.0 / params.reaction_ratio.max(1) as f64,
            frames_encoded: 0,
        }
    }

    pub fn target_bits_per_frame(&self) -> f64 {
        self.target_bits_per_frame
    }

    /// Short-term target after compensating the long-term error.
    fn reaction_target(&self) -> f64 {
        let debt = self.average_bits - self.target_bits_per_frame;
        (self.target_bits_per_frame - debt).max(self.target_bits_per_frame * 0.25)
    }
}

impl RatePolicy for RateControl {
    fn get_quantizer(&mut self, _distortion: f64) -> u8 {
        self.quant
    }

    fn update(&mut self, bits: u64) {
        let bits = bits as f64;
        self.average_bits += (bits - self.average_bits) * self.average_delta;
        self.reaction_bits += (bits - self.reaction_bits) * self.reaction_delta;
        self.frames_encoded += 1;

        let target = self.reaction_target();
        let error = (self.reaction_bits - target) / target;
        if error > self.tolerance && self.quant < self.max_quant {
            self.quant += 1;
        } else if error < -self.tolerance && self.quant > self.min_quant {
            self.quant -= 1;
        }
    }

    fn stats(&self) -> Option<RateControlStats> {
        Some(RateControlStats {
            target_bits_per_frame: self.target_bits_per_frame.round() as u64,
            average_bits: self.average_bits.round() as u64,
            reaction_bits: self.reaction_bits.round() as u64,
            frames_encoded: self.frames_encoded,
            quant: self.quant,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateControlStats {
    pub target_bits_per_frame: u64,
    pub average_bits: u64,
    pub reaction_bits: u64,
    pub frames_encoded: u64,
    pub quant: u8,
}
