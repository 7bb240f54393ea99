#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Key,
    Delta,
}

/// One coded frame: the fixed header followed by the macroblock data,
/// padded to a byte boundary.
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Vec<u8>,
    pub frame_type: FrameType,
    pub frame_number: u64,
    pub quant: u8,
}

impl Packet {
    pub fn is_key_frame(&self) -> bool {
        self.frame_type == FrameType::Key
    }
}
