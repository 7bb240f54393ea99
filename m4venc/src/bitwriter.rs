/// MSB-first bit packer for one frame's worth of syntax.
///
/// Completed bytes live in `buf`; the open byte accumulates in `current_byte`
/// and is always zero in its unused low bits.
#[derive(Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    current_byte: u8,
    bits_in_current: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    pub fn put_bit(&mut self, bit: bool) {
        self.current_byte |= (bit as u8) << (7 - self.bits_in_current);
        self.bits_in_current += 1;
        if self.bits_in_current == 8 {
            self.flush_byte();
        }
    }

    /// Appends the low `size` bits of `value`, most significant first.
    pub fn put_bits(&mut self, value: u32, size: u32) {
        debug_assert!(size <= 32, "put_bits size {size} exceeds 32");
        let mut remaining = size.min(32);
        while remaining > 0 {
            let free = 8 - self.bits_in_current as u32;
            let take = free.min(remaining);
            let shift = remaining - take;
            let chunk = ((value as u64 >> shift) & ((1u64 << take) - 1)) as u8;
            self.current_byte |= chunk << (free - take);
            self.bits_in_current += take as u8;
            remaining -= take;
            if self.bits_in_current == 8 {
                self.flush_byte();
            }
        }
    }

    pub fn pad_to_byte(&mut self) {
        if self.bits_in_current > 0 {
            self.flush_byte();
        }
    }

    pub fn position_in_bits(&self) -> usize {
        self.buf.len() * 8 + self.bits_in_current as usize
    }

    pub fn length_in_bytes(&self) -> usize {
        self.buf.len() + usize::from(self.bits_in_current > 0)
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bits_in_current == 0
    }

    /// Closes the open byte (zero padded) and hands back the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.pad_to_byte();
        self.buf
    }

    fn flush_byte(&mut self) {
        self.buf.push(self.current_byte);
        self.current_byte = 0;
        self.bits_in_current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_true() {
        let mut w = BitWriter::new();
        w.put_bit(true);
        assert_eq!(w.finish(), vec![0x80]);
    }

    #[test]
    fn single_bit_false() {
        let mut w = BitWriter::new();
        w.put_bit(false);
        assert_eq!(w.finish(), vec![0x00]);
    }

    #[test]
    fn write_3_bits() {
        let mut w = BitWriter::new();
        w.put_bits(0b101, 3);
        assert_eq!(w.finish(), vec![0xA0]);
    }

    #[test]
    fn write_across_byte_boundary() {
        let mut w = BitWriter::new();
        w.put_bits(0b11111, 5);
        w.put_bits(0b11111, 5);
        assert_eq!(w.finish(), vec![0xFF, 0xC0]);
    }

    #[test]
    fn write_32_bits() {
        let mut w = BitWriter::new();
        w.put_bits(0x0000_01B6, 32);
        assert_eq!(w.finish(), vec![0x00, 0x00, 0x01, 0xB6]);
    }

    #[test]
    fn only_low_bits_are_used() {
        let mut w = BitWriter::new();
        w.put_bits(0xFFFF_FF05, 4);
        assert_eq!(w.finish(), vec![0x50]);
    }

    #[test]
    fn zero_size_writes_nothing() {
        let mut w = BitWriter::new();
        w.put_bits(0xFF, 0);
        assert_eq!(w.position_in_bits(), 0);
        assert_eq!(w.length_in_bytes(), 0);
    }

    #[test]
    fn pad_to_byte_no_op_when_aligned() {
        let mut w = BitWriter::new();
        w.put_bits(0xFF, 8);
        w.pad_to_byte();
        assert_eq!(w.position_in_bits(), 8);
        assert_eq!(w.finish(), vec![0xFF]);
    }

    #[test]
    fn pad_to_byte_fills_zeros() {
        let mut w = BitWriter::new();
        w.put_bits(0b111, 3);
        w.pad_to_byte();
        assert!(w.is_byte_aligned());
        assert_eq!(w.position_in_bits(), 8);
        assert_eq!(w.finish(), vec![0xE0]);
    }

    #[test]
    fn length_rounds_partial_byte_up() {
        let mut w = BitWriter::new();
        w.put_bits(0x3FF, 10);
        assert_eq!(w.position_in_bits(), 10);
        assert_eq!(w.length_in_bytes(), 2);
    }

    #[test]
    fn empty_writer() {
        let w = BitWriter::new();
        assert!(w.finish().is_empty());
    }
}
