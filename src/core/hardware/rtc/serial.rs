use crate::bitfield;

bitfield! {
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct RtcIo(pub u16) {
        pub data: bool => 0,
        pub clock: bool => 1,
        pub select: bool => 2,
        // 3
        pub write_direction: bool => 4,
        pub clock_direction: bool => 5,
        pub select_direction: bool => 6
        // 7 | 15
    }
}

/// Shift register state of one chip-select framed transfer.
///
/// Bytes move least significant bit first in both directions.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct SerialSession {
    pub input: u8,
    pub input_bit: u32,
    pub input_pos: u32,
    pub output: [u8; 8],
    pub output_bit: u32,
    pub output_pos: u32,
    pub cur_cmd: u8,
}

impl SerialSession {
    /// Chip select went high. The last command byte survives until the next one arrives.
    pub fn begin(&mut self) {
        self.input = 0;
        self.input_bit = 0;
        self.input_pos = 0;

        self.output = [0; 8];
        self.output_bit = 0;
        self.output_pos = 0;
    }

    /// Latches one incoming bit and returns the byte once eight have arrived.
    pub fn shift_in(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.input |= 1 << self.input_bit;
        }

        self.input_bit += 1;
        if self.input_bit < 8 {
            return None;
        }

        let byte = self.input;
        self.input = 0;
        self.input_bit = 0;
        Some(byte)
    }

    /// Produces the next outgoing bit. Reading past the buffer repeats its last byte.
    pub fn shift_out(&mut self) -> bool {
        let bit = self.output[self.output_pos as usize] & (1 << self.output_bit) != 0;

        self.output_bit += 1;
        if self.output_bit >= 8 {
            self.output_bit = 0;
            if self.output_pos < 7 {
                self.output_pos += 1;
            }
        }

        bit
    }
}
