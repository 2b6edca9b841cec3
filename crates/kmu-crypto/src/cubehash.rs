//! CubeHash16/32 streaming digest.
//!
//! Sixteen rounds per 32-byte message block, ten finalization transforms,
//! output truncated to 224, 256, 384 or 512 bits.

const ROUNDS: usize = 16;
const BLOCK_BYTES: usize = 32;
const FINAL_TRANSFORMS: usize = 10;

/// CubeHash state for one digest computation.
#[derive(Clone)]
pub struct CubeHash {
    x: [u32; 32],
    pos: usize,
    output_bytes: usize,
}

impl CubeHash {
    /// Create a hasher producing `output_bits` bits. Must be a multiple of 8 up to 512.
    pub fn new(output_bits: usize) -> Self {
        debug_assert!(output_bits % 8 == 0 && output_bits <= 512);
        let output_bytes = output_bits / 8;

        let mut x = [0u32; 32];
        x[0] = output_bytes as u32;
        x[1] = BLOCK_BYTES as u32;
        x[2] = ROUNDS as u32;

        let mut state = Self {
            x,
            pos: 0,
            output_bytes,
        };
        for _ in 0..FINAL_TRANSFORMS {
            state.transform();
        }
        state
    }

    pub fn output_len(&self) -> usize {
        self.output_bytes
    }

    /// Absorb message bytes.
    pub fn update(&mut self, data: &[u8]) {
        for byte in data {
            self.x[self.pos / 4] ^= (*byte as u32) << (8 * (self.pos % 4));
            self.pos += 1;
            if self.pos == BLOCK_BYTES {
                self.transform();
                self.pos = 0;
            }
        }
    }

    /// Pad, finalize and return the truncated digest.
    pub fn finalize(mut self) -> Vec<u8> {
        self.x[self.pos / 4] ^= 0x80u32 << (8 * (self.pos % 4));
        self.transform();
        self.x[31] ^= 1;
        for _ in 0..FINAL_TRANSFORMS {
            self.transform();
        }

        self.x
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .take(self.output_bytes)
            .collect()
    }

    fn transform(&mut self) {
        let x = &mut self.x;
        let mut y = [0u32; 16];

        for _ in 0..ROUNDS {
            for i in 0..16 {
                x[i + 16] = x[i + 16].wrapping_add(x[i]);
            }
            for i in 0..16 {
                y[i ^ 8] = x[i];
            }
            for i in 0..16 {
                x[i] = y[i].rotate_left(7);
            }
            for i in 0..16 {
                x[i] ^= x[i + 16];
            }
            for i in 0..16 {
                y[i ^ 2] = x[i + 16];
            }
            x[16..32].copy_from_slice(&y);
            for i in 0..16 {
                x[i + 16] = x[i + 16].wrapping_add(x[i]);
            }
            for i in 0..16 {
                y[i ^ 4] = x[i];
            }
            for i in 0..16 {
                x[i] = y[i].rotate_left(11);
            }
            for i in 0..16 {
                x[i] ^= x[i + 16];
            }
            for i in 0..16 {
                y[i ^ 1] = x[i + 16];
            }
            x[16..32].copy_from_slice(&y);
        }
    }
}

impl std::fmt::Debug for CubeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeHash")
            .field("output_bytes", &self.output_bytes)
            .finish_non_exhaustive()
    }
}
