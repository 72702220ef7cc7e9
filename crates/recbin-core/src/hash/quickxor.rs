//! QuickXorHash, the content hash OneDrive for Business reports.
//!
//! Bytes are XORed into a 160-bit circular buffer, each one placed 11 bits
//! after its predecessor. The total input length is XORed into the last 64
//! bits of the digest on finalisation.

const WIDTH_IN_BITS: usize = 160;
const SHIFT: usize = 11;
const BITS_IN_LAST_CELL: usize = 32;
const CELLS: usize = (WIDTH_IN_BITS - 1) / 64 + 1;

/// Digest length in bytes
pub const DIGEST_SIZE: usize = (WIDTH_IN_BITS - 1) / 8 + 1;

#[derive(Debug, Clone, Default)]
pub struct QuickXorHash {
    cells: [u64; CELLS],
    length: u64,
    shift: usize,
}

impl QuickXorHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut cell = self.shift / 64;
        let mut offset = self.shift % 64;

        for i in 0..data.len().min(WIDTH_IN_BITS) {
            let is_last_cell = cell == CELLS - 1;
            let cell_bits = if is_last_cell { BITS_IN_LAST_CELL } else { 64 };

            // Every WIDTH_IN_BITS-th byte lands on the same bit position
            let folded = data[i..]
                .iter()
                .step_by(WIDTH_IN_BITS)
                .fold(0u8, |acc, &b| acc ^ b);

            if offset <= cell_bits - 8 {
                self.cells[cell] ^= u64::from(folded) << offset;
            } else {
                let next = if is_last_cell { 0 } else { cell + 1 };
                self.cells[cell] ^= u64::from(folded) << offset;
                self.cells[next] ^= u64::from(folded) >> (cell_bits - offset);
            }

            offset += SHIFT;
            if offset >= cell_bits {
                cell = if is_last_cell { 0 } else { cell + 1 };
                offset -= cell_bits;
            }
        }

        self.shift = (self.shift + SHIFT * (data.len() % WIDTH_IN_BITS)) % WIDTH_IN_BITS;
        self.length = self.length.wrapping_add(data.len() as u64);
    }

    pub fn finalize(&self) -> [u8; DIGEST_SIZE] {
        let mut digest = [0u8; DIGEST_SIZE];

        for (i, cell) in self.cells.iter().enumerate() {
            let start = i * 8;
            let end = (start + 8).min(DIGEST_SIZE);
            digest[start..end].copy_from_slice(&cell.to_le_bytes()[..end - start]);
        }

        let length = self.length.to_le_bytes();
        for (i, b) in length.iter().enumerate() {
            digest[DIGEST_SIZE - length.len() + i] ^= b;
        }

        digest
    }
}
