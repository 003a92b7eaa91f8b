//! CRC-32 matching the device-side bootloader checksum.
//!
//! Reflected CRC-32 over the 0xEDB88320 polynomial, initial register
//! 0xFFFFFFFF, one byte at a time through a lookup table, final result
//! inverted. This is the common IEEE variant, but it is implemented
//! here byte-for-byte the way the bootloader does it: the header CRCs
//! must verify on the microcontroller without a crypto library.

/// CRC-32 polynomial (reflected): 0xEDB88320.
const POLYNOMIAL: u32 = 0xEDB88320;

/// Precomputed lookup table, generated at compile time.
const CRC32_TABLE: [u32; 256] = generate_table();

const fn generate_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the bootloader-compatible CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(crc32(b""), 0x00000000);
    }

    #[test]
    fn standard_check_value() {
        // The classic CRC-32/ISO-HDLC check input.
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn table_spot_checks() {
        // First entries of the canonical reflected table.
        assert_eq!(CRC32_TABLE[0], 0x00000000);
        assert_eq!(CRC32_TABLE[1], 0x77073096);
        assert_eq!(CRC32_TABLE[255], 0x2D02EF8D);
    }

    #[test]
    fn differs_on_single_bit_flip() {
        let a = crc32(b"firmware image");
        let b = crc32(b"firmware imagf");
        assert_ne!(a, b);
    }
}
