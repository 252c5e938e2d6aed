//! CRC-16/CCITT with XMODEM parameters (poly 0x1021, init 0, no reflection,
//! no final xor). The vehicle firmware checks frames with the same variant.

use crc::{Crc, CRC_16_XMODEM};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Compute the CRC16 of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Continue a CRC16 computation over another span.
///
/// XMODEM has no reflection or output xor, so a finished value is a valid
/// starting register for the next span.
pub fn crc16_update(crc: u16, bytes: &[u8]) -> u16 {
    let mut digest = CRC16.digest_with_initial(crc);
    digest.update(bytes);
    digest.finalize()
}
