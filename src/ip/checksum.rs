//! One's complement checksum over an IPv4 header.
//!
//! The header is summed as big-endian 16-bit words over its declared length
//! (IHL * 4), with the checksum field (bytes 10 and 11) counted as zero. The
//! 32-bit running sum is folded back into 16 bits until no carry remains and
//! the result is inverted.

/// Byte offset of the header checksum field
pub const CHECKSUM_OFFSET: usize = 10;

/// Smallest legal IPv4 header, IHL = 5
pub const MIN_HEADER_LEN: usize = 20;

/// Header length in bytes as declared by the low nibble of byte 0
pub fn header_len(packet: &[u8]) -> usize {
  usize::from(packet[0] & 0b0000_1111) * 4
}

fn fold(mut sum: u32) -> u16 {
  while sum >> 16 != 0 {
    sum = (sum & 0xffff) + (sum >> 16);
  }
  sum as u16
}

/// Computes the checksum the header should carry.
///
/// The buffer must hold at least `header_len(packet)` bytes; shorter buffers
/// are a caller bug and will panic. The buffer is never written to, the
/// stored checksum is simply skipped during summation.
pub fn compute(packet: &[u8]) -> u16 {
  let header = &packet[..header_len(packet)];
  let sum = header
    .chunks(2)
    .enumerate()
    .filter(|(i, _)| *i != CHECKSUM_OFFSET / 2)
    .fold(0u32, |acc, (_, word)| {
      let word = match word {
        [hi, lo] => u16::from_be_bytes([*hi, *lo]),
        [hi] => u16::from_be_bytes([*hi, 0]),
        _ => 0,
      };
      acc + u32::from(word)
    });
  !fold(sum)
}

/// Checksum currently stored in the header
pub fn stored(packet: &[u8]) -> u16 {
  u16::from_be_bytes([packet[CHECKSUM_OFFSET], packet[CHECKSUM_OFFSET + 1]])
}

/// Writes `compute(packet)` into the checksum field
pub fn write(packet: &mut [u8]) {
  let checksum = compute(packet);
  packet[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
}

/// Returns true iff the stored checksum matches the header contents.
///
/// Buffers that cannot hold the declared header, or that declare less than the
/// minimum header, fail validation rather than panicking since they come
/// straight off the wire.
pub fn validate(packet: &[u8]) -> bool {
  if packet.is_empty() {
    return false;
  }
  let len = header_len(packet);
  if len < MIN_HEADER_LEN || packet.len() < len {
    return false;
  }
  compute(packet) == stored(packet)
}
