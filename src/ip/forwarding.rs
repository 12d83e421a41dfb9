use super::checksum;

/// Byte offset of the time to live field in an IPv4 header
pub const TTL_OFFSET: usize = 8;

/// Prepares a transiting packet for its next hop: validates the header
/// checksum, decrements the TTL and rewrites the checksum.
///
/// Returns false, leaving the buffer untouched, when the incoming checksum is
/// bad. A true return does not mean the packet may be sent on: the caller must
/// check `ttl(packet) == 0` and drop (or signal time exceeded) in that case. A
/// packet that already arrived with TTL 0 stays at 0.
pub fn forward(packet: &mut [u8]) -> bool {
  if !checksum::validate(packet) {
    return false;
  }
  packet[TTL_OFFSET] = packet[TTL_OFFSET].saturating_sub(1);
  checksum::write(packet);
  true
}

pub fn ttl(packet: &[u8]) -> u8 {
  packet[TTL_OFFSET]
}
