//! ICMP echo packet construction and parsing.

pub const ECHO_REPLY: u8 = 0;
pub const ECHO_REQUEST: u8 = 8;
pub const ICMP_HEADER_LEN: usize = 8;

/// Every request carries sequence 1; one request is sent per socket.
pub const ECHO_SEQUENCE: u16 = 1;
pub const ECHO_PAYLOAD: &[u8] = b"oping probe";

const MIN_IPV4_HEADER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub kind: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

/// Internet checksum (RFC 1071) over `data`, odd lengths padded with a zero byte.
pub fn checksum(data: &[u8]) -> u16 {
    !fold(word_sum(data))
}

/// True when the folded sum over a packet, checksum field included, is `0xFFFF`.
pub fn verify_checksum(packet: &[u8]) -> bool {
    fold(word_sum(packet)) == 0xFFFF
}

fn word_sum(data: &[u8]) -> u64 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u64 = chunks
        .by_ref()
        .map(|pair| u64::from(u16::from_be_bytes([pair[0], pair[1]])))
        .sum();
    if let [last] = chunks.remainder() {
        sum += u64::from(u16::from_be_bytes([*last, 0]));
    }
    sum
}

fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// Identifier stamped into echo requests, taken from the process id.
pub fn echo_identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

pub fn build_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ICMP_HEADER_LEN + payload.len());
    packet.extend_from_slice(&[ECHO_REQUEST, 0, 0, 0]);
    packet.extend_from_slice(&identifier.to_be_bytes());
    packet.extend_from_slice(&sequence.to_be_bytes());
    packet.extend_from_slice(payload);

    let sum = checksum(&packet);
    packet[2..4].copy_from_slice(&sum.to_be_bytes());
    packet
}

pub fn parse_icmp_header(bytes: &[u8]) -> Option<IcmpHeader> {
    if bytes.len() < ICMP_HEADER_LEN {
        return None;
    }

    Some(IcmpHeader {
        kind: bytes[0],
        code: bytes[1],
        checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
        identifier: u16::from_be_bytes([bytes[4], bytes[5]]),
        sequence: u16::from_be_bytes([bytes[6], bytes[7]]),
    })
}

/// Reads the ICMP header out of a datagram captured on a raw IPv4 socket,
/// skipping the IP header by its IHL field.
pub fn parse_echo_reply(datagram: &[u8]) -> Option<IcmpHeader> {
    let first = *datagram.first()?;
    if first >> 4 != 4 {
        return None;
    }

    let header_len = usize::from(first & 0x0F) * 4;
    if header_len < MIN_IPV4_HEADER_LEN || datagram.len() < header_len {
        return None;
    }

    parse_icmp_header(&datagram[header_len..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_fits_process_id() {
        assert_eq!(u32::from(echo_identifier()), std::process::id() & 0xFFFF);
    }

    #[test]
    fn non_ipv4_datagram_is_rejected() {
        let mut datagram = vec![0x60; 48];
        datagram[40] = ECHO_REPLY;
        assert_eq!(parse_echo_reply(&datagram), None);
    }
}
