use oping_probe::packet::{ECHO_PAYLOAD, ECHO_REPLY, ECHO_REQUEST, ECHO_SEQUENCE};
use oping_probe::{build_echo_request, checksum, parse_echo_reply, verify_checksum};

fn pseudo_random_bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

fn ipv4_datagram(ihl_words: u8, icmp: &[u8]) -> Vec<u8> {
    let header_len = usize::from(ihl_words) * 4;
    let mut datagram = vec![0u8; header_len];
    datagram[0] = 0x40 | ihl_words;
    datagram[9] = 1;
    datagram.extend_from_slice(icmp);
    datagram
}

#[test]
fn checksum_matches_rfc1071_example() {
    let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
    assert_eq!(checksum(&data), 0x220d);
}

#[test]
fn embedded_checksum_sums_to_all_ones() {
    for (seed, len) in [(1, 0), (2, 2), (3, 8), (4, 64), (5, 1500), (6, 20_000)] {
        let data = pseudo_random_bytes(seed, len);
        let mut packet = data.clone();
        packet.extend_from_slice(&checksum(&data).to_be_bytes());
        assert!(verify_checksum(&packet), "seed {seed} len {len}");
    }

    let saturated = [0xff, 0xff, 0xff, 0xff];
    let mut packet = saturated.to_vec();
    packet.extend_from_slice(&checksum(&saturated).to_be_bytes());
    assert!(verify_checksum(&packet));
}

#[test]
fn odd_length_is_padded_with_zero() {
    let data = pseudo_random_bytes(9, 11);
    let mut padded = data.clone();
    padded.push(0);
    assert_eq!(checksum(&data), checksum(&padded));
}

#[test]
fn echo_request_layout() {
    let packet = build_echo_request(0xbeef, ECHO_SEQUENCE, ECHO_PAYLOAD);

    assert_eq!(packet.len(), 8 + ECHO_PAYLOAD.len());
    assert_eq!(packet[0], ECHO_REQUEST);
    assert_eq!(packet[1], 0);
    assert_eq!(&packet[4..6], &[0xbe, 0xef]);
    assert_eq!(&packet[6..8], &ECHO_SEQUENCE.to_be_bytes());
    assert_eq!(&packet[8..], ECHO_PAYLOAD);
    assert!(verify_checksum(&packet));

    let mut zeroed = packet.clone();
    zeroed[2] = 0;
    zeroed[3] = 0;
    assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), checksum(&zeroed));
}

#[test]
fn reply_is_found_after_ip_header() {
    let mut icmp = build_echo_request(0x1234, 7, b"abc");
    icmp[0] = ECHO_REPLY;

    let header = parse_echo_reply(&ipv4_datagram(5, &icmp)).unwrap();
    assert_eq!(header.kind, ECHO_REPLY);
    assert_eq!(header.identifier, 0x1234);
    assert_eq!(header.sequence, 7);

    let with_options = parse_echo_reply(&ipv4_datagram(6, &icmp)).unwrap();
    assert_eq!(with_options, header);
}

#[test]
fn truncated_or_malformed_datagrams_are_ignored() {
    assert_eq!(parse_echo_reply(&[]), None);
    assert_eq!(parse_echo_reply(&ipv4_datagram(5, &[0, 0, 0])), None);

    let mut short_ihl = ipv4_datagram(5, &[0; 8]);
    short_ihl[0] = 0x44;
    assert_eq!(parse_echo_reply(&short_ihl), None);
}
