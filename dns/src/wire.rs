//! DNS packet parsing and response building.
//!
//! Message layout: 12-byte header (id, flags, qd/an/ns/ar counts), then
//! the question as length-prefixed labels, QTYPE and QCLASS. Answers
//! refer back to the question name with the standard 0xC00C pointer.

use std::net::IpAddr;

pub const QTYPE_A: u16 = 1;
pub const QTYPE_AAAA: u16 = 28;
pub const QCLASS_IN: u16 = 1;

const HEADER_LEN: usize = 12;
const ANSWER_TTL: [u8; 4] = [0x00, 0x00, 0x00, 0x3C];

/// The question section of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: u16,
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// True for an ordinary query: QR clear, opcode zero, exactly one
/// question. Everything else is refused before resolution.
pub fn is_standard_query(packet: &[u8]) -> bool {
    if packet.len() < HEADER_LEN {
        return false;
    }
    let flags = u16::from_be_bytes([packet[2], packet[3]]);
    let qr = flags & 0x8000 != 0;
    let opcode = (flags >> 11) & 0xF;
    let qdcount = u16::from_be_bytes([packet[4], packet[5]]);
    !qr && opcode == 0 && qdcount == 1
}

pub fn parse_query(packet: &[u8]) -> Option<Query> {
    if packet.len() < HEADER_LEN {
        return None;
    }
    let id = u16::from_be_bytes([packet[0], packet[1]]);

    let mut labels = Vec::new();
    let mut pos = HEADER_LEN;
    loop {
        let len = *packet.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        // Compression pointers never appear in a well-formed question.
        if len & 0xC0 != 0 {
            return None;
        }
        let label = packet.get(pos + 1..pos + 1 + len)?;
        labels.push(std::str::from_utf8(label).ok()?.to_string());
        pos += 1 + len;
    }
    if labels.is_empty() {
        return None;
    }

    let qtype = u16::from_be_bytes([*packet.get(pos)?, *packet.get(pos + 1)?]);
    let qclass = u16::from_be_bytes([*packet.get(pos + 2)?, *packet.get(pos + 3)?]);

    Some(Query {
        id,
        name: labels.join("."),
        qtype,
        qclass,
    })
}

/// Offset one past the question section (name, QTYPE, QCLASS).
fn question_end(packet: &[u8]) -> Option<usize> {
    let mut pos = HEADER_LEN;
    while *packet.get(pos)? != 0 {
        pos += 1 + *packet.get(pos)? as usize;
    }
    let end = pos + 5;
    if end > packet.len() {
        return None;
    }
    Some(end)
}

fn response_header(query: &[u8], rcode: u8, answers: u16) -> Option<Vec<u8>> {
    let end = question_end(query)?;
    let mut response = Vec::with_capacity(end + 16);
    // Transaction id.
    response.extend_from_slice(&query[0..2]);
    // QR=1, AA=1, RD copied, RA=1.
    let rd = query[2] & 0x01;
    response.push(0x84 | rd);
    response.push(0x80 | (rcode & 0x0F));
    // QDCOUNT=1, ANCOUNT, NSCOUNT=0, ARCOUNT=0.
    response.extend_from_slice(&[0x00, 0x01]);
    response.extend_from_slice(&answers.to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    // Question copied verbatim.
    response.extend_from_slice(&query[HEADER_LEN..end]);
    Some(response)
}

/// Builds a NOERROR response carrying the addresses that match the
/// question's record type (A for IPv4, AAAA for IPv6).
pub fn build_answer(query_packet: &[u8], addresses: &[IpAddr]) -> Option<Vec<u8>> {
    let query = parse_query(query_packet)?;
    let matching: Vec<&IpAddr> = addresses
        .iter()
        .filter(|addr| match query.qtype {
            QTYPE_A => addr.is_ipv4(),
            QTYPE_AAAA => addr.is_ipv6(),
            _ => false,
        })
        .collect();

    let mut response = response_header(query_packet, 0, matching.len() as u16)?;
    for addr in matching {
        // Name pointer to offset 12, the question name.
        response.extend_from_slice(&[0xC0, 0x0C]);
        match addr {
            IpAddr::V4(v4) => {
                response.extend_from_slice(&QTYPE_A.to_be_bytes());
                response.extend_from_slice(&QCLASS_IN.to_be_bytes());
                response.extend_from_slice(&ANSWER_TTL);
                response.extend_from_slice(&4u16.to_be_bytes());
                response.extend_from_slice(&v4.octets());
            }
            IpAddr::V6(v6) => {
                response.extend_from_slice(&QTYPE_AAAA.to_be_bytes());
                response.extend_from_slice(&QCLASS_IN.to_be_bytes());
                response.extend_from_slice(&ANSWER_TTL);
                response.extend_from_slice(&16u16.to_be_bytes());
                response.extend_from_slice(&v6.octets());
            }
        }
    }
    Some(response)
}

/// Builds the deterministic name-error response for unknown names.
pub fn build_nxdomain(query_packet: &[u8]) -> Option<Vec<u8>> {
    response_header(query_packet, 3, 0)
}

#[cfg(test)]
pub fn encode_query(id: u16, name: &str, qtype: u16) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&[0x01, 0x00]); // RD set
    packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    for label in name.trim_end_matches('.').split('.') {
        packet.push(label.len() as u8);
        packet.extend_from_slice(label.as_bytes());
    }
    packet.push(0);
    packet.extend_from_slice(&qtype.to_be_bytes());
    packet.extend_from_slice(&QCLASS_IN.to_be_bytes());
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let packet = encode_query(0x1234, "c1.example.internal", QTYPE_A);
        let query = parse_query(&packet).unwrap();
        assert_eq!(query.id, 0x1234);
        assert_eq!(query.name, "c1.example.internal");
        assert_eq!(query.qtype, QTYPE_A);
        assert_eq!(query.qclass, QCLASS_IN);
    }

    #[test]
    fn test_standard_query_validator() {
        let packet = encode_query(1, "c1", QTYPE_A);
        assert!(is_standard_query(&packet));

        let mut response = packet.clone();
        response[2] |= 0x80; // QR set
        assert!(!is_standard_query(&response));

        let mut status = packet.clone();
        status[2] |= 0x10; // opcode = 2
        assert!(!is_standard_query(&status));

        assert!(!is_standard_query(&[0u8; 4]));
    }

    #[test]
    fn test_answer_carries_a_record() {
        let packet = encode_query(7, "c1", QTYPE_A);
        let response =
            build_answer(&packet, &["192.168.64.2".parse().unwrap()]).unwrap();

        assert_eq!(&response[0..2], &7u16.to_be_bytes());
        // One answer.
        assert_eq!(u16::from_be_bytes([response[6], response[7]]), 1);
        // RCODE 0.
        assert_eq!(response[3] & 0x0F, 0);
        // RDATA is the address, at the tail.
        assert_eq!(&response[response.len() - 4..], &[192, 168, 64, 2]);
    }

    #[test]
    fn test_answer_filters_by_record_type() {
        let addresses = vec![
            "192.168.64.2".parse().unwrap(),
            "fd00::2".parse().unwrap(),
        ];
        let a = build_answer(&encode_query(1, "c1", QTYPE_A), &addresses).unwrap();
        assert_eq!(u16::from_be_bytes([a[6], a[7]]), 1);

        let aaaa = build_answer(&encode_query(1, "c1", QTYPE_AAAA), &addresses).unwrap();
        assert_eq!(u16::from_be_bytes([aaaa[6], aaaa[7]]), 1);
        assert_eq!(aaaa[aaaa.len() - 16..][..2], [0xfd, 0x00]);
    }

    #[test]
    fn test_nxdomain_rcode() {
        let packet = encode_query(9, "ghost", QTYPE_A);
        let response = build_nxdomain(&packet).unwrap();
        assert_eq!(response[3] & 0x0F, 3);
        assert_eq!(u16::from_be_bytes([response[6], response[7]]), 0);
    }
}
