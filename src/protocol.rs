use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the fixed header block: sequence, packet size, word count.
pub const HEADER_LEN: usize = 12;

/// Largest packet a Frostbite server accepts or emits.
pub const MAX_PACKET_LEN: usize = 16_384;

const SEQUENCE_MASK: u32 = 0x3fff_ffff;
const RESPONSE_FLAG: u32 = 1 << 30;
const CLIENT_ORIGIN_FLAG: u32 = 1 << 31;

/// Which side of the connection started the exchange a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Client,
  Server,
}

/// Errors raised while encoding or decoding Frostbite RCON packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
  #[error("packet of {0} bytes exceeds the {max} byte limit", max = MAX_PACKET_LEN)]
  TooLarge(usize),
  #[error("packet header announces invalid size {0}")]
  InvalidSize(u32),
  #[error("packet truncated: expected {expected} bytes, found {found}")]
  Truncated { expected: usize, found: usize },
  #[error("word {index} is not terminated by a NUL byte")]
  MissingTerminator { index: usize },
  #[error("word {index} contains a NUL byte")]
  EmbeddedNul { index: usize },
  #[error("word {index} is not valid UTF-8")]
  InvalidUtf8 { index: usize },
  #[error("packet declares {declared} words but carries trailing bytes")]
  TrailingBytes { declared: u32 },
  /// A whole frame was read but its body could not be decoded. The stream
  /// is still aligned on the next packet.
  #[error("malformed packet {sequence}: {source}")]
  Malformed {
    sequence: u32,
    origin: Origin,
    is_response: bool,
    source: Box<ProtocolError>,
  },
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// A single framed message: a header plus an ordered list of words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
  pub sequence: u32,
  pub origin: Origin,
  pub is_response: bool,
  pub words: Vec<String>,
}

impl Packet {
  /// Build a client-originated request.
  pub fn request(sequence: u32, words: Vec<String>) -> Self {
    Self {
      sequence: sequence & SEQUENCE_MASK,
      origin: Origin::Client,
      is_response: false,
      words,
    }
  }

  /// Build the answer to this packet, echoing its sequence and origin.
  pub fn reply(&self, words: Vec<String>) -> Self {
    Self {
      sequence: self.sequence,
      origin: self.origin,
      is_response: true,
      words,
    }
  }

  /// True when the server pushed this packet on its own, i.e. an event.
  pub fn is_server_request(&self) -> bool {
    self.origin == Origin::Server && !self.is_response
  }

  fn header(&self) -> u32 {
    let mut header = self.sequence & SEQUENCE_MASK;
    if self.is_response {
      header |= RESPONSE_FLAG;
    }
    if self.origin == Origin::Client {
      header |= CLIENT_ORIGIN_FLAG;
    }
    header
  }

  /// Serialize the packet into its wire representation.
  pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
    let mut size = HEADER_LEN;
    for (index, word) in self.words.iter().enumerate() {
      if word.as_bytes().contains(&0) {
        return Err(ProtocolError::EmbeddedNul { index });
      }
      size += 4 + word.len() + 1;
    }
    if size > MAX_PACKET_LEN {
      return Err(ProtocolError::TooLarge(size));
    }

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&self.header().to_le_bytes());
    buf.extend_from_slice(&(size as u32).to_le_bytes());
    buf.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
    for word in &self.words {
      buf.extend_from_slice(&(word.len() as u32).to_le_bytes());
      buf.extend_from_slice(word.as_bytes());
      buf.push(0);
    }
    Ok(buf)
  }

  /// Decode exactly one complete packet from `bytes`.
  pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
    if bytes.len() < HEADER_LEN {
      return Err(ProtocolError::Truncated {
        expected: HEADER_LEN,
        found: bytes.len(),
      });
    }

    let header = read_u32(bytes, 0);
    let size = read_u32(bytes, 4);
    let declared = validate_size(size)?;
    if bytes.len() != declared {
      return Err(ProtocolError::Truncated {
        expected: declared,
        found: bytes.len(),
      });
    }

    let word_count = read_u32(bytes, 8);
    let mut words = Vec::new();
    let mut cursor = HEADER_LEN;
    for index in 0..word_count as usize {
      if cursor + 4 > bytes.len() {
        return Err(ProtocolError::Truncated {
          expected: cursor + 4,
          found: bytes.len(),
        });
      }
      let len = read_u32(bytes, cursor) as usize;
      cursor += 4;

      let end = cursor + len;
      if end >= bytes.len() {
        return Err(ProtocolError::Truncated {
          expected: end + 1,
          found: bytes.len(),
        });
      }
      let raw = &bytes[cursor..end];
      if raw.contains(&0) {
        return Err(ProtocolError::EmbeddedNul { index });
      }
      if bytes[end] != 0 {
        return Err(ProtocolError::MissingTerminator { index });
      }
      let word = std::str::from_utf8(raw)
        .map_err(|_| ProtocolError::InvalidUtf8 { index })?;
      words.push(word.to_owned());
      cursor = end + 1;
    }

    if cursor != bytes.len() {
      return Err(ProtocolError::TrailingBytes {
        declared: word_count,
      });
    }

    let (sequence, origin, is_response) = split_header(header);
    Ok(Self {
      sequence,
      origin,
      is_response,
      words,
    })
  }
}

/// Read one whole packet from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly on a packet boundary.
/// A frame whose body fails to decode is consumed in full and reported as
/// [`ProtocolError::Malformed`], so the caller may keep reading.
pub async fn read_packet<R>(
  reader: &mut R,
) -> Result<Option<Packet>, ProtocolError>
where
  R: AsyncRead + Unpin,
{
  let mut head = [0u8; HEADER_LEN];
  let mut filled = 0;
  while filled < HEADER_LEN {
    let n = reader.read(&mut head[filled..]).await?;
    if n == 0 {
      if filled == 0 {
        return Ok(None);
      }
      return Err(ProtocolError::Truncated {
        expected: HEADER_LEN,
        found: filled,
      });
    }
    filled += n;
  }

  let size = validate_size(read_u32(&head, 4))?;
  let mut buf = vec![0u8; size];
  buf[..HEADER_LEN].copy_from_slice(&head);
  reader.read_exact(&mut buf[HEADER_LEN..]).await?;

  Packet::decode(&buf).map(Some).map_err(|err| {
    let (sequence, origin, is_response) = split_header(read_u32(&head, 0));
    ProtocolError::Malformed {
      sequence,
      origin,
      is_response,
      source: Box::new(err),
    }
  })
}

fn split_header(header: u32) -> (u32, Origin, bool) {
  let origin = if header & CLIENT_ORIGIN_FLAG != 0 {
    Origin::Client
  } else {
    Origin::Server
  };
  (header & SEQUENCE_MASK, origin, header & RESPONSE_FLAG != 0)
}

fn validate_size(size: u32) -> Result<usize, ProtocolError> {
  let len = size as usize;
  if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&len) {
    return Err(ProtocolError::InvalidSize(size));
  }
  Ok(len)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
  u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn request_encodes_known_layout() {
    let bytes = Packet::request(7, words(&["serverInfo"])).encode().unwrap();

    // header: sequence 7 with the client origin bit set
    assert_eq!(&bytes[0..4], &(7u32 | (1 << 31)).to_le_bytes());
    assert_eq!(read_u32(&bytes, 4) as usize, bytes.len());
    assert_eq!(read_u32(&bytes, 8), 1);
    assert_eq!(read_u32(&bytes, 12), 10);
    assert_eq!(&bytes[16..26], b"serverInfo");
    assert_eq!(bytes[26], 0);
    assert_eq!(bytes.len(), 27);
  }

  #[test]
  fn decode_recovers_server_event() {
    let event = Packet {
      sequence: 42,
      origin: Origin::Server,
      is_response: false,
      words: words(&["player.onKill", "A", "B", "M16A4", "true"]),
    };
    let decoded = Packet::decode(&event.encode().unwrap()).unwrap();

    assert!(decoded.is_server_request());
    assert_eq!(decoded, event);
  }

  #[test]
  fn reply_echoes_sequence_and_origin() {
    let event = Packet {
      sequence: 9,
      origin: Origin::Server,
      is_response: false,
      words: words(&["player.onLeave"]),
    };
    let ack = event.reply(words(&["OK"]));

    assert_eq!(ack.sequence, 9);
    assert_eq!(ack.origin, Origin::Server);
    assert!(ack.is_response);
    let header = read_u32(&ack.encode().unwrap(), 0);
    assert_eq!(header, 9 | (1 << 30));
  }

  #[test]
  fn encode_rejects_oversized_packets() {
    let huge = "x".repeat(MAX_PACKET_LEN);
    let err = Packet::request(1, vec![huge]).encode().unwrap_err();
    assert!(matches!(err, ProtocolError::TooLarge(_)));
  }

  #[test]
  fn decode_rejects_missing_terminator() {
    let mut bytes = Packet::request(1, words(&["abc"])).encode().unwrap();
    let last = bytes.len() - 1;
    bytes[last] = b'!';
    let err = Packet::decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingTerminator { index: 0 }));
  }

  #[test]
  fn decode_rejects_bogus_size() {
    let mut bytes = Packet::request(1, words(&["abc"])).encode().unwrap();
    bytes[4..8].copy_from_slice(&4u32.to_le_bytes());
    let err = Packet::decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidSize(4)));
  }

  #[tokio::test]
  async fn read_packet_handles_back_to_back_frames() {
    let mut stream = Vec::new();
    stream.extend(Packet::request(1, words(&["a"])).encode().unwrap());
    stream.extend(Packet::request(2, words(&["b", "c"])).encode().unwrap());
    let mut reader = stream.as_slice();

    let first = read_packet(&mut reader).await.unwrap().unwrap();
    let second = read_packet(&mut reader).await.unwrap().unwrap();
    assert_eq!(first.words, words(&["a"]));
    assert_eq!(second.sequence, 2);
    assert_eq!(second.words, words(&["b", "c"]));
    assert!(read_packet(&mut reader).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn read_packet_skips_past_undecodable_body() {
    let bad = Packet {
      sequence: 3,
      origin: Origin::Server,
      is_response: false,
      words: words(&["player.onLeaveX"]),
    };
    let mut bytes = bad.encode().unwrap();
    // last character of the word, just before its NUL
    let at = bytes.len() - 2;
    bytes[at] = 0xff;
    bytes.extend(Packet::request(4, words(&["ok"])).encode().unwrap());
    let mut reader = bytes.as_slice();

    let err = read_packet(&mut reader).await.unwrap_err();
    match err {
      ProtocolError::Malformed {
        sequence,
        origin,
        is_response,
        source,
      } => {
        assert_eq!(sequence, 3);
        assert_eq!(origin, Origin::Server);
        assert!(!is_response);
        assert!(matches!(*source, ProtocolError::InvalidUtf8 { index: 0 }));
      }
      other => panic!("unexpected error: {other}"),
    }

    let next = read_packet(&mut reader).await.unwrap().unwrap();
    assert_eq!(next.sequence, 4);
    assert_eq!(next.words, words(&["ok"]));
  }
}
