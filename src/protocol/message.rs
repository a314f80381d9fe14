use bytes::Bytes;

/// A logical message handed to or received from the protocol.
///
/// The header and payload travel as one contiguous stream; the START frame
/// records where the header ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    header: Bytes,
    payload: Bytes,
}

impl Message {
    pub fn new(header: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            header: header.into(),
            payload: payload.into(),
        }
    }

    /// A message with an empty header.
    pub fn from_payload(payload: impl Into<Bytes>) -> Self {
        Self::new(Bytes::new(), payload)
    }

    pub fn header(&self) -> &Bytes {
        &self.header
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.header, self.payload)
    }

    /// Combined length of header and payload.
    #[inline]
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
