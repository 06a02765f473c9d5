//! Zero-copy byte accumulation for streamed tool-call arguments.
//!
//! Argument payloads arrive as many small `Bytes` chunks. `ByteSequenceBuilder`
//! keeps the chunks as-is (each append only bumps a refcount) and `build()`
//! hands back a `ByteSequence` view over them in arrival order. Nothing is
//! concatenated until a caller explicitly asks for contiguous bytes.
//!
//! A builder is owned by exactly one streaming round and is not shared.

use std::io::{self, Read};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

// ─── Builder ────────────────────────────────────────────────────────────────

/// Append-only collector of byte chunks.
#[derive(Debug, Default)]
pub struct ByteSequenceBuilder {
    chunks: Vec<Bytes>,
    len: usize,
}

impl ByteSequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. The chunk's backing storage is shared, never copied.
    /// Empty chunks are ignored.
    pub fn append(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Total number of bytes appended so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Produce a view over everything appended so far.
    ///
    /// - no chunks → [`ByteSequence::Empty`]
    /// - one chunk → that chunk, returned directly
    /// - many chunks → a segmented view sharing the chunks
    pub fn build(&self) -> ByteSequence {
        match self.chunks.as_slice() {
            [] => ByteSequence::Empty,
            [only] => ByteSequence::Single(only.clone()),
            many => ByteSequence::Segmented {
                segments: Arc::from(many),
                len: self.len,
            },
        }
    }
}

// ─── View ───────────────────────────────────────────────────────────────────

/// A read-only logical byte range made of one or more shared segments.
///
/// Cloning is cheap: a `Bytes` refcount bump or an `Arc` bump.
#[derive(Debug, Clone, Default)]
pub enum ByteSequence {
    #[default]
    Empty,
    Single(Bytes),
    Segmented { segments: Arc<[Bytes]>, len: usize },
}

impl ByteSequence {
    pub fn len(&self) -> usize {
        match self {
            ByteSequence::Empty => 0,
            ByteSequence::Single(b) => b.len(),
            ByteSequence::Segmented { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the underlying segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &Bytes> {
        let slice: &[Bytes] = match self {
            ByteSequence::Empty => &[],
            ByteSequence::Single(b) => std::slice::from_ref(b),
            ByteSequence::Segmented { segments, .. } => &segments[..],
        };
        slice.iter()
    }

    /// Contiguous bytes. Free for `Empty`/`Single`; copies once for segmented views.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ByteSequence::Empty => Bytes::new(),
            ByteSequence::Single(b) => b.clone(),
            ByteSequence::Segmented { segments, len } => {
                let mut out = BytesMut::with_capacity(*len);
                for segment in segments.iter() {
                    out.extend_from_slice(segment);
                }
                out.freeze()
            }
        }
    }

    /// Lossy UTF-8 rendering, used when the payload is echoed back to a backend.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// A streaming reader over the segments, so parsers can consume the
    /// payload without it ever being made contiguous.
    pub fn reader(&self) -> SequenceReader<'_> {
        SequenceReader {
            segments: self.segments().collect(),
            segment: 0,
            offset: 0,
        }
    }
}

impl PartialEq for ByteSequence {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for ByteSequence {}

impl From<&'static str> for ByteSequence {
    fn from(s: &'static str) -> Self {
        let mut builder = ByteSequenceBuilder::new();
        builder.append(Bytes::from_static(s.as_bytes()));
        builder.build()
    }
}

impl From<String> for ByteSequence {
    fn from(s: String) -> Self {
        let mut builder = ByteSequenceBuilder::new();
        builder.append(Bytes::from(s));
        builder.build()
    }
}

/// `std::io::Read` adapter over a [`ByteSequence`].
pub struct SequenceReader<'a> {
    segments: Vec<&'a Bytes>,
    segment: usize,
    offset: usize,
}

impl Read for SequenceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(current) = self.segments.get(self.segment).copied() {
            let remaining = &current[self.offset..];
            if remaining.is_empty() {
                self.segment += 1;
                self.offset = 0;
                continue;
            }
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.offset += n;
            return Ok(n);
        }
        Ok(0)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_before_append_is_empty() {
        let builder = ByteSequenceBuilder::new();
        let seq = builder.build();
        assert!(seq.is_empty());
        assert!(matches!(seq, ByteSequence::Empty));
        assert_eq!(seq.to_bytes(), Bytes::new());
    }

    #[test]
    fn test_single_chunk_returned_directly() {
        let chunk = Bytes::from_static(b"{\"x\":1}");
        let mut builder = ByteSequenceBuilder::new();
        builder.append(chunk.clone());

        match builder.build() {
            ByteSequence::Single(b) => {
                // Same backing storage, no copy
                assert_eq!(b.as_ptr(), chunk.as_ptr());
            }
            other => panic!("expected single segment, got {other:?}"),
        }
    }

    #[test]
    fn test_segments_preserve_arrival_order_without_copy() {
        let a = Bytes::from_static(b"{\"text\":");
        let b = Bytes::from_static(b"\"hi\"}");
        let mut builder = ByteSequenceBuilder::new();
        builder.append(a.clone());
        builder.append(b.clone());

        let seq = builder.build();
        assert_eq!(seq.len(), a.len() + b.len());
        let ptrs: Vec<_> = seq.segments().map(|s| s.as_ptr()).collect();
        assert_eq!(ptrs, vec![a.as_ptr(), b.as_ptr()]);
        assert_eq!(&seq.to_bytes()[..], b"{\"text\":\"hi\"}");
    }

    #[test]
    fn test_empty_chunks_ignored() {
        let mut builder = ByteSequenceBuilder::new();
        builder.append(Bytes::new());
        builder.append(Bytes::from_static(b"ab"));
        builder.append(Bytes::new());
        assert!(matches!(builder.build(), ByteSequence::Single(_)));
    }

    #[test]
    fn test_reader_streams_across_segments() {
        let mut builder = ByteSequenceBuilder::new();
        for piece in ["{\"x\"", ":", " 12", ", \"y\": 3", "4}"] {
            builder.append(Bytes::from(piece));
        }
        let seq = builder.build();
        let value: serde_json::Value = serde_json::from_reader(seq.reader()).unwrap();
        assert_eq!(value, serde_json::json!({"x": 12, "y": 34}));
    }

    #[test]
    fn test_build_is_repeatable() {
        let mut builder = ByteSequenceBuilder::new();
        builder.append(Bytes::from_static(b"ab"));
        builder.append(Bytes::from_static(b"cd"));
        assert_eq!(builder.build(), builder.build());
        assert_eq!(builder.build().to_string_lossy(), "abcd");
    }
}
