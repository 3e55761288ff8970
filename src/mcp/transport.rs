//! `Content-Length` framed transport for the bridge.
//!
//! Each message is a header block followed by a JSON payload:
//!
//! ```text
//! Content-Length: <decimal byte count>\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! <exactly Content-Length bytes of JSON>
//! ```
//!
//! Header names are case-insensitive; only `Content-Length` is required.
//! Bare `\n` line endings are accepted when reading. Writing always emits
//! both headers with `\r\n` endings and flushes before returning.
//!
//! The transport is generic over any buffered reader and writer so it can be
//! driven from stdio in production and from in-memory buffers in tests.

use std::io;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on the size of one header block.
pub const MAX_HEADER_BYTES: u64 = 8 * 1024;

/// Upper bound on input discarded after an oversized header block while
/// looking for its end.
pub const MAX_DISCARD_BYTES: u64 = 1024 * 1024;

/// Upper bound on a single payload.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Errors produced while reading or writing a frame.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The underlying stream failed.
    #[error("transport I/O error")]
    Io(#[from] io::Error),

    /// The stream ended before the announced payload was complete.
    #[error("stream ended after {received} of {expected} payload bytes")]
    Truncated {
        /// Bytes announced by `Content-Length`.
        expected: usize,
        /// Bytes available before end-of-stream.
        received: usize,
    },

    /// The header block exceeded [`MAX_HEADER_BYTES`]. The block and its
    /// payload were skipped.
    #[error("header block exceeds {MAX_HEADER_BYTES} bytes")]
    HeaderTooLarge,

    /// An oversized header block did not end within [`MAX_DISCARD_BYTES`].
    #[error("header block not terminated within {MAX_DISCARD_BYTES} bytes")]
    HeaderUnterminated,

    /// A header line had no `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The header block had no `Content-Length`.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// `Content-Length` was not a usable byte count.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// The payload was not valid JSON.
    #[error("payload is not valid JSON")]
    Parse(#[source] serde_json::Error),

    /// An outgoing message could not be serialised.
    #[error("failed to encode outgoing message")]
    Encode(#[source] serde_json::Error),
}

impl FrameError {
    /// Returns `true` if the stream is still usable after this error.
    ///
    /// Recoverable errors are answered with a parse-error response; the rest
    /// end the session.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::HeaderTooLarge
                | Self::MalformedHeader(_)
                | Self::MissingContentLength
                | Self::InvalidContentLength(_)
                | Self::Parse(_)
        )
    }
}

/// A framed JSON transport over a reader/writer pair.
pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport used in production: stdin in, stdout out.
pub type StdioTransport = FramedTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> FramedTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the transport, returning the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Reads the next framed message and decodes its payload.
    ///
    /// Returns `Ok(None)` when the stream ends before a complete header
    /// block, including when it closes part-way through one.
    ///
    /// # Errors
    ///
    /// See [`FrameError`]; use [`FrameError::is_recoverable`] to decide
    /// whether to keep reading.
    pub async fn read_message(&mut self) -> Result<Option<Value>, FrameError> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        let mut payload = vec![0_u8; content_length];
        let mut received = 0;
        while received < content_length {
            let n = self.reader.read(&mut payload[received..]).await?;
            if n == 0 {
                return Err(FrameError::Truncated {
                    expected: content_length,
                    received,
                });
            }
            received += n;
        }

        tracing::trace!(bytes = content_length, "Read frame payload");

        serde_json::from_slice(&payload)
            .map(Some)
            .map_err(FrameError::Parse)
    }

    /// Reads one header block, returning the announced payload length.
    ///
    /// A block over [`MAX_HEADER_BYTES`] is read on to its blank line (up to
    /// [`MAX_DISCARD_BYTES`] more) and its payload skipped, so the error is
    /// recoverable.
    async fn read_headers(&mut self) -> Result<Option<usize>, FrameError> {
        let mut budget = MAX_HEADER_BYTES;
        let mut oversized = false;
        // The current line is the tail of one cut at the header limit.
        let mut continuation = false;
        let mut content_length: Option<Result<usize, String>> = None;
        let mut malformed: Option<String> = None;
        let mut saw_header = false;

        loop {
            let mut line = Vec::new();
            let n = (&mut self.reader)
                .take(budget)
                .read_until(b'\n', &mut line)
                .await?;
            budget = budget.saturating_sub(n as u64);

            if !line.ends_with(b"\n") {
                if budget > 0 {
                    if saw_header || n > 0 {
                        tracing::debug!("Stream closed inside a header block");
                    }
                    return Ok(None);
                }
                if oversized {
                    return Err(FrameError::HeaderUnterminated);
                }
                tracing::debug!("Header block over {MAX_HEADER_BYTES} bytes, discarding");
                oversized = true;
                continuation = n > 0;
                saw_header = true;
                budget = MAX_DISCARD_BYTES;
                continue;
            }

            if std::mem::take(&mut continuation) {
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);

            if text.is_empty() {
                if !saw_header {
                    // Stray blank line between frames.
                    continue;
                }
                break;
            }
            saw_header = true;

            let Some((name, value)) = text.split_once(':') else {
                malformed.get_or_insert_with(|| text.to_string());
                continue;
            };

            if name.trim().eq_ignore_ascii_case("content-length") {
                let value = value.trim();
                content_length = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| value.to_string()),
                );
            }
        }

        let rejected = if oversized {
            Some(FrameError::HeaderTooLarge)
        } else {
            malformed.map(FrameError::MalformedHeader)
        };
        if let Some(err) = rejected {
            // Skip the payload too so the next read starts on a frame boundary.
            if let Some(Ok(n)) = content_length {
                self.skip_payload(n).await?;
            }
            return Err(err);
        }

        match content_length {
            None => Err(FrameError::MissingContentLength),
            Some(Err(raw)) => Err(FrameError::InvalidContentLength(raw)),
            Some(Ok(n)) if n > MAX_PAYLOAD_BYTES => {
                Err(FrameError::InvalidContentLength(n.to_string()))
            }
            Some(Ok(n)) => Ok(Some(n)),
        }
    }

    async fn skip_payload(&mut self, len: usize) -> io::Result<()> {
        if len <= MAX_PAYLOAD_BYTES {
            let mut payload = (&mut self.reader).take(len as u64);
            tokio::io::copy(&mut payload, &mut tokio::io::sink()).await?;
        }
        Ok(())
    }

    /// Serialises `message` and writes it as one frame, then flushes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Encode`] if serialisation fails (nothing is
    /// written in that case) or [`FrameError::Io`] if writing fails.
    pub async fn write_message<T: Serialize + ?Sized>(
        &mut self,
        message: &T,
    ) -> Result<(), FrameError> {
        let frame = encode_frame(message)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Encodes `message` as a complete frame: headers followed by the payload.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] if serialisation fails.
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(message).map_err(FrameError::Encode)?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        payload.len()
    );

    let mut frame = Vec::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mcp::protocol::{JsonRpcResponse, RequestId};

    fn reader(bytes: &[u8]) -> FramedTransport<&[u8], Vec<u8>> {
        FramedTransport::new(bytes, Vec::new())
    }

    #[test]
    fn encode_frame_has_exact_length() {
        let frame = encode_frame(&json!({"name": "Pikachu é"})).unwrap();
        let text = String::from_utf8(frame).unwrap();
        let (headers, payload) = text.split_once("\r\n\r\n").unwrap();
        assert!(headers.contains(&format!("Content-Length: {}", payload.len())));
        assert!(headers.contains("Content-Type: application/json"));
    }

    #[tokio::test]
    async fn read_single_message() {
        let input = b"Content-Length: 17\r\n\r\n{\"jsonrpc\":\"2.0\"}";
        let mut transport = reader(input);
        let value = transport.read_message().await.unwrap();
        assert_eq!(value, Some(json!({"jsonrpc": "2.0"})));
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn header_names_case_insensitive_and_extra_headers_ignored() {
        let input = b"content-type: application/json\ncontent-length: 2\n\n{}";
        let mut transport = reader(input);
        assert_eq!(transport.read_message().await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn empty_stream_is_clean_end() {
        let mut transport = reader(b"");
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_closing_mid_header_is_clean_end() {
        let mut transport = reader(b"Content-Length: 12\r\nContent-Ty");
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_content_length_is_recoverable() {
        let mut transport = reader(b"Content-Type: application/json\r\n\r\n");
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::MissingContentLength));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn non_numeric_content_length_is_recoverable() {
        let mut transport = reader(b"Content-Length: twelve\r\n\r\n");
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidContentLength(ref v) if v == "twelve"));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn malformed_header_skips_its_frame() {
        let input = b"Bogus header\r\nContent-Length: 2\r\n\r\n{}Content-Length: 2\r\n\r\n[]";
        let mut transport = reader(input);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::MalformedHeader(ref line) if line == "Bogus header"));
        assert!(err.is_recoverable());
        assert_eq!(transport.read_message().await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn truncated_payload_is_fatal() {
        let mut transport = reader(b"Content-Length: 50\r\n\r\n{\"a\":1}");
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                expected: 50,
                received: 7
            }
        ));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn invalid_json_payload_is_recoverable_and_stream_continues() {
        let input = b"Content-Length: 3\r\n\r\nnopContent-Length: 2\r\n\r\n[]";
        let mut transport = reader(input);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::Parse(_)));
        assert!(err.is_recoverable());
        assert_eq!(transport.read_message().await.unwrap(), Some(json!([])));
    }

    fn padding_header(len: usize) -> Vec<u8> {
        let mut input = b"X-Padding: ".to_vec();
        input.extend(std::iter::repeat(b'a').take(len));
        input.extend_from_slice(b"\r\n");
        input
    }

    #[tokio::test]
    async fn oversized_header_block_skips_its_frame() {
        let mut input = padding_header(10_000);
        input.extend_from_slice(b"Content-Length: 2\r\n\r\n{}");
        input.extend_from_slice(b"Content-Length: 2\r\n\r\n[]");
        let mut transport = reader(&input);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::HeaderTooLarge));
        assert!(err.is_recoverable());
        assert_eq!(transport.read_message().await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn oversized_header_without_length_resumes_after_blank_line() {
        let mut input = padding_header(9_000);
        input.extend_from_slice(b"\r\nContent-Length: 2\r\n\r\n{}");
        let mut transport = reader(&input);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::HeaderTooLarge));
        assert_eq!(transport.read_message().await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn unterminated_oversized_header_is_fatal() {
        let len = usize::try_from(MAX_HEADER_BYTES + MAX_DISCARD_BYTES).unwrap() + 16;
        let input = padding_header(len);
        let mut transport = reader(&input);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, FrameError::HeaderUnterminated));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn fragmented_reads_are_reassembled() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Len")
            .read(b"gth: 9\r")
            .read(b"\n\r\n{\"id\":")
            .read(b"42}")
            .build();
        let mut transport = FramedTransport::new(BufReader::new(mock), Vec::new());
        assert_eq!(
            transport.read_message().await.unwrap(),
            Some(json!({"id": 42}))
        );
    }

    #[tokio::test]
    async fn write_emits_single_flushed_frame() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!(null));
        let expected = encode_frame(&response).unwrap();
        let mock = tokio_test::io::Builder::new().write(&expected).build();
        let mut transport = FramedTransport::new(&b""[..], mock);
        transport.write_message(&response).await.unwrap();
    }

    #[tokio::test]
    async fn written_response_reads_back_equal() {
        let response = JsonRpcResponse::success(
            RequestId::from("req-7"),
            json!({"card": {"id": "base1-4", "name": "Charizard"}}),
        );

        let mut writer = FramedTransport::new(&b""[..], Vec::new());
        writer.write_message(&response).await.unwrap();
        let (_, bytes) = writer.into_parts();

        let mut reader = reader(&bytes);
        let value = reader.read_message().await.unwrap().unwrap();
        let decoded: JsonRpcResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, response);
    }
}
