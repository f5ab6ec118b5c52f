//! Incremental capture of a child's output stream
//!
//! Each stream is read chunk by chunk into its own buffer. Past the byte
//! limit the stream is still drained so the engine never blocks on a full
//! pipe, but the extra bytes are dropped and a marker is appended.

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8 * 1024;

/// Reads one output stream to EOF with a byte limit.
#[derive(Debug, Clone, Copy)]
pub struct StreamCapture {
    max_bytes: usize,
}

/// What was read from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    /// Captured text, lossily decoded, with a marker when truncated
    pub data: String,
    pub truncated: bool,
    /// Total bytes the stream produced, including dropped ones
    pub bytes_read: usize,
}

impl StreamCapture {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Accumulate `reader` until EOF or a read error.
    pub async fn collect<R: AsyncRead + Unpin>(&self, reader: &mut R) -> CapturedStream {
        let mut kept: Vec<u8> = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut bytes_read = 0usize;
        let mut truncated = false;

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    bytes_read += n;
                    let room = self.max_bytes.saturating_sub(kept.len());
                    kept.extend_from_slice(&chunk[..n.min(room)]);
                    if n > room {
                        truncated = true;
                    }
                }
                Err(e) => {
                    tracing::debug!("Stopped reading engine output: {}", e);
                    break;
                }
            }
        }

        let text = String::from_utf8_lossy(&kept).into_owned();
        let data = if truncated {
            format!("{}\n... [output truncated at {} bytes]", text, self.max_bytes)
        } else {
            text
        };

        CapturedStream {
            data,
            truncated,
            bytes_read,
        }
    }
}
