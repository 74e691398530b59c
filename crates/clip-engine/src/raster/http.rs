//! Seekable HTTP access via Range requests.
//!
//! The TIFF decoder seeks aggressively (header, tag data, then individual
//! tiles), so remote assets are read through a block cache: each Range
//! request fetches an aligned 64 KiB block and subsequent reads inside
//! the same block are served from memory.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use clip_common::{ClipError, ClipResult};
use reqwest::blocking::Client;
use reqwest::header;
use tracing::debug;

const BLOCK_SIZE: u64 = 64 * 1024;

/// Blocking `Read + Seek` over a remote object.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    len: u64,
    pos: u64,
    blocks: HashMap<u64, Vec<u8>>,
}

impl HttpRangeReader {
    /// Open a remote object and learn its length.
    pub fn open(url: &str) -> ClipResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClipError::RemoteIo(format!("HTTP client: {e}")))?;

        let response = client
            .head(url)
            .send()
            .map_err(|e| ClipError::RemoteIo(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipError::RemoteIo(format!("{url}: HTTP {status}")));
        }

        let len = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                ClipError::RemoteIo(format!("{url}: missing Content-Length"))
            })?;

        debug!(url = %url, bytes = len, "Opened remote raster");

        Ok(Self {
            client,
            url: url.to_string(),
            len,
            pos: 0,
            blocks: HashMap::new(),
        })
    }

    fn fetch_block(&mut self, block_index: u64) -> io::Result<&[u8]> {
        if !self.blocks.contains_key(&block_index) {
            let start = block_index * BLOCK_SIZE;
            let end = (start + BLOCK_SIZE - 1).min(self.len.saturating_sub(1));

            let response = self
                .client
                .get(&self.url)
                .header(header::RANGE, format!("bytes={start}-{end}"))
                .send()
                .map_err(|e| io::Error::other(format!("{}: {e}", self.url)))?;

            let status = response.status();
            if !(status.is_success() || status == reqwest::StatusCode::PARTIAL_CONTENT) {
                return Err(io::Error::other(format!("{}: HTTP {status}", self.url)));
            }

            let bytes = response
                .bytes()
                .map_err(|e| io::Error::other(format!("{}: {e}", self.url)))?;

            self.blocks.insert(block_index, bytes.to_vec());
        }

        Ok(self.blocks.get(&block_index).map(|v| v.as_slice()).unwrap_or(&[]))
    }
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }

        let block_index = self.pos / BLOCK_SIZE;
        let offset = (self.pos % BLOCK_SIZE) as usize;
        let block = self.fetch_block(block_index)?;

        if offset >= block.len() {
            return Ok(0);
        }

        let n = buf.len().min(block.len() - offset);
        buf[..n].copy_from_slice(&block[offset..offset + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.len as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };

        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }

        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}
