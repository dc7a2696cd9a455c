//! Line-delimited JSON consumer
//!
//! Used by the `stream-client` binary and by the end-to-end tests.

use std::io;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::replay::{Banner, ReceivedFrame};

/// Errors seen by a consumer
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting or reading failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A line was not the expected JSON object
    #[error("Malformed line from server: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server closed before sending a banner
    #[error("Connection closed before the banner was received")]
    MissingBanner,
}

/// A connected consumer that has already read the banner
#[derive(Debug)]
pub struct StreamClient {
    lines: Lines<BufReader<TcpStream>>,
    banner: Banner,
}

impl StreamClient {
    /// Connect and read the banner
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let mut lines = BufReader::new(stream).lines();
        let line = lines.next_line().await?.ok_or(ClientError::MissingBanner)?;
        let banner = serde_json::from_str(&line)?;
        Ok(Self { lines, banner })
    }

    /// Banner sent by the server
    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    /// Next frame, or `None` once the server closes the stream
    pub async fn next_frame(&mut self) -> Result<Option<ReceivedFrame>, ClientError> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(serde_json::from_str(&line)?)),
                None => return Ok(None),
            }
        }
    }

    /// Read frames until the stream closes or `limit` frames arrived (0 = no limit)
    pub async fn collect(&mut self, limit: usize) -> Result<Vec<ReceivedFrame>, ClientError> {
        let mut frames = Vec::new();
        while limit == 0 || frames.len() < limit {
            match self.next_frame().await? {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        Ok(frames)
    }
}
