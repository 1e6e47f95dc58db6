use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::CrawlError;

/// Line closing one result block.
pub const END_OF_BLOCK: &str = "---";

/// Line closing the whole delivery.
pub const END_OF_STREAM: &str = "OK";

/// One crawl result on the wire: the app id line followed by the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub app_id: String,
    pub payload: String,
}

/// `"<app-id>\n<payload>\n---\n"`
pub fn encode_block(app_id: &str, payload: &str) -> String {
    format!("{}\n{}\n{}\n", app_id, payload, END_OF_BLOCK)
}

// ============================================================================
// Sending side
// ============================================================================

/// Writes result blocks to a connection-oriented stream.
pub struct ResultSender<W: Write> {
    writer: W,
}

impl ResultSender<TcpStream> {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, CrawlError> {
        let stream = TcpStream::connect(addr).map_err(|e| CrawlError::transport("could not reach collector", e))?;
        Ok(Self::new(stream))
    }
}

impl<W: Write> ResultSender<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn send(&mut self, app_id: &str, payload: &str) -> Result<(), CrawlError> {
        self.writer
            .write_all(encode_block(app_id, payload).as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| CrawlError::transport(format!("failed to send result for {}", app_id), e))?;
        debug!(app = app_id, bytes = payload.len(), "result block sent");
        Ok(())
    }

    /// Write the terminating `OK` line and hand back the writer.
    pub fn finish(mut self) -> Result<W, CrawlError> {
        writeln!(self.writer, "{}", END_OF_STREAM)
            .and_then(|_| self.writer.flush())
            .map_err(|e| CrawlError::transport("failed to terminate result stream", e))?;
        Ok(self.writer)
    }
}

// ============================================================================
// Receiving side
// ============================================================================

/// Split a stream into blocks until `OK` or end of input.
///
/// Returns whether the terminating `OK` line was seen. Blank lines between
/// blocks are skipped; an unterminated trailing block is dropped.
pub fn read_blocks<R, F>(reader: R, mut on_block: F) -> Result<bool, CrawlError>
where
    R: BufRead,
    F: FnMut(Block) -> Result<(), CrawlError>,
{
    let mut pending: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| CrawlError::transport("failed to read result stream", e))?;
        let line = line.trim_end_matches('\r');
        match line.trim() {
            END_OF_STREAM if pending.is_empty() => return Ok(true),
            END_OF_BLOCK => {
                let mut lines = std::mem::take(&mut pending).into_iter();
                match lines.next() {
                    Some(app_id) => on_block(Block {
                        app_id: app_id.trim().to_string(),
                        payload: lines.collect::<Vec<_>>().join("\n"),
                    })?,
                    None => warn!("empty result block"),
                }
            }
            "" if pending.is_empty() => {}
            _ => pending.push(line.to_string()),
        }
    }
    if !pending.is_empty() {
        warn!(lines = pending.len(), "result stream ended inside a block");
    }
    Ok(false)
}

/// Host-side sink that stores every received block as `<dir>/<app-id>.<extension>`.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    out_dir: PathBuf,
    extension: String,
}

impl ResultCollector {
    pub fn new(out_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            out_dir: out_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, app_id: &str) -> PathBuf {
        let name: String = app_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.out_dir.join(format!("{}.{}", name, self.extension))
    }

    pub fn store(&self, block: &Block) -> Result<PathBuf, CrawlError> {
        fs::create_dir_all(&self.out_dir)
            .map_err(|e| CrawlError::transport(format!("cannot create {}", self.out_dir.display()), e))?;
        let path = self.path_for(&block.app_id);
        fs::write(&path, &block.payload)
            .map_err(|e| CrawlError::transport(format!("cannot write {}", path.display()), e))?;
        info!(app = %block.app_id, path = %path.display(), "stored result");
        Ok(path)
    }

    /// Store every block of one stream. Returns the written files and whether `OK` was seen.
    pub fn collect<R: BufRead>(&self, reader: R) -> Result<(Vec<PathBuf>, bool), CrawlError> {
        let mut written = Vec::new();
        let finished = read_blocks(reader, |block| {
            written.push(self.store(&block)?);
            Ok(())
        })?;
        Ok((written, finished))
    }

    /// Accept connections until one of them delivers the `OK` line.
    pub fn serve(&self, listener: &TcpListener) -> Result<Vec<PathBuf>, CrawlError> {
        let mut written = Vec::new();
        for stream in listener.incoming() {
            let stream = stream.map_err(|e| CrawlError::transport("failed to accept connection", e))?;
            let (files, finished) = self.collect(BufReader::new(stream))?;
            written.extend(files);
            if finished {
                break;
            }
        }
        Ok(written)
    }
}
