//! File-backed snapshot channel
//!
//! Frame layout, all little-endian:
//!
//! ```text
//! | length: u32 | crc32(bytes): u32 | bytes: [u8; length] |
//! ```
//!
//! The publication never leaves a partial snapshot behind after
//! `abandon`: the file is truncated to zero bytes, which reads back as a
//! complete stream with no EndOfSnapshot marker.
//!
//! The image stops at the first frame it cannot trust. Everything before
//! it was delivered; the torn or corrupt frame and anything after it are
//! not.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::channel::{OfferOutcome, SnapshotImage, SnapshotPublication};
use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use crate::observability::{Event, LogSink};

/// Bytes of framing before each message
pub const FRAME_HEADER_LENGTH: u64 = 8;

/// Default byte limit for a snapshot file (64 MiB)
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PublicationState {
    Open,
    Failed,
    Abandoned,
}

/// Snapshot publication writing framed messages to a file.
pub struct FileSnapshotPublication {
    path: PathBuf,
    writer: BufWriter<File>,
    position: u64,
    max_bytes: u64,
    state: PublicationState,
    failure: Option<io::Error>,
}

impl FileSnapshotPublication {
    /// Create (or truncate) the snapshot file at `path`
    pub fn create(path: &Path, max_bytes: u64) -> SnapshotResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SnapshotError::io_error_at_path(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            position: 0,
            max_bytes,
            state: PublicationState::Open,
            failure: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes accepted so far, framing included
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_abandoned(&self) -> bool {
        self.state == PublicationState::Abandoned
    }

    /// Flush and fsync, returning the final file length.
    ///
    /// Reports the I/O failure that disconnected the publication, if any.
    pub fn finish(mut self) -> SnapshotResult<u64> {
        if let Some(err) = self.failure.take() {
            return Err(SnapshotError::io_error_at_path(&self.path, err)
                .with_details("publication failed before finish"));
        }
        self.writer
            .flush()
            .map_err(|e| SnapshotError::io_error_at_path(&self.path, e))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| SnapshotError::io_error_at_path(&self.path, e))?;
        Ok(self.position)
    }

    /// Flush pending frames first so nothing buffered lands after the truncate
    fn truncate(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn write_frame(&mut self, message: &[u8]) -> io::Result<()> {
        let length = u32::try_from(message.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
        self.writer.write_all(&length.to_le_bytes())?;
        self.writer.write_all(&compute_checksum(message).to_le_bytes())?;
        self.writer.write_all(message)?;
        Ok(())
    }
}

impl SnapshotPublication for FileSnapshotPublication {
    fn offer(&mut self, message: &[u8]) -> OfferOutcome {
        if self.state != PublicationState::Open {
            return OfferOutcome::NotConnected;
        }
        let frame_length = FRAME_HEADER_LENGTH + message.len() as u64;
        if self.position + frame_length > self.max_bytes {
            return OfferOutcome::MaxPositionExceeded;
        }
        match self.write_frame(message) {
            Ok(()) => {
                self.position += frame_length;
                OfferOutcome::Accepted(self.position)
            }
            Err(err) => {
                self.state = PublicationState::Failed;
                self.failure = Some(err);
                OfferOutcome::NotConnected
            }
        }
    }

    fn abandon(&mut self) {
        self.state = PublicationState::Abandoned;
        self.position = 0;
        if let Err(err) = self.truncate() {
            self.failure = Some(err);
        }
    }
}

/// One attempt at reading the next frame
enum FrameRead {
    Frame(Vec<u8>),
    Corrupt(String),
}

/// Snapshot image reading framed messages from a file.
pub struct FileSnapshotImage<L> {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    file_size: u64,
    ended: bool,
    corrupt_frames: usize,
    log: L,
}

impl<L: LogSink> FileSnapshotImage<L> {
    pub fn open(path: &Path, log: L) -> SnapshotResult<Self> {
        let file = File::open(path).map_err(|e| SnapshotError::io_error_at_path(path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| SnapshotError::io_error_at_path(path, e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
            file_size,
            ended: file_size == 0,
            corrupt_frames: 0,
            log,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Frames rejected as torn or failing their checksum
    pub fn corrupt_frames(&self) -> usize {
        self.corrupt_frames
    }

    fn read_frame(&mut self) -> FrameRead {
        let remaining = self.file_size - self.offset;
        if remaining < FRAME_HEADER_LENGTH {
            return FrameRead::Corrupt(format!(
                "torn frame header: {} bytes remaining",
                remaining
            ));
        }

        let mut header = [0u8; FRAME_HEADER_LENGTH as usize];
        if let Err(err) = self.reader.read_exact(&mut header) {
            return FrameRead::Corrupt(format!("failed to read frame header: {}", err));
        }
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length > remaining - FRAME_HEADER_LENGTH {
            return FrameRead::Corrupt(format!(
                "frame length {} exceeds remaining {} bytes",
                length,
                remaining - FRAME_HEADER_LENGTH
            ));
        }

        let mut body = vec![0u8; length as usize];
        if let Err(err) = self.reader.read_exact(&mut body) {
            return FrameRead::Corrupt(format!("failed to read frame body: {}", err));
        }
        if !verify_checksum(&body, checksum) {
            return FrameRead::Corrupt(format!("checksum mismatch: expected {:08x}", checksum));
        }

        self.offset += FRAME_HEADER_LENGTH + length;
        FrameRead::Frame(body)
    }
}

impl<L: LogSink> SnapshotImage for FileSnapshotImage<L> {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize {
        let mut delivered = 0;
        while delivered < fragment_limit && !self.ended {
            match self.read_frame() {
                FrameRead::Frame(body) => {
                    handler(&body);
                    delivered += 1;
                    if self.offset >= self.file_size {
                        self.ended = true;
                    }
                }
                FrameRead::Corrupt(reason) => {
                    self.corrupt_frames += 1;
                    self.ended = true;
                    self.log.error(
                        Event::SnapshotFrameCorrupt,
                        &[
                            ("offset", &self.offset.to_string()),
                            ("path", &self.path.display().to_string()),
                            ("reason", &reason),
                        ],
                    );
                }
            }
        }
        delivered
    }

    fn is_end_of_stream(&self) -> bool {
        self.ended
    }
}
