//! Seams to the embedding application.
//!
//! The crop session never touches files, URIs or threads directly. Everything
//! it needs from the host comes through these traits:
//!
//! - [`SourceProvider`]: re-openable byte stream of the source image
//! - [`RegionDecoder`] / [`RegionReader`]: optional partial-region decoding
//! - [`SinkProvider`]: optional destination for the encoded result
//! - [`Dispatcher`]: runs the pipeline off the UI thread
//! - [`RegionProvider`]: optional detector proposing initial crop rectangles
//!
//! Reference implementations for in-memory bytes and local files live here
//! too; dispatchers are in [`crate::dispatch`].

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::decode::{DecodeError, DecodedImage, Image};
use crate::geometry::{IntRect, Rect};

/// A unit of work handed to a [`Dispatcher`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Re-openable source of encoded image bytes.
///
/// Opened once to build the display image and again by the partial-region
/// path, so every call must return a fresh stream positioned at the start.
pub trait SourceProvider: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Factory for partial-region readers. Having one at all is the capability.
pub trait RegionDecoder: Send + Sync {
    fn open(&self, stream: Box<dyn Read + Send>) -> Result<Box<dyn RegionReader>, DecodeError>;
}

/// An opened source that can decode sub-rectangles in source-encoded space.
pub trait RegionReader: Send {
    /// Width and height of the raw, unrotated image.
    fn dimensions(&self) -> (u32, u32);

    /// Decode only `rect`. Callers check bounds first; readers still reject
    /// rectangles outside the image instead of clamping.
    fn decode_region(&mut self, rect: &IntRect) -> Result<DecodedImage, DecodeError>;
}

/// Destination for the encoded output.
pub trait SinkProvider: Send + Sync {
    fn open_sink(&self) -> io::Result<Box<dyn Write + Send>>;
}

/// Runs pipeline jobs. Implementations decide on which thread.
pub trait Dispatcher {
    fn dispatch(&self, job: Job);
}

/// Proposes initial crop rectangles (image space) for a freshly opened image.
///
/// Candidates are tried in the returned order; the first one becomes the
/// focused region.
pub trait RegionProvider {
    fn candidates(&self, image: &Image) -> Vec<Rect>;
}

/// Source backed by shared in-memory bytes.
#[derive(Debug, Clone)]
pub struct BytesSource {
    bytes: Arc<[u8]>,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl SourceProvider for BytesSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(&self.bytes)))))
    }
}

/// `AsRef<[u8]>` wrapper so a `Cursor` can read from shared bytes.
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Source read from a local file on every open.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceProvider for FileSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}

/// Sink that creates (or truncates) a local file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SinkProvider for FileSink {
    fn open_sink(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(BufWriter::new(File::create(&self.path)?)))
    }
}

/// Sink collecting the output in a shared buffer the host can read back.
#[derive(Debug, Clone, Default)]
pub struct SharedBufferSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SinkProvider for SharedBufferSink {
    fn open_sink(&self) -> io::Result<Box<dyn Write + Send>> {
        let mut buf = self
            .buffer
            .lock()
            .map_err(|_| io::Error::other("sink buffer poisoned"))?;
        buf.clear();
        Ok(Box::new(SharedBufferWriter(Arc::clone(&self.buffer))))
    }
}

struct SharedBufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("sink buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Provider returning a fixed list of candidates.
#[derive(Debug, Clone, Default)]
pub struct FixedRegions(pub Vec<Rect>);

impl RegionProvider for FixedRegions {
    fn candidates(&self, _image: &Image) -> Vec<Rect> {
        self.0.clone()
    }
}
