//! Image acquisition for plant identification.
//!
//! An image reaches the identification endpoint by one of two paths, both
//! ending in an [`ImagePayload`]:
//!
//! - **Camera**: a [`Camera`] hands out a [`CameraStream`], which is wrapped in
//!   a [`CaptureSession`]. [`CaptureSession::capture`] grabs a frame and
//!   encodes it as JPEG. The session stops every track when it is captured,
//!   cancelled or dropped.
//! - **File**: [`ImagePayload::from_path`] reads a picked or dropped file.
//!
//! [`MockCamera`] stands in for a real device in tests.
//!
//! # Example
//!
//! ```
//! use vanadristi_core::capture::{CaptureConstraints, CaptureSession, MockCamera};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), vanadristi_core::Error> {
//! let camera = MockCamera::new(4, 4);
//! let mut session = CaptureSession::open(&camera, CaptureConstraints::default()).await?;
//! assert_eq!(camera.active_tracks(), 1);
//!
//! let payload = session.capture()?;
//! assert_eq!(payload.mime, "image/jpeg");
//! assert_eq!(camera.active_tracks(), 0);
//! # Ok(())
//! # }
//! ```

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{CaptureError, Error, Result};

/// File name given to camera captures.
pub const CAPTURE_FILE_NAME: &str = "capture.jpg";

/// JPEG quality used for camera captures.
pub const CAPTURE_JPEG_QUALITY: u8 = 90;

const FALLBACK_MIME: &str = "application/octet-stream";

/// An image ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub file_name: String,
    pub mime: String,
}

impl ImagePayload {
    /// Wrap in-memory image data.
    pub fn from_bytes(
        bytes: impl Into<Bytes>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    /// Read an image file.
    ///
    /// The MIME type is guessed from the extension. Neither type nor size is
    /// checked; the server decides what it accepts.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Read {} ({} bytes)", path.display(), bytes.len());

        Ok(Self {
            bytes: Bytes::from(bytes),
            mime: mime_from_path(path).to_string(),
            file_name,
        })
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there is no data.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK_MIME;
    };
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => FALLBACK_MIME,
    }
}

/// Which camera to prefer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera.
    #[default]
    Environment,
    /// Front camera.
    User,
}

/// Requirements passed to [`Camera::acquire`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub facing_mode: FacingMode,
}

/// A single RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, 4 bytes per pixel.
    pub rgba: Vec<u8>,
}

impl Frame {
    /// Build a frame, checking the buffer length.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        (rgba.len() == expected && expected > 0).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    /// Encode as JPEG at the given quality.
    pub fn to_jpeg(&self, quality: u8) -> std::result::Result<Bytes, CaptureError> {
        let image = RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| CaptureError::Encode("frame buffer size mismatch".to_string()))?;
        let rgb = image::DynamicImage::ImageRgba8(image).to_rgb8();

        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(rgb.as_raw(), self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(Bytes::from(out.into_inner()))
    }
}

/// A source of camera streams.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Open a live stream matching `constraints`.
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> std::result::Result<Box<dyn CameraStream>, CaptureError>;
}

/// A live camera stream. Holds the device until stopped.
pub trait CameraStream: Send {
    /// Grab the current frame.
    fn snapshot(&mut self) -> std::result::Result<Frame, CaptureError>;

    /// Stop every track. Calling it twice is harmless.
    fn stop(&mut self);

    /// Returns true until [`stop`](Self::stop) is called.
    fn is_active(&self) -> bool;
}

/// Exclusive hold on a camera stream.
///
/// The stream is stopped on [`capture`](Self::capture), on
/// [`cancel`](Self::cancel) and on drop, whichever comes first.
pub struct CaptureSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("active", &self.is_active())
            .finish()
    }
}

impl CaptureSession {
    /// Acquire a stream from `camera`.
    pub async fn open(camera: &dyn Camera, constraints: CaptureConstraints) -> Result<Self> {
        let stream = camera.acquire(constraints).await?;
        info!("Camera acquired ({:?})", constraints.facing_mode);
        Ok(Self::new(stream))
    }

    /// Wrap an already acquired stream.
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Returns true while the stream is held and running.
    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    /// Take a picture and release the camera.
    ///
    /// The camera is released whether or not encoding succeeds.
    pub fn capture(&mut self) -> Result<ImagePayload> {
        let mut stream = self
            .stream
            .take()
            .ok_or(Error::Capture(CaptureError::StreamInactive))?;
        let frame = stream.snapshot();
        stream.stop();
        debug!("Camera released after capture");

        let bytes = frame?.to_jpeg(CAPTURE_JPEG_QUALITY)?;
        Ok(ImagePayload::from_bytes(
            bytes,
            CAPTURE_FILE_NAME,
            "image/jpeg",
        ))
    }

    /// Release the camera without taking a picture.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Camera released");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Default)]
struct MockCameraState {
    active_tracks: AtomicUsize,
    acquisitions: AtomicU32,
    fail_snapshot: AtomicBool,
    failure: RwLock<Option<CaptureError>>,
}

/// In-memory camera for tests.
///
/// Produces solid green frames and counts how many tracks are live.
#[derive(Debug, Clone)]
pub struct MockCamera {
    width: u32,
    height: u32,
    state: Arc<MockCameraState>,
}

impl MockCamera {
    /// Create a camera producing `width` x `height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            state: Arc::new(MockCameraState::default()),
        }
    }

    /// Make the next acquisitions fail (or succeed again with `None`).
    pub async fn set_failure(&self, failure: Option<CaptureError>) {
        *self.state.failure.write().await = failure;
    }

    /// Make snapshots fail.
    pub fn set_snapshot_failure(&self, fail: bool) {
        self.state.fail_snapshot.store(fail, Ordering::SeqCst);
    }

    /// Number of streams not yet stopped.
    pub fn active_tracks(&self) -> usize {
        self.state.active_tracks.load(Ordering::SeqCst)
    }

    /// Number of successful acquisitions so far.
    pub fn acquisitions(&self) -> u32 {
        self.state.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn acquire(
        &self,
        _constraints: CaptureConstraints,
    ) -> std::result::Result<Box<dyn CameraStream>, CaptureError> {
        if let Some(failure) = self.state.failure.read().await.clone() {
            return Err(failure);
        }
        self.state.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.state.active_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            width: self.width,
            height: self.height,
            active: true,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockStream {
    width: u32,
    height: u32,
    active: bool,
    state: Arc<MockCameraState>,
}

impl CameraStream for MockStream {
    fn snapshot(&mut self) -> std::result::Result<Frame, CaptureError> {
        if !self.active {
            return Err(CaptureError::StreamInactive);
        }
        if self.state.fail_snapshot.load(Ordering::SeqCst) {
            return Err(CaptureError::Encode("mock snapshot failure".to_string()));
        }
        let pixels = (self.width * self.height) as usize;
        let rgba = [34, 139, 34, 255].repeat(pixels);
        Frame::new(self.width, self.height, rgba)
            .ok_or_else(|| CaptureError::Encode("empty frame".to_string()))
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.state.active_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}
