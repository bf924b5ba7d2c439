use crate::shared::media_time::MediaTime;

/// Pixel encodings a capture session can be asked to deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit BGRA, the only layout the recognition engine accepts.
    Bgra32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra32 => 4,
        }
    }
}

/// A single captured camera frame: contiguous pixel bytes in row-major order
/// plus the presentation timestamp assigned by the capture source.
///
/// The pipeline treats pixel data as opaque; only the recognition engine
/// looks inside.
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    timestamp: MediaTime,
    index: u64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        timestamp: MediaTime,
        index: u64,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * pixel_format.bytes_per_pixel(),
            "data length must equal width * height * bytes per pixel"
        );
        Self {
            data,
            width,
            height,
            pixel_format,
            timestamp,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn timestamp(&self) -> MediaTime {
        self.timestamp
    }

    /// Sequence number assigned by the capture source, increasing per session.
    pub fn index(&self) -> u64 {
        self.index
    }
}
