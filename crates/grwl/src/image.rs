use crate::error::{raise, ErrorCode, Result};

/// A 32-bit RGBA image used for window icons and custom cursors.
///
/// Pixels are non-premultiplied, 8 bits per channel with red first, and laid
/// out row-major starting from the top-left corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Box<[u8]>,
}

impl Image {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Creates an image from a byte array. The byte array will be copied into
    /// the image.
    ///
    /// Fails with [`ErrorCode::InvalidValue`] if either dimension is zero or
    /// the byte count does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid image dimensions {width}x{height}"),
            ));
        }

        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if bytes.len() != expected {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!(
                    "image of {width}x{height} needs {expected} bytes, got {}",
                    bytes.len()
                ),
            ));
        }

        Ok(Self {
            width,
            height,
            pixels: bytes.into(),
        })
    }

    /// Decodes a PNG file into an RGBA image. Grayscale, RGB and palette images
    /// are expanded to RGBA.
    pub fn decode_png(data: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

        let mut reader = decoder
            .read_info()
            .map_err(|e| raise(ErrorCode::InvalidValue, format!("bad PNG header: {e}")))?;

        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buffer)
            .map_err(|e| raise(ErrorCode::InvalidValue, format!("bad PNG data: {e}")))?;
        buffer.truncate(info.buffer_size());

        let rgba = match info.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => buffer
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buffer
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => buffer.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            png::ColorType::Indexed => {
                return Err(raise(
                    ErrorCode::FormatUnavailable,
                    "palette was not expanded by the decoder",
                ))
            }
        };

        Self::from_rgba(info.width, info.height, &rgba)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Iterates over the rows of the image, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels
            .chunks_exact(self.width as usize * Self::BYTES_PER_PIXEL)
    }

    /// Returns the RGBA value of the pixel at the given coordinates.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        let p = &self.pixels[offset..offset + Self::BYTES_PER_PIXEL];
        Some([p[0], p[1], p[2], p[3]])
    }
}
