use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use rectify_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// assert_eq!(image_size.aspect_ratio(), 0.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Create a new image size, rejecting zero dimensions.
    pub fn new(width: usize, height: usize) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImageSize(width, height));
        }
        Ok(Self { width, height })
    }

    /// The ratio width / height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Number of pixels covered by this size.
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Trait for image data types.
///
/// Send and Sync are required so images can be processed by rayon row iterators.
pub trait ImageDtype: Copy + Default + Into<f32> + Send + Sync {
    /// Convert a f32 value to the image data type.
    fn from_f32(x: f32) -> Self;
}

impl ImageDtype for f32 {
    fn from_f32(x: f32) -> Self {
        x
    }
}

impl ImageDtype for u8 {
    fn from_f32(x: f32) -> Self {
        x.round().clamp(0.0, 255.0) as u8
    }
}

/// Represents an image with pixel data.
///
/// The pixels are stored row major in interleaved (H, W, C) order.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use rectify_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///     ImageSize {
    ///         width: 10,
    ///         height: 20,
    ///     },
    ///     vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if size.width == 0 || size.height == 0 {
            return Err(ImageError::EmptyImageSize(size.width, size.height));
        }

        if data.len() != size.width * size.height * CHANNELS {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.width * size.height * CHANNELS,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and every sample set to `val`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rectify_image::{Image, ImageSize};
    ///
    /// let image = Image::<f32, 1>::from_size_val([4, 2].into(), 0.5).unwrap();
    ///
    /// assert_eq!(image.as_slice().len(), 8);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * CHANNELS];
        Image::new(size, data)
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Borrow the interleaved pixel data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutably borrow the interleaved pixel data.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get a sample of the image.
    ///
    /// Returns `None` when the coordinates or the channel are out of bounds.
    pub fn get(&self, x: usize, y: usize, ch: usize) -> Option<&T> {
        if x >= self.size.width || y >= self.size.height || ch >= CHANNELS {
            return None;
        }
        self.data.get((y * self.size.width + x) * CHANNELS + ch)
    }

    /// Get the pixel value, failing on out of bounds coordinates.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<T, ImageError>
    where
        T: Copy,
    {
        self.get(x, y, ch).copied().ok_or(ImageError::PixelIndexOutOfBounds(
            x,
            y,
            self.size.width,
            self.size.height,
        ))
    }
}

impl<T: ImageDtype, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Convert the pixel data to another image data type.
    ///
    /// Conversion goes through `f32`; integer targets are rounded and saturated.
    ///
    /// # Examples
    ///
    /// ```
    /// use rectify_image::{Image, ImageSize};
    ///
    /// let image = Image::<f32, 1>::new([3, 1].into(), vec![-4.0, 12.4, 300.0]).unwrap();
    /// let image_u8 = image.convert::<u8>();
    ///
    /// assert_eq!(image_u8.as_slice(), &[0, 12, 255]);
    /// ```
    pub fn convert<U: ImageDtype>(&self) -> Image<U, CHANNELS> {
        Image {
            size: self.size,
            data: self
                .data
                .iter()
                .map(|&x| U::from_f32(x.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size() {
        let size = ImageSize {
            width: 10,
            height: 20,
        };
        assert_eq!(size.width, 10);
        assert_eq!(size.height, 20);
        assert_eq!(size.area(), 200);
        assert_eq!(size.to_string(), "10x20");
    }

    #[test]
    fn image_size_rejects_zero() {
        assert_eq!(
            ImageSize::new(0, 10),
            Err(ImageError::EmptyImageSize(0, 10))
        );
    }

    #[test]
    fn image_smoke() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new([10, 20].into(), vec![0u8; 10 * 20 * 3])?;
        assert_eq!(image.size().width, 10);
        assert_eq!(image.size().height, 20);
        assert_eq!(image.num_channels(), 3);
        Ok(())
    }

    #[test]
    fn image_wrong_length() {
        let res = Image::<u8, 3>::new([2, 2].into(), vec![0u8; 11]);
        assert_eq!(res, Err(ImageError::InvalidChannelShape(11, 12)));
    }

    #[test]
    fn image_get() -> Result<(), ImageError> {
        let image = Image::<u8, 2>::new([2, 1].into(), vec![1, 2, 3, 4])?;
        assert_eq!(image.get(1, 0, 0), Some(&3));
        assert_eq!(image.get(1, 0, 1), Some(&4));
        assert_eq!(image.get(2, 0, 0), None);
        assert_eq!(image.get(0, 0, 2), None);
        assert!(image.get_pixel(0, 1, 0).is_err());
        Ok(())
    }

    #[test]
    fn image_convert_round_trip() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 1, 128, 255])?;
        let image_f32 = image.convert::<f32>();
        assert_eq!(image_f32.as_slice(), &[0.0, 1.0, 128.0, 255.0]);
        assert_eq!(image_f32.convert::<u8>(), image);
        Ok(())
    }
}
