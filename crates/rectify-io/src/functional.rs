use std::path::Path;

use image::{ColorType, DynamicImage, ImageReader};
use rectify_image::{Image, ImageSize};

use crate::error::IoError;

fn color_type(channels: usize) -> Result<ColorType, IoError> {
    match channels {
        1 => Ok(ColorType::L8),
        3 => Ok(ColorType::Rgb8),
        c => Err(IoError::UnsupportedChannels(c)),
    }
}

fn open_any(file_path: &Path) -> Result<DynamicImage, IoError> {
    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| IoError::ImageDecodeError(file_path.to_path_buf(), e))
}

/// Reads a frame from the given file path.
///
/// Any format supported by the image crate is accepted. The number of
/// channels `C` selects the conversion: `1` yields a grayscale (mono8)
/// image, `3` an RGB (rgb8) image, whatever the file stores.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Errors
///
/// [`IoError::FileDoesNotExist`] when the file is absent and
/// [`IoError::ImageDecodeError`] when it cannot be decoded.
///
/// # Example
///
/// ```no_run
/// use rectify_image::Image;
/// use rectify_io::functional as F;
///
/// let image: Image<u8, 1> = F::read_image("left/00002.pgm").unwrap();
///
/// assert_eq!(image.num_channels(), 1);
/// ```
pub fn read_image<const C: usize>(file_path: impl AsRef<Path>) -> Result<Image<u8, C>, IoError> {
    let file_path = file_path.as_ref();

    let img = open_any(file_path)?;
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let requested = color_type(C)?;
    if img.color() != requested {
        log::debug!(
            "converting {} from {:?} to {requested:?}",
            file_path.display(),
            img.color()
        );
    }

    let data = match requested {
        ColorType::L8 => img.into_luma8().into_raw(),
        _ => img.into_rgb8().into_raw(),
    };

    Ok(Image::new(size, data)?)
}

/// Reads only the dimensions of an image file, without decoding its pixels.
pub fn probe_image_size(file_path: impl AsRef<Path>) -> Result<ImageSize, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let (width, height) = image::image_dimensions(file_path)
        .map_err(|e| IoError::ImageDecodeError(file_path.to_path_buf(), e))?;

    Ok(ImageSize {
        width: width as usize,
        height: height as usize,
    })
}

/// Writes a mono8 or rgb8 image to the given file path, overwriting it.
///
/// The encoder is chosen from the file extension, e.g. `.pgm` or `.png`.
///
/// # Arguments
///
/// * `file_path` - The path to the output file.
/// * `image` - The image to write.
pub fn write_image<const C: usize>(
    file_path: impl AsRef<Path>,
    image: &Image<u8, C>,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();

    image::save_buffer(
        file_path,
        image.as_slice(),
        image.width() as u32,
        image.height() as u32,
        color_type(C)?,
    )
    .map_err(|e| IoError::ImageEncodeError(file_path.to_path_buf(), e))
}
