//! Gaussian blur for noise reduction before edge detection.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. The blur strength is
//! configured as a kernel size, which is converted to a standard
//! deviation with the usual `0.3 * ((k - 1) / 2 - 1) + 0.8` rule so a
//! kernel of `k` pixels covers roughly three sigma on each side.

use image::GrayImage;

/// Standard deviation matching a square Gaussian kernel of `kernel` pixels.
///
/// Kernels of size 1 (or 0) mean "no blur" and return `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kernel_sigma(kernel: u32) -> f32 {
    if kernel <= 1 {
        return 0.0;
    }
    let half = (kernel as f32 - 1.0) * 0.5;
    0.3f32.mul_add(half - 1.0, 0.8)
}

/// Apply Gaussian blur with the given kernel size.
///
/// Kernel sizes of 1 or less return the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel: u32) -> GrayImage {
    let sigma = kernel_sigma(kernel);
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
