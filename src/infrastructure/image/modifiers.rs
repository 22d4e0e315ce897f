//! Built-in modifiers backed by `image::imageops`.

use image::{DynamicImage, GenericImageView, Rgba, imageops::FilterType};

use crate::domain::errors::ModifierError;
use crate::domain::modifier::Modifier;

fn ensure_pixels(image: &DynamicImage) -> Result<(), ModifierError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ModifierError::empty_image());
    }
    Ok(())
}

/// Gaussian blur.
#[derive(Debug, Clone)]
pub struct BlurModifier {
    sigma: f32,
    identifier: String,
}

impl BlurModifier {
    /// Creates a blur with the given standard deviation.
    #[must_use]
    pub fn new(sigma: f32) -> Self {
        Self {
            sigma,
            identifier: format!("blur(sigma={sigma})"),
        }
    }

    /// Blur radius.
    #[must_use]
    pub const fn sigma(&self) -> f32 {
        self.sigma
    }
}

impl Modifier for BlurModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn modify(&self, image: DynamicImage) -> Result<DynamicImage, ModifierError> {
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(ModifierError::new(format!(
                "blur sigma must be a non-negative number, got {}",
                self.sigma
            )));
        }
        ensure_pixels(&image)?;
        Ok(image.blur(self.sigma))
    }
}

/// Monochrome tint: maps luminance onto `color`, blended by `intensity`.
#[derive(Debug, Clone)]
pub struct MonoModifier {
    color: [u8; 3],
    intensity: f32,
    identifier: String,
}

impl MonoModifier {
    /// Creates a monochrome tint.
    #[must_use]
    pub fn new(color: [u8; 3], intensity: f32) -> Self {
        let [r, g, b] = color;
        Self {
            color,
            intensity,
            identifier: format!("mono({r},{g},{b};{intensity})"),
        }
    }

    /// Full-strength mid-gray tint.
    #[must_use]
    pub fn gray() -> Self {
        Self::new([128, 128, 128], 1.0)
    }
}

impl Modifier for MonoModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn modify(&self, image: DynamicImage) -> Result<DynamicImage, ModifierError> {
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(ModifierError::new(format!(
                "mono intensity must be within 0..=1, got {}",
                self.intensity
            )));
        }
        ensure_pixels(&image)?;

        let mut rgba = image.into_rgba8();
        let t = self.intensity;
        for pixel in rgba.pixels_mut() {
            let Rgba([r, g, b, a]) = *pixel;
            let luma =
                (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)) / 255.0;
            let blend = |orig: u8, tint: u8| -> u8 {
                let tinted = f32::from(tint) * luma;
                (f32::from(orig) * (1.0 - t) + tinted * t).round().clamp(0.0, 255.0) as u8
            };
            *pixel = Rgba([
                blend(r, self.color[0]),
                blend(g, self.color[1]),
                blend(b, self.color[2]),
                a,
            ]);
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

/// Resizes to an exact size.
#[derive(Debug, Clone)]
pub struct ScaleModifier {
    width: u32,
    height: u32,
    identifier: String,
}

impl ScaleModifier {
    /// Creates a scale to `width` x `height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            identifier: format!("scale({width}x{height})"),
        }
    }
}

impl Modifier for ScaleModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn modify(&self, image: DynamicImage) -> Result<DynamicImage, ModifierError> {
        if self.width == 0 || self.height == 0 {
            return Err(ModifierError::new(format!(
                "cannot scale to {}x{}",
                self.width, self.height
            )));
        }
        ensure_pixels(&image)?;
        if image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }
        Ok(image.resize_exact(self.width, self.height, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::modifier::ModifierChain;
    use test_case::test_case;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    #[test_case(BlurModifier::new(8.0).identifier().to_string(), "blur(sigma=8)" ; "blur")]
    #[test_case(BlurModifier::new(2.5).identifier().to_string(), "blur(sigma=2.5)" ; "blur_fractional")]
    #[test_case(MonoModifier::gray().identifier().to_string(), "mono(128,128,128;1)" ; "mono_gray")]
    #[test_case(ScaleModifier::new(60, 40).identifier().to_string(), "scale(60x40)" ; "scale")]
    fn test_identifiers(actual: String, expected: &str) {
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_blur_radius_is_part_of_identity() {
        assert_ne!(
            BlurModifier::new(8.0).identifier(),
            BlurModifier::new(16.0).identifier()
        );
    }

    #[test]
    fn test_mono_gray_outputs_neutral_pixels() {
        let out = MonoModifier::gray()
            .modify(solid(2, 2, [255, 0, 0, 200]))
            .unwrap();
        let Rgba([r, g, b, a]) = out.get_pixel(1, 1);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 200);
    }

    #[test]
    fn test_mono_zero_intensity_is_identity() {
        let input = solid(2, 2, [10, 120, 240, 255]);
        let out = MonoModifier::new([255, 0, 0], 0.0)
            .modify(input.clone())
            .unwrap();
        assert_eq!(out.get_pixel(0, 0), input.get_pixel(0, 0));
    }

    #[test_case(-0.1 ; "negative")]
    #[test_case(1.5 ; "too_large")]
    #[test_case(f32::NAN ; "nan")]
    fn test_mono_rejects_bad_intensity(intensity: f32) {
        let err = MonoModifier::new([0, 0, 0], intensity)
            .modify(solid(1, 1, [0, 0, 0, 255]))
            .unwrap_err();
        assert!(err.reason().contains("intensity"));
    }

    #[test]
    fn test_scale_resizes_exactly() {
        let out = ScaleModifier::new(7, 3)
            .modify(solid(20, 20, [1, 2, 3, 255]))
            .unwrap();
        assert_eq!(out.dimensions(), (7, 3));
    }

    #[test]
    fn test_scale_rejects_zero_size() {
        assert!(
            ScaleModifier::new(0, 10)
                .modify(solid(1, 1, [0, 0, 0, 255]))
                .is_err()
        );
    }

    #[test]
    fn test_blur_rejects_negative_sigma() {
        assert!(
            BlurModifier::new(-1.0)
                .modify(solid(4, 4, [0, 0, 0, 255]))
                .is_err()
        );
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let out = BlurModifier::new(1.0)
            .modify(solid(6, 5, [50, 50, 50, 255]))
            .unwrap();
        assert_eq!(out.dimensions(), (6, 5));
    }

    #[test]
    fn test_empty_image_is_rejected_not_panicking() {
        let empty = DynamicImage::new_rgba8(0, 0);
        assert_eq!(
            ScaleModifier::new(4, 4).modify(empty.clone()).unwrap_err(),
            ModifierError::empty_image()
        );
        assert_eq!(
            MonoModifier::gray().modify(empty.clone()).unwrap_err(),
            ModifierError::empty_image()
        );
        assert_eq!(
            BlurModifier::new(1.0).modify(empty).unwrap_err(),
            ModifierError::empty_image()
        );
    }

    #[test]
    fn test_mono_then_scale_differs_from_scale_then_mono_key_but_not_shape() {
        let a = ModifierChain::new()
            .then(MonoModifier::gray())
            .then(ScaleModifier::new(4, 4));
        let b = ModifierChain::new()
            .then(ScaleModifier::new(4, 4))
            .then(MonoModifier::gray());

        let ids_a: Vec<_> = a.identifiers().collect();
        let ids_b: Vec<_> = b.identifiers().collect();
        assert_ne!(ids_a, ids_b);

        let input = solid(8, 8, [200, 10, 10, 255]);
        assert_eq!(a.apply(input.clone()).unwrap().dimensions(), (4, 4));
        assert_eq!(b.apply(input).unwrap().dimensions(), (4, 4));
    }
}
