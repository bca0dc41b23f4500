//! Array operations shared by the transforms. Spatial axes are 0 (rows) and 1 (columns).

use super::TransformError;
use crate::config::ColorJitter;
use ndarray::{ArrayD, ArrayView1, Axis, Slice};
use rand::Rng;

/// Crop the central `(height, width)` window.
pub fn center_crop(
    key: &str,
    array: &ArrayD<f32>,
    (height, width): (usize, usize),
) -> Result<ArrayD<f32>, TransformError> {
    let size = (array.len_of(Axis(0)), array.len_of(Axis(1)));
    if height > size.0 || width > size.1 {
        return Err(TransformError::CropTooLarge {
            key: key.to_string(),
            crop: (height, width),
            size,
        });
    }

    let top = (size.0 - height) / 2;
    let left = (size.1 - width) / 2;
    Ok(array
        .slice_axis(Axis(0), Slice::from(top..top + height))
        .slice_axis(Axis(1), Slice::from(left..left + width))
        .to_owned())
}

/// Mirror along the column axis.
pub fn hflip(array: &ArrayD<f32>) -> ArrayD<f32> {
    array.slice_axis(Axis(1), Slice::new(0, None, -1)).to_owned()
}

/// Jitter a channel-last color array in place, clamping to `[0, max_value]`.
///
/// Factors are drawn from `rng` in brightness, contrast, saturation order.
pub fn jitter_color<R: Rng>(array: &mut ArrayD<f32>, jitter: &ColorJitter, max_value: f32, rng: &mut R) {
    let brightness = factor(jitter.brightness, rng);
    let contrast = factor(jitter.contrast, rng);
    let saturation = factor(jitter.saturation, rng);

    array.mapv_inplace(|v| (v * brightness).clamp(0.0, max_value));

    let channel_axis = Axis(array.ndim() - 1);
    let pixels = array.len() / array.len_of(channel_axis).max(1);
    let mean = if pixels == 0 {
        0.0
    } else {
        array
            .lanes(channel_axis)
            .into_iter()
            .map(luminance)
            .sum::<f32>()
            / pixels as f32
    };
    array.mapv_inplace(|v| ((v - mean) * contrast + mean).clamp(0.0, max_value));

    for mut px in array.lanes_mut(channel_axis) {
        let grey = luminance(px.view());
        px.mapv_inplace(|v| ((v - grey) * saturation + grey).clamp(0.0, max_value));
    }
}

fn factor<R: Rng>(strength: f32, rng: &mut R) -> f32 {
    if strength <= 0.0 {
        return 1.0;
    }
    rng.random_range((1.0 - strength).max(0.0)..=1.0 + strength)
}

fn luminance(px: ArrayView1<'_, f32>) -> f32 {
    if px.len() >= 3 {
        0.2989 * px[0] + 0.587 * px[1] + 0.114 * px[2]
    } else {
        px.mean().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, array};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_center_crop() {
        let a = Array2::from_shape_fn((4, 6), |(y, x)| (y * 10 + x) as f32).into_dyn();
        let c = center_crop("a", &a, (2, 2)).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c[[0, 0]], 12.0);
        assert_eq!(c[[1, 1]], 23.0);
    }

    #[test]
    fn test_center_crop_color() {
        let a = Array3::from_shape_fn((3, 3, 3), |(y, x, c)| (y * 100 + x * 10 + c) as f32).into_dyn();
        let c = center_crop("rgb", &a, (1, 1)).unwrap();
        assert_eq!(c.shape(), &[1, 1, 3]);
        assert_eq!(c[[0, 0, 2]], 112.0);
    }

    #[test]
    fn test_crop_too_large() {
        let a = Array2::<f32>::zeros((2, 2)).into_dyn();
        assert!(matches!(
            center_crop("kw", &a, (3, 1)),
            Err(TransformError::CropTooLarge { .. })
        ));
    }

    #[test]
    fn test_hflip() {
        let a: ArrayD<f32> = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let expected: ArrayD<f32> = array![[3.0, 2.0, 1.0], [6.0, 5.0, 4.0]].into_dyn();
        assert_eq!(hflip(&a), expected);
    }

    #[test]
    fn test_jitter_none_is_identity() {
        let original = Array3::from_shape_fn((2, 2, 3), |(y, x, c)| 0.1 * (y + x + c) as f32).into_dyn();
        let mut a = original.clone();
        let mut rng = StdRng::seed_from_u64(1);
        jitter_color(&mut a, &ColorJitter::none(), 1.0, &mut rng);
        for (x, y) in a.iter().zip(original.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut a = Array3::from_shape_fn((4, 4, 3), |(y, x, c)| ((y * 4 + x) * 3 + c) as f32 / 48.0).into_dyn();
        let mut rng = StdRng::seed_from_u64(3);
        jitter_color(&mut a, &ColorJitter::new(0.9, 0.9, 0.9), 1.0, &mut rng);
        assert!(a.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
