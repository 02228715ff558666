//! Perceptual hashing over the HSV channels of an image.
//!
//! Each channel is reduced to a tiny grayscale grid and difference-hashed:
//! a bit is set when a cell is darker than its right-hand neighbour. The
//! value channel gets a 9×8 grid (64 bits), hue and saturation a 5×4 grid
//! (16 bits each).

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imgview_common::Fingerprint;

const VALUE_GRID: (u32, u32) = (9, 8);
const COLOR_GRID: (u32, u32) = (5, 4);

/// Compute the fingerprint of an image. Pure: equal pixels give equal output.
pub fn fingerprint(image: &DynamicImage) -> Fingerprint {
    let aspect_ratio = if image.height() == 0 {
        0.0
    } else {
        f64::from(image.width()) / f64::from(image.height())
    };

    let [hue, saturation, value] = hsv_channels(&image.to_rgb8());

    Fingerprint {
        aspect_ratio,
        value_hash: difference_hash(&value, VALUE_GRID),
        hue_hash: difference_hash(&hue, COLOR_GRID) as u16,
        saturation_hash: difference_hash(&saturation, COLOR_GRID) as u16,
    }
}

/// Split an RGB image into hue, saturation and value planes scaled to 0..=255.
fn hsv_channels(rgb: &RgbImage) -> [GrayImage; 3] {
    let (width, height) = rgb.dimensions();
    let mut hue = GrayImage::new(width, height);
    let mut saturation = GrayImage::new(width, height);
    let mut value = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [h, s, v] = rgb_to_hsv(pixel.0);
        hue.put_pixel(x, y, Luma([h]));
        saturation.put_pixel(x, y, Luma([s]));
        value.put_pixel(x, y, Luma([v]));
    }

    [hue, saturation, value]
}

fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let value = max;
    if max == 0 || delta == 0.0 {
        return [0, 0, value];
    }
    let saturation = (delta * 255.0 / f32::from(max)).round() as u8;

    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let max_f = f32::from(max);
    // hue in sixths of a turn
    let sector = if max_f == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max_f == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let hue = (sector / 6.0 * 255.0).round() as u8;

    [hue, saturation, value]
}

/// Difference hash of `plane` over a `(columns, rows)` grid.
///
/// Each row contributes `columns - 1` bits, most significant first.
fn difference_hash(plane: &GrayImage, (columns, rows): (u32, u32)) -> u64 {
    let small = imageops::resize(plane, columns, rows, FilterType::Triangle);
    let mut hash = 0u64;
    for y in 0..rows {
        for x in 0..columns - 1 {
            let left = small.get_pixel(x, y)[0];
            let right = small.get_pixel(x + 1, y)[0];
            hash = (hash << 1) | u64::from(left < right);
        }
    }
    hash
}
