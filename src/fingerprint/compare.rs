//! Pairwise comparison of items that share a fingerprint bucket.

use image::DynamicImage;
use imgview_common::ContentId;
use imgview_db::models::ContentItem;
use serde::Serialize;

/// A content item together with its decoded pixels.
#[derive(Debug, Clone, Copy)]
pub struct ComparedItem<'a> {
    pub item: &'a ContentItem,
    pub image: &'a DynamicImage,
}

/// Result of comparing two items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateComparison {
    pub first: ContentId,
    pub second: ContentId,
    /// Both images hold the same number of pixels.
    pub is_size_equal: bool,
    pub is_aspect_ratio_equal: bool,
    pub is_first_larger: bool,
    /// The first item was added to the library later.
    pub is_first_newer: bool,
    /// Both items come from the same external source.
    pub is_origin_equal: bool,
    pub both_alternate_version: bool,
    /// The images are pixel-identical across all four channels.
    pub no_difference: bool,
    /// Difference score in `[0, 1]`, present only when the dimensions match.
    pub difference: Option<f64>,
}

/// Compare two items.
pub fn compare(a: ComparedItem<'_>, b: ComparedItem<'_>) -> DuplicateComparison {
    let (aw, ah) = (u64::from(a.image.width()), u64::from(a.image.height()));
    let (bw, bh) = (u64::from(b.image.width()), u64::from(b.image.height()));
    let a_size = aw * ah;
    let b_size = bw * bh;

    let difference = difference_score(a.image, b.image);

    let is_origin_equal = a.item.origin.as_ref().map(|o| &o.name)
        == b.item.origin.as_ref().map(|o| &o.name);

    DuplicateComparison {
        first: a.item.id,
        second: b.item.id,
        is_size_equal: a_size == b_size,
        is_aspect_ratio_equal: aw * bh == bw * ah,
        is_first_larger: a_size > b_size,
        is_first_newer: a.item.added_at > b.item.added_at,
        is_origin_equal,
        both_alternate_version: a.item.is_alternate_version() && b.item.is_alternate_version(),
        no_difference: difference == Some(0.0),
        difference,
    }
}

/// Per-channel absolute difference of two images holding the same number of
/// pixels, summed over all four RGBA channels and normalized to `[0, 1]`.
///
/// Images of different shape are compared over their overlapping region;
/// the normalization still uses the full pixel count. Returns `None` when
/// the pixel counts differ.
pub fn difference_score(a: &DynamicImage, b: &DynamicImage) -> Option<f64> {
    let pixel_count = u64::from(a.width()) * u64::from(a.height());
    if pixel_count != u64::from(b.width()) * u64::from(b.height()) {
        return None;
    }
    if pixel_count == 0 {
        return Some(0.0);
    }

    let a = a.to_rgba8();
    let b = b.to_rgba8();

    let width = a.width().min(b.width());
    let height = a.height().min(b.height());

    let mut histograms = [[0u64; 256]; 4];
    for y in 0..height {
        for x in 0..width {
            let (pa, pb) = (a.get_pixel(x, y), b.get_pixel(x, y));
            for channel in 0..4 {
                let delta = pa[channel].abs_diff(pb[channel]);
                histograms[channel][usize::from(delta)] += 1;
            }
        }
    }

    let total: u64 = histograms
        .iter()
        .flat_map(|histogram| histogram.iter().enumerate())
        .map(|(value, count)| value as u64 * count)
        .sum();

    Some(total as f64 / (pixel_count as f64 * 255.0 * 4.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use image::{Rgba, RgbaImage};
    use imgview_common::MediaKind;
    use imgview_db::models::Origin;

    fn item(id: i64, day: u32) -> ContentItem {
        ContentItem {
            id: ContentId::from(id),
            file_path: format!("{id}.png"),
            media_kind: MediaKind::Image,
            title: None,
            hidden: false,
            description: None,
            added_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            origin: None,
            alternate_of: None,
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_identical_black_images() {
        let (a, b) = (item(1, 1), item(2, 2));
        let image = solid(100, 100, [0, 0, 0, 255]);
        let result = compare(
            ComparedItem { item: &a, image: &image },
            ComparedItem { item: &b, image: &image },
        );
        assert!(result.is_size_equal);
        assert!(result.is_aspect_ratio_equal);
        assert!(result.no_difference);
        assert_eq!(result.difference, Some(0.0));
        assert!(!result.is_first_larger);
        assert!(!result.is_first_newer);
    }

    #[test]
    fn test_maximal_difference_is_one() {
        // all four channels differ by 255, normalized over four channels
        let black = solid(10, 10, [0, 0, 0, 0]);
        let white = solid(10, 10, [255, 255, 255, 255]);
        assert_eq!(difference_score(&black, &white), Some(1.0));
    }

    #[test]
    fn test_alpha_only_difference_counts() {
        let opaque = solid(10, 10, [0, 0, 0, 255]);
        let clear = solid(10, 10, [0, 0, 0, 0]);
        assert_eq!(difference_score(&opaque, &clear), Some(0.25));
    }

    #[test]
    fn test_single_pixel_change() {
        let a = solid(2, 2, [10, 10, 10, 255]);
        let mut b = a.to_rgba8();
        b.put_pixel(0, 0, Rgba([20, 10, 10, 255]));
        let score = difference_score(&a, &DynamicImage::ImageRgba8(b)).unwrap();
        assert!((score - 10.0 / (4.0 * 255.0 * 4.0)).abs() < 1e-12);
    }

    #[test]
    fn test_size_flags() {
        let (mut a, mut b) = (item(1, 5), item(2, 3));
        a.origin = Some(Origin {
            name: "archive".to_string(),
            external_id: Some("1".to_string()),
        });
        b.origin = Some(Origin {
            name: "archive".to_string(),
            external_id: Some("2".to_string()),
        });
        a.alternate_of = Some(b.id);
        b.alternate_of = Some(a.id);

        let large = solid(200, 100, [0, 0, 0, 255]);
        let small = solid(100, 50, [0, 0, 0, 255]);
        let result = compare(
            ComparedItem { item: &a, image: &large },
            ComparedItem { item: &b, image: &small },
        );
        assert!(!result.is_size_equal);
        assert!(result.is_aspect_ratio_equal);
        assert!(result.is_first_larger);
        assert!(result.is_first_newer);
        assert!(result.is_origin_equal);
        assert!(result.both_alternate_version);
        assert!(!result.no_difference);
        assert_eq!(result.difference, None);
    }

    #[test]
    fn test_equal_count_different_shape() {
        let (a, b) = (item(1, 1), item(2, 1));
        let wide = solid(200, 50, [0, 0, 0, 255]);
        let tall = solid(50, 200, [0, 0, 0, 255]);
        let result = compare(
            ComparedItem { item: &a, image: &wide },
            ComparedItem { item: &b, image: &tall },
        );
        assert!(result.is_size_equal);
        assert!(!result.is_aspect_ratio_equal);
        assert_eq!(result.difference, Some(0.0));
        assert!(result.no_difference);

        // Overlap is 50x50 of the 10000 pixels.
        let white_tall = solid(50, 200, [255, 255, 255, 255]);
        let score = difference_score(&wide, &white_tall).unwrap();
        assert!((score - 2500.0 * 3.0 / 40000.0).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn test_origin_flag_compares_names() {
        let (mut a, mut b) = (item(1, 1), item(2, 1));
        let image = solid(4, 4, [0, 0, 0, 255]);
        let flag = |a: &ContentItem, b: &ContentItem| {
            compare(
                ComparedItem { item: a, image: &image },
                ComparedItem { item: b, image: &image },
            )
            .is_origin_equal
        };

        // Neither item has an origin.
        assert!(flag(&a, &b));

        a.origin = Some(Origin {
            name: "archive".to_string(),
            external_id: None,
        });
        assert!(!flag(&a, &b));

        b.origin = Some(Origin {
            name: "gallery".to_string(),
            external_id: None,
        });
        assert!(!flag(&a, &b));
    }
}
