// THEORY:
// The `BlobExtractor` is the spatial grouping stage. It turns the binary
// foreground mask into a list of candidate touches.
//
// Key architectural principles & algorithm steps:
// 1.  **Outermost borders**: `imageproc`'s Suzuki border follower traces
//     every border of the mask. Only outer borders without a parent are kept,
//     in raster discovery order. Holes, and anything sitting inside a hole,
//     are never reported.
// 2.  **Member pixels**: 8-connected component labelling gives each kept
//     border its pixel count and bounding box.
// 3.  **Simplified chain**: straight runs of the boundary (horizontal,
//     vertical, diagonal) are collapsed to their end points.
// 4.  **Centroid approximation**: the touch point is the arithmetic mean of
//     the simplified boundary points, not the mass centroid of the member
//     pixels. It is exact for rectangles and other symmetric shapes and
//     drifts toward corner-heavy sides otherwise.
// 5.  **Area filter**: `area > min_area` always; `area < max_area` only when
//     the upper bound is enabled.
// 6.  **Stateless Utility**: nothing is remembered between masks.

use crate::config::{AreaMetric, DetectorConfig};
use crate::core_modules::frame::Frame;
use image::Luma;
use imageproc::contours::{self, BorderType};
use imageproc::point::Point;
use imageproc::region_labelling::{self, Connectivity};
use serde::{Deserialize, Serialize};

/// A pixel coordinate in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

/// A touch location in frame pixel coordinates. Same origin and axes as the
/// frame source; nothing is flipped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

/// One connected foreground region of a mask.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Discovery index within this mask. Not persistent across frames.
    pub id: u64,
    /// Area as measured by the configured `AreaMetric`.
    pub area: f64,
    pub pixel_count: usize,
    /// Top-left and bottom-right member pixels.
    pub bounding_box: (PixelPoint, PixelPoint),
    /// Simplified outer boundary.
    pub contour: Vec<PixelPoint>,
    pub centroid: TouchPoint,
}

/// Lower / upper bounds a blob's area has to satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaFilter {
    pub min_area: f64,
    pub max_area: Option<f64>,
}

impl AreaFilter {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_area: config.min_area,
            max_area: config.enforce_max_area.then_some(config.max_area),
        }
    }

    pub fn accepts(&self, area: f64) -> bool {
        area > self.min_area && self.max_area.is_none_or(|max| area < max)
    }
}

pub mod blob_extractor {
    use super::*; // Make the data types from the parent module available.

    /// Finds every outermost foreground region of `mask`, in raster discovery order.
    pub fn find_blobs(mask: &Frame, metric: AreaMetric) -> Vec<Blob> {
        let labels = region_labelling::connected_components(mask, Connectivity::Eight, Luma([0u8]));
        let members = member_stats(&labels);

        contours::find_contours::<i64>(mask)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .filter_map(|contour| {
                let border: Vec<PixelPoint> = contour.points.iter().map(PixelPoint::from).collect();
                let start = *border.first()?;
                let label = labels.get_pixel(start.x as u32, start.y as u32)[0] as usize;
                let (pixel_count, bounding_box) = members.get(label).copied().flatten()?;
                Some((border, pixel_count, bounding_box))
            })
            .enumerate()
            .map(|(id, (border, pixel_count, bounding_box))| {
                let contour = simplify_chain(&border);
                let area = match metric {
                    AreaMetric::PixelCount => pixel_count as f64,
                    AreaMetric::ContourPolygon => polygon_area(&contour),
                };
                Blob {
                    id: id as u64,
                    area,
                    pixel_count,
                    bounding_box,
                    centroid: mean_point(&contour),
                    contour,
                }
            })
            .collect()
    }

    /// Runs extraction and the area filter, returning the surviving centroids in discovery order.
    pub fn touch_points(mask: &Frame, config: &DetectorConfig) -> (Vec<TouchPoint>, Vec<Blob>) {
        let filter = AreaFilter::from_config(config);
        let blobs = find_blobs(mask, config.area_metric);
        let points = blobs
            .iter()
            .filter(|blob| filter.accepts(blob.area))
            .map(|blob| blob.centroid)
            .collect();
        (points, blobs)
    }

    type MemberStats = Option<(usize, (PixelPoint, PixelPoint))>;

    /// Pixel count and bounding box per component label. Label 0 is background.
    fn member_stats(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<MemberStats> {
        let mut stats: Vec<MemberStats> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if stats.len() <= label {
                stats.resize(label + 1, None);
            }
            let p = PixelPoint { x: x as i64, y: y as i64 };
            stats[label] = Some(match stats[label] {
                None => (1, (p, p)),
                Some((count, (min, max))) => (
                    count + 1,
                    (
                        PixelPoint { x: min.x.min(p.x), y: min.y.min(p.y) },
                        PixelPoint { x: max.x.max(p.x), y: max.y.max(p.y) },
                    ),
                ),
            });
        }
        stats
    }

    impl From<&Point<i64>> for PixelPoint {
        fn from(p: &Point<i64>) -> Self {
            PixelPoint { x: p.x, y: p.y }
        }
    }

    /// Keeps only the points where the closed chain changes direction.
    fn simplify_chain(border: &[PixelPoint]) -> Vec<PixelPoint> {
        let n = border.len();
        if n < 3 {
            return border.to_vec();
        }
        let simplified: Vec<PixelPoint> = (0..n)
            .filter(|&i| {
                let prev = border[(i + n - 1) % n];
                let here = border[i];
                let next = border[(i + 1) % n];
                (here.x - prev.x, here.y - prev.y) != (next.x - here.x, next.y - here.y)
            })
            .map(|i| border[i])
            .collect();
        if simplified.is_empty() { border.to_vec() } else { simplified }
    }

    fn mean_point(points: &[PixelPoint]) -> TouchPoint {
        if points.is_empty() {
            return TouchPoint::default();
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
        TouchPoint { x: sx / n, y: sy / n }
    }

    /// Shoelace area of the simplified boundary, as the installation measured blobs.
    fn polygon_area(points: &[PixelPoint]) -> f64 {
        let n = points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = points[i];
                let b = points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core_modules::frame::uniform;
        use image::Luma;

        fn paint(mask: &mut Frame, x0: u32, y0: u32, w: u32, h: u32) {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }

        #[test]
        fn empty_mask_has_no_blobs() {
            assert!(find_blobs(&uniform(16, 16, 0), AreaMetric::PixelCount).is_empty());
        }

        #[test]
        fn rectangle_simplifies_to_its_corners() {
            let mut mask = uniform(20, 20, 0);
            paint(&mut mask, 3, 4, 6, 5);
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            assert_eq!(blobs.len(), 1);
            let blob = &blobs[0];
            assert_eq!(blob.pixel_count, 30);
            assert_eq!(blob.contour.len(), 4);
            for corner in [(3, 4), (8, 4), (8, 8), (3, 8)] {
                assert!(blob.contour.contains(&PixelPoint { x: corner.0, y: corner.1 }));
            }
            assert_eq!(blob.centroid, TouchPoint { x: 5.5, y: 6.0 });
            assert_eq!(blob.bounding_box, (PixelPoint { x: 3, y: 4 }, PixelPoint { x: 8, y: 8 }));
        }

        #[test]
        fn polygon_metric_matches_corner_polygon() {
            let mut mask = uniform(20, 20, 0);
            paint(&mut mask, 2, 2, 6, 5);
            let blobs = find_blobs(&mask, AreaMetric::ContourPolygon);
            assert_eq!(blobs[0].area, 20.0);
        }

        #[test]
        fn single_pixel_and_line_blobs() {
            let mut mask = uniform(10, 10, 0);
            mask.put_pixel(1, 1, Luma([255]));
            paint(&mut mask, 4, 6, 3, 1);
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            assert_eq!(blobs.len(), 2);
            assert_eq!(blobs[0].centroid, TouchPoint { x: 1.0, y: 1.0 });
            assert_eq!(blobs[0].pixel_count, 1);
            assert_eq!(blobs[1].centroid, TouchPoint { x: 5.0, y: 6.0 });
            assert_eq!(blobs[1].pixel_count, 3);
        }

        #[test]
        fn diagonal_neighbours_join_one_blob() {
            let mut mask = uniform(8, 8, 0);
            mask.put_pixel(2, 2, Luma([255]));
            mask.put_pixel(3, 3, Luma([255]));
            mask.put_pixel(4, 4, Luma([255]));
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            assert_eq!(blobs.len(), 1);
            assert_eq!(blobs[0].pixel_count, 3);
            assert_eq!(blobs[0].centroid, TouchPoint { x: 3.0, y: 3.0 });
        }

        #[test]
        fn holes_are_not_reported() {
            let mut mask = uniform(20, 20, 0);
            paint(&mut mask, 2, 2, 10, 10);
            for y in 5..8 {
                for x in 5..8 {
                    mask.put_pixel(x, y, Luma([0]));
                }
            }
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            assert_eq!(blobs.len(), 1);
            assert_eq!(blobs[0].pixel_count, 91);
            assert_eq!(blobs[0].contour.len(), 4);
        }

        #[test]
        fn island_inside_a_hole_is_not_reported() {
            let mut mask = uniform(20, 20, 0);
            paint(&mut mask, 2, 2, 11, 11);
            for y in 4..11 {
                for x in 4..11 {
                    mask.put_pixel(x, y, Luma([0]));
                }
            }
            paint(&mut mask, 6, 6, 3, 3);
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            assert_eq!(blobs.len(), 1);
            assert_eq!(blobs[0].pixel_count, 121 - 49);
            assert_eq!(blobs[0].centroid, TouchPoint { x: 7.0, y: 7.0 });
        }

        #[test]
        fn polygon_area_is_smaller_than_pixel_count() {
            let mut mask = uniform(40, 40, 0);
            paint(&mut mask, 5, 5, 26, 26);
            let by_pixels = find_blobs(&mask, AreaMetric::PixelCount);
            let by_polygon = find_blobs(&mask, AreaMetric::ContourPolygon);
            assert_eq!(by_pixels[0].area, 676.0);
            assert_eq!(by_polygon[0].area, 625.0);
        }

        #[test]
        fn blobs_come_out_in_raster_order() {
            let mut mask = uniform(30, 30, 0);
            paint(&mut mask, 20, 2, 3, 3);
            paint(&mut mask, 2, 10, 3, 3);
            paint(&mut mask, 10, 1, 3, 3);
            let blobs = find_blobs(&mask, AreaMetric::PixelCount);
            let centers: Vec<(f64, f64)> = blobs.iter().map(|b| (b.centroid.x, b.centroid.y)).collect();
            assert_eq!(centers, vec![(11.0, 2.0), (21.0, 3.0), (3.0, 11.0)]);
        }

        #[test]
        fn concave_shape_is_traced_once() {
            // An "L": vertical bar plus a foot to the right.
            let mut mask = uniform(20, 20, 0);
            paint(&mut mask, 2, 2, 3, 10);
            paint(&mut mask, 5, 9, 6, 3);
            let blobs = find_blobs(&mask, AreaMetric::ContourPolygon);
            assert_eq!(blobs.len(), 1);
            assert_eq!(blobs[0].pixel_count, 48);
            // Six corners plus the diagonal step into the inner corner.
            assert_eq!(blobs[0].contour.len(), 7);
        }

        #[test]
        fn area_filter_lower_bound_is_strict() {
            let filter = AreaFilter { min_area: 25.0, max_area: None };
            assert!(!filter.accepts(25.0));
            assert!(filter.accepts(26.0));
        }

        #[test]
        fn area_filter_upper_bound_only_when_enabled() {
            let mut config = DetectorConfig {
                min_area: 10.0,
                max_area: 100.0,
                ..Default::default()
            };
            assert!(AreaFilter::from_config(&config).accepts(5_000.0));
            config.enforce_max_area = true;
            let filter = AreaFilter::from_config(&config);
            assert!(!filter.accepts(100.0));
            assert!(filter.accepts(99.0));
        }

        #[test]
        fn touch_points_apply_the_area_filter() {
            let mut mask = uniform(40, 40, 0);
            paint(&mut mask, 2, 2, 5, 5); // 25 pixels
            paint(&mut mask, 20, 20, 2, 13); // 26 pixels
            let config = DetectorConfig {
                min_area: 25.0,
                ..Default::default()
            };
            let (points, blobs) = touch_points(&mask, &config);
            assert_eq!(blobs.len(), 2);
            assert_eq!(points, vec![TouchPoint { x: 20.5, y: 26.0 }]);
        }
    }
}
