//! Selection regions. A region is a list of single-row pixel spans, which
//! keeps marquee rectangles exact and lets lasso and wand output share one
//! representation.

use crate::geom::{Point, Rect};

/// One horizontal run of selected pixels: row `y`, columns `[x0, x1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    spans: Vec<Span>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.normalized();
        let mut region = Self::new();
        for y in rect.top..rect.bottom {
            region.push_span(y, rect.left, rect.right);
        }
        region
    }

    /// Rasterize a closed polygon with even-odd scanline filling. Pixels are
    /// sampled at their centers.
    pub fn from_polygon(points: &[Point]) -> Self {
        let mut region = Self::new();
        if points.len() < 3 {
            return region;
        }
        let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);

        let mut crossings: Vec<f32> = Vec::new();
        for y in min_y..=max_y {
            let sample = y as f32 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                let (ay, by) = (a.y as f32, b.y as f32);
                if (ay <= sample && by > sample) || (by <= sample && ay > sample) {
                    let t = (sample - ay) / (by - ay);
                    crossings.push(a.x as f32 + t * (b.x as f32 - a.x as f32));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let x0 = pair[0].ceil() as i32;
                let x1 = pair[1].ceil() as i32;
                if x1 > x0 {
                    region.push_span(y, x0, x1);
                }
            }
        }
        region
    }

    /// The ellipse inscribed in `rect`, realized as a filled polygon path.
    pub fn from_ellipse(rect: Rect) -> Self {
        let rect = rect.normalized();
        if rect.width() < 1 || rect.height() < 1 {
            return Self::new();
        }
        let cx = rect.left as f32 + rect.width() as f32 / 2.0;
        let cy = rect.top as f32 + rect.height() as f32 / 2.0;
        let rx = rect.width() as f32 / 2.0;
        let ry = rect.height() as f32 / 2.0;

        let segments = ((rx.max(ry) * 4.0) as usize).clamp(16, 256);
        let points: Vec<Point> = (0..segments)
            .map(|i| {
                let theta = (i as f32 / segments as f32) * std::f32::consts::TAU;
                Point::new(
                    (cx + rx * theta.cos()).round() as i32,
                    (cy + ry * theta.sin()).round() as i32,
                )
            })
            .collect();
        Self::from_polygon(&points)
    }

    /// Append a span, merging with the previous one when contiguous on the
    /// same row. Builders emit spans in row order, so a single-pass merge
    /// keeps the list canonical.
    pub fn push_span(&mut self, y: i32, x0: i32, x1: i32) {
        if x1 <= x0 {
            return;
        }
        if let Some(last) = self.spans.last_mut()
            && last.y == y
            && last.x1 >= x0
        {
            last.x1 = last.x1.max(x1);
            return;
        }
        self.spans.push(Span { y, x0, x1 });
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn pixel_count(&self) -> u64 {
        self.spans.iter().map(|s| (s.x1 - s.x0) as u64).sum()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.spans.iter().any(|s| s.y == y && x >= s.x0 && x < s.x1)
    }

    /// Tight bounding box, or `None` for an empty region.
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.spans.first()?;
        let mut rect = Rect::new(first.x0, first.y, first.x1, first.y + 1);
        for s in &self.spans[1..] {
            rect.left = rect.left.min(s.x0);
            rect.right = rect.right.max(s.x1);
            rect.top = rect.top.min(s.y);
            rect.bottom = rect.bottom.max(s.y + 1);
        }
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rect_region_counts_pixels() {
        let region = Region::from_rect(Rect::from_size(2, 3, 4, 5));
        assert_eq!(region.pixel_count(), 20);
        assert!(region.contains(2, 3));
        assert!(region.contains(5, 7));
        assert!(!region.contains(6, 3));
        assert_eq!(region.bounds(), Some(Rect::from_size(2, 3, 4, 5)));
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let pts = [Point::new(0, 0), Point::new(5, 5)];
        assert!(Region::from_polygon(&pts).is_empty());
    }

    #[test]
    fn test_triangle_fill_stays_inside_bounds() {
        let pts = [Point::new(0, 0), Point::new(8, 0), Point::new(0, 8)];
        let region = Region::from_polygon(&pts);
        assert!(!region.is_empty());
        // All spans must sit inside the triangle's bounding box.
        let bounds = region.bounds().unwrap();
        assert!(bounds.left >= 0 && bounds.right <= 9);
        assert!(bounds.top >= 0 && bounds.bottom <= 9);
        // The hypotenuse side is excluded, the right angle corner included.
        assert!(region.contains(1, 1));
        assert!(!region.contains(7, 7));
    }

    #[test]
    fn test_ellipse_fills_center_not_corners() {
        let region = Region::from_ellipse(Rect::from_size(0, 0, 20, 10));
        assert!(region.contains(10, 5));
        assert!(!region.contains(0, 0));
        assert!(!region.contains(19, 9));
        // The inscribed ellipse covers roughly pi/4 of the box.
        let area = region.pixel_count() as f64;
        assert!(area > 120.0 && area < 175.0, "area = {}", area);
    }

    #[test]
    fn test_push_span_merges_contiguous_runs() {
        let mut region = Region::new();
        region.push_span(0, 0, 4);
        region.push_span(0, 4, 8);
        region.push_span(1, 0, 2);
        assert_eq!(region.spans().len(), 2);
        assert_eq!(region.pixel_count(), 10);
    }
}
