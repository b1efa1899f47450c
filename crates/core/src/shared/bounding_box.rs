/// Axis-aligned box in integer pixel coordinates.
///
/// `x1 < x2` and `y1 < y2` hold for boxes produced by a detector; they are
/// not re-checked here and inverted boxes simply yield meaningless (but
/// non-panicking) geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Truncates float detector coordinates toward zero.
    pub fn from_f64(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    /// Grows the box by `margin` pixels on every side.
    pub fn expanded(&self, margin: i32) -> Self {
        Self::new(
            self.x1.saturating_sub(margin),
            self.y1.saturating_sub(margin),
            self.x2.saturating_add(margin),
            self.y2.saturating_add(margin),
        )
    }

    /// Strict overlap on both axes; boxes sharing only an edge do not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        other.x1 < self.x2 && other.x2 > self.x1 && other.y1 < self.y2 && other.y2 > self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_f64_truncates() {
        let b = BoundingBox::from_f64(10.9, 20.2, 30.999, 40.5);
        assert_eq!(b, BoundingBox::new(10, 20, 30, 40));
    }

    #[test]
    fn test_expanded_grows_every_side() {
        let b = BoundingBox::new(100, 100, 200, 300).expanded(50);
        assert_eq!(b, BoundingBox::new(50, 50, 250, 350));
    }

    #[test]
    fn test_expanded_zero_is_identity() {
        let b = BoundingBox::new(1, 2, 3, 4);
        assert_eq!(b.expanded(0), b);
    }

    #[test]
    fn test_expanded_saturates() {
        let b = BoundingBox::new(i32::MIN + 1, 0, i32::MAX - 1, 10).expanded(50);
        assert_eq!(b.x1, i32::MIN);
        assert_eq!(b.x2, i32::MAX);
    }

    #[rstest]
    #[case::overlap(BoundingBox::new(0, 0, 10, 10), BoundingBox::new(5, 5, 15, 15), true)]
    #[case::contained(BoundingBox::new(0, 0, 100, 100), BoundingBox::new(10, 10, 20, 20), true)]
    #[case::touching_x(BoundingBox::new(0, 0, 10, 10), BoundingBox::new(10, 0, 20, 10), false)]
    #[case::touching_y(BoundingBox::new(0, 0, 10, 10), BoundingBox::new(0, 10, 10, 20), false)]
    #[case::apart(BoundingBox::new(0, 0, 10, 10), BoundingBox::new(50, 50, 60, 60), false)]
    #[case::x_only(BoundingBox::new(0, 0, 10, 10), BoundingBox::new(5, 20, 15, 30), false)]
    fn test_intersects(#[case] a: BoundingBox, #[case] b: BoundingBox, #[case] expected: bool) {
        assert_eq!(a.intersects(&b), expected);
        assert_eq!(b.intersects(&a), expected);
    }

    #[test]
    fn test_inverted_box_does_not_panic() {
        let inverted = BoundingBox::new(10, 10, 0, 0);
        let _ = inverted.intersects(&BoundingBox::new(0, 0, 5, 5));
        assert_eq!(inverted.expanded(5), BoundingBox::new(5, 5, 5, 5));
    }
}
