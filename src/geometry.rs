//! Points and the segments piecewise curves are built from.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }

    fn lerp(self, rhs: Point2D, ratio: f64) -> Point2D {
        self * (1. - ratio) + rhs * ratio
    }
}

/// Coordinates compare with the same tolerance as `numpy.allclose`.
impl PartialEq for Point2D {
    fn eq(&self, rhs: &Self) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
        }

        close(self.x, rhs.x) && close(self.y, rhs.y)
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, rhs: f64) -> Point2D {
        Point2D::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Point2D::new(x, y)
    }
}

/// A piece of a piecewise curve. Endpoints are always ordered by x.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Segment {
    Linear { left: Point2D, right: Point2D },
    Step { left: Point2D, right: Point2D, height: f64 },
    Bezier { left: Point2D, right: Point2D, control: Point2D },
}

fn ordered(p1: Point2D, p2: Point2D) -> Result<(Point2D, Point2D)> {
    if p1 == p2 {
        return Err(FuzzyError::InvalidSegment(format!(
            "endpoints {p1} and {p2} form a zero-length segment"
        )));
    }

    Ok(if p1.x <= p2.x { (p1, p2) } else { (p2, p1) })
}

impl Segment {
    pub fn linear(p1: Point2D, p2: Point2D) -> Result<Self> {
        let (left, right) = ordered(p1, p2)?;
        Ok(Segment::Linear { left, right })
    }

    /// Without an explicit height the step sits halfway between its endpoints.
    pub fn step(p1: Point2D, p2: Point2D, height: Option<f64>) -> Result<Self> {
        let (left, right) = ordered(p1, p2)?;
        let height = height.unwrap_or((left.y + right.y) / 2.);
        Ok(Segment::Step { left, right, height })
    }

    /// Without an explicit control point the curve bends through the midpoint.
    pub fn bezier(p1: Point2D, p2: Point2D, control: Option<Point2D>) -> Result<Self> {
        let (left, right) = ordered(p1, p2)?;
        let control = control.unwrap_or_else(|| left.lerp(right, 0.5));
        Ok(Segment::Bezier { left, right, control })
    }

    pub fn left(&self) -> Point2D {
        match *self {
            Segment::Linear { left, .. } | Segment::Step { left, .. } | Segment::Bezier { left, .. } => left,
        }
    }

    pub fn right(&self) -> Point2D {
        match *self {
            Segment::Linear { right, .. } | Segment::Step { right, .. } | Segment::Bezier { right, .. } => right,
        }
    }

    fn endpoints_mut(&mut self) -> (&mut Point2D, &mut Point2D) {
        match self {
            Segment::Linear { left, right }
            | Segment::Step { left, right, .. }
            | Segment::Bezier { left, right, .. } => (left, right),
        }
    }

    pub fn set_left(&mut self, pt: Point2D) -> Result<()> {
        if pt == self.right() {
            return Err(FuzzyError::InvalidSegment(format!("left point {pt} equals right point")));
        }
        *self.endpoints_mut().0 = pt;
        Ok(())
    }

    pub fn set_right(&mut self, pt: Point2D) -> Result<()> {
        if pt == self.left() {
            return Err(FuzzyError::InvalidSegment(format!("right point {pt} equals left point")));
        }
        *self.endpoints_mut().1 = pt;
        Ok(())
    }

    pub fn x_in_range(&self, x: f64) -> bool {
        self.left().x <= x && x <= self.right().x
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        match *self {
            Segment::Linear { left, right } => {
                if right.x == left.x {
                    return right.y;
                }
                let m = (right.y - left.y) / (right.x - left.x);
                let b = left.y - m * left.x;
                m * x + b
            },
            Segment::Step { height, .. } => height,
            Segment::Bezier { left, right, control } => {
                let t = bezier_t(left, right, control, x);
                bezier_point(left, control, right, t).y
            },
        }
    }

    /// Splits at `ratio` along the segment. The side that would have zero
    /// length is `None`.
    pub fn split(&self, ratio: f64) -> Result<(Option<Segment>, Option<Segment>)> {
        let ratio = crate::math::unit_check(ratio)?;
        let (lo, hi) = (self.left(), self.right());
        let mp = lo.lerp(hi, ratio);

        let (lhs, rhs) = match *self {
            Segment::Linear { .. } => (
                (ratio > 0.).then(|| Segment::Linear { left: lo, right: mp }),
                (ratio < 1.).then(|| Segment::Linear { left: mp, right: hi }),
            ),
            Segment::Step { height, .. } => (
                (ratio > 0.).then(|| Segment::Step { left: lo, right: mp, height }),
                (ratio < 1.).then(|| Segment::Step { left: mp, right: hi, height }),
            ),
            Segment::Bezier { control, .. } => {
                // de Casteljau
                let mid = bezier_point(lo, control, hi, ratio);
                (
                    (ratio > 0.).then(|| Segment::Bezier {
                        left: lo,
                        right: mid,
                        control: lo.lerp(control, ratio),
                    }),
                    (ratio < 1.).then(|| Segment::Bezier {
                        left: mid,
                        right: hi,
                        control: control.lerp(hi, ratio),
                    }),
                )
            },
        };

        Ok((lhs, rhs))
    }

    /// The part of this segment between `x1` and `x2`.
    pub fn subsegment(&self, x1: f64, x2: f64) -> Result<Segment> {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        if !self.x_in_range(x1) || !self.x_in_range(x2) {
            return Err(FuzzyError::InvalidSegment(format!(
                "[{x1}, {x2}] is not inside [{}, {}]",
                self.left().x,
                self.right().x
            )));
        }

        match *self {
            Segment::Linear { .. } => {
                Segment::linear(Point2D::new(x1, self.evaluate(x1)), Point2D::new(x2, self.evaluate(x2)))
            },
            Segment::Step { height, .. } => {
                Segment::step(Point2D::new(x1, height), Point2D::new(x2, height), Some(height))
            },
            Segment::Bezier { left, right, control } => {
                let t1 = bezier_t(left, right, control, x1);
                let t2 = bezier_t(left, right, control, x2);
                let (head, _) = self.split(t2)?;
                let head = head.ok_or_else(|| FuzzyError::InvalidSegment("empty subsegment".to_owned()))?;
                if t1 <= 0. {
                    return Ok(head);
                }
                let (_, tail) = head.split(t1 / t2)?;
                tail.ok_or_else(|| FuzzyError::InvalidSegment("empty subsegment".to_owned()))
            },
        }
    }

    pub fn max_point(&self) -> Point2D {
        match *self {
            Segment::Linear { left, right } => {
                if left.y > right.y {
                    left
                } else {
                    right
                }
            },
            Segment::Step { right, height, .. } => Point2D::new(right.x, height),
            Segment::Bezier { left, right, .. } => {
                let end = if left.y > right.y { left } else { right };
                let mid = self.midpoint();
                if end.y > mid.y || (end.y == mid.y && end.x > mid.x) {
                    end
                } else {
                    mid
                }
            },
        }
    }

    pub fn min_point(&self) -> Point2D {
        match *self {
            Segment::Linear { left, right } => {
                if left.y <= right.y {
                    left
                } else {
                    right
                }
            },
            Segment::Step { left, height, .. } => Point2D::new(left.x, height),
            Segment::Bezier { left, right, .. } => {
                let end = if left.y <= right.y { left } else { right };
                let mid = self.midpoint();
                if end.y <= mid.y {
                    end
                } else {
                    mid
                }
            },
        }
    }

    fn midpoint(&self) -> Point2D {
        let x = (self.left().x + self.right().x) / 2.;
        Point2D::new(x, self.evaluate(x))
    }

    /// Control points beyond the endpoints.
    pub fn control_points(&self) -> Vec<Point2D> {
        match *self {
            Segment::Bezier { control, .. } => vec![control],
            _ => Vec::new(),
        }
    }
}

/// Maps x onto the curve parameter, piecewise-linearly through the
/// control point's x.
fn bezier_t(left: Point2D, right: Point2D, control: Point2D, x: f64) -> f64 {
    if control.x > x && control.x > left.x {
        0.5 - 0.5 * (control.x - x) / (control.x - left.x)
    } else if control.x < x && right.x > control.x {
        0.5 + 0.5 * (x - control.x) / (right.x - control.x)
    } else {
        0.5
    }
}

fn bezier_point(p0: Point2D, p1: Point2D, p2: Point2D, t: f64) -> Point2D {
    let alt = 1. - t;
    p0 * (alt * alt) + p1 * (2. * t * alt) + p2 * (t * t)
}

/// Re-joins `segments` so each one starts exactly where the previous one ends
/// and the whole run spans `x = 0` to `x = 1`.
pub fn stitch(segments: &mut [Segment]) -> Result<()> {
    let Some(first) = segments.first_mut() else {
        return Ok(());
    };
    let start = Point2D::new(0., first.evaluate(0.));
    first.set_left(start)?;

    for i in 1..segments.len() {
        let joint = segments[i - 1].right();
        segments[i].set_left(joint)?;
    }

    if let Some(last) = segments.last_mut() {
        let end = Point2D::new(1., last.evaluate(1.));
        last.set_right(end)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_zero_length_rejected() {
        let p = Point2D::new(0.5, 0.5);

        assert!(Segment::linear(p, p).is_err());
        assert!(Segment::bezier(p, Point2D::new(0.5, 0.5 + 1e-12), None).is_err());
    }

    #[test]
    fn test_endpoints_ordered_and_defaults() {
        let seg = Segment::step(Point2D::new(1., 1.), Point2D::new(0., 0.), None).unwrap();

        assert_eq!(seg.left(), Point2D::new(0., 0.));
        assert_eq!(seg.evaluate(0.3), 0.5);

        let seg = Segment::bezier(Point2D::new(0., 0.), Point2D::new(1., 1.), None).unwrap();

        assert_eq!(seg.control_points(), vec![Point2D::new(0.5, 0.5)]);
        assert_abs_diff_eq!(seg.evaluate(0.5), 0.5);
        assert_abs_diff_eq!(seg.evaluate(1.), 1.);
    }

    #[test]
    fn test_linear_split_and_subsegment() {
        let seg = Segment::linear(Point2D::new(0., 0.), Point2D::new(1., 2.)).unwrap();
        let (lhs, rhs) = seg.split(0.25).unwrap();

        assert_eq!(lhs.unwrap().right(), Point2D::new(0.25, 0.5));
        assert_eq!(rhs.unwrap().left(), Point2D::new(0.25, 0.5));
        assert_eq!(seg.split(1.).unwrap().1, None);

        let sub = seg.subsegment(0.5, 0.75).unwrap();

        assert_abs_diff_eq!(sub.evaluate(0.6), 1.2);
        assert!(seg.subsegment(0.5, 1.5).is_err());
    }

    #[test]
    fn test_bezier_split_matches_curve() {
        let seg = Segment::bezier(Point2D::new(0., 0.), Point2D::new(1., 0.), Some(Point2D::new(0.5, 1.))).unwrap();
        let (lhs, rhs) = seg.split(0.5).unwrap();
        let (lhs, rhs) = (lhs.unwrap(), rhs.unwrap());

        assert_abs_diff_eq!(lhs.right().y, 0.5);
        assert_eq!(lhs.right(), rhs.left());
        assert_eq!(seg.max_point(), Point2D::new(0.5, 0.5));
    }

    #[test]
    fn test_stitch() {
        let mut segs = vec![
            Segment::linear(Point2D::new(0.1, 0.), Point2D::new(0.5, 1.)).unwrap(),
            Segment::linear(Point2D::new(0.6, 1.), Point2D::new(0.9, 0.)).unwrap(),
        ];

        stitch(&mut segs).unwrap();

        // ends are extended along each segment's own line
        assert_eq!(segs[0].left(), Point2D::new(0., -0.25));
        assert_eq!(segs[1].left(), Point2D::new(0.5, 1.));
        assert_eq!(segs[1].right(), Point2D::new(1., -0.25));
    }
}
