//! Membership curves over the normalized domain `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};
use crate::geometry::{stitch, Point2D, Segment};
use crate::linspace::Linspace;
use crate::math::{interp_even, unit_check};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Curve {
    /// Flat before `left`, flat after `right`, straight in between.
    Linear { left: Point2D, right: Point2D },
    /// `(height - y_min) * exp(-(x - center)^2 / (2 * spread^2)) + y_min`
    Gaussian {
        height: f64,
        center: f64,
        spread: f64,
        y_min: f64,
    },
    /// `(y_max - y_min) / (1 + exp(-slope * (x - midpoint))) + y_min`
    Sigmoid {
        midpoint: f64,
        y_max: f64,
        slope: f64,
        y_min: f64,
    },
    Triangle { left: Point2D, apex: Point2D, right: Point2D },
    Trapezoid { points: [Point2D; 4] },
    Step {
        steps: u32,
        y_left: f64,
        y_right: f64,
        x_min: f64,
        x_max: f64,
    },
    /// `a*u^2 + b*u + c` with `u = x - x_offset`
    Polynomial { a: f64, b: f64, c: f64, x_offset: f64 },
    /// `a*u^3 + b*u^2 + c*u + d` with `u = x - x_offset`
    Cubic {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        x_offset: f64,
    },
    Piecewise { segments: Vec<Segment> },
    /// Evenly spaced samples over `[0, 1]`, interpolated linearly.
    Lookup { ys: Vec<f64> },
}

fn line_y(p1: Point2D, p2: Point2D, x: f64) -> f64 {
    if p2.x == p1.x {
        return p2.y;
    }
    p1.y + (x - p1.x) * (p2.y - p1.y) / (p2.x - p1.x)
}

/// Spacing shared by most templates: the distance between neighbouring
/// curves and where the first one sits.
fn template_spacing(count: usize, spread_to_edges: bool) -> Result<(f64, f64)> {
    if count < 2 {
        return Err(FuzzyError::Argument("At least two curves must be requested".to_owned()));
    }

    Ok(if spread_to_edges {
        (1. / (count - 1) as f64, 0.)
    } else {
        let step = 1. / count as f64;
        (step, step / 2.)
    })
}

impl Curve {
    pub fn linear() -> Self {
        Curve::Linear {
            left: Point2D::new(0., 0.),
            right: Point2D::new(1., 1.),
        }
    }

    pub fn gaussian() -> Self {
        Curve::Gaussian {
            height: 1.,
            center: 0.5,
            spread: 0.1,
            y_min: 0.,
        }
    }

    pub fn sigmoid() -> Self {
        Curve::Sigmoid {
            midpoint: 0.5,
            y_max: 1.,
            slope: 20.,
            y_min: 0.,
        }
    }

    pub fn triangle() -> Self {
        Curve::Triangle {
            left: Point2D::new(0.25, 0.),
            apex: Point2D::new(0.5, 1.),
            right: Point2D::new(0.75, 0.),
        }
    }

    pub fn trapezoid() -> Self {
        Curve::Trapezoid {
            points: [
                Point2D::new(0., 0.),
                Point2D::new(0.3, 1.),
                Point2D::new(0.7, 1.),
                Point2D::new(1., 0.),
            ],
        }
    }

    pub fn step() -> Self {
        Curve::Step {
            steps: 2,
            y_left: 0.,
            y_right: 1.,
            x_min: 0.,
            x_max: 1.,
        }
    }

    pub fn polynomial() -> Self {
        Curve::Polynomial {
            a: 1.,
            b: -1.,
            c: 0.25,
            x_offset: 0.,
        }
    }

    pub fn cubic() -> Self {
        Curve::Cubic {
            a: 1.,
            b: -1.5,
            c: 0.5,
            d: 0.15,
            x_offset: 0.,
        }
    }

    /// Builds a piecewise curve, stitching the segments edge to edge. With no
    /// segments the curve is flat at zero.
    pub fn piecewise(mut segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            segments.push(Segment::linear(Point2D::new(0., 0.), Point2D::new(1., 0.))?);
        }
        stitch(&mut segments)?;

        Ok(Curve::Piecewise { segments })
    }

    pub fn lookup(ys: Vec<f64>) -> Result<Self> {
        if ys.len() < 2 {
            return Err(FuzzyError::Argument("a lookup curve needs at least two samples".to_owned()));
        }
        Ok(Curve::Lookup { ys })
    }

    /// Replaces the segments of a piecewise curve and re-stitches them.
    pub fn replace_segments(&mut self, segments: Vec<Segment>) -> Result<()> {
        match self {
            Curve::Piecewise { .. } => {
                *self = Curve::piecewise(segments)?;
                Ok(())
            },
            _ => Err(FuzzyError::Unsupported(format!("{} curves have no segments", self.kind()))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Curve::Linear { .. } => "Linear",
            Curve::Gaussian { .. } => "Gaussian",
            Curve::Sigmoid { .. } => "Sigmoid",
            Curve::Triangle { .. } => "Triangle",
            Curve::Trapezoid { .. } => "Trapezoid",
            Curve::Step { .. } => "Step",
            Curve::Polynomial { .. } => "Polynomial",
            Curve::Cubic { .. } => "Cubic",
            Curve::Piecewise { .. } => "Piecewise",
            Curve::Lookup { .. } => "Lookup",
        }
    }

    /// Evaluates the curve at `x`, which must lie in `[0, 1]` give or take
    /// a small drift.
    pub fn evaluate(&self, x: f64) -> Result<f64> {
        let x = unit_check(x)?;

        let y = match self {
            &Curve::Linear { left, right } => {
                if x <= left.x {
                    left.y
                } else if x >= right.x {
                    right.y
                } else {
                    line_y(left, right, x)
                }
            },
            &Curve::Gaussian {
                height,
                center,
                spread,
                y_min,
            } => {
                let exponent = -(x - center).powi(2) / (2. * spread * spread);
                (height - y_min) * exponent.exp() + y_min
            },
            &Curve::Sigmoid {
                midpoint,
                y_max,
                slope,
                y_min,
            } => (y_max - y_min) / (1. + (-slope * (x - midpoint)).exp()) + y_min,
            &Curve::Triangle { left, apex, right } => {
                if x <= left.x || x >= right.x {
                    left.y
                } else if x <= apex.x {
                    line_y(left, apex, x)
                } else {
                    line_y(apex, right, x)
                }
            },
            Curve::Trapezoid { points: [p0, p1, p2, p3] } => {
                if x <= p0.x || x >= p3.x {
                    p0.y
                } else if x <= p1.x {
                    line_y(*p0, *p1, x)
                } else if x <= p2.x {
                    line_y(*p1, *p2, x)
                } else {
                    line_y(*p2, *p3, x)
                }
            },
            &Curve::Step {
                steps,
                y_left,
                y_right,
                x_min,
                x_max,
            } => {
                if x <= x_min {
                    y_left
                } else if x > x_max || steps < 2 {
                    y_right
                } else {
                    let x_incr = (x_max - x_min) / steps as f64;
                    let y_incr = (y_right - y_left) / (steps - 1) as f64;
                    // x == x_max lands on the last stair, not past it
                    let index = ((x - x_min) / x_incr).floor().min((steps - 1) as f64);
                    index * y_incr + y_left
                }
            },
            &Curve::Polynomial { a, b, c, x_offset } => {
                let u = x - x_offset;
                a * u * u + b * u + c
            },
            &Curve::Cubic { a, b, c, d, x_offset } => {
                let u = x - x_offset;
                a * u.powi(3) + b * u * u + c * u + d
            },
            Curve::Piecewise { segments } => segments
                .iter()
                .find(|s| s.x_in_range(x))
                .map(|s| s.evaluate(x))
                .ok_or_else(|| FuzzyError::InvalidSegment(format!("no segment covers x = {x}")))?,
            Curve::Lookup { ys } => interp_even(x, ys)
                .ok_or_else(|| FuzzyError::Argument("a lookup curve needs at least two samples".to_owned()))?,
        };

        Ok(y)
    }

    /// Key coordinates of the curve, for display and editing.
    pub fn anchor_points(&self) -> Vec<Point2D> {
        let at = |x: f64| Point2D::new(x, self.evaluate(x).unwrap_or(f64::NAN));

        match self {
            &Curve::Linear { left, right } => vec![left, right],
            &Curve::Gaussian { center, spread, .. } => vec![at(center - spread), at(center), at(center + spread)],
            &Curve::Sigmoid { midpoint, .. } => vec![at(0.), at(midpoint), at(1.)],
            &Curve::Triangle { left, apex, right } => vec![left, apex, right],
            Curve::Trapezoid { points } => points.to_vec(),
            &Curve::Step {
                steps,
                y_left,
                y_right,
                x_min,
                x_max,
            } => {
                let x_incr = (x_max - x_min) / steps.max(1) as f64;
                let y_incr = (y_right - y_left) / steps.saturating_sub(1).max(1) as f64;
                (0..steps)
                    .flat_map(|i| {
                        let x = x_min + i as f64 * x_incr;
                        let y = y_left + i as f64 * y_incr;
                        [Point2D::new(x, y), Point2D::new(x + x_incr, y)]
                    })
                    .collect()
            },
            &Curve::Polynomial { a, b, .. } => {
                let inflection = if a != 0. { -b / (2. * a) } else { 0.5 };
                vec![at(0.), at(inflection.clamp(0., 1.)), at(1.)]
            },
            &Curve::Cubic { a, b, .. } => {
                let inflection = if a != 0. { -b / (3. * a) } else { 0.5 };
                vec![at(0.), at(inflection.clamp(0., 1.)), at(1.)]
            },
            Curve::Piecewise { segments } => {
                let mut points: Vec<Point2D> = segments.iter().map(Segment::left).collect();
                points.extend(segments.last().map(Segment::right));
                points
            },
            Curve::Lookup { ys } => Linspace::new(0., 1., ys.len())
                .zip(ys.iter())
                .map(|(x, y)| Point2D::new(x, *y))
                .collect(),
        }
    }

    /// Whether `construct_multiple` honours its overlap argument.
    pub fn allows_overlap(&self) -> bool {
        !matches!(
            self,
            Curve::Polynomial { .. } | Curve::Cubic { .. } | Curve::Piecewise { .. } | Curve::Lookup { .. }
        )
    }

    /// Produces `count` copies of this curve spread across `[0, 1]`,
    /// overlapping their neighbours by roughly `overlap`. With
    /// `spread_to_edges` the first and last copies are centred on the edges.
    pub fn construct_multiple(&self, count: usize, overlap: f64, spread_to_edges: bool) -> Result<Vec<Curve>> {
        let (step, start) = template_spacing(count, spread_to_edges)?;
        let mid = |i: usize| start + step * i as f64;

        let curves = match self {
            &Curve::Linear { left, right } => {
                let slice = 2. * overlap * step + step;
                (0..count)
                    .map(|i| {
                        let x_left = mid(i) - slice / 2.;
                        Curve::Linear {
                            left: Point2D::new(x_left, left.y),
                            right: Point2D::new(x_left + slice, right.y),
                        }
                    })
                    .collect()
            },
            &Curve::Gaussian { height, y_min, .. } => {
                let base = step / 7.;
                let spread = base + 4. * base * overlap;
                (0..count)
                    .map(|i| Curve::Gaussian {
                        height,
                        center: mid(i),
                        spread,
                        y_min,
                    })
                    .collect()
            },
            &Curve::Sigmoid { y_max, y_min, .. } => {
                let base_slope = 24. * (count - 1) as f64;
                (0..count)
                    .map(|i| Curve::Sigmoid {
                        midpoint: mid(i),
                        y_max,
                        slope: base_slope - base_slope * overlap,
                        y_min,
                    })
                    .collect()
            },
            &Curve::Triangle { left, apex, right } => {
                let half = (step + overlap * step * 2.) / 2.;
                (0..count)
                    .map(|i| Curve::Triangle {
                        left: Point2D::new(mid(i) - half, left.y),
                        apex: Point2D::new(mid(i), apex.y),
                        right: Point2D::new(mid(i) + half, right.y),
                    })
                    .collect()
            },
            Curve::Trapezoid { points: [p0, p1, p2, p3] } => {
                let low_spread = p3.x - p0.x;
                let high_spread = p2.x - p1.x;
                let lower = step + step * overlap * 2.;
                let upper = if low_spread != 0. {
                    high_spread * (lower / low_spread)
                } else {
                    0.
                };
                (0..count)
                    .map(|i| {
                        let m = mid(i);
                        Curve::Trapezoid {
                            points: [
                                Point2D::new(m - lower / 2., p0.y),
                                Point2D::new(m - upper / 2., p1.y),
                                Point2D::new(m + upper / 2., p2.y),
                                Point2D::new(m + lower / 2., p3.y),
                            ],
                        }
                    })
                    .collect()
            },
            &Curve::Step {
                steps, y_left, y_right, ..
            } => {
                let half = step / 2. + step * overlap * 2.;
                (0..count)
                    .map(|i| Curve::Step {
                        steps,
                        y_left,
                        y_right,
                        x_min: mid(i) - half,
                        x_max: mid(i) + half,
                    })
                    .collect()
            },
            &Curve::Polynomial { a, b, c, .. } => (0..count)
                .map(|i| Curve::Polynomial {
                    a,
                    b,
                    c,
                    x_offset: mid(i) - 0.5,
                })
                .collect(),
            &Curve::Cubic { a, b, c, d, .. } => (0..count)
                .map(|i| Curve::Cubic {
                    a,
                    b,
                    c,
                    d,
                    x_offset: mid(i) - 0.5,
                })
                .collect(),
            Curve::Piecewise { .. } | Curve::Lookup { .. } => {
                return Err(FuzzyError::Unsupported(format!(
                    "{} curves do not support construct_multiple",
                    self.kind()
                )))
            },
        };

        Ok(curves)
    }

    /// Samples this curve into an equivalent lookup table.
    pub fn bake(&self, samples: usize) -> Result<Curve> {
        if samples < 2 {
            return Err(FuzzyError::Argument("a lookup curve needs at least two samples".to_owned()));
        }
        let ys = Linspace::new(0., 1., samples)
            .map(|x| self.evaluate(x))
            .collect::<Result<Vec<_>>>()?;

        Ok(Curve::Lookup { ys })
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Curve::linear().evaluate(0.5).unwrap(), 0.5);
        assert_eq!(Curve::gaussian().evaluate(0.5).unwrap(), 1.);
        assert_eq!(Curve::sigmoid().evaluate(0.5).unwrap(), 0.5);
        assert_eq!(Curve::triangle().evaluate(0.5).unwrap(), 1.);
        assert_eq!(Curve::triangle().evaluate(0.1).unwrap(), 0.);
        assert_relative_eq!(Curve::triangle().evaluate(0.375).unwrap(), 0.5);
        assert_relative_eq!(Curve::trapezoid().evaluate(0.15).unwrap(), 0.5);
        assert_eq!(Curve::trapezoid().evaluate(0.5).unwrap(), 1.);
        assert_eq!(Curve::polynomial().evaluate(0.5).unwrap(), 0.);
        assert_relative_eq!(Curve::cubic().evaluate(0.).unwrap(), 0.15);
    }

    #[test]
    fn test_domain_is_checked() {
        assert_eq!(Curve::linear().evaluate(1. + 1e-7).unwrap(), 1.);
        assert!(matches!(Curve::linear().evaluate(-0.1), Err(FuzzyError::Domain { .. })));
    }

    #[test]
    fn test_step_stairs() {
        let curve = Curve::Step {
            steps: 4,
            y_left: 0.,
            y_right: 1.,
            x_min: 0.2,
            x_max: 0.6,
        };

        assert_eq!(curve.evaluate(0.1).unwrap(), 0.);
        assert_eq!(curve.evaluate(0.25).unwrap(), 0.);
        assert_relative_eq!(curve.evaluate(0.45).unwrap(), 2. / 3.);
        assert_eq!(curve.evaluate(0.6).unwrap(), 1.);
        assert_eq!(curve.evaluate(0.9).unwrap(), 1.);
        assert_eq!(curve.anchor_points().len(), 8);
    }

    #[test]
    fn test_piecewise() {
        let curve = Curve::piecewise(vec![
            Segment::linear(Point2D::new(0., 0.), Point2D::new(0.5, 1.)).unwrap(),
            Segment::step(Point2D::new(0.5, 1.), Point2D::new(1., 1.), None).unwrap(),
        ])
        .unwrap();

        assert_relative_eq!(curve.evaluate(0.25).unwrap(), 0.5);
        assert_eq!(curve.evaluate(0.75).unwrap(), 1.);
        assert_eq!(curve.anchor_points().len(), 3);
        assert_eq!(Curve::piecewise(Vec::new()).unwrap().evaluate(0.3).unwrap(), 0.);
        assert!(Curve::piecewise(Vec::new())
            .unwrap()
            .construct_multiple(3, 0., false)
            .is_err());
    }

    #[test]
    fn test_construct_multiple_triangles() {
        let curves = Curve::triangle().construct_multiple(3, 0., true).unwrap();

        assert_eq!(curves.len(), 3);
        assert_eq!(
            curves[1],
            Curve::Triangle {
                left: Point2D::new(0.25, 0.),
                apex: Point2D::new(0.5, 1.),
                right: Point2D::new(0.75, 0.),
            }
        );
        assert_eq!(curves[0].evaluate(0.).unwrap(), 1.);
        assert!(matches!(
            Curve::triangle().construct_multiple(1, 0., false),
            Err(FuzzyError::Argument(_))
        ));
    }

    #[test]
    fn test_construct_multiple_spacing() {
        let curves = Curve::gaussian().construct_multiple(4, 0.5, false).unwrap();
        let Curve::Gaussian { center, spread, .. } = curves[3] else {
            panic!("expected a gaussian");
        };

        assert_relative_eq!(center, 0.875);
        assert_relative_eq!(spread, 3. / 28.);

        let curves = Curve::cubic().construct_multiple(2, 0.9, true).unwrap();

        assert_eq!(curves[1].evaluate(1.).unwrap(), 0.15);
        assert!(!Curve::cubic().allows_overlap());

        let curves = Curve::trapezoid().construct_multiple(2, 0., true).unwrap();
        let Curve::Trapezoid { points } = &curves[0] else {
            panic!("expected a trapezoid");
        };

        assert_relative_eq!(points[3].x, 0.5);
        assert_relative_eq!(points[2].x, 0.2);
    }

    #[test]
    fn test_bake() {
        let baked = Curve::linear().bake(11).unwrap();

        for x in [0., 0.05, 0.33, 0.5, 0.99, 1.] {
            assert_abs_diff_eq!(baked.evaluate(x).unwrap(), x, epsilon = 1e-12);
        }

        let source = Curve::gaussian();
        let baked = source.bake(101).unwrap();

        assert_abs_diff_eq!(baked.evaluate(0.3).unwrap(), source.evaluate(0.3).unwrap(), epsilon = 1e-12);
        assert!(Curve::linear().bake(1).is_err());
    }
}
