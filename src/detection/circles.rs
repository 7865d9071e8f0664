/// Circle given by center and radius, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let dx = p.0 - self.x;
        let dy = p.1 - self.y;
        (dx * dx + dy * dy).sqrt() <= self.radius + 1e-7
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Self {
        let x = (a.0 + b.0) / 2.0;
        let y = (a.1 + b.1) / 2.0;
        let radius = ((a.0 - x).powi(2) + (a.1 - y).powi(2)).sqrt();
        Self { x, y, radius }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Self> {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < 1e-12 {
            return None;
        }
        let sq = |p: (f64, f64)| p.0 * p.0 + p.1 * p.1;
        let x = (sq(a) * (b.1 - c.1) + sq(b) * (c.1 - a.1) + sq(c) * (a.1 - b.1)) / d;
        let y = (sq(a) * (c.0 - b.0) + sq(b) * (a.0 - c.0) + sq(c) * (b.0 - a.0)) / d;
        let radius = ((a.0 - x).powi(2) + (a.1 - y).powi(2)).sqrt();
        Some(Self { x, y, radius })
    }
}

/// Smallest circle containing every point. `None` for no points.
pub fn min_enclosing_circle(points: &[(i32, i32)]) -> Option<Circle> {
    let pts: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    let first = *pts.first()?;
    let mut circle = Circle { x: first.0, y: first.1, radius: 0.0 };

    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle { x: pts[i].0, y: pts[i].1, radius: 0.0 };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_two(pts[i], pts[j]);
            for k in 0..j {
                if circle.contains(pts[k]) {
                    continue;
                }
                // collinear triples are already covered by the widest pair
                if let Some(c) = Circle::from_three(pts[i], pts[j], pts[k]) {
                    circle = c;
                }
            }
        }
    }
    Some(circle)
}

/// Absolute polygon area by the shoelace formula.
pub fn polygon_area(points: &[(i32, i32)]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn square_corners() {
        let c = min_enclosing_circle(&[(0, 0), (10, 0), (10, 10), (0, 10)]).unwrap();
        assert_relative_eq!(c.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(c.radius, 50f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn interior_points_do_not_grow_circle() {
        let c = min_enclosing_circle(&[(0, 0), (3, 1), (2, -1), (8, 0)]).unwrap();
        assert_relative_eq!(c.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(c.radius, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(min_enclosing_circle(&[]).is_none());
        let single = min_enclosing_circle(&[(4, 5)]).unwrap();
        assert_eq!((single.x, single.y, single.radius), (4.0, 5.0, 0.0));
    }

    #[test]
    fn shoelace_area() {
        assert_relative_eq!(polygon_area(&[(0, 0), (4, 0), (4, 3), (0, 3)]), 12.0);
        assert_relative_eq!(polygon_area(&[(0, 0), (4, 0)]), 0.0);
    }
}
