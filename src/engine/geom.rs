use crate::model::{Pt, Segment};

// Same-line comparisons fix a resolution of 1/100: two lines share an
// equation iff both the rounded slope and the rounded intercept agree.
const LINE_EQ_SCALE: f64 = 100.0;

/// Exact membership test: `p` lies on the closed segment `a`-`b`.
pub fn point_on_segment(a: Pt, b: Pt, p: Pt) -> bool {
    let cross = (b.x - a.x) as i64 * (p.y - a.y) as i64 - (b.y - a.y) as i64 * (p.x - a.x) as i64;
    if cross != 0 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// `p` lies on the segment strictly between its endpoints.
pub fn point_inside_segment(a: Pt, b: Pt, p: Pt) -> bool {
    p != a && p != b && point_on_segment(a, b, p)
}

/// Proximity test with an L-infinity tolerance `res`.
pub fn point_near_segment(a: Pt, b: Pt, p: Pt, res: i32) -> bool {
    if res <= 0 {
        return point_on_segment(a, b, p);
    }
    let (cx, cy) = closest_point(a, b, p);
    let dx = (p.x as f64 - cx).abs();
    let dy = (p.y as f64 - cy).abs();
    dx.max(dy) <= res as f64
}

fn closest_point(a: Pt, b: Pt, p: Pt) -> (f64, f64) {
    let ax = a.x as f64;
    let ay = a.y as f64;
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return (ax, ay);
    }
    let t = (((p.x as f64 - ax) * dx + (p.y as f64 - ay) * dy) / len2).clamp(0.0, 1.0);
    (ax + t * dx, ay + t * dy)
}

/// Snap a scalar to the nearest multiple of `pitch`.
pub fn snap_coord(v: i32, pitch: i32) -> i32 {
    if pitch <= 1 {
        return v;
    }
    ((v as f64 / pitch as f64).round() as i32) * pitch
}

pub fn snap_pt(p: Pt, pitch: (i32, i32)) -> Pt {
    Pt::new(snap_coord(p.x, pitch.0), snap_coord(p.y, pitch.1))
}

/// The line-equation key of a segment: vertical lines compare by x, all
/// others by slope and intercept rounded down at the 1/100 resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKey {
    Vertical(i32),
    Sloped { m: i64, c: i64 },
}

pub fn line_key(a: Pt, b: Pt) -> LineKey {
    if a.x == b.x {
        return LineKey::Vertical(a.x);
    }
    let m_key = ((b.y - a.y) as f64 / (b.x - a.x) as f64 * LINE_EQ_SCALE).floor() as i64;
    let m = m_key as f64 / LINE_EQ_SCALE;
    let c_key = ((a.y as f64 - m * a.x as f64) * LINE_EQ_SCALE).floor() as i64;
    LineKey::Sloped { m: m_key, c: c_key }
}

/// Whether two segments satisfy the same line equation.
pub fn same_line(s1: &Segment, s2: &Segment) -> bool {
    line_key(s1.a, s1.b) == line_key(s2.a, s2.b)
}

/// Scalar position of a point along a line, using the axis the line is
/// monotonic in (y for vertical lines, x otherwise).
pub fn axis_value(p: Pt, key: LineKey) -> i32 {
    match key {
        LineKey::Vertical(_) => p.y,
        LineKey::Sloped { .. } => p.x,
    }
}
