//! Polygon geometry over normalized coordinates.

use haven_models::NormalizedPoint;

/// Even-odd (crossing number) point-in-polygon test.
///
/// Works on open or closed rings; the closing duplicate vertex contributes
/// a zero-length edge that never toggles the parity. Points exactly on an
/// edge may land on either side, which is acceptable for motion anchors.
pub fn point_in_polygon(point: NormalizedPoint, ring: &[NormalizedPoint]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].x, ring[i].y);
        let (xj, yj) = (ring[j].x, ring[j].y);

        let crosses = (yi > point.y) != (yj > point.y);
        if crosses && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Arithmetic-mean centroid of the ring's unique vertices.
///
/// Not the area centroid, but inside every convex polygon and good enough
/// for sanity checks and zone previews.
pub fn polygon_centroid(ring: &[NormalizedPoint]) -> Option<NormalizedPoint> {
    let n = ring.len();
    if n < 3 {
        return None;
    }
    // Skip the closing duplicate if present
    let unique = if ring[0] == ring[n - 1] { &ring[..n - 1] } else { ring };

    let (sx, sy) = unique
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let len = unique.len() as f64;
    Some(NormalizedPoint::new(sx / len, sy / len))
}
