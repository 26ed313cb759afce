//! Spawn anchor search and the starting formation around an anchor.
//!
//! Anchors are found by walking an outward spiral from the origin and taking
//! the first candidate far enough from every active anchor. Candidates are
//! only accepted when all sixteen formation cells are empty. Traversal order
//! is fixed, so placement is reproducible for a given join order.

use log::{debug, warn};
use shared::{Coord, PieceType};
use std::f64::consts::{PI, TAU};

pub const ANGLE_STEP: f64 = PI / 12.0;
pub const RADIUS_STEP: f64 = 4.0;
pub const MAX_SPIRAL_ATTEMPTS: usize = 5000;
pub const FALLBACK_RINGS: usize = 64;

const BACK_ROW: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Cells and piece types of a full set anchored at `anchor`: back row on
/// `y`, pawns on `y + 1`, columns `x - 3 ..= x + 4`.
pub fn formation(anchor: Coord) -> Vec<(Coord, PieceType)> {
    let mut cells = Vec::with_capacity(BACK_ROW.len() * 2);
    for (i, kind) in BACK_ROW.iter().enumerate() {
        let x = anchor.x.saturating_add(i as i64 - 3);
        cells.push((Coord::new(x, anchor.y), *kind));
    }
    for i in 0..BACK_ROW.len() {
        let x = anchor.x.saturating_add(i as i64 - 3);
        cells.push((Coord::new(x, anchor.y.saturating_add(1)), PieceType::Pawn));
    }
    cells
}

/// Finds a spawn anchor at least `min_distance` from every anchor in
/// `anchors` whose formation cells all satisfy `is_free`.
///
/// Falls back to the candidate that maximises its nearest-anchor distance
/// when the spiral runs out; that result may be closer than `min_distance`.
/// Returns `None` only if no scanned candidate has a free footprint.
pub fn find_anchor<F>(anchors: &[Coord], min_distance: f64, is_free: F) -> Option<Coord>
where
    F: Fn(Coord) -> bool,
{
    let footprint_free = |anchor: Coord| formation(anchor).iter().all(|(at, _)| is_free(*at));

    if anchors.is_empty() && footprint_free(Coord::ORIGIN) {
        return Some(Coord::ORIGIN);
    }

    let mut angle = 0.0_f64;
    let mut radius = min_distance.max(1.0);
    for attempt in 0..MAX_SPIRAL_ATTEMPTS {
        let candidate = polar(radius, angle);
        if nearest_distance(candidate, anchors) >= min_distance && footprint_free(candidate) {
            debug!(
                "Spawn anchor {} found after {} spiral attempts",
                candidate,
                attempt + 1
            );
            return Some(candidate);
        }

        angle += ANGLE_STEP;
        if angle >= TAU - 1e-9 {
            angle = 0.0;
            radius += RADIUS_STEP;
        }
    }

    warn!(
        "Spiral exhausted after {} attempts, falling back to best-effort placement",
        MAX_SPIRAL_ATTEMPTS
    );
    fallback(anchors, min_distance, footprint_free)
}

fn fallback<F>(anchors: &[Coord], min_distance: f64, footprint_free: F) -> Option<Coord>
where
    F: Fn(Coord) -> bool,
{
    let steps_per_ring = (TAU / ANGLE_STEP).round() as usize;
    let mut best: Option<(Coord, f64)> = None;

    for ring in 0..FALLBACK_RINGS {
        let radius = min_distance.max(1.0) + ring as f64 * RADIUS_STEP;
        for step in 0..steps_per_ring {
            let candidate = polar(radius, step as f64 * ANGLE_STEP);
            let nearest = nearest_distance(candidate, anchors);
            let improves = match best {
                Some((_, best_distance)) => nearest > best_distance,
                None => true,
            };
            if improves && footprint_free(candidate) {
                best = Some((candidate, nearest));
            }
        }
    }

    best.map(|(anchor, _)| anchor)
}

fn polar(radius: f64, angle: f64) -> Coord {
    Coord::new(
        (radius * angle.cos()).round() as i64,
        (radius * angle.sin()).round() as i64,
    )
}

/// Distance from `candidate` to the closest anchor, infinite when there are none.
pub fn nearest_distance(candidate: Coord, anchors: &[Coord]) -> f64 {
    anchors
        .iter()
        .map(|anchor| candidate.distance(*anchor))
        .fold(f64::INFINITY, f64::min)
}
