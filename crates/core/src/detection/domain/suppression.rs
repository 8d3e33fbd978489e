use std::cmp::Ordering;

use crate::shared::candidate::FaceBox;

/// Greedy non-max suppression.
///
/// Returns the indices of the kept boxes. Candidates are visited in
/// descending score order (ties broken by input order); each kept box
/// discards every remaining box whose IoU with it exceeds the threshold.
/// Any two kept boxes therefore have IoU at or below the threshold, and
/// the result is non-empty whenever the input is.
pub fn suppress(boxes: &[FaceBox], scores: &[f64], iou_threshold: f64) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len(), "one score per box");

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    // Stable sort keeps input order among equal scores.
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut kept = Vec::new();
    while !order.is_empty() {
        let best = order.remove(0);
        kept.push(best);
        order.retain(|&other| boxes[best].iou(&boxes[other]) <= iou_threshold);
    }
    kept
}
