use crate::detection::domain::face_verifier::FaceVerifier;
use crate::detection::domain::proposal_detector::ProposalDetector;
use crate::detection::domain::suppression::suppress;
use crate::shared::candidate::{Candidate, FaceBox, VerificationResult};
use crate::shared::frame::Frame;

/// What one pipeline pass produced, for selection and reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineRun {
    /// The frame's chosen face box, if any survived.
    pub selected: Option<FaceBox>,
    /// Raw proposal count before verification and suppression.
    pub proposal_count: usize,
    /// Verification outcome for the best proposal, when verification ran.
    pub verification: Option<VerificationResult>,
}

/// Two-stage detection: fast proposals, single-candidate verification,
/// then non-max suppression over whatever survives.
///
/// Only the highest-scoring proposal is ever verified, which bounds the
/// worst-case per-frame latency to one verification. A candidate that
/// fails verification empties the whole frame's candidate set: one
/// false-reject is cheaper than streaming a false-positive box.
pub struct ProposalPipeline {
    detector: Box<dyn ProposalDetector>,
    verifier: Option<FaceVerifier>,
    confidence_threshold: f64,
    iou_threshold: f64,
}

impl ProposalPipeline {
    pub fn new(
        detector: Box<dyn ProposalDetector>,
        verifier: Option<FaceVerifier>,
        confidence_threshold: f64,
        iou_threshold: f64,
    ) -> Self {
        Self {
            detector,
            verifier,
            confidence_threshold,
            iou_threshold,
        }
    }

    pub fn verification_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Runs one grayscale frame through the pipeline.
    ///
    /// A detector failure is propagated (the frame is unusable); a
    /// verifier failure on a malformed region counts as "not a face".
    pub fn run(&mut self, gray: &Frame) -> Result<PipelineRun, Box<dyn std::error::Error>> {
        let proposals = self.detector.detect(gray)?;
        let proposal_count = proposals.len();

        let mut verification = None;
        let candidates = match (&self.verifier, proposals.is_empty()) {
            (Some(verifier), false) => {
                let best = best_candidate(&proposals);
                let result = match verifier.verify(gray, &best.bounding_box) {
                    Ok(result) => result,
                    Err(e) => {
                        log::debug!("verification failed on {:?}: {e}", best.bounding_box);
                        VerificationResult::rejected()
                    }
                };
                verification = Some(result);
                if result.accepted && result.confidence > self.confidence_threshold {
                    vec![Candidate {
                        bounding_box: best.bounding_box,
                        score: result.confidence,
                    }]
                } else {
                    Vec::new()
                }
            }
            _ => proposals,
        };

        let selected = select(&candidates, self.iou_threshold);
        Ok(PipelineRun {
            selected,
            proposal_count,
            verification,
        })
    }
}

fn best_candidate(candidates: &[Candidate]) -> Candidate {
    debug_assert!(!candidates.is_empty());
    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.score > best.score {
            best = *c;
        }
    }
    best
}

/// Suppression followed by highest-score selection among the survivors.
fn select(candidates: &[Candidate], iou_threshold: f64) -> Option<FaceBox> {
    if candidates.is_empty() {
        return None;
    }
    let boxes: Vec<FaceBox> = candidates.iter().map(|c| c.bounding_box).collect();
    let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();

    suppress(&boxes, &scores, iou_threshold)
        .into_iter()
        .max_by(|&a, &b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|i| boxes[i])
}
