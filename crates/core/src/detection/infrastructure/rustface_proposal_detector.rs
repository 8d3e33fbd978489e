use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::detection::domain::proposal_detector::ProposalDetector;
use crate::shared::candidate::{Candidate, FaceBox};
use crate::shared::frame::Frame;

/// Proposal detector backed by the `rustface` crate (SeetaFace engine).
///
/// Candidates are scored by bounding-box area, not by the engine's own
/// score: the pipeline verifies only the largest proposal, and area is the
/// cheap proxy for "most likely the subject".
pub struct RustfaceProposalDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceProposalDetector {
    pub fn new(model_path: &Path, min_face_size: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(model_path)
            .map_err(|e| format!("cannot open detector model {}: {e}", model_path.display()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| format!("cannot read detector model {}: {e}", model_path.display()))?;
        Ok(Self {
            model,
            min_face_size,
        })
    }
}

impl ProposalDetector for RustfaceProposalDetector {
    fn detect(&mut self, gray: &Frame) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
        debug_assert_eq!(gray.channels(), 1, "proposal detection runs on grayscale");

        // The SeetaFace detector is cheap to construct and not reusable
        // across threads; build one per frame from the shared model.
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let image = rustface::ImageData::new(gray.data(), gray.width(), gray.height());
        let faces = detector.detect(&image);

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                let bounding_box = FaceBox::new(
                    bbox.x(),
                    bbox.y(),
                    bbox.width() as i32,
                    bbox.height() as i32,
                );
                Candidate {
                    bounding_box,
                    score: bounding_box.area(),
                }
            })
            .collect())
    }
}
