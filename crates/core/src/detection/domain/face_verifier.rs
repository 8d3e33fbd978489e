use image::imageops::{self, FilterType};

use crate::detection::domain::bovw::Codebook;
use crate::detection::domain::descriptor_extractor::DescriptorExtractor;
use crate::detection::domain::roi::crop_gray;
use crate::shared::candidate::{FaceBox, VerificationResult};
use crate::shared::constants::{MIN_DESCRIPTORS, TRAINING_RESOLUTION};
use crate::shared::frame::Frame;

/// A fitted linear decision boundary with optional per-dimension feature
/// scaling (trained without mean subtraction, so scaling is a plain
/// divide).
pub struct LinearClassifier {
    weights: Vec<f32>,
    bias: f32,
    scale: Option<Vec<f32>>,
}

impl LinearClassifier {
    pub fn new(weights: Vec<f32>, bias: f32, scale: Option<Vec<f32>>) -> Self {
        if let Some(s) = &scale {
            debug_assert_eq!(s.len(), weights.len(), "one scale factor per weight");
        }
        Self {
            weights,
            bias,
            scale,
        }
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    /// Signed margin of the histogram: positive means "face".
    pub fn decision(&self, histogram: &[f32]) -> f64 {
        debug_assert_eq!(histogram.len(), self.weights.len());
        let mut acc = self.bias as f64;
        match &self.scale {
            Some(scale) => {
                for ((h, s), w) in histogram.iter().zip(scale).zip(&self.weights) {
                    acc += (h / s) as f64 * *w as f64;
                }
            }
            None => {
                for (h, w) in histogram.iter().zip(&self.weights) {
                    acc += *h as f64 * *w as f64;
                }
            }
        }
        acc
    }
}

/// The slower, higher-precision verification stage.
///
/// Resizes a candidate region to the training resolution, extracts local
/// descriptors, encodes them against the codebook, and applies the linear
/// decision boundary.
pub struct FaceVerifier {
    extractor: Box<dyn DescriptorExtractor>,
    codebook: Codebook,
    classifier: LinearClassifier,
    training_resolution: u32,
    min_descriptors: usize,
}

impl FaceVerifier {
    pub fn new(
        extractor: Box<dyn DescriptorExtractor>,
        codebook: Codebook,
        classifier: LinearClassifier,
    ) -> Self {
        debug_assert_eq!(
            codebook.k(),
            classifier.dimension(),
            "classifier must be trained on the codebook's histogram length"
        );
        Self {
            extractor,
            codebook,
            classifier,
            training_resolution: TRAINING_RESOLUTION,
            min_descriptors: MIN_DESCRIPTORS,
        }
    }

    pub fn with_min_descriptors(mut self, min_descriptors: usize) -> Self {
        self.min_descriptors = min_descriptors;
        self
    }

    /// Verifies one candidate region of a grayscale frame.
    ///
    /// A region that yields no pixels (malformed box) or too few
    /// descriptors is rejected with zero confidence; the classifier is
    /// only consulted when a reliable histogram can be formed.
    pub fn verify(
        &self,
        gray: &Frame,
        region: &FaceBox,
    ) -> Result<VerificationResult, Box<dyn std::error::Error>> {
        let crop = match crop_gray(gray, region) {
            Some(crop) => crop,
            None => return Ok(VerificationResult::rejected()),
        };
        let resized = imageops::resize(
            &crop,
            self.training_resolution,
            self.training_resolution,
            FilterType::Triangle,
        );

        let descriptors = self.extractor.extract(&resized)?;
        let descriptors = match &descriptors {
            Some(d) if d.nrows() >= self.min_descriptors => d,
            _ => return Ok(VerificationResult::rejected()),
        };

        let histogram = self.codebook.encode(Some(descriptors));
        let confidence = self.classifier.decision(&histogram);
        Ok(VerificationResult {
            accepted: confidence > 0.0,
            confidence,
        })
    }
}
