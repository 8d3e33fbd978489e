use crate::shared::candidate::Candidate;
use crate::shared::frame::Frame;

/// Domain interface for the fast candidate-proposal stage.
///
/// Implementations receive a grayscale frame and return zero or more
/// scored candidate regions. Implementations may be stateful, hence
/// `&mut self`.
pub trait ProposalDetector: Send {
    fn detect(&mut self, gray: &Frame) -> Result<Vec<Candidate>, Box<dyn std::error::Error>>;
}
