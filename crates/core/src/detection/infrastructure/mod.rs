pub mod fast_patch_extractor;
pub mod intensity_eye_detector;
pub mod model_store;
pub mod rustface_proposal_detector;
