use image::GrayImage;
use ndarray::Array2;

/// Domain interface for local visual-feature extraction.
///
/// Returns one descriptor vector per row, or `None` when the region
/// yields no usable features at all. Row count varies with image content;
/// column count must match the codebook's descriptor dimension.
pub trait DescriptorExtractor: Send {
    fn extract(&self, image: &GrayImage)
        -> Result<Option<Array2<f32>>, Box<dyn std::error::Error>>;
}
