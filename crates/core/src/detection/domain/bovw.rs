use ndarray::{Array2, ArrayView1};

use crate::shared::constants::EPSILON;

/// A fitted visual-word codebook: one centroid per row.
///
/// Loaded once at startup and shared read-only across frames. Fitting
/// happens in an offline training tool; the live system only assigns and
/// encodes.
pub struct Codebook {
    centroids: Array2<f32>,
}

impl Codebook {
    pub fn new(centroids: Array2<f32>) -> Self {
        debug_assert!(centroids.nrows() > 0, "codebook must have at least one centroid");
        Self { centroids }
    }

    /// Number of visual words (histogram length).
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Descriptor dimension the codebook was fitted on.
    pub fn dimension(&self) -> usize {
        self.centroids.ncols()
    }

    /// Index of the nearest centroid by squared Euclidean distance.
    pub fn assign(&self, descriptor: ArrayView1<'_, f32>) -> usize {
        debug_assert_eq!(descriptor.len(), self.dimension());
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, centroid) in self.centroids.rows().into_iter().enumerate() {
            let dist: f32 = centroid
                .iter()
                .zip(descriptor.iter())
                .map(|(c, d)| (c - d) * (c - d))
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }

    /// Encodes a descriptor set as an L1-normalized visual-word histogram.
    ///
    /// No descriptors at all yields the uniform distribution, so the
    /// verifier always sees a well-formed vector. Normalization must match
    /// the training-time encoder exactly: counts divided by
    /// `(sum + epsilon)`.
    pub fn encode(&self, descriptors: Option<&Array2<f32>>) -> Vec<f32> {
        let k = self.k();
        let descriptors = match descriptors {
            Some(d) if d.nrows() > 0 => d,
            _ => return vec![1.0 / k as f32; k],
        };

        let mut histogram = vec![0.0f32; k];
        for descriptor in descriptors.rows() {
            histogram[self.assign(descriptor)] += 1.0;
        }
        let sum: f32 = histogram.iter().sum();
        let denom = sum + EPSILON as f32;
        for bin in &mut histogram {
            *bin /= denom;
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn codebook_3() -> Codebook {
        // Three well-separated 2-d centroids.
        Codebook::new(array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]])
    }

    #[test]
    fn test_assign_nearest() {
        let cb = codebook_3();
        assert_eq!(cb.assign(array![1.0, 1.0].view()), 0);
        assert_eq!(cb.assign(array![9.0, 1.0].view()), 1);
        assert_eq!(cb.assign(array![1.0, 9.0].view()), 2);
    }

    #[test]
    fn test_assign_tie_takes_first() {
        let cb = Codebook::new(array![[0.0], [2.0]]);
        // Equidistant from both centroids.
        assert_eq!(cb.assign(array![1.0].view()), 0);
    }

    #[test]
    fn test_encode_counts_and_normalizes() {
        let cb = codebook_3();
        let descriptors = array![[0.5, 0.5], [9.5, 0.0], [10.0, 0.5], [0.0, 9.0]];
        let hist = cb.encode(Some(&descriptors));
        assert_eq!(hist.len(), 3);
        let sum: f32 = hist.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-4);
        // Bins: one near origin, two near (10,0), one near (0,10).
        assert!(hist[1] > hist[0]);
        assert_relative_eq!(hist[0], hist[2], epsilon = 1e-6);
    }

    #[test]
    fn test_encode_none_is_uniform() {
        let cb = codebook_3();
        let hist = cb.encode(None);
        assert_eq!(hist, vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_encode_empty_is_uniform() {
        let cb = codebook_3();
        let empty = Array2::<f32>::zeros((0, 2));
        let hist = cb.encode(Some(&empty));
        assert_eq!(hist, vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_encode_single_descriptor() {
        let cb = codebook_3();
        let descriptors = array![[10.0, 0.0]];
        let hist = cb.encode(Some(&descriptors));
        let sum: f32 = hist.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-4);
        assert!(hist[1] > 0.99);
        assert_relative_eq!(hist[0], 0.0);
    }

    #[test]
    fn test_encode_entries_non_negative() {
        let cb = codebook_3();
        let descriptors = array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [5.0, 5.0]];
        for v in cb.encode(Some(&descriptors)) {
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn test_dimensions() {
        let cb = codebook_3();
        assert_eq!(cb.k(), 3);
        assert_eq!(cb.dimension(), 2);
    }
}
