//! Object detection models.

mod detr;

pub use detr::{postprocess_predictions, resize_dimensions, DetrModel, DetrPretrainedModels};

use crate::{Detection, Result};

/// A pretrained detector that turns one image into the detections above its
/// confidence threshold.
///
/// Implementations are loaded once and then shared by reference across a
/// sequential run; they are not expected to be called from several threads.
pub trait ObjectDetector {
    /// Scores must be strictly above this to be reported.
    fn confidence_threshold(&self) -> f32;

    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<Detection>>;
}
