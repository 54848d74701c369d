//! # Overview
//!
//! Batch object detection over a folder of images. Each image is run through a pretrained
//! [DETR](https://github.com/facebookresearch/detr) model in ONNX format through onnxruntime
//! (bindings via [ort](https://github.com/pykeio/ort)); detections above the confidence
//! threshold are drawn onto a copy of the image, and the run ends with a summary of which
//! objects from an expected checklist were found.

pub mod annotate;
mod detection;
mod error;
pub mod fonts;
pub mod inputs;
pub mod pipeline;
pub mod summary;
mod utils;

pub use error::{Error, Result};

// re-exports
pub use ort;
pub use image;
pub use geo_types;

pub mod models;

pub use detection::Detection;
pub use utils::round_to;
