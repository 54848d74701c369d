use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("ort (onnxruntime) error: {0}")]
    Ort(#[from] ort::Error),
    #[error("hf-hub: {0}")]
    HuggingFace(#[from] hf_hub::api::sync::ApiError),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("model output `{0}` is missing")]
    MissingOutput(&'static str),
    #[error("label id {0} is not in the label map")]
    UnknownLabel(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
