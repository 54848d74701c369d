use image::imageops;
use ndarray::{Array, ArrayBase, ArrayView2, Axis, Dim, ErrorKind, Ix3, OwnedRepr, ShapeError};
use ort::{Session, SessionBuilder, SessionOutputs};

pub use crate::error::{Error, Result};
use crate::{models::ObjectDetector, utils::vec_to_bbox, Detection};

/// A [`DETR`](https://github.com/facebookresearch/detr) object detector.
pub struct DetrModel {
    model_name: String,
    model: ort::Session,
    confidence_threshold: f32,
    label_map: Vec<(i64, String)>,
    wants_pixel_mask: bool,
}

/// Pretrained DETR models exported to ONNX on Hugging Face.
pub enum DetrPretrainedModels {
    ResNet50,
    ResNet50Quantized,
    ResNet101,
}

// COCO 2017 ids as used by the DETR checkpoints; gaps are unused ids.
const COCO_LABELS: [&str; 91] = [
    "N/A", "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "N/A", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "N/A", "backpack",
    "umbrella", "N/A", "N/A", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard",
    "sports ball", "kite", "baseball bat", "baseball glove", "skateboard", "surfboard",
    "tennis racket", "bottle", "N/A", "wine glass", "cup", "fork", "knife", "spoon", "bowl",
    "banana", "apple", "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut",
    "cake", "chair", "couch", "potted plant", "bed", "N/A", "dining table", "N/A", "N/A",
    "toilet", "N/A", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone", "microwave",
    "oven", "toaster", "sink", "refrigerator", "N/A", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

impl DetrPretrainedModels {
    /// Model name.
    pub fn name(&self) -> &str {
        match self {
            DetrPretrainedModels::ResNet50 | DetrPretrainedModels::ResNet50Quantized => {
                "facebook/detr-resnet-50"
            }
            DetrPretrainedModels::ResNet101 => "facebook/detr-resnet-101",
        }
    }

    /// Hugging Face repository for this model.
    pub fn hf_repo(&self) -> &str {
        match self {
            DetrPretrainedModels::ResNet50 | DetrPretrainedModels::ResNet50Quantized => {
                "Xenova/detr-resnet-50"
            }
            DetrPretrainedModels::ResNet101 => "Xenova/detr-resnet-101",
        }
    }

    /// Path for this model file in Hugging Face repository.
    pub fn hf_filename(&self) -> &str {
        match self {
            DetrPretrainedModels::ResNet50Quantized => "onnx/model_quantized.onnx",
            _ => "onnx/model.onnx",
        }
    }

    /// The label map for this model.
    pub fn label_map(&self) -> Vec<(i64, String)> {
        match self {
            _ => COCO_LABELS
                .iter()
                .enumerate()
                .map(|(i, l)| (i as i64, l.to_string()))
                .collect(),
        }
    }
}

impl DetrModel {
    /// Target length of the shorter image edge.
    pub const SHORTEST_EDGE: u32 = 800;
    /// Upper bound for the longer image edge after resizing.
    pub const LONGEST_EDGE: u32 = 1333;
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.9;

    const IMAGE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    const IMAGE_STD: [f32; 3] = [0.229, 0.224, 0.225];

    const PIXEL_VALUES: &'static str = "pixel_values";
    const PIXEL_MASK: &'static str = "pixel_mask";
    const LOGITS: &'static str = "logits";
    const PRED_BOXES: &'static str = "pred_boxes";

    /// Construct a [`DetrModel`] with a pretrained model downloaded from Hugging Face.
    pub fn pretrained(p_model: DetrPretrainedModels) -> Result<Self> {
        Self::configure_pretrained(
            p_model,
            Self::DEFAULT_CONFIDENCE_THRESHOLD,
            Session::builder()?,
        )
    }

    /// Construct a configured [`DetrModel`] with a pretrained model downloaded from Hugging Face.
    pub fn configure_pretrained(
        p_model: DetrPretrainedModels,
        confidence_threshold: f32,
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        let api = hf_hub::api::sync::Api::new()?;
        let filename = api
            .model(p_model.hf_repo().to_string())
            .get(p_model.hf_filename())?;
        tracing::info!("loading {} from {}", p_model.name(), filename.display());

        let model = session_builder.commit_from_file(filename)?;

        Ok(Self::from_session(
            model,
            p_model.name(),
            p_model.label_map(),
            confidence_threshold,
        ))
    }

    /// Construct a [`DetrModel`] from a model file.
    pub fn new_from_file(
        file_path: &str,
        model_name: &str,
        label_map: &[(i64, &str)],
        confidence_threshold: f32,
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        let model = session_builder.commit_from_file(file_path)?;

        Ok(Self::from_session(
            model,
            model_name,
            label_map.iter().map(|(i, l)| (*i, l.to_string())).collect(),
            confidence_threshold,
        ))
    }

    fn from_session(
        model: Session,
        model_name: &str,
        label_map: Vec<(i64, String)>,
        confidence_threshold: f32,
    ) -> Self {
        let wants_pixel_mask = model.inputs.iter().any(|i| i.name == Self::PIXEL_MASK);

        Self {
            model_name: model_name.to_string(),
            model,
            confidence_threshold,
            label_map,
            wants_pixel_mask,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Predict [`Detection`]s from the image provided.
    pub fn predict(&self, img: &image::DynamicImage) -> Result<Vec<Detection>> {
        let (img_width, img_height, pixel_values) = self.preprocess(img);

        let outputs = if self.wants_pixel_mask {
            let (_, _, height, width) = pixel_values.dim();
            let pixel_mask = Array::<i64, _>::ones((1, height, width));
            self.model.run(ort::inputs![
                Self::PIXEL_VALUES => pixel_values,
                Self::PIXEL_MASK => pixel_mask
            ]?)?
        } else {
            self.model
                .run(ort::inputs![Self::PIXEL_VALUES => pixel_values]?)?
        };

        self.postprocess(&outputs, img_width, img_height)
    }

    fn preprocess(
        &self,
        img: &image::DynamicImage,
    ) -> (u32, u32, ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>>) {
        let (img_width, img_height) = (img.width(), img.height());
        let (width, height) = resize_dimensions(img_width, img_height);

        let img_rgb8 = imageops::resize(
            &img.to_rgb8(),
            width,
            height,
            imageops::FilterType::Triangle,
        );

        let mut input = Array::zeros((1, 3, height as usize, width as usize));

        for pixel in img_rgb8.enumerate_pixels() {
            let x = pixel.0 as usize;
            let y = pixel.1 as usize;
            for (c, value) in pixel.2 .0.iter().enumerate() {
                input[[0, c, y, x]] =
                    (*value as f32 / 255.0 - Self::IMAGE_MEAN[c]) / Self::IMAGE_STD[c];
            }
        }

        (img_width, img_height, input)
    }

    fn postprocess<'s>(
        &self,
        outputs: &SessionOutputs<'_, 's>,
        img_width: u32,
        img_height: u32,
    ) -> Result<Vec<Detection>> {
        let logits = outputs
            .get(Self::LOGITS)
            .ok_or(Error::MissingOutput(Self::LOGITS))?
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;
        let boxes = outputs
            .get(Self::PRED_BOXES)
            .ok_or(Error::MissingOutput(Self::PRED_BOXES))?
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;

        postprocess_predictions(
            logits.index_axis(Axis(0), 0),
            boxes.index_axis(Axis(0), 0),
            img_width,
            img_height,
            self.confidence_threshold,
            &self.label_map,
        )
    }
}

impl ObjectDetector for DetrModel {
    fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<Detection>> {
        self.predict(img)
    }
}

/// Size an image is resized to before inference: the shorter edge becomes
/// [`DetrModel::SHORTEST_EDGE`] unless that would push the longer edge past
/// [`DetrModel::LONGEST_EDGE`].
pub fn resize_dimensions(width: u32, height: u32) -> (u32, u32) {
    let (w, h) = (width as f64, height as f64);
    let (min_orig, max_orig) = (w.min(h), w.max(h));

    let mut size = DetrModel::SHORTEST_EDGE as f64;
    if max_orig / min_orig * size > DetrModel::LONGEST_EDGE as f64 {
        size = (DetrModel::LONGEST_EDGE as f64 * min_orig / max_orig).round();
    }

    if (h <= w && h == size) || (w <= h && w == size) {
        return (width, height);
    }

    if width < height {
        (size as u32, (size * h / w) as u32)
    } else {
        ((size * w / h) as u32, size as u32)
    }
}

/// Turn raw DETR outputs for one image into detections.
///
/// `logits` is `[queries, classes + 1]` with the trailing column being the
/// "no object" class; `boxes` is `[queries, 4]` in normalised
/// `(cx, cy, w, h)`. Boxes are scaled to the original image size and only
/// scores strictly above `threshold` are kept, in query order.
pub fn postprocess_predictions(
    logits: ArrayView2<f32>,
    boxes: ArrayView2<f32>,
    img_width: u32,
    img_height: u32,
    threshold: f32,
    label_map: &[(i64, String)],
) -> Result<Vec<Detection>> {
    if boxes.ncols() != 4 || boxes.nrows() != logits.nrows() {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
    }

    let (img_width, img_height) = (img_width as f32, img_height as f32);
    let mut detections = vec![];

    for (query_logits, bbox) in logits.outer_iter().zip(boxes.outer_iter()) {
        let max_logit = query_logits
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let exp = query_logits.mapv(|l| (l - max_logit).exp());
        let total = exp.sum();

        let classes = exp.len().saturating_sub(1);
        let Some((class_id, score)) = exp
            .iter()
            .take(classes)
            .map(|e| e / total)
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, max)) if max >= p => best,
                _ => Some((i, p)),
            })
        else {
            continue;
        };

        if score <= threshold {
            continue;
        }

        let class_id = class_id as i64;
        let label = &label_map
            .iter()
            .find(|(l_i, _)| *l_i == class_id)
            .ok_or(Error::UnknownLabel(class_id))?
            .1;

        let [cx, cy, w, h] = vec_to_bbox(bbox.iter().copied().collect());
        detections.push(Detection::new(
            (cx - 0.5 * w) * img_width,
            (cy - 0.5 * h) * img_height,
            (cx + 0.5 * w) * img_width,
            (cy + 0.5 * h) * img_height,
            label,
            score,
        ));
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn labels() -> Vec<(i64, String)> {
        DetrPretrainedModels::ResNet50.label_map()
    }

    #[test]
    fn coco_label_map() {
        let map = labels();
        assert_eq!(map.len(), 91);
        assert_eq!(map[1].1, "person");
        assert_eq!(map[17].1, "cat");
        assert_eq!(map[18].1, "dog");
        assert_eq!(map[67].1, "dining table");
        assert_eq!(map[90].1, "toothbrush");
    }

    #[test]
    fn resize_keeps_shortest_edge_at_800() {
        assert_eq!(resize_dimensions(640, 480), (1066, 800));
        assert_eq!(resize_dimensions(480, 640), (800, 1066));
        assert_eq!(resize_dimensions(800, 1000), (800, 1000));
    }

    #[test]
    fn resize_caps_longest_edge() {
        // 4:1 panorama: 800 * 4 > 1333, so the short edge shrinks.
        assert_eq!(resize_dimensions(4000, 1000), (1332, 333));
    }

    #[test]
    fn keeps_confident_queries_only() {
        // three classes + "no object"; class 2 is "bicycle"
        let logits = array![
            [0.0_f32, 0.0, 12.0, 0.0],
            [0.0, 0.0, 1.0, 5.0],
            [0.0, 0.0, 0.0, 0.0],
        ];
        let boxes = array![
            [0.5_f32, 0.5, 0.5, 0.25],
            [0.1, 0.1, 0.1, 0.1],
            [0.2, 0.2, 0.1, 0.1],
        ];

        let dets =
            postprocess_predictions(logits.view(), boxes.view(), 200, 100, 0.9, &labels()).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "bicycle");
        assert!(dets[0].confidence > 0.99);
        assert_eq!(dets[0].corners(), [50.0, 37.5, 150.0, 62.5]);
    }

    #[test]
    fn no_object_class_never_wins() {
        let logits = array![[0.0_f32, 0.0, 0.0, 30.0]];
        let boxes = array![[0.5_f32, 0.5, 1.0, 1.0]];

        let dets =
            postprocess_predictions(logits.view(), boxes.view(), 10, 10, 0.0, &labels()).unwrap();

        assert_eq!(dets.len(), 1);
        assert!(dets[0].confidence < 0.01);
    }

    #[test]
    fn threshold_is_strict() {
        // two classes + "no object", uniform softmax gives exactly 1/3
        let logits = array![[0.0_f32, 0.0, 0.0]];
        let boxes = array![[0.5_f32, 0.5, 1.0, 1.0]];
        let score = 1.0_f32 / 3.0;

        let dets =
            postprocess_predictions(logits.view(), boxes.view(), 10, 10, score, &labels()).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn mismatched_outputs_are_rejected() {
        let logits = array![[0.0_f32, 20.0, 0.0]];
        let boxes = array![[0.5_f32, 0.5, 1.0]];

        let err =
            postprocess_predictions(logits.view(), boxes.view(), 10, 10, 0.5, &labels()).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn unknown_label_is_an_error() {
        let logits = array![[0.0_f32, 20.0, 0.0]];
        let boxes = array![[0.5_f32, 0.5, 1.0, 1.0]];
        let map = vec![(0, "only".to_string())];

        let err =
            postprocess_predictions(logits.view(), boxes.view(), 10, 10, 0.5, &map).unwrap_err();
        assert!(matches!(err, Error::UnknownLabel(1)));
    }
}
