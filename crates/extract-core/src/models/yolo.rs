//! YOLO-style detector exported to ONNX
//!
//! Input: letterboxed `(1, 3, S, S)` RGB tensor scaled to [0, 1].
//! Output: `(1, 4 + nc, anchors)`, first four features are the box centre and
//! size in letterbox pixels, the rest are per-class scores.

use image::{imageops, Rgb, RgbImage};
use micrograph_common::{BoundingBox, Detection, RasterImage};
use ndarray::{Array, Array4};
use ort::{session::Session, value::TensorRef};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{Detector, DetectorKind};
use crate::config::DetectorParams;
use crate::error::ModelError;

const LETTERBOX_FILL: u8 = 114;

/// Mapping between source pixels and letterbox pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a letterbox-space box back to source-image pixels
    #[must_use]
    pub fn unmap(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x1 - self.pad_x) / self.scale,
            (bbox.y1 - self.pad_y) / self.scale,
            (bbox.x2 - self.pad_x) / self.scale,
            (bbox.y2 - self.pad_y) / self.scale,
        )
    }
}

/// Resize keeping the aspect ratio and pad to a centred `size` x `size` square
#[must_use]
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);

    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);

    let dw = (size - new_width) as f32 / 2.0;
    let dh = (size - new_height) as f32 / 2.0;
    let left = (dw - 0.1).round().max(0.0);
    let top = (dh - 0.1).round().max(0.0);

    let resized = if (new_width, new_height) == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, new_width, new_height, imageops::FilterType::Triangle)
    };

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    imageops::replace(&mut canvas, &resized, i64::from(left as u32), i64::from(top as u32));

    (
        canvas,
        Letterbox {
            scale,
            pad_x: left,
            pad_y: top,
        },
    )
}

/// Convert to CHW format and normalize to [0, 1]
fn to_input_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut input_array = Array::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input_array[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
        input_array[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
        input_array[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
    }

    input_array
}

/// Decode raw detector output into source-image detections.
///
/// Applies the confidence floor, class-aware NMS and the detection cap.
/// Result is sorted by descending score.
pub fn decode_predictions(
    dims: &[usize],
    data: &[f32],
    params: &DetectorParams,
    letterbox: &Letterbox,
) -> Result<Vec<Detection>, ModelError> {
    if dims.len() != 3 {
        return Err(ModelError::InvalidOutput(format!(
            "Expected 3D output tensor, got {}D",
            dims.len()
        )));
    }
    let num_features = dims[1];
    let num_anchors = dims[2];
    if num_features < 5 {
        return Err(ModelError::InvalidOutput(format!(
            "Expected at least 5 features per anchor, got {num_features}"
        )));
    }
    if data.len() < num_features * num_anchors {
        return Err(ModelError::InvalidOutput(format!(
            "Output holds {} values, shape {:?} needs {}",
            data.len(),
            dims,
            num_features * num_anchors
        )));
    }
    let num_classes = num_features - 4;

    // Layout [batch, features, anchors]: feature f of anchor i is at f * anchors + i
    let mut raw = Vec::new();
    for anchor in 0..num_anchors {
        let feature = |f: usize| data[f * num_anchors + anchor];

        let mut best_score = f32::NEG_INFINITY;
        let mut best_class = 0usize;
        for class_id in 0..num_classes {
            let score = feature(4 + class_id);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if best_score <= params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(feature(0), feature(1), feature(2), feature(3));
        raw.push(Detection::new(
            letterbox.unmap(bbox),
            best_score,
            best_class as u32,
        ));
    }

    debug!("Raw detections before NMS: {}", raw.len());

    let mut detections = apply_nms(raw, params.iou_threshold);
    detections.truncate(params.max_detections);
    Ok(detections)
}

/// Class-aware non-maximum suppression, keeps descending score order
fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Detector backed by an ONNX session
pub struct YoloDetector {
    kind: DetectorKind,
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    params: DetectorParams,
}

impl YoloDetector {
    #[must_use]
    pub fn new(kind: DetectorKind, session: Session, params: DetectorParams) -> Self {
        Self {
            kind,
            session: Mutex::new(session),
            params,
        }
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &RasterImage) -> Result<Vec<Detection>, ModelError> {
        if !image.is_color() {
            warn!(
                "{} detector received a {}-channel image, expanding to RGB",
                self.kind,
                image.channels()
            );
        }

        let (canvas, mapping) = letterbox(&image.to_rgb_image(), self.params.input_size);
        let input = to_input_tensor(&canvas);
        let input_tensor = TensorRef::from_array_view(input.view())?;

        let mut session = self.session.lock().map_err(|e| {
            ModelError::Inference(format!("Failed to lock {} session: {e}", self.kind))
        })?;
        let outputs = session.run(ort::inputs![input_tensor])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        let detections = decode_predictions(&dims, data, &self.params, &mapping)?;
        debug!(
            "{} detector: {} detections on {}x{} image",
            self.kind,
            detections.len(),
            image.width(),
            image.height()
        );
        Ok(detections)
    }
}
