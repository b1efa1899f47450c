/// Multi-class YOLO detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, class-aware NMS and mapping
/// boxes back to frame coordinates. No class or threshold filtering beyond
/// the model's standard post-processing happens here.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::{preferred_device_name, preferred_execution_providers};
use super::math::{bbox_iou, clip_bbox};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Minimum class score for a prediction to survive post-processing.
pub const DEFAULT_MIN_SCORE: f32 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.7;

/// Upper bound on detections returned per frame.
const MAX_DETECTIONS: usize = 300;

/// Values before the per-class scores in each prediction row: cx, cy, w, h.
const BOX_VALUES: usize = 4;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    min_score: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, min_score: f32) -> Result<Self, Box<dyn std::error::Error>> {
        log::info!(
            "Loading detection model {} (preferred device: {})",
            model_path.display(),
            preferred_device_name()
        );
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        // NCHW: [1, 3, H, W]
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("Model input size: {input_size}");

        Ok(Self {
            session,
            min_score,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let fw = frame.width() as f64;
        let fh = frame.height() as f64;

        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let layout = OutputLayout::from_shape(&shape)?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        // 3. Parse, 4. NMS
        let mut raw_dets = parse_predictions(data, layout, self.min_score);
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH, MAX_DETECTIONS);

        // 5. Back to frame coordinates
        Ok(kept
            .into_iter()
            .map(|d| {
                let unpadded = [
                    (d.bbox[0] - pad_x as f64) / scale,
                    (d.bbox[1] - pad_y as f64) / scale,
                    (d.bbox[2] - pad_x as f64) / scale,
                    (d.bbox[3] - pad_y as f64) / scale,
                ];
                let [x1, y1, x2, y2] = clip_bbox(unpadded, fw, fh);
                Detection::new(BoundingBox::from_f64(x1, y1, x2, y2), d.class_id, d.score)
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

/// Memory layout of the `[1, a, b]` prediction tensor.
///
/// Exports are usually `[1, features, predictions]`; some tools transpose
/// them to `[1, predictions, features]`. Handle both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OutputLayout {
    num_preds: usize,
    num_feats: usize,
    transposed: bool,
}

impl OutputLayout {
    fn from_shape(shape: &[usize]) -> Result<Self, Box<dyn std::error::Error>> {
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let layout = if shape[1] < shape[2] {
            Self {
                num_preds: shape[2],
                num_feats: shape[1],
                transposed: true,
            }
        } else {
            Self {
                num_preds: shape[1],
                num_feats: shape[2],
                transposed: false,
            }
        };
        if layout.num_feats <= BOX_VALUES {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }
        Ok(layout)
    }

    fn value(&self, data: &[f32], pred: usize, feat: usize) -> f32 {
        if self.transposed {
            data[feat * self.num_preds + pred]
        } else {
            data[pred * self.num_feats + feat]
        }
    }
}

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: [f64; 4],
    class_id: usize,
    score: f32,
}

/// Turn each prediction row `[cx, cy, w, h, score_0, score_1, ...]` into a
/// corner-format box with its best class, dropping rows below `min_score`.
fn parse_predictions(data: &[f32], layout: OutputLayout, min_score: f32) -> Vec<RawDetection> {
    let mut dets = Vec::new();
    for i in 0..layout.num_preds {
        let (class_id, score) = (BOX_VALUES..layout.num_feats)
            .map(|f| (f - BOX_VALUES, layout.value(data, i, f)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < min_score {
            continue;
        }

        let cx = layout.value(data, i, 0) as f64;
        let cy = layout.value(data, i, 1) as f64;
        let w = layout.value(data, i, 2) as f64;
        let h = layout.value(data, i, 3) as f64;

        dets.push(RawDetection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            class_id,
            score,
        });
    }
    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy class-aware NMS: sort by score descending, suppress overlapping
/// boxes of the same class, keep at most `max_dets`.
fn nms(dets: &mut [RawDetection], iou_thresh: f64, max_dets: usize) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        if keep.len() == max_dets {
            break;
        }
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if bbox_iou(&dets[i].bbox, &dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(bbox: [f64; 4], class_id: usize, score: f32) -> RawDetection {
        RawDetection {
            bbox,
            class_id,
            score,
        }
    }

    #[test]
    fn test_letterbox_square_frame_has_no_padding() {
        let frame = Frame::new(vec![128u8; 640 * 640 * 3], 640, 640, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(scale, 1.0);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 0);
    }

    #[test]
    fn test_letterbox_wide_frame_pads_vertically() {
        // 200x100 → scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![255u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_relative_eq!(scale, 3.2, epsilon = 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
        assert_relative_eq!(tensor[[0, 0, 161, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_layout_detects_transposed_export() {
        let layout = OutputLayout::from_shape(&[1, 6, 8400]).unwrap();
        assert_eq!(
            layout,
            OutputLayout {
                num_preds: 8400,
                num_feats: 6,
                transposed: true
            }
        );
        let layout = OutputLayout::from_shape(&[1, 8400, 6]).unwrap();
        assert!(!layout.transposed);
    }

    #[test]
    fn test_layout_rejects_bad_shapes() {
        assert!(OutputLayout::from_shape(&[8400, 6]).is_err());
        assert!(OutputLayout::from_shape(&[1, 4, 8400]).is_err());
    }

    #[test]
    fn test_parse_predictions_transposed() {
        // Two predictions, features-major: rows are cx, cy, w, h, gun, person
        let data = vec![
            100.0, 300.0, // cx
            100.0, 300.0, // cy
            20.0, 40.0, // w
            10.0, 80.0, // h
            0.9, 0.1, // gun
            0.05, 0.8, // person
        ];
        let layout = OutputLayout {
            num_preds: 2,
            num_feats: 6,
            transposed: true,
        };
        let dets = parse_predictions(&data, layout, 0.25);

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_relative_eq!(dets[0].score, 0.9);
        assert_eq!(dets[0].bbox, [90.0, 95.0, 110.0, 105.0]);
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[1].bbox, [280.0, 260.0, 320.0, 340.0]);
    }

    #[test]
    fn test_parse_predictions_full_size_export() {
        // [1, 6, 8400] with a single live prediction at index 42
        const PREDS: usize = 8400;
        let mut data = vec![0.0f32; 6 * PREDS];
        for (feat, value) in [320.0, 240.0, 40.0, 60.0, 0.1, 0.85].into_iter().enumerate() {
            data[feat * PREDS + 42] = value;
        }
        let layout = OutputLayout::from_shape(&[1, 6, PREDS]).unwrap();
        let dets = parse_predictions(&data, layout, 0.25);

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_relative_eq!(dets[0].score, 0.85);
        assert_eq!(dets[0].bbox, [300.0, 210.0, 340.0, 270.0]);
    }

    #[test]
    fn test_parse_predictions_keeps_unknown_classes() {
        // Three-class export: best score is class 2, which has no label
        let data = vec![50.0, 50.0, 10.0, 10.0, 0.1, 0.2, 0.7];
        let layout = OutputLayout {
            num_preds: 1,
            num_feats: 7,
            transposed: false,
        };
        let dets = parse_predictions(&data, layout, 0.25);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 2);
    }

    #[test]
    fn test_parse_predictions_drops_low_scores() {
        let data = vec![50.0, 50.0, 10.0, 10.0, 0.1, 0.2];
        let layout = OutputLayout {
            num_preds: 1,
            num_feats: 6,
            transposed: false,
        };
        assert!(parse_predictions(&data, layout, 0.25).is_empty());
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0, 0.9),
            raw([2.0, 2.0, 102.0, 102.0], 0, 0.8),
        ];
        let kept = nms(&mut dets, 0.7, 300);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_boxes_of_different_classes() {
        // A gun held in front of a person overlaps heavily; both must survive
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 1, 0.9),
            raw([1.0, 1.0, 101.0, 101.0], 0, 0.8),
        ];
        let kept = nms(&mut dets, 0.7, 300);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_orders_by_score() {
        let mut dets = vec![
            raw([0.0, 0.0, 10.0, 10.0], 0, 0.3),
            raw([50.0, 50.0, 60.0, 60.0], 1, 0.95),
        ];
        let kept = nms(&mut dets, 0.7, 300);
        assert_relative_eq!(kept[0].score, 0.95);
        assert_relative_eq!(kept[1].score, 0.3);
    }

    #[test]
    fn test_nms_caps_detections() {
        let mut dets: Vec<RawDetection> = (0..10)
            .map(|i| {
                let x = i as f64 * 100.0;
                raw([x, 0.0, x + 10.0, 10.0], 0, 0.5)
            })
            .collect();
        assert_eq!(nms(&mut dets, 0.7, 3).len(), 3);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        assert!(nms(&mut dets, 0.7, 300).is_empty());
    }
}
