use threatwatch_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use threatwatch_core::detection::domain::detection::Detection;
use threatwatch_core::detection::domain::object_detector::ObjectDetector;
use threatwatch_core::pipeline::frame_pipeline::FramePipeline;
use threatwatch_core::shared::bounding_box::BoundingBox;
use threatwatch_core::shared::frame::Frame;
use threatwatch_core::threat::domain::threat_policy::ThreatPolicy;

struct FixedDetector(Vec<Detection>);

impl ObjectDetector for FixedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self.0.clone())
    }
}

fn pipeline_with(detections: Vec<Detection>) -> FramePipeline {
    FramePipeline::new(
        Box::new(FixedDetector(detections)),
        Box::new(OverlayAnnotator::default()),
        ThreatPolicy::default(),
    )
}

/// Pipeline whose detector never finds anything.
pub fn empty_pipeline() -> FramePipeline {
    pipeline_with(Vec::new())
}

/// Person holding a gun, as in the reference scene.
pub fn scenario_pipeline() -> FramePipeline {
    pipeline_with(vec![
        Detection::new(BoundingBox::new(100, 100, 200, 300), 1, 0.8),
        Detection::new(BoundingBox::new(190, 150, 250, 200), 0, 0.9),
    ])
}
