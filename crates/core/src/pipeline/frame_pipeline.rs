use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::FRAME_SIZE;
use crate::shared::frame::Frame;
use crate::threat::domain::detection_classifier::classify;
use crate::threat::domain::proximity_judge::ProximityJudge;
use crate::threat::domain::threat_policy::ThreatPolicy;

use super::pipeline_logger::PipelineLogger;
use super::processing_error::ProcessingError;

/// What the pipeline found in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub index: usize,
    pub persons: usize,
    /// Guns above the confidence threshold.
    pub weapons: usize,
    /// Highlights drawn; a person near two weapons counts twice unless deduped.
    pub threats: usize,
    /// Detections with a class index outside the model's class list.
    pub ignored: usize,
}

#[derive(Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub report: FrameReport,
}

/// Resize → detect → classify → judge → annotate, for one frame at a time.
///
/// Owns the loaded detector, so it is built once and reused for every frame
/// of every run.
pub struct FramePipeline {
    detector: Box<dyn ObjectDetector>,
    annotator: Box<dyn FrameAnnotator>,
    policy: ThreatPolicy,
}

impl FramePipeline {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        annotator: Box<dyn FrameAnnotator>,
        policy: ThreatPolicy,
    ) -> Self {
        Self {
            detector,
            annotator,
            policy,
        }
    }

    pub fn policy(&self) -> &ThreatPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: ThreatPolicy) {
        self.policy = policy;
    }

    pub fn set_annotator(&mut self, annotator: Box<dyn FrameAnnotator>) {
        self.annotator = annotator;
    }

    pub fn process(
        &mut self,
        frame: Frame,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedFrame, ProcessingError> {
        let index = frame.index();

        let t0 = Instant::now();
        let mut frame = frame
            .resized(FRAME_SIZE, FRAME_SIZE)
            .map_err(|source| ProcessingError::Decode { source })?;
        logger.timing("resize", t0.elapsed().as_secs_f64() * 1000.0);

        let t0 = Instant::now();
        let detections = self
            .detector
            .detect(&frame)
            .map_err(|source| ProcessingError::Inference { index, source })?;
        logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        let classified = classify(&detections, self.policy.weapon_confidence);
        let judge = ProximityJudge::new(self.policy.extension);
        let threats =
            judge.find_threats(&classified.persons, &classified.weapons, self.policy.dedupe);

        let t0 = Instant::now();
        for person in &threats {
            self.annotator
                .annotate(&mut frame, person)
                .map_err(|source| ProcessingError::Annotation { index, source })?;
        }
        logger.timing("annotate", t0.elapsed().as_secs_f64() * 1000.0);

        let report = FrameReport {
            index,
            persons: classified.persons.len(),
            weapons: classified.weapons.len(),
            threats: threats.len(),
            ignored: classified.ignored,
        };
        logger.metric("threats", report.threats as f64);
        if report.threats > 0 {
            log::debug!(
                "Frame {index}: {} threat(s) among {} person(s) and {} weapon(s)",
                report.threats,
                report.persons,
                report.weapons
            );
        }

        Ok(ProcessedFrame { frame, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
    use crate::detection::domain::detection::Detection;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::pipeline::test_support::{
        gray_frame, gray_frame_at, FailingDetector, RecordingAnnotator, StubDetector,
    };
    use crate::shared::bounding_box::BoundingBox;
    use rstest::rstest;

    const PERSON: BoundingBox = BoundingBox::new(100, 100, 200, 300);
    const NEAR_GUN: BoundingBox = BoundingBox::new(190, 150, 250, 200);
    const FAR_GUN: BoundingBox = BoundingBox::new(400, 400, 450, 450);

    fn person() -> Detection {
        Detection::new(PERSON, 1, 0.8)
    }

    fn gun(bbox: BoundingBox, confidence: f32) -> Detection {
        Detection::new(bbox, 0, confidence)
    }

    fn pipeline_with(detections: Vec<Detection>) -> (FramePipeline, RecordingAnnotator) {
        let annotator = RecordingAnnotator::new();
        let pipeline = FramePipeline::new(
            Box::new(StubDetector::new(detections)),
            Box::new(annotator.clone()),
            ThreatPolicy::default(),
        );
        (pipeline, annotator)
    }

    #[rstest]
    #[case::weapon_in_hand(vec![person(), gun(NEAR_GUN, 0.9)], 1)]
    #[case::distant_weapon(vec![person(), gun(FAR_GUN, 0.9)], 0)]
    #[case::low_confidence_overlapping(vec![person(), gun(NEAR_GUN, 0.3)], 0)]
    #[case::threshold_excluded(vec![person(), gun(NEAR_GUN, 0.4)], 0)]
    #[case::just_above_threshold(vec![person(), gun(NEAR_GUN, 0.41)], 1)]
    #[case::weapon_only(vec![gun(NEAR_GUN, 0.9)], 0)]
    #[case::nothing(vec![], 0)]
    fn test_threat_scenarios(#[case] detections: Vec<Detection>, #[case] expected: usize) {
        let (mut pipeline, annotator) = pipeline_with(detections);
        let out = pipeline
            .process(gray_frame(640, 640, 0), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(out.report.threats, expected);
        assert_eq!(annotator.calls().len(), expected);
        if expected > 0 {
            assert_eq!(annotator.calls()[0], PERSON);
        }
    }

    #[test]
    fn test_person_near_two_weapons_is_annotated_twice() {
        let second = gun(BoundingBox::new(90, 90, 110, 110), 0.9);
        let (mut pipeline, annotator) = pipeline_with(vec![person(), gun(NEAR_GUN, 0.9), second]);
        pipeline
            .process(gray_frame(640, 640, 0), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(annotator.calls(), vec![PERSON, PERSON]);
    }

    #[test]
    fn test_dedupe_annotates_person_once() {
        let second = gun(BoundingBox::new(90, 90, 110, 110), 0.9);
        let (mut pipeline, annotator) = pipeline_with(vec![person(), gun(NEAR_GUN, 0.9), second]);
        pipeline.set_policy(ThreatPolicy {
            dedupe: true,
            ..Default::default()
        });
        let out = pipeline
            .process(gray_frame(640, 640, 0), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(out.report.threats, 1);
        assert_eq!(annotator.calls(), vec![PERSON]);
    }

    #[test]
    fn test_report_counts() {
        let unknown = Detection::new(BoundingBox::new(0, 0, 5, 5), 5, 0.9);
        let (mut pipeline, _) =
            pipeline_with(vec![person(), gun(NEAR_GUN, 0.9), gun(FAR_GUN, 0.2), unknown]);
        let out = pipeline
            .process(gray_frame_at(640, 640, 0, 4), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(
            out.report,
            FrameReport {
                index: 4,
                persons: 1,
                weapons: 1,
                threats: 1,
                ignored: 1,
            }
        );
    }

    #[rstest]
    #[case(1280, 720)]
    #[case(320, 240)]
    #[case(640, 640)]
    #[case(100, 900)]
    fn test_output_is_always_frame_size(#[case] width: u32, #[case] height: u32) {
        let (mut pipeline, _) = pipeline_with(vec![]);
        let out = pipeline
            .process(gray_frame(width, height, 30), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!((out.frame.width(), out.frame.height()), (640, 640));
    }

    #[test]
    fn test_no_threats_leaves_frame_untouched() {
        let (mut pipeline, _) = pipeline_with(vec![person(), gun(FAR_GUN, 0.9)]);
        let input = gray_frame(640, 640, 77);
        let out = pipeline.process(input.clone(), &mut NullPipelineLogger).unwrap();
        assert_eq!(out.frame, input);
    }

    #[test]
    fn test_second_pass_without_detections_is_identity() {
        let mut first = FramePipeline::new(
            Box::new(StubDetector::new(vec![person(), gun(NEAR_GUN, 0.9)])),
            Box::new(OverlayAnnotator::default()),
            ThreatPolicy::default(),
        );
        let annotated = first
            .process(gray_frame(640, 640, 10), &mut NullPipelineLogger)
            .unwrap()
            .frame;

        let mut second = FramePipeline::new(
            Box::new(StubDetector::new(vec![])),
            Box::new(OverlayAnnotator::default()),
            ThreatPolicy::default(),
        );
        let again = second
            .process(annotated.clone(), &mut NullPipelineLogger)
            .unwrap()
            .frame;
        assert_eq!(again, annotated);
    }

    #[test]
    fn test_detector_failure_is_inference_error() {
        let mut pipeline = FramePipeline::new(
            Box::new(FailingDetector),
            Box::new(RecordingAnnotator::new()),
            ThreatPolicy::default(),
        );
        let err = pipeline
            .process(gray_frame_at(640, 640, 0, 3), &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Inference { index: 3, .. }));
    }

    #[test]
    fn test_stage_timings_and_metric_are_logged() {
        let (mut pipeline, _) = pipeline_with(vec![person(), gun(NEAR_GUN, 0.9)]);
        let mut logger = StdoutPipelineLogger::new(10);
        pipeline.process(gray_frame(320, 240, 0), &mut logger).unwrap();

        for stage in ["resize", "detect", "annotate"] {
            assert_eq!(logger.timings_for(stage).map(|t| t.len()), Some(1), "{stage}");
        }
        assert_eq!(logger.metrics_for("threats").unwrap(), &[1.0]);
    }
}
