//! Flags people standing near firearms in videos and images.
//!
//! Each bounded context keeps its pure types and traits under `domain` and
//! its library-backed implementations under `infrastructure`.

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod threat {
    pub mod domain {
        pub mod detection_classifier;
        pub mod proximity_judge;
        pub mod threat_policy;
    }
}

pub mod annotation {
    pub mod domain {
        pub mod frame_annotator;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detect_threats_in_image_use_case;
    pub mod detect_threats_in_video_use_case;
    pub mod frame_pipeline;
    pub mod infrastructure;
    pub mod pipeline_executor;
    pub mod pipeline_logger;
    pub mod processing_error;
    #[cfg(test)]
    pub(crate) mod test_support;
}
