pub mod audio {
    pub mod domain {
        pub mod audio_reader;
        pub mod audio_segment;
        pub mod feature_extractor;
        pub mod onset_segmenter;
        pub mod window;
    }
    pub mod infrastructure {
        pub mod ffmpeg_audio_reader;
        pub mod spectral_feature_extractor;
    }
}

pub mod recognition {
    pub mod domain {
        pub mod acoustic_model;
        pub mod alphabet_classifier;
        pub mod classification;
        pub mod phoneme;
        pub mod probability_matrix;
        pub mod recognition_result;
        pub mod rule;
        pub mod rule_table;
        pub mod sequence_decoder;
    }
    pub mod infrastructure {
        pub mod execution_provider;
        pub mod model_cell;
        pub mod onnx_acoustic_model;
    }
}

pub mod pipeline {
    pub mod batch_executor;
    pub mod pipeline_logger;
    pub mod recognize_letter_use_case;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}

pub mod shared {
    pub mod constants;
    pub mod model_resolver;
}
