//! Evaluation of the pig tracker against ground-truth annotations.
//!
//! [`Evaluator`] runs a [`pigtrack::Model`] over a video and scores every annotated object,
//! [`extract_scores`] normalises the scores against the predicted paths,
//! [`print_path_comparison`] renders one object's comparison and [`ResultsDir`] persists a run.

pub mod annotation;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod onnx;
pub mod path;
pub mod persistence;
pub mod pipeline;
pub mod report;
pub mod scores;
pub mod utils;
pub mod video;

pub use annotation::Annotations;
pub use config::{EvaluationConfig, EvaluationMode, TrackerKind};
pub use error::{Error, Result};
pub use evaluator::{EvaluationResult, Evaluator};
pub use path::{aligned_annotation, ObjectPath, Paths, Point};
pub use persistence::ResultsDir;
pub use report::{print_path_comparison, write_reports};
pub use scores::{extract_scores, FrameOutcome, Intervals, ObjectScore, PartScore, Scores};
pub use video::Video;
