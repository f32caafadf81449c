mod outcome;
mod packager;
mod pipeline;
mod score;

pub use outcome::SubmissionOutcome;
pub use packager::{SourceBundler, SourceFile, source_files};
pub use pipeline::{PipelineSettings, SubmissionPipeline};
pub use score::{CommandTestRunner, ConfiguredScore, FixedScore, Score, TestRunScore};
