pub mod about;
pub mod collection_date;
pub mod config;
pub mod cut_points;
pub mod error;
pub mod open_reading_frame;
pub mod output;
pub mod passage;
pub mod pipeline;
pub mod sampler;
pub mod sequence_record;
pub mod timeline;

pub use error::{ErrorCode, PipelineError};
pub use pipeline::Pipeline;
