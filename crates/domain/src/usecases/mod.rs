//! Application use cases / business logic

pub mod activity;
pub mod command;
pub mod compose;
pub mod merge;
pub mod resolve;
pub mod responders;
pub mod scheduler;
pub mod split;

#[cfg(test)]
pub(crate) mod testing;

pub use activity::{ActivityPipeline, PipelineConfig, Services};
pub use command::{parse_directive, resolve_language};
pub use compose::{ComposedReply, apology_key, compose_reply};
pub use merge::merge_responses;
pub use resolve::MediaResolver;
pub use responders::{GeneratedResponses, Responders};
pub use scheduler::{ActivityScheduler, JobHandler, SchedulerConfig};
pub use split::split_message;
