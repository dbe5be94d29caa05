pub mod cli;
pub mod message;
pub mod pipeline;

pub use cli::{CliIngress, CliInput};
pub use message::{CompositeUnit, InboundMessage, MERGE_SEPARATOR};
pub use pipeline::{QueuePipeline, ReplyPipeline};
