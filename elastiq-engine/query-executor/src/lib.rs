#[macro_use]
extern crate tracing;

mod error;
mod executor;
mod http;
mod memory;
pub mod request;
pub mod response;
mod results;
mod transcoder;
mod transport;

pub use error::ExecutionError;
pub use executor::{ExecutorConfig, QueryExecutor};
pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use results::{ExecutionResult, GroupKey, Grouping};
pub use transcoder::{SerdeTranscoder, Transcoder};
pub use transport::Transport;
