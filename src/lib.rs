pub mod batch;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalate;
pub mod increase;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod request;
pub mod select;
pub mod tier;
pub mod trial;
pub mod util;

pub use cancel::{CancelToken, RunControl};
pub use error::{EngineError, Result};
pub use orchestrator::{CompressionResult, Orchestrator};
pub use request::{CompressionRequest, Mode};
pub use tier::{Strategy, Tier};
