//! The QUEST node — the deterministic single-writer execution environment
//! the protocol engines run inside.
//!
//! Every public entry point executes as an indivisible unit against shared
//! state: the node holds each engine behind an async mutex and acquires
//! the locks an operation needs for its full duration, releasing them on
//! every exit path. The only genuinely asynchronous boundary is proof
//! dispatch to external verifiers, which is fire-and-forget.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{Node, VerdictOutcome, VerifierHandle};
