//! Run orchestration: connect, discover tools, exercise each one with
//! the judging agent, and assemble the final report.

mod execution;
mod prompt;

pub use execution::{run_http, run_with_session, RunnerOptions};
