//! Work-execution engine: dispatch, per-job execution, ordered output.

pub mod dispatch;
pub mod responder;
pub mod work_unit;

pub use dispatch::Dispatcher;
pub use responder::Responder;
pub use work_unit::{DefaultApiWorker, WorkHandler, WorkUnit};
