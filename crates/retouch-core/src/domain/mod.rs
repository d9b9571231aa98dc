//! Domain model: ids, status, task records, payloads, timeout policy, errors.

pub mod errors;
pub mod ids;
pub mod payload;
pub mod state;
pub mod task;
pub mod timeout;

pub use self::errors::CoreError;
pub use self::ids::{ParseTaskIdError, TaskId};
pub use self::payload::ImagePayload;
pub use self::state::TaskStatus;
pub use self::task::{TaskOutcome, TaskRecord};
pub use self::timeout::{megapixels, timeout_for};
