pub mod batch_fetch;
pub mod fetch_content;

pub use batch_fetch::{BATCH_FETCH_TASK, BatchFetchPayload, BatchFetchTask, BatchOutcome};
pub use fetch_content::{FETCH_CONTENT_TASK, FetchContentPayload, FetchContentTask, fetch_and_store};
