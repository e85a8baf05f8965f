pub mod console;
pub mod file;
pub mod remote;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use remote::{AuditRpcTransport, LogEventBatchResult, RemoteSink};
