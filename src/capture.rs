//! Running tshark and feeding its output into the metric sink.

pub mod session;
pub mod stream_reader;
pub mod supervisor;
pub mod temp_files;
pub mod tool;

pub use session::CaptureSession;
pub use supervisor::{CaptureSupervisor, SupervisorState};
pub use temp_files::TempArtifactCleaner;
pub use tool::CaptureTool;
