use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingInterface,
    BadInterfaceName(String),
    ListenPortsEmpty,
    BadPort(String),
    NotInRange(String),
    DirectoryDoesNotExist(String),
    BadIPFormatting(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingInterface => write!(f, "No capture interface configured"),
            ConfigError::BadInterfaceName(e) => write!(f, "Interface name error: {}", e),
            ConfigError::ListenPortsEmpty => write!(f, "At least one listen port is required"),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Reasons a TZSP buffer could not be decoded.
///
/// These are per-record failures: the caller logs them and moves on to the
/// next record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnsupportedVersion(u8),
    UnsupportedType(u8),
    UnsupportedProtocol(u16),
    /// A read needed more bytes than the buffer holds.
    Truncated { needed: usize, available: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedVersion(v) => write!(f, "Unsupported TZSP version: {}", v),
            DecodeError::UnsupportedType(t) => write!(f, "Unsupported TZSP packet type: {}", t),
            DecodeError::UnsupportedProtocol(p) => {
                write!(f, "Unsupported TZSP encapsulated protocol: {}", p)
            }
            DecodeError::Truncated { needed, available } => write!(
                f,
                "Truncated packet: needed {} bytes but only {} available",
                needed, available
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    MalformedRecord(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MalformedRecord(e) => write!(f, "Malformed record: {}", e),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Debug)]
pub enum MetricsError {
    RegistrationFailed(prometheus::Error),
    EncodeFailed(prometheus::Error),
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::RegistrationFailed(e) => write!(f, "Metric registration failed: {}", e),
            MetricsError::EncodeFailed(e) => write!(f, "Metric encoding failed: {}", e),
        }
    }
}

impl std::error::Error for MetricsError {}

#[derive(Debug)]
pub enum CaptureError {
    /// The capture tool is missing or reports a version we do not understand.
    EnvironmentError(String),
    SpawnFailed(std::io::Error),
    StreamError(std::io::Error),
    ReaderFailed(String),
    ToolFailed(Option<i32>),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::EnvironmentError(e) => write!(f, "Capture environment error: {}", e),
            CaptureError::SpawnFailed(e) => write!(f, "Failed to start capture tool: {}", e),
            CaptureError::StreamError(e) => write!(f, "Capture stream error: {}", e),
            CaptureError::ReaderFailed(e) => write!(f, "Capture reader failed: {}", e),
            CaptureError::ToolFailed(Some(code)) => {
                write!(f, "Capture tool exited with code {}", code)
            }
            CaptureError::ToolFailed(None) => write!(f, "Capture tool terminated by a signal"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum ControllerError {
    CaptureError(CaptureError),
    MetricsError(MetricsError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::CaptureError(e) => write!(f, "Capture error: {}", e),
            ControllerError::MetricsError(e) => write!(f, "Metrics error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<CaptureError> for ControllerError {
    fn from(err: CaptureError) -> Self {
        ControllerError::CaptureError(err)
    }
}

impl From<MetricsError> for ControllerError {
    fn from(err: MetricsError) -> Self {
        ControllerError::MetricsError(err)
    }
}
