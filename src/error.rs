use thiserror::Error;

use crate::runtime::GraphicsApi;
use crate::session::LifecycleState;
use crate::types::Eye;

/// A failed call into the XR runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{call} failed: {message} ({code})")]
    Call {
        call: &'static str,
        code: i32,
        message: String,
    },

    #[error("{call} timed out")]
    Timeout { call: &'static str },

    #[error("runtime does not support extension {0}")]
    ExtensionUnsupported(String),

    #[error("{0} has not been created")]
    MissingObject(&'static str),

    #[error("unknown {kind} handle {raw:#x}")]
    UnknownHandle { kind: &'static str, raw: u64 },

    #[error("runtime drives {runtime:?} sessions, backend asked for {requested:?}")]
    UnsupportedGraphicsApi {
        runtime: GraphicsApi,
        requested: GraphicsApi,
    },

    #[error("failed to load the OpenXR loader: {0}")]
    Loader(String),
}

impl RuntimeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RuntimeError::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no graphics context is current on this thread")]
    NoCurrentContext,

    #[error("no graphics adapter matches the runtime adapter LUID")]
    AdapterNotFound,

    #[error("{0}")]
    Graphics(String),

    #[error(transparent)]
    Interop(#[from] InteropError),

    #[error("{0} has not been initialized")]
    NotInitialized(&'static str),

    #[error("eye {0:?} has no swapchain")]
    EyeOutOfRange(Eye),

    #[error("image {index} out of range for eye {eye:?} ({count} images)")]
    ImageOutOfRange { eye: Eye, index: u32, count: usize },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteropError {
    #[error("interop entry point {0} is not available")]
    EntryPointMissing(&'static str),

    #[error("failed to open the interop device")]
    OpenDevice,

    #[error("failed to register object with the interop device")]
    Register,

    #[error("failed to lock interop objects")]
    Lock,

    #[error("failed to unlock interop objects")]
    Unlock,

    #[error("interop objects are already locked")]
    AlreadyLocked,

    #[error("interop device is not open")]
    NotOpen,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("runtime does not support the primary stereo view configuration")]
    StereoUnsupported,

    #[error("expected {expected} views, runtime reported {actual}")]
    ViewCountMismatch { expected: usize, actual: usize },

    #[error("runtime does not support the opaque environment blend mode")]
    OpaqueBlendUnsupported,

    #[error("{operation} is not valid while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("a frame is already in progress")]
    FrameInProgress,

    #[error("no frame is in progress")]
    NoActiveFrame,

    #[error("eye {requested:?} locked out of order (expected {expected:?})")]
    EyeOrder {
        requested: Eye,
        expected: Option<Eye>,
    },

    #[error("session did not become ready after {0} polls")]
    NotReady(usize),
}
