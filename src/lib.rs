//! Stereo head-mounted display session engine.
//!
//! A [`SessionController`] connects to an OpenXR runtime, negotiates the
//! primary stereo view configuration and runs the per-frame protocol. The
//! graphics side lives behind [`backend::GraphicsBackend`]: OpenGL through
//! GLX on Linux, and on Windows a D3D11 device whose swapchain images are
//! filled from an OpenGL render target shared through [`interop`].

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod frame_timing;
pub mod interop;
pub mod math;
pub mod runtime;
pub mod session;
pub mod types;

pub use config::SessionConfig;
pub use error::{BackendError, InteropError, RuntimeError, SessionError};
pub use events::{EventType, RuntimeEvent};
pub use session::{LifecycleState, SessionController};
pub use types::Eye;
