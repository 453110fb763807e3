//! Graphics backends.
//!
//! A backend owns every graphics API object the session needs: the device
//! or context handed to the runtime, one swapchain per eye with a render
//! target per swapchain image, and whatever auxiliary buffers it renders
//! through. Two variants exist:
//!
//! - [`opengl::OpenGlBackend`] (Linux): renders and presents with the
//!   current GLX context.
//! - [`d3d11::D3D11Backend`] (Windows): the application renders with OpenGL,
//!   the runtime consumes D3D11 swapchains, and an interop bridge aliases
//!   the render target between the two.

use std::ffi::c_void;

use crate::error::BackendError;
use crate::runtime::{GraphicsApi, XrRuntime};
use crate::types::{ApiVersion, Eye, InstanceHandle, SessionHandle, SwapchainHandle, SystemId};
use crate::types::ViewConfigurationView;

#[cfg(any(test, all(feature = "opengl", windows)))]
pub(crate) mod guard;
pub mod swapchain;

#[cfg(all(feature = "opengl", target_os = "linux"))]
pub mod opengl;

#[cfg(all(feature = "opengl", windows))]
pub mod d3d11;

pub use swapchain::{SurfaceImage, Swapchain, SwapchainSet};

#[cfg(all(feature = "opengl", target_os = "linux"))]
pub use opengl::load_gl;
#[cfg(all(feature = "opengl", windows))]
pub use d3d11::load_gl;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Renders and presents through one API.
    SingleApi,
    /// Renders through one API and presents through another.
    DualApi,
}

/// Everything session creation needs to know about the graphics device.
///
/// Pointers are owned by the backend and stay valid until its `free`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsBinding {
    OpenGlXlib {
        x_display: *mut c_void,
        visual_id: u32,
        fb_config: *mut c_void,
        drawable: u64,
        context: *mut c_void,
    },
    D3D11 {
        device: *mut c_void,
    },
}

impl GraphicsBinding {
    pub fn api(&self) -> GraphicsApi {
        match self {
            GraphicsBinding::OpenGlXlib { .. } => GraphicsApi::OpenGl,
            GraphicsBinding::D3D11 { .. } => GraphicsApi::D3D11,
        }
    }
}

/// Graphics API constraints the runtime reports for a system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsRequirements {
    OpenGl {
        min_api_version: ApiVersion,
        max_api_version: ApiVersion,
    },
    D3D11 {
        adapter_luid: [u8; 8],
        min_feature_level: u32,
    },
}

pub trait GraphicsBackend {
    fn kind(&self) -> BackendKind;

    /// Graphics API of the swapchains this backend hands to the runtime.
    fn graphics_api(&self) -> GraphicsApi;

    /// Instance extension this backend needs. Queried before instance
    /// creation.
    fn presentation_extension_name(&self) -> &'static str {
        self.graphics_api().extension_name()
    }

    /// Checks the runtime's requirements for `system`, creates or captures
    /// the graphics device, and describes it for session creation.
    fn graphics_binding(
        &mut self,
        runtime: &dyn XrRuntime,
        instance: InstanceHandle,
        system: SystemId,
    ) -> Result<GraphicsBinding, BackendError>;

    /// Runtime swapchain format every eye swapchain is created with.
    fn swapchain_format(&self) -> i64;

    /// Creates one swapchain per view and a render target per image.
    fn init_swapchains(
        &mut self,
        runtime: &mut dyn XrRuntime,
        session: SessionHandle,
        views: &[ViewConfigurationView],
    ) -> Result<(), BackendError>;

    /// Allocates buffers sized to the eye resolution. Runs after
    /// `init_swapchains`.
    fn init_platform_resources(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Binds and clears the target for `eye`'s acquired image.
    fn begin_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError>;

    fn end_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError>;

    fn swapchain_handle(&self, eye: Eye) -> Option<SwapchainHandle>;

    /// Releases everything in reverse creation order. Returns false when
    /// there was nothing left to release.
    fn free(&mut self, runtime: &mut dyn XrRuntime) -> bool;
}

/// Backend for the build platform.
#[cfg(all(feature = "opengl", target_os = "linux"))]
pub fn platform_backend() -> Box<dyn GraphicsBackend> {
    Box::new(opengl::OpenGlBackend::new())
}

#[cfg(all(feature = "opengl", windows))]
pub fn platform_backend() -> Box<dyn GraphicsBackend> {
    Box::new(d3d11::D3D11Backend::new())
}
