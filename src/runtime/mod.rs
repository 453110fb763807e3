//! The XR runtime as seen by the session engine.
//!
//! [`XrRuntime`] has one method per runtime protocol call. The session
//! controller and the graphics backends never touch the `openxr` crate
//! directly, so the whole protocol can be driven against a recording mock.

use std::time::Duration;

use crate::backend::{GraphicsBinding, GraphicsRequirements};
use crate::error::RuntimeError;
use crate::events::RuntimeEvent;
use crate::types::{
    EnvironmentBlendMode, FrameState, InstanceHandle, Posef, ProjectionLayer, ReferenceSpaceKind,
    RuntimeProperties, SessionHandle, SpaceHandle, SwapchainCreateInfo, SwapchainHandle, SystemId,
    SystemProperties, Time, View, ViewConfigurationProperties, ViewConfigurationType,
    ViewConfigurationView,
};

#[cfg(test)]
pub mod mock;
#[cfg(feature = "runtime")]
pub mod openxr_runtime;

#[cfg(feature = "runtime")]
pub use openxr_runtime::{OpenXrRuntime, RuntimeGraphics};

/// Graphics API a session is created against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    OpenGl,
    D3D11,
}

impl GraphicsApi {
    /// Instance extension that enables sessions for this API.
    pub fn extension_name(self) -> &'static str {
        match self {
            GraphicsApi::OpenGl => "XR_KHR_opengl_enable",
            GraphicsApi::D3D11 => "XR_KHR_D3D11_enable",
        }
    }
}

pub trait XrRuntime {
    /// Graphics API this runtime creates sessions for.
    fn graphics_api(&self) -> GraphicsApi;

    fn create_instance(
        &mut self,
        application_name: &str,
        extension: &str,
    ) -> Result<InstanceHandle, RuntimeError>;

    fn instance_properties(&self) -> Result<RuntimeProperties, RuntimeError>;

    /// Resolves the head-mounted display system.
    fn system(&mut self) -> Result<SystemId, RuntimeError>;

    fn system_properties(&self, system: SystemId) -> Result<SystemProperties, RuntimeError>;

    fn enumerate_view_configurations(
        &self,
        system: SystemId,
    ) -> Result<Vec<ViewConfigurationType>, RuntimeError>;

    fn view_configuration_properties(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<ViewConfigurationProperties, RuntimeError>;

    fn enumerate_view_configuration_views(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<Vec<ViewConfigurationView>, RuntimeError>;

    fn graphics_requirements(
        &self,
        system: SystemId,
        api: GraphicsApi,
    ) -> Result<GraphicsRequirements, RuntimeError>;

    fn create_session(
        &mut self,
        system: SystemId,
        binding: &GraphicsBinding,
    ) -> Result<SessionHandle, RuntimeError>;

    fn enumerate_environment_blend_modes(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<Vec<EnvironmentBlendMode>, RuntimeError>;

    fn enumerate_swapchain_formats(&self, session: SessionHandle)
    -> Result<Vec<i64>, RuntimeError>;

    fn create_swapchain(
        &mut self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> Result<SwapchainHandle, RuntimeError>;

    /// Native image names (GL texture ids or D3D11 texture pointers).
    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> Result<Vec<u64>, RuntimeError>;

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError>;

    fn create_reference_space(
        &mut self,
        session: SessionHandle,
        kind: ReferenceSpaceKind,
        pose: Posef,
    ) -> Result<SpaceHandle, RuntimeError>;

    fn begin_session(
        &mut self,
        session: SessionHandle,
        ty: ViewConfigurationType,
    ) -> Result<(), RuntimeError>;

    /// Blocks until the compositor is ready for the next frame.
    fn wait_frame(&mut self, session: SessionHandle) -> Result<FrameState, RuntimeError>;

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, RuntimeError>;

    fn locate_views(
        &mut self,
        session: SessionHandle,
        ty: ViewConfigurationType,
        time: Time,
        space: SpaceHandle,
    ) -> Result<Vec<View>, RuntimeError>;

    fn begin_frame(&mut self, session: SessionHandle) -> Result<(), RuntimeError>;

    fn acquire_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<u32, RuntimeError>;

    /// Returns [`RuntimeError::Timeout`] when `timeout` elapses first.
    fn wait_swapchain_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout: Duration,
    ) -> Result<(), RuntimeError>;

    fn release_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError>;

    fn end_frame(
        &mut self,
        session: SessionHandle,
        display_time: Time,
        blend_mode: EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> Result<(), RuntimeError>;

    fn request_exit_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError>;

    fn end_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError>;

    fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError>;

    fn destroy_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError>;

    fn destroy_instance(&mut self, instance: InstanceHandle) -> Result<(), RuntimeError>;
}

/// Production runtime for the platform backend: OpenGL sessions on Linux,
/// D3D11 sessions everywhere else.
#[cfg(all(feature = "runtime", target_os = "linux"))]
pub fn platform_runtime() -> Result<Box<dyn XrRuntime>, RuntimeError> {
    Ok(Box::new(OpenXrRuntime::<openxr::OpenGL>::load()?))
}

#[cfg(all(feature = "runtime", windows))]
pub fn platform_runtime() -> Result<Box<dyn XrRuntime>, RuntimeError> {
    Ok(Box::new(OpenXrRuntime::<openxr::D3D11>::load()?))
}
