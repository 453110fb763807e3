//! Recording runtime for tests.
//!
//! Every protocol call is appended to a shared log. Handles are plain
//! counters, the session is stereo with two 1440x1600 views, and call order
//! violations (double acquire, release before wait, frame begin without a
//! wait) fail the same way a conformant runtime would.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use super::{GraphicsApi, XrRuntime};
use crate::backend::{GraphicsBinding, GraphicsRequirements};
use crate::error::RuntimeError;
use crate::events::RuntimeEvent;
use crate::types::{
    ApiVersion, EnvironmentBlendMode, FrameState, InstanceHandle, Posef, ProjectionLayer,
    ReferenceSpaceKind, RuntimeProperties, RuntimeSessionState, SessionHandle, SpaceHandle,
    SwapchainCreateInfo, SwapchainHandle, SystemId, SystemProperties, Time, View,
    ViewConfigurationProperties, ViewConfigurationType, ViewConfigurationView,
};

pub const GL_RGBA8: i64 = 0x8058;
pub const GL_SRGB8_ALPHA8: i64 = 0x8C43;
pub const DISPLAY_PERIOD_NS: i64 = 11_111_111;

#[derive(Debug, Default)]
struct MockSwapchain {
    image_count: u32,
    next_image: u32,
    acquired: Option<u32>,
    waited: bool,
}

#[derive(Debug)]
pub struct MockState {
    pub api: GraphicsApi,
    pub calls: Vec<&'static str>,
    pub extensions: Vec<String>,
    pub view_configurations: Vec<ViewConfigurationType>,
    /// Type reported back by the properties query; defaults to the queried type.
    pub reported_properties_type: Option<ViewConfigurationType>,
    pub views: Vec<ViewConfigurationView>,
    pub blend_modes: Vec<EnvironmentBlendMode>,
    pub formats: Vec<i64>,
    /// Image count per created swapchain, in creation order. Extra swapchains get 3.
    pub image_counts: Vec<u32>,
    pub events: VecDeque<RuntimeEvent>,
    /// Calls that fail with a runtime error.
    pub failing: HashSet<&'static str>,
    /// Remaining timeouts per swapchain image wait.
    pub image_wait_timeouts: usize,
    pub should_render: bool,
    pub located_views: Vec<View>,
    pub submitted_layers: Vec<Option<ProjectionLayer>>,
    pub swapchain_infos: Vec<SwapchainCreateInfo>,
    pub last_binding: Option<GraphicsBinding>,

    next_handle: u64,
    instance: Option<InstanceHandle>,
    session: Option<SessionHandle>,
    session_running: bool,
    frame_waited: bool,
    frame_begun: bool,
    display_time: i64,
    spaces: HashSet<SpaceHandle>,
    swapchains: HashMap<SwapchainHandle, MockSwapchain>,
}

impl MockState {
    fn new(api: GraphicsApi) -> Self {
        let view = ViewConfigurationView {
            recommended_image_rect_width: 1440,
            max_image_rect_width: 2880,
            recommended_image_rect_height: 1600,
            max_image_rect_height: 3200,
            recommended_swapchain_sample_count: 1,
            max_swapchain_sample_count: 4,
        };
        Self {
            api,
            calls: Vec::new(),
            extensions: Vec::new(),
            view_configurations: vec![ViewConfigurationType::PrimaryStereo],
            reported_properties_type: None,
            views: vec![view; 2],
            blend_modes: vec![EnvironmentBlendMode::Opaque],
            formats: vec![GL_SRGB8_ALPHA8, GL_RGBA8, 28],
            image_counts: vec![3, 3],
            events: VecDeque::new(),
            failing: HashSet::new(),
            image_wait_timeouts: 0,
            should_render: true,
            located_views: vec![View::default(); 2],
            submitted_layers: Vec::new(),
            swapchain_infos: Vec::new(),
            last_binding: None,
            next_handle: 0x100,
            instance: None,
            session: None,
            session_running: false,
            frame_waited: false,
            frame_begun: false,
            display_time: 1_000_000,
            spaces: HashSet::new(),
            swapchains: HashMap::new(),
        }
    }

    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.iter().position(|c| *c == call)
    }

    pub fn live_swapchains(&self) -> usize {
        self.swapchains.len()
    }

    pub fn live_spaces(&self) -> usize {
        self.spaces.len()
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_running(&self) -> bool {
        self.session_running
    }

    /// Queues a session state change for the current session.
    pub fn push_state(&mut self, state: RuntimeSessionState) {
        let session = self.session.unwrap_or(SessionHandle::NULL);
        self.events.push_back(RuntimeEvent::SessionStateChanged {
            session,
            state,
            time: Time::from_nanos(self.display_time),
        });
    }
}

/// Cloning shares the underlying state, so a test keeps one clone for
/// inspection and hands the other to the code under test.
#[derive(Debug, Clone)]
pub struct MockRuntime {
    state: Rc<RefCell<MockState>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new(GraphicsApi::OpenGl)
    }
}

impl MockRuntime {
    pub fn new(api: GraphicsApi) -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::new(api))),
        }
    }

    pub fn state(&self) -> std::cell::RefMut<'_, MockState> {
        self.state.borrow_mut()
    }

    fn enter(&self, call: &'static str) -> Result<std::cell::RefMut<'_, MockState>, RuntimeError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        if state.failing.contains(call) {
            return Err(fail(call, "injected failure"));
        }
        Ok(state)
    }
}

fn fail(call: &'static str, message: &str) -> RuntimeError {
    RuntimeError::Call {
        call,
        code: -1,
        message: message.to_string(),
    }
}

fn check_session(state: &MockState, session: SessionHandle) -> Result<(), RuntimeError> {
    if state.session == Some(session) {
        Ok(())
    } else {
        Err(RuntimeError::UnknownHandle {
            kind: "session",
            raw: session.into_raw(),
        })
    }
}

fn swapchain_mut(
    state: &mut MockState,
    swapchain: SwapchainHandle,
) -> Result<&mut MockSwapchain, RuntimeError> {
    state
        .swapchains
        .get_mut(&swapchain)
        .ok_or(RuntimeError::UnknownHandle {
            kind: "swapchain",
            raw: swapchain.into_raw(),
        })
}

impl XrRuntime for MockRuntime {
    fn graphics_api(&self) -> GraphicsApi {
        self.state.borrow().api
    }

    fn create_instance(
        &mut self,
        _application_name: &str,
        extension: &str,
    ) -> Result<InstanceHandle, RuntimeError> {
        let mut state = self.enter("create_instance")?;
        if extension != state.api.extension_name() {
            return Err(RuntimeError::ExtensionUnsupported(extension.to_string()));
        }
        state.extensions.push(extension.to_string());
        let handle = InstanceHandle::from_raw(state.handle());
        state.instance = Some(handle);
        Ok(handle)
    }

    fn instance_properties(&self) -> Result<RuntimeProperties, RuntimeError> {
        let _state = self.enter("instance_properties")?;
        Ok(RuntimeProperties {
            runtime_name: "Mock Runtime".to_string(),
            runtime_version: ApiVersion::new(1, 2, 3),
        })
    }

    fn system(&mut self) -> Result<SystemId, RuntimeError> {
        let mut state = self.enter("system")?;
        if state.instance.is_none() {
            return Err(RuntimeError::MissingObject("instance"));
        }
        Ok(SystemId::from_raw(state.handle()))
    }

    fn system_properties(&self, _system: SystemId) -> Result<SystemProperties, RuntimeError> {
        let _state = self.enter("system_properties")?;
        Ok(SystemProperties {
            system_name: "Mock HMD".to_string(),
            vendor_id: 0x1234,
            max_swapchain_image_width: 4096,
            max_swapchain_image_height: 4096,
            orientation_tracking: true,
            position_tracking: true,
        })
    }

    fn enumerate_view_configurations(
        &self,
        _system: SystemId,
    ) -> Result<Vec<ViewConfigurationType>, RuntimeError> {
        let state = self.enter("enumerate_view_configurations")?;
        Ok(state.view_configurations.clone())
    }

    fn view_configuration_properties(
        &self,
        _system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<ViewConfigurationProperties, RuntimeError> {
        let state = self.enter("view_configuration_properties")?;
        Ok(ViewConfigurationProperties {
            view_configuration_type: state.reported_properties_type.unwrap_or(ty),
            fov_mutable: false,
        })
    }

    fn enumerate_view_configuration_views(
        &self,
        _system: SystemId,
        _ty: ViewConfigurationType,
    ) -> Result<Vec<ViewConfigurationView>, RuntimeError> {
        let state = self.enter("enumerate_view_configuration_views")?;
        Ok(state.views.clone())
    }

    fn graphics_requirements(
        &self,
        _system: SystemId,
        api: GraphicsApi,
    ) -> Result<GraphicsRequirements, RuntimeError> {
        let state = self.enter("graphics_requirements")?;
        if api != state.api {
            return Err(RuntimeError::UnsupportedGraphicsApi {
                runtime: state.api,
                requested: api,
            });
        }
        Ok(match api {
            GraphicsApi::OpenGl => GraphicsRequirements::OpenGl {
                min_api_version: ApiVersion::new(3, 3, 0),
                max_api_version: ApiVersion::new(4, 6, 0),
            },
            GraphicsApi::D3D11 => GraphicsRequirements::D3D11 {
                adapter_luid: [1, 0, 0, 0, 0, 0, 0, 0],
                min_feature_level: 0xb000,
            },
        })
    }

    fn create_session(
        &mut self,
        _system: SystemId,
        binding: &GraphicsBinding,
    ) -> Result<SessionHandle, RuntimeError> {
        let mut state = self.enter("create_session")?;
        if state.instance.is_none() {
            return Err(RuntimeError::MissingObject("instance"));
        }
        state.last_binding = Some(binding.clone());
        let handle = SessionHandle::from_raw(state.handle());
        state.session = Some(handle);
        Ok(handle)
    }

    fn enumerate_environment_blend_modes(
        &self,
        _system: SystemId,
        _ty: ViewConfigurationType,
    ) -> Result<Vec<EnvironmentBlendMode>, RuntimeError> {
        let state = self.enter("enumerate_environment_blend_modes")?;
        Ok(state.blend_modes.clone())
    }

    fn enumerate_swapchain_formats(
        &self,
        session: SessionHandle,
    ) -> Result<Vec<i64>, RuntimeError> {
        let state = self.enter("enumerate_swapchain_formats")?;
        check_session(&state, session)?;
        Ok(state.formats.clone())
    }

    fn create_swapchain(
        &mut self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> Result<SwapchainHandle, RuntimeError> {
        let mut state = self.enter("create_swapchain")?;
        check_session(&state, session)?;
        if !state.formats.contains(&info.format) {
            return Err(fail("create_swapchain", "swapchain format unsupported"));
        }
        let index = state.swapchain_infos.len();
        let image_count = state.image_counts.get(index).copied().unwrap_or(3);
        state.swapchain_infos.push(*info);
        let handle = SwapchainHandle::from_raw(state.handle());
        state.swapchains.insert(
            handle,
            MockSwapchain {
                image_count,
                ..Default::default()
            },
        );
        Ok(handle)
    }

    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> Result<Vec<u64>, RuntimeError> {
        let mut state = self.enter("enumerate_swapchain_images")?;
        let base = swapchain.into_raw() << 8;
        let chain = swapchain_mut(&mut state, swapchain)?;
        Ok((0..chain.image_count as u64).map(|i| base + i + 1).collect())
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("destroy_swapchain")?;
        state
            .swapchains
            .remove(&swapchain)
            .map(|_| ())
            .ok_or(RuntimeError::UnknownHandle {
                kind: "swapchain",
                raw: swapchain.into_raw(),
            })
    }

    fn create_reference_space(
        &mut self,
        session: SessionHandle,
        _kind: ReferenceSpaceKind,
        _pose: Posef,
    ) -> Result<SpaceHandle, RuntimeError> {
        let mut state = self.enter("create_reference_space")?;
        check_session(&state, session)?;
        let handle = SpaceHandle::from_raw(state.handle());
        state.spaces.insert(handle);
        Ok(handle)
    }

    fn begin_session(
        &mut self,
        session: SessionHandle,
        _ty: ViewConfigurationType,
    ) -> Result<(), RuntimeError> {
        let mut state = self.enter("begin_session")?;
        check_session(&state, session)?;
        if state.session_running {
            return Err(fail("begin_session", "session already running"));
        }
        state.session_running = true;
        Ok(())
    }

    fn wait_frame(&mut self, session: SessionHandle) -> Result<FrameState, RuntimeError> {
        let mut state = self.enter("wait_frame")?;
        check_session(&state, session)?;
        if !state.session_running {
            return Err(fail("wait_frame", "session not running"));
        }
        state.display_time += DISPLAY_PERIOD_NS;
        state.frame_waited = true;
        Ok(FrameState {
            predicted_display_time: Time::from_nanos(state.display_time),
            predicted_display_period_ns: DISPLAY_PERIOD_NS,
            should_render: state.should_render,
        })
    }

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, RuntimeError> {
        let mut state = self.enter("poll_event")?;
        Ok(state.events.pop_front())
    }

    fn locate_views(
        &mut self,
        session: SessionHandle,
        _ty: ViewConfigurationType,
        _time: Time,
        space: SpaceHandle,
    ) -> Result<Vec<View>, RuntimeError> {
        let state = self.enter("locate_views")?;
        check_session(&state, session)?;
        if !state.spaces.contains(&space) {
            return Err(RuntimeError::UnknownHandle {
                kind: "space",
                raw: space.into_raw(),
            });
        }
        Ok(state.located_views.clone())
    }

    fn begin_frame(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("begin_frame")?;
        check_session(&state, session)?;
        if !state.frame_waited {
            return Err(fail("begin_frame", "frame not waited"));
        }
        state.frame_waited = false;
        state.frame_begun = true;
        Ok(())
    }

    fn acquire_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<u32, RuntimeError> {
        let mut state = self.enter("acquire_swapchain_image")?;
        let chain = swapchain_mut(&mut state, swapchain)?;
        if chain.acquired.is_some() {
            return Err(fail("acquire_swapchain_image", "image already acquired"));
        }
        let index = chain.next_image;
        chain.next_image = (chain.next_image + 1) % chain.image_count.max(1);
        chain.acquired = Some(index);
        chain.waited = false;
        Ok(index)
    }

    fn wait_swapchain_image(
        &mut self,
        swapchain: SwapchainHandle,
        _timeout: Duration,
    ) -> Result<(), RuntimeError> {
        let mut state = self.enter("wait_swapchain_image")?;
        let timed_out = state.image_wait_timeouts > 0;
        if timed_out {
            state.image_wait_timeouts -= 1;
        }
        let chain = swapchain_mut(&mut state, swapchain)?;
        if chain.acquired.is_none() {
            return Err(fail("wait_swapchain_image", "no image acquired"));
        }
        if timed_out {
            return Err(RuntimeError::Timeout {
                call: "wait_swapchain_image",
            });
        }
        chain.waited = true;
        Ok(())
    }

    fn release_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("release_swapchain_image")?;
        let chain = swapchain_mut(&mut state, swapchain)?;
        if chain.acquired.is_none() || !chain.waited {
            return Err(fail("release_swapchain_image", "image not waited"));
        }
        chain.acquired = None;
        chain.waited = false;
        Ok(())
    }

    fn end_frame(
        &mut self,
        session: SessionHandle,
        _display_time: Time,
        _blend_mode: EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> Result<(), RuntimeError> {
        let mut state = self.enter("end_frame")?;
        check_session(&state, session)?;
        if !state.frame_begun {
            return Err(fail("end_frame", "frame not begun"));
        }
        let still_acquired = layer.is_some_and(|layer| {
            layer.views.iter().any(|view| {
                state
                    .swapchains
                    .get(&view.sub_image.swapchain)
                    .is_none_or(|chain| chain.acquired.is_some())
            })
        });
        if still_acquired {
            return Err(fail("end_frame", "layer references an acquired swapchain image"));
        }
        state.frame_begun = false;
        state.submitted_layers.push(layer.cloned());
        Ok(())
    }

    fn request_exit_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("request_exit_session")?;
        check_session(&state, session)?;
        if !state.session_running {
            return Err(fail("request_exit_session", "session not running"));
        }
        state.push_state(RuntimeSessionState::Stopping);
        Ok(())
    }

    fn end_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("end_session")?;
        check_session(&state, session)?;
        if !state.session_running {
            return Err(fail("end_session", "session not running"));
        }
        state.session_running = false;
        state.push_state(RuntimeSessionState::Idle);
        state.push_state(RuntimeSessionState::Exiting);
        Ok(())
    }

    fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("destroy_space")?;
        if state.spaces.remove(&space) {
            Ok(())
        } else {
            Err(RuntimeError::UnknownHandle {
                kind: "space",
                raw: space.into_raw(),
            })
        }
    }

    fn destroy_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("destroy_session")?;
        check_session(&state, session)?;
        if !state.swapchains.is_empty() {
            return Err(fail("destroy_session", "swapchains still alive"));
        }
        state.session = None;
        state.session_running = false;
        Ok(())
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) -> Result<(), RuntimeError> {
        let mut state = self.enter("destroy_instance")?;
        if state.instance != Some(instance) {
            return Err(RuntimeError::UnknownHandle {
                kind: "instance",
                raw: instance.into_raw(),
            });
        }
        if state.session.is_some() {
            return Err(fail("destroy_instance", "session still alive"));
        }
        state.instance = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_extension() {
        let mut runtime = MockRuntime::new(GraphicsApi::OpenGl);
        let err = runtime
            .create_instance("test", "XR_KHR_D3D11_enable")
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ExtensionUnsupported(_)));
        assert!(!runtime.state().has_instance());
    }

    #[test]
    fn test_acquire_twice_fails() {
        let mut runtime = MockRuntime::default();
        let instance = runtime.create_instance("test", "XR_KHR_opengl_enable").unwrap();
        let system = runtime.system().unwrap();
        let binding = GraphicsBinding::D3D11 {
            device: std::ptr::null_mut(),
        };
        let session = runtime.create_session(system, &binding).unwrap();
        let info = SwapchainCreateInfo::for_view(&runtime.state().views[0], GL_RGBA8);
        let chain = runtime.create_swapchain(session, &info).unwrap();

        assert_eq!(runtime.acquire_swapchain_image(chain).unwrap(), 0);
        assert!(runtime.acquire_swapchain_image(chain).is_err());
        assert!(runtime.release_swapchain_image(chain).is_err());
        runtime
            .wait_swapchain_image(chain, Duration::from_millis(1))
            .unwrap();
        runtime.release_swapchain_image(chain).unwrap();
        assert_eq!(runtime.acquire_swapchain_image(chain).unwrap(), 1);

        assert!(runtime.destroy_instance(instance).is_err());
    }

    #[test]
    fn test_injected_timeout() {
        let mut runtime = MockRuntime::default();
        runtime.create_instance("test", "XR_KHR_opengl_enable").unwrap();
        let system = runtime.system().unwrap();
        let binding = GraphicsBinding::D3D11 {
            device: std::ptr::null_mut(),
        };
        let session = runtime.create_session(system, &binding).unwrap();
        let info = SwapchainCreateInfo::for_view(&runtime.state().views[0], GL_RGBA8);
        let chain = runtime.create_swapchain(session, &info).unwrap();
        runtime.state().image_wait_timeouts = 1;

        runtime.acquire_swapchain_image(chain).unwrap();
        let err = runtime
            .wait_swapchain_image(chain, Duration::from_millis(1))
            .unwrap_err();
        assert!(err.is_timeout());
        runtime
            .wait_swapchain_image(chain, Duration::from_millis(1))
            .unwrap();
    }
}
