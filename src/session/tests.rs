use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::*;
use crate::backend::{BackendKind, GraphicsBinding, SwapchainSet};
use crate::runtime::GraphicsApi;
use crate::runtime::mock::{GL_RGBA8, MockRuntime};
use crate::types::{Fovf, SwapchainHandle, ViewConfigurationType};

#[derive(Debug, Default)]
struct Counts {
    extension: usize,
    binding: usize,
    init_swapchains: usize,
    init_platform: usize,
    begin_eye: usize,
    end_eye: usize,
    swapchain_handle: usize,
    free: usize,
    eyes: Vec<(Eye, u32)>,
    platform_size: Option<(u32, u32)>,
}

/// Backend that records every call and renders nothing.
struct CountingBackend {
    counts: Rc<RefCell<Counts>>,
    swapchains: SwapchainSet<u64>,
    fail_binding: bool,
    fail_begin_eye: bool,
}

impl CountingBackend {
    fn new(counts: Rc<RefCell<Counts>>) -> Self {
        Self {
            counts,
            swapchains: SwapchainSet::new(),
            fail_binding: false,
            fail_begin_eye: false,
        }
    }
}

impl GraphicsBackend for CountingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SingleApi
    }

    fn graphics_api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn presentation_extension_name(&self) -> &'static str {
        self.counts.borrow_mut().extension += 1;
        GraphicsApi::OpenGl.extension_name()
    }

    fn graphics_binding(
        &mut self,
        runtime: &dyn XrRuntime,
        _instance: InstanceHandle,
        system: SystemId,
    ) -> Result<GraphicsBinding, BackendError> {
        self.counts.borrow_mut().binding += 1;
        runtime.graphics_requirements(system, GraphicsApi::OpenGl)?;
        if self.fail_binding {
            return Err(BackendError::NoCurrentContext);
        }
        Ok(GraphicsBinding::OpenGlXlib {
            x_display: std::ptr::null_mut(),
            visual_id: 0x21,
            fb_config: std::ptr::null_mut(),
            drawable: 0x400001,
            context: std::ptr::null_mut(),
        })
    }

    fn swapchain_format(&self) -> i64 {
        GL_RGBA8
    }

    fn init_swapchains(
        &mut self,
        runtime: &mut dyn XrRuntime,
        session: SessionHandle,
        views: &[ViewConfigurationView],
    ) -> Result<(), BackendError> {
        self.counts.borrow_mut().init_swapchains += 1;
        self.swapchains
            .create(runtime, session, views, GL_RGBA8, |_, _, image| Ok(image))
    }

    fn init_platform_resources(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        let mut counts = self.counts.borrow_mut();
        counts.init_platform += 1;
        counts.platform_size = Some((width, height));
        Ok(())
    }

    fn begin_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        self.swapchains.surface(eye, image_index)?;
        if self.fail_begin_eye {
            return Err(BackendError::Graphics("lost".to_string()));
        }
        let mut counts = self.counts.borrow_mut();
        counts.begin_eye += 1;
        counts.eyes.push((eye, image_index));
        Ok(())
    }

    fn end_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        self.swapchains.surface(eye, image_index)?;
        self.counts.borrow_mut().end_eye += 1;
        Ok(())
    }

    fn swapchain_handle(&self, eye: Eye) -> Option<SwapchainHandle> {
        self.counts.borrow_mut().swapchain_handle += 1;
        self.swapchains.handle(eye)
    }

    fn free(&mut self, runtime: &mut dyn XrRuntime) -> bool {
        self.counts.borrow_mut().free += 1;
        if self.swapchains.is_empty() {
            return false;
        }
        self.swapchains.destroy(runtime, |_| {});
        true
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        application_name: "session test".to_string(),
        ready_poll_limit: 8,
        ready_poll_interval: Duration::ZERO,
        ..Default::default()
    }
}

struct Harness {
    runtime: MockRuntime,
    counts: Rc<RefCell<Counts>>,
    controller: SessionController,
}

fn harness_with(configure: impl FnOnce(&mut CountingBackend)) -> Harness {
    let runtime = MockRuntime::default();
    let counts = Rc::new(RefCell::new(Counts::default()));
    let mut backend = CountingBackend::new(counts.clone());
    configure(&mut backend);
    let controller =
        SessionController::new(Box::new(runtime.clone()), Box::new(backend), test_config());
    Harness {
        runtime,
        counts,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(|_| {})
}

fn running() -> Harness {
    let mut h = harness();
    h.controller.init().unwrap();
    h.controller.begin_session().unwrap();
    h
}

fn calls_since(runtime: &MockRuntime, start: usize) -> Vec<&'static str> {
    runtime.state().calls[start..].to_vec()
}

#[test]
fn test_handles_null_before_init() {
    let mut h = harness();
    assert!(h.controller.instance().is_null());
    assert!(h.controller.session().is_null());
    assert!(h.controller.system().is_null());
    assert_eq!(h.controller.state(), LifecycleState::Uninitialized);

    h.controller.init().unwrap();
    assert!(!h.controller.instance().is_null());
    assert!(!h.controller.session().is_null());
    assert!(!h.controller.system().is_null());
    assert_eq!(h.controller.state(), LifecycleState::SessionCreated);
    for eye in Eye::ALL {
        let handle = h.controller.backend().swapchain_handle(eye);
        assert!(handle.is_some_and(|handle| !handle.is_null()));
    }
}

#[test]
fn test_protocol_call_order() {
    let mut h = harness();
    h.controller.init().unwrap();
    assert!(h.counts.borrow().extension >= 1);
    assert_eq!(
        calls_since(&h.runtime, 0),
        [
            "create_instance",
            "system",
            "enumerate_view_configurations",
            "view_configuration_properties",
            "enumerate_view_configuration_views",
            "graphics_requirements",
            "create_session",
            "enumerate_environment_blend_modes",
            "enumerate_swapchain_formats",
            "create_swapchain",
            "enumerate_swapchain_images",
            "create_swapchain",
            "enumerate_swapchain_images",
        ]
    );
    assert_eq!(h.runtime.state().extensions, ["XR_KHR_opengl_enable"]);
    assert_eq!(h.counts.borrow().platform_size, Some((1440, 1600)));

    let mark = h.runtime.state().calls.len();
    h.controller.begin_session().unwrap();
    h.controller.render_frame(|_, _| {}).unwrap();
    assert_eq!(
        calls_since(&h.runtime, mark),
        [
            "create_reference_space",
            "begin_session",
            "wait_frame",
            "poll_event",
            "locate_views",
            "begin_frame",
            "acquire_swapchain_image",
            "wait_swapchain_image",
            "release_swapchain_image",
            "acquire_swapchain_image",
            "wait_swapchain_image",
            "release_swapchain_image",
            "end_frame",
        ]
    );

    let mark = h.runtime.state().calls.len();
    h.controller.end_session().unwrap();
    assert!(h.controller.free());
    assert_eq!(
        calls_since(&h.runtime, mark),
        [
            "request_exit_session",
            "poll_event",
            "end_session",
            "destroy_swapchain",
            "destroy_swapchain",
            "destroy_space",
            "destroy_session",
            "destroy_instance",
        ]
    );
    assert!(!h.runtime.state().has_instance());
}

#[test]
fn test_hundred_frames() {
    let mut h = running();
    for _ in 0..100 {
        h.controller.render_frame(|_, _| {}).unwrap();
    }

    let state = h.runtime.state();
    assert_eq!(state.count("begin_frame"), 100);
    assert_eq!(state.count("end_frame"), 100);
    assert_eq!(state.count("acquire_swapchain_image"), 200);
    assert_eq!(state.count("release_swapchain_image"), 200);
    assert!(state.submitted_layers.iter().all(|layer| {
        layer
            .as_ref()
            .is_some_and(|layer| layer.views.len() == Eye::COUNT)
    }));
    drop(state);

    let counts = h.counts.borrow();
    assert_eq!(counts.begin_eye, 200);
    assert_eq!(counts.end_eye, 200);
    assert_eq!(counts.swapchain_handle, 400);
    assert_eq!(counts.init_swapchains, 1);
    assert_eq!(counts.init_platform, 1);
    assert_eq!(counts.binding, 1);
    assert!(
        counts
            .eyes
            .chunks(2)
            .all(|pair| pair[0].0 == Eye::Left && pair[1].0 == Eye::Right)
    );
    drop(counts);

    assert_eq!(h.controller.frame_timing().total_frames(), 100);
}

#[test]
fn test_submitted_layer_contents() {
    let mut h = running();
    let fov = Fovf {
        angle_left: -0.8,
        angle_right: 0.7,
        angle_up: 0.75,
        angle_down: -0.85,
    };
    h.runtime.state().located_views[1].fov = fov;

    let frame_state = h.controller.render_frame(|_, _| {}).unwrap();

    let state = h.runtime.state();
    let layer = state.submitted_layers[0].as_ref().unwrap();
    assert_eq!(layer.space, h.controller.space());
    assert_eq!(layer.views[1].fov, fov);
    assert_eq!(layer.views[0].sub_image.image_rect.width, 1440);
    assert_eq!(layer.views[0].sub_image.image_rect.height, 1600);
    assert_ne!(
        layer.views[0].sub_image.swapchain,
        layer.views[1].sub_image.swapchain
    );
    assert!(frame_state.should_render);
}

#[test]
fn test_state_callback_runs_during_frame() {
    let mut h = harness();
    let seen = Rc::new(Cell::new(false));
    let flag = seen.clone();
    h.controller
        .set_callback(EventType::SessionStateChanged, move |_| flag.set(true));

    h.controller.init().unwrap();
    h.controller.begin_session().unwrap();
    h.runtime.state().push_state(RuntimeSessionState::Focused);
    for _ in 0..3 {
        h.controller.render_frame(|_, _| {}).unwrap();
    }

    assert!(seen.get());
    assert_eq!(h.controller.runtime_state(), RuntimeSessionState::Focused);
}

#[test]
fn test_callback_replaced() {
    let mut h = harness();
    assert!(!h.controller.set_callback(EventType::EventsLost, |_| {}));
    assert!(h.controller.set_callback(EventType::EventsLost, |_| {}));
}

#[test]
fn test_poll_until_ready() {
    let mut h = harness();
    h.controller.init().unwrap();
    h.runtime.state().push_state(RuntimeSessionState::Idle);
    h.runtime.state().push_state(RuntimeSessionState::Ready);

    h.controller.poll_until_ready().unwrap();
    assert_eq!(h.controller.runtime_state(), RuntimeSessionState::Ready);
    assert_eq!(h.runtime.state().count("poll_event"), 2);
}

#[test]
fn test_poll_until_ready_gives_up() {
    let mut h = harness();
    h.controller.init().unwrap();

    let err = h.controller.poll_until_ready().unwrap_err();
    assert!(matches!(err, SessionError::NotReady(8)));
    assert_eq!(h.runtime.state().count("poll_event"), 8);
}

#[test]
fn test_stereo_unsupported() {
    let mut h = harness();
    h.runtime.state().view_configurations = vec![ViewConfigurationType::PrimaryMono];

    let err = h.controller.init().unwrap_err();
    assert!(matches!(err, SessionError::StereoUnsupported));
    assert!(h.runtime.state().position("create_session").is_none());
    assert_eq!(h.controller.state(), LifecycleState::SystemResolved);
    assert!(h.controller.free());
    assert!(!h.runtime.state().has_instance());
}

#[test]
fn test_stereo_properties_must_round_trip() {
    let mut h = harness();
    h.runtime.state().reported_properties_type = Some(ViewConfigurationType::PrimaryMono);

    let err = h.controller.init().unwrap_err();
    assert!(matches!(err, SessionError::StereoUnsupported));
}

#[test]
fn test_first_matching_configuration_selected() {
    let mut h = harness();
    h.runtime.state().view_configurations = vec![
        ViewConfigurationType::PrimaryMono,
        ViewConfigurationType::PrimaryStereo,
        ViewConfigurationType::Other(1000037000),
    ];

    h.controller.init().unwrap();
    assert_eq!(h.runtime.state().count("view_configuration_properties"), 3);
}

#[test]
fn test_view_count_mismatch() {
    let mut h = harness();
    h.runtime.state().views.truncate(1);

    let err = h.controller.init().unwrap_err();
    assert!(matches!(
        err,
        SessionError::ViewCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn test_opaque_blend_unsupported() {
    let mut h = harness();
    h.runtime.state().blend_modes = vec![EnvironmentBlendMode::Additive];

    let err = h.controller.init().unwrap_err();
    assert!(matches!(err, SessionError::OpaqueBlendUnsupported));
    assert!(!h.controller.session().is_null());
    assert_eq!(h.counts.borrow().init_swapchains, 0);

    assert!(h.controller.free());
    assert!(!h.runtime.state().has_session());
    assert!(!h.runtime.state().has_instance());
}

#[test]
fn test_binding_failure_aborts_setup() {
    let mut h = harness_with(|backend| backend.fail_binding = true);

    let err = h.controller.init().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Backend(BackendError::NoCurrentContext)
    ));
    assert!(h.controller.session().is_null());
    assert!(h.runtime.state().position("create_session").is_none());
}

#[test]
fn test_missing_format_still_attempted() {
    let mut h = harness();
    h.runtime.state().formats = vec![0x8C43];

    let err = h.controller.init().unwrap_err();
    assert!(matches!(err, SessionError::Backend(BackendError::Runtime(_))));
    assert_eq!(h.controller.swapchain_formats(), [0x8C43]);
}

#[test]
fn test_image_timeout_skips_eye_and_rewaits() {
    let mut h = running();
    h.runtime.state().image_wait_timeouts = 1;

    h.controller.begin_frame().unwrap();
    assert!(!h.controller.lock_swapchain(Eye::Left).unwrap());
    assert!(h.controller.lock_swapchain(Eye::Right).unwrap());
    h.controller.unlock_swapchain(Eye::Right).unwrap();
    h.controller.end_frame().unwrap();

    h.controller.render_frame(|_, _| {}).unwrap();

    let state = h.runtime.state();
    assert_eq!(state.count("acquire_swapchain_image"), 3);
    assert_eq!(state.count("wait_swapchain_image"), 4);
    assert_eq!(state.count("release_swapchain_image"), 3);
    assert!(state.submitted_layers[0].is_none());
    assert!(state.submitted_layers[1].is_some());
}

#[test]
fn test_eye_order_enforced() {
    let mut h = running();
    h.controller.begin_frame().unwrap();

    let err = h.controller.lock_swapchain(Eye::Right).unwrap_err();
    assert!(matches!(
        err,
        SessionError::EyeOrder {
            requested: Eye::Right,
            expected: Some(Eye::Left)
        }
    ));

    assert!(h.controller.lock_swapchain(Eye::Left).unwrap());
    let err = h.controller.lock_swapchain(Eye::Left).unwrap_err();
    assert!(matches!(err, SessionError::EyeOrder { expected: None, .. }));
    let err = h.controller.unlock_swapchain(Eye::Right).unwrap_err();
    assert!(matches!(
        err,
        SessionError::EyeOrder {
            expected: Some(Eye::Left),
            ..
        }
    ));

    h.controller.unlock_swapchain(Eye::Left).unwrap();
    assert!(h.controller.lock_swapchain(Eye::Right).unwrap());
    h.controller.unlock_swapchain(Eye::Right).unwrap();
    h.controller.end_frame().unwrap();
}

#[test]
fn test_locked_eye_released_at_frame_end() {
    let mut h = running();
    h.controller.begin_frame().unwrap();
    assert!(h.controller.lock_swapchain(Eye::Left).unwrap());
    h.controller.end_frame().unwrap();

    let state = h.runtime.state();
    assert_eq!(state.count("release_swapchain_image"), 1);
    assert!(state.submitted_layers[0].is_none());
    assert_eq!(h.counts.borrow().end_eye, 1);
}

#[test]
fn test_backend_eye_failure_releases_image() {
    let mut h = harness_with(|backend| backend.fail_begin_eye = true);
    h.controller.init().unwrap();
    h.controller.begin_session().unwrap();

    h.controller.render_frame(|_, _| panic!("no eye renders")).unwrap();

    let state = h.runtime.state();
    assert_eq!(state.count("acquire_swapchain_image"), 2);
    assert_eq!(state.count("release_swapchain_image"), 2);
    assert!(state.submitted_layers[0].is_none());
}

#[test]
fn test_locate_failure_submits_empty_frame() {
    let mut h = running();
    h.runtime.state().failing.insert("locate_views");

    let mut rendered = 0;
    h.controller.render_frame(|_, _| rendered += 1).unwrap();

    assert_eq!(rendered, 0);
    let state = h.runtime.state();
    assert_eq!(state.count("begin_frame"), 1);
    assert_eq!(state.count("end_frame"), 1);
    assert!(state.submitted_layers[0].is_none());
}

#[test]
fn test_should_render_false_skips_eyes() {
    let mut h = running();
    h.runtime.state().should_render = false;

    h.controller.render_frame(|_, _| {}).unwrap();

    let state = h.runtime.state();
    assert_eq!(state.count("acquire_swapchain_image"), 0);
    assert!(state.submitted_layers[0].is_none());
}

#[test]
fn test_acquire_failure_skips_frame_then_recovers() {
    let mut h = running();
    h.runtime.state().failing.insert("acquire_swapchain_image");

    let mut rendered = 0;
    h.controller.render_frame(|_, _| rendered += 1).unwrap();
    assert_eq!(rendered, 0);
    assert_eq!(h.runtime.state().count("wait_swapchain_image"), 0);

    h.runtime.state().failing.remove("acquire_swapchain_image");
    h.controller.render_frame(|_, _| rendered += 1).unwrap();
    assert_eq!(rendered, 2);

    let state = h.runtime.state();
    assert_eq!(state.submitted_layers.len(), 2);
    assert!(state.submitted_layers[0].is_none());
    assert_eq!(
        state.submitted_layers[1].as_ref().map(|layer| layer.views.len()),
        Some(Eye::COUNT)
    );
}

#[test]
fn test_wait_frame_failure_is_transient() {
    let mut h = running();
    h.runtime.state().failing.insert("wait_frame");

    let err = h.controller.render_frame(|_, _| {}).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Runtime(RuntimeError::Call {
            call: "wait_frame",
            ..
        })
    ));
    {
        let state = h.runtime.state();
        assert_eq!(state.count("begin_frame"), 0);
        assert!(state.submitted_layers.is_empty());
    }
    assert_eq!(h.controller.state(), LifecycleState::SessionRunning);

    h.runtime.state().failing.remove("wait_frame");
    h.controller.render_frame(|_, _| {}).unwrap();

    let state = h.runtime.state();
    assert_eq!(state.submitted_layers.len(), 1);
    assert_eq!(
        state.submitted_layers[0].as_ref().map(|layer| layer.views.len()),
        Some(Eye::COUNT)
    );
}

#[test]
fn test_event_poll_failure_submits_empty_frame() {
    let mut h = running();
    h.runtime.state().failing.insert("poll_event");

    let mut rendered = 0;
    h.controller.render_frame(|_, _| rendered += 1).unwrap();
    assert_eq!(rendered, 0);
    assert_eq!(h.runtime.state().count("locate_views"), 1);

    h.runtime.state().failing.remove("poll_event");
    h.controller.render_frame(|_, _| rendered += 1).unwrap();
    assert_eq!(rendered, 2);

    let state = h.runtime.state();
    assert!(state.submitted_layers[0].is_none());
    assert!(state.submitted_layers[1].is_some());
}

#[test]
fn test_runtime_stopping_ends_session() {
    let mut h = running();
    assert!(!h.controller.should_end_session());
    h.runtime.state().push_state(RuntimeSessionState::Stopping);

    h.controller.render_frame(|_, _| {}).unwrap();
    assert_eq!(h.controller.runtime_state(), RuntimeSessionState::Stopping);
    assert!(h.controller.should_end_session());

    h.controller.end_session().unwrap();
    assert!(!h.controller.should_end_session());
    assert_eq!(h.controller.state(), LifecycleState::Ended);
    let state = h.runtime.state();
    assert_eq!(state.count("request_exit_session"), 0);
    assert_eq!(state.count("end_session"), 1);
}

#[test]
fn test_frame_calls_need_running_session() {
    let mut h = harness();
    assert!(matches!(
        h.controller.begin_frame(),
        Err(SessionError::InvalidState { .. })
    ));
    assert!(matches!(
        h.controller.lock_swapchain(Eye::Left),
        Err(SessionError::NoActiveFrame)
    ));
    assert!(matches!(
        h.controller.end_frame(),
        Err(SessionError::NoActiveFrame)
    ));

    h.controller.init().unwrap();
    h.controller.begin_session().unwrap();
    h.controller.end_session().unwrap();
    assert_eq!(h.controller.state(), LifecycleState::Ended);
    assert!(matches!(
        h.controller.begin_frame(),
        Err(SessionError::InvalidState {
            state: LifecycleState::Ended,
            ..
        })
    ));
}

#[test]
fn test_frame_in_progress() {
    let mut h = running();
    h.controller.begin_frame().unwrap();
    assert!(matches!(
        h.controller.begin_frame(),
        Err(SessionError::FrameInProgress)
    ));
    assert!(matches!(
        h.controller.end_session(),
        Err(SessionError::FrameInProgress)
    ));
    h.controller.end_frame().unwrap();
    h.controller.end_session().unwrap();
}

#[test]
fn test_free_twice() {
    let mut h = running();
    h.controller.end_session().unwrap();
    assert!(h.controller.free());
    assert!(!h.controller.free());
    assert!(h.controller.instance().is_null());
    assert!(h.controller.session().is_null());
}

#[test]
fn test_free_while_running_is_refused() {
    let mut h = running();
    assert!(!h.controller.free());
    assert!(h.runtime.state().has_session());
    assert_eq!(h.counts.borrow().free, 0);
    assert_eq!(h.controller.state(), LifecycleState::SessionRunning);
}

#[test]
fn test_drop_ends_running_session() {
    let h = running();
    let runtime = h.runtime.clone();
    drop(h);

    let state = runtime.state();
    assert_eq!(state.count("end_session"), 1);
    assert!(!state.has_session());
    assert!(!state.has_instance());
    assert_eq!(state.live_swapchains(), 0);
    assert_eq!(state.live_spaces(), 0);
}

#[test]
fn test_explicit_reference_space() {
    let mut h = harness();
    h.controller.init().unwrap();
    h.controller
        .set_reference_space(Posef::IDENTITY, ReferenceSpaceKind::Stage)
        .unwrap();
    let space = h.controller.space();
    h.controller.begin_session().unwrap();

    assert_eq!(h.controller.space(), space);
    assert_eq!(h.runtime.state().count("create_reference_space"), 1);

    h.controller
        .set_reference_space(Posef::IDENTITY, ReferenceSpaceKind::Local)
        .unwrap();
    assert_ne!(h.controller.space(), space);
    assert_eq!(h.runtime.state().live_spaces(), 1);

    h.controller.render_frame(|_, _| {}).unwrap();
    let state = h.runtime.state();
    assert_eq!(
        state.submitted_layers[0].as_ref().unwrap().space,
        h.controller.space()
    );
}

#[test]
fn test_reference_space_needs_session() {
    let mut h = harness();
    assert!(matches!(
        h.controller
            .set_reference_space(Posef::IDENTITY, ReferenceSpaceKind::Local),
        Err(SessionError::InvalidState { .. })
    ));
}

#[test]
fn test_runtime_and_system_names() {
    let mut h = harness();
    assert!(h.controller.runtime_name().is_err());
    assert_eq!(h.controller.hmd_ideal_horiz_res(), 0);
    assert_eq!(h.controller.hmd_ideal_vert_res(), 0);

    h.controller.init().unwrap();
    assert_eq!(h.controller.runtime_name().unwrap(), "Mock Runtime v1.2.3");
    assert_eq!(h.controller.manufacturer_name().unwrap(), "Mock HMD");
    assert_eq!(h.controller.hmd_ideal_horiz_res(), 1440);
    assert_eq!(h.controller.hmd_ideal_vert_res(), 1600);
    assert_eq!(h.controller.view_configuration_views().len(), Eye::COUNT);
}

#[test]
fn test_matrices_only_while_running() {
    let mut h = harness();
    h.controller.init().unwrap();
    assert!(h.controller.projection_matrix(Eye::Left, 0.1, 100.0).is_none());

    h.controller.begin_session().unwrap();
    assert!(h.controller.projection_matrix(Eye::Left, 0.1, 100.0).is_none());

    h.runtime.state().located_views[0].fov = Fovf {
        angle_left: -0.785,
        angle_right: 0.785,
        angle_up: 0.785,
        angle_down: -0.785,
    };
    h.controller.render_frame(|_, _| {}).unwrap();
    let projection = h
        .controller
        .projection_matrix(Eye::Left, 0.1, 100.0)
        .unwrap();
    assert_eq!(projection.w_axis.w, 0.0);
    assert!((projection.x_axis.x - 1.0).abs() < 1e-3);
    let modelview = h
        .controller
        .eye_modelview_matrix(Eye::Right, Mat4::IDENTITY)
        .unwrap();
    assert!(modelview.abs_diff_eq(Mat4::IDENTITY, 1e-6));

    h.controller.end_session().unwrap();
    assert!(h.controller.eye_modelview_matrix(Eye::Right, Mat4::IDENTITY).is_none());
}
