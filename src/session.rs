//! Stereo session controller.
//!
//! [`SessionController`] owns the runtime objects (instance, system, session,
//! space), negotiates the primary stereo view configuration and drives the
//! frame protocol:
//!
//! ```text
//! wait -> poll one event -> locate views -> begin
//!      -> [acquire -> wait -> render -> release] per eye
//!      -> end (one projection layer)
//! ```
//!
//! Everything graphics-specific is delegated to a [`GraphicsBackend`].

use std::thread;
use std::time::Instant;

use glam::Mat4;
use tracing::{debug, error, info, warn};

use crate::backend::GraphicsBackend;
use crate::config::SessionConfig;
use crate::error::{BackendError, RuntimeError, SessionError};
use crate::events::{EventCallbackTable, EventType, RuntimeEvent};
use crate::frame_timing::FrameTiming;
use crate::math;
use crate::runtime::XrRuntime;
use crate::types::{
    EnvironmentBlendMode, Eye, FrameState, InstanceHandle, Posef, ProjectionLayer,
    ProjectionView, Rect2Di, ReferenceSpaceKind, RuntimeSessionState, SessionHandle,
    SpaceHandle, SwapchainSubImage, SystemId, View, ViewConfigurationType, ViewConfigurationView,
};

/// The only view configuration this controller drives.
pub const VIEW_CONFIGURATION: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    InstanceCreated,
    SystemResolved,
    SessionCreated,
    SessionRunning,
    SessionStopping,
    Ended,
}

/// An eye between `lock_swapchain` and `unlock_swapchain`.
#[derive(Debug, Copy, Clone)]
struct LockedEye {
    eye: Eye,
    image_index: u32,
}

/// Bookkeeping for the frame between `begin_frame` and `end_frame`.
#[derive(Debug)]
struct ActiveFrame {
    state: FrameState,
    began_at: Instant,
    wait_ms: f64,
    /// False when the views for this frame could not be located.
    views_located: bool,
    /// False when the event poll at frame start failed.
    events_polled: bool,
    next_eye: usize,
    locked: Option<LockedEye>,
    skipped: bool,
    projection_views: Vec<ProjectionView>,
}

impl ActiveFrame {
    fn expected_eye(&self) -> Option<Eye> {
        Eye::from_index(self.next_eye)
    }

    /// Whether eyes are rendered and views submitted for this frame.
    fn renders(&self) -> bool {
        self.state.should_render && self.views_located && self.events_polled
    }

    fn skip_eye(&mut self) {
        self.skipped = true;
        self.next_eye += 1;
    }
}

pub struct SessionController {
    runtime: Box<dyn XrRuntime>,
    backend: Box<dyn GraphicsBackend>,
    config: SessionConfig,
    state: LifecycleState,
    runtime_state: RuntimeSessionState,

    instance: InstanceHandle,
    system: SystemId,
    session: SessionHandle,
    space: SpaceHandle,

    view_configuration_views: Vec<ViewConfigurationView>,
    blend_mode: EnvironmentBlendMode,
    swapchain_formats: Vec<i64>,

    /// Bound to the space at `begin_session`; views are replaced every frame.
    layer: Option<ProjectionLayer>,
    views: Vec<View>,
    frame: Option<ActiveFrame>,
    /// Images whose wait timed out, still held by the application.
    pending_images: [Option<u32>; Eye::COUNT],

    callbacks: EventCallbackTable,
    timing: FrameTiming,
}

impl SessionController {
    pub fn new(
        runtime: Box<dyn XrRuntime>,
        backend: Box<dyn GraphicsBackend>,
        config: SessionConfig,
    ) -> Self {
        let timing = FrameTiming::new(config.timing_window, config.frame_budget_ms);
        Self {
            runtime,
            backend,
            config,
            state: LifecycleState::Uninitialized,
            runtime_state: RuntimeSessionState::Unknown,
            instance: InstanceHandle::NULL,
            system: SystemId::NULL,
            session: SessionHandle::NULL,
            space: SpaceHandle::NULL,
            view_configuration_views: Vec::new(),
            blend_mode: EnvironmentBlendMode::Opaque,
            swapchain_formats: Vec::new(),
            layer: None,
            views: Vec::new(),
            frame: None,
            pending_images: [None; Eye::COUNT],
            callbacks: EventCallbackTable::new(),
            timing,
        }
    }

    fn require(&self, operation: &'static str, state: LifecycleState) -> Result<(), SessionError> {
        if self.state == state {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Creates the instance and session and initializes the backend.
    ///
    /// On failure the objects created so far are kept; `free` (or drop)
    /// releases them.
    pub fn init(&mut self) -> Result<(), SessionError> {
        self.require("init", LifecycleState::Uninitialized)?;

        let extension = self.backend.presentation_extension_name();
        info!("XR: using extension {}", extension);
        self.instance = self
            .runtime
            .create_instance(&self.config.application_name, extension)?;
        self.state = LifecycleState::InstanceCreated;

        self.system = self.runtime.system()?;
        self.state = LifecycleState::SystemResolved;

        let configurations = self.runtime.enumerate_view_configurations(self.system)?;
        info!("XR: {} view configurations", configurations.len());
        let mut stereo = false;
        for ty in configurations {
            let properties = self
                .runtime
                .view_configuration_properties(self.system, ty)?;
            debug!(
                "XR: view configuration {:?} (fov mutable: {})",
                ty, properties.fov_mutable
            );
            if !stereo && ty == VIEW_CONFIGURATION && properties.view_configuration_type == ty {
                stereo = true;
            }
        }
        if !stereo {
            error!("XR: primary stereo view configuration not supported");
            return Err(SessionError::StereoUnsupported);
        }

        let views = self
            .runtime
            .enumerate_view_configuration_views(self.system, VIEW_CONFIGURATION)?;
        if views.len() != Eye::COUNT {
            return Err(SessionError::ViewCountMismatch {
                expected: Eye::COUNT,
                actual: views.len(),
            });
        }
        for (index, view) in views.iter().enumerate() {
            info!(
                "XR: view {}: recommended {}x{} (max {}x{}), {} samples (max {})",
                index,
                view.recommended_image_rect_width,
                view.recommended_image_rect_height,
                view.max_image_rect_width,
                view.max_image_rect_height,
                view.recommended_swapchain_sample_count,
                view.max_swapchain_sample_count
            );
        }
        self.view_configuration_views = views;

        let binding = self
            .backend
            .graphics_binding(&*self.runtime, self.instance, self.system)?;
        self.session = self.runtime.create_session(self.system, &binding)?;
        debug!("XR: session {:?} created", self.session);

        let blend_modes = self
            .runtime
            .enumerate_environment_blend_modes(self.system, VIEW_CONFIGURATION)?;
        if !blend_modes.contains(&EnvironmentBlendMode::Opaque) {
            error!("XR: opaque blend mode not supported ({:?})", blend_modes);
            return Err(SessionError::OpaqueBlendUnsupported);
        }
        self.blend_mode = EnvironmentBlendMode::Opaque;

        let formats = self.runtime.enumerate_swapchain_formats(self.session)?;
        let listed: Vec<String> = formats.iter().map(|f| format!("{f:#x}")).collect();
        info!("XR: swapchain formats [{}]", listed.join(", "));
        let required = self.backend.swapchain_format();
        if !formats.contains(&required) {
            warn!("XR: runtime does not list swapchain format {:#x}", required);
        }
        self.swapchain_formats = formats;

        self.backend.init_swapchains(
            &mut *self.runtime,
            self.session,
            &self.view_configuration_views,
        )?;
        let first = self.view_configuration_views[0];
        self.backend.init_platform_resources(
            first.recommended_image_rect_width,
            first.recommended_image_rect_height,
        )?;

        self.state = LifecycleState::SessionCreated;
        Ok(())
    }

    /// Replaces the space views are located in and layers are submitted to.
    pub fn set_reference_space(
        &mut self,
        pose: Posef,
        kind: ReferenceSpaceKind,
    ) -> Result<(), SessionError> {
        match self.state {
            LifecycleState::SessionCreated | LifecycleState::SessionRunning => {}
            state => {
                return Err(SessionError::InvalidState {
                    operation: "set_reference_space",
                    state,
                });
            }
        }
        if self.frame.is_some() {
            return Err(SessionError::FrameInProgress);
        }

        let space = self
            .runtime
            .create_reference_space(self.session, kind, pose)?;
        if !self.space.is_null() {
            if let Err(e) = self.runtime.destroy_space(self.space) {
                warn!("XR: failed to destroy space {:?}: {}", self.space, e);
            }
        }
        self.space = space;
        if let Some(layer) = self.layer.as_mut() {
            layer.space = space;
        }
        debug!("XR: reference space {:?} ({:?})", space, kind);
        Ok(())
    }

    /// Drains runtime events until the session reports READY.
    pub fn poll_until_ready(&mut self) -> Result<(), SessionError> {
        self.require("poll_until_ready", LifecycleState::SessionCreated)?;
        for _ in 0..self.config.ready_poll_limit {
            if self.runtime_state == RuntimeSessionState::Ready {
                return Ok(());
            }
            match self.runtime.poll_event()? {
                Some(event) => self.handle_event(&event),
                None => thread::sleep(self.config.ready_poll_interval),
            }
        }
        if self.runtime_state == RuntimeSessionState::Ready {
            Ok(())
        } else {
            Err(SessionError::NotReady(self.config.ready_poll_limit))
        }
    }

    pub fn begin_session(&mut self) -> Result<(), SessionError> {
        self.require("begin_session", LifecycleState::SessionCreated)?;
        if self.space.is_null() {
            self.space = self.runtime.create_reference_space(
                self.session,
                self.config.reference_space,
                Posef::IDENTITY,
            )?;
            debug!(
                "XR: default reference space {:?} ({:?})",
                self.space, self.config.reference_space
            );
        }
        self.runtime.begin_session(self.session, VIEW_CONFIGURATION)?;
        self.layer = Some(ProjectionLayer {
            space: self.space,
            views: Vec::with_capacity(Eye::COUNT),
        });
        self.state = LifecycleState::SessionRunning;
        info!("XR: session running");
        Ok(())
    }

    // ========================================================================
    // FRAME LOOP
    // ========================================================================

    /// Waits for the compositor, handles one runtime event, locates the
    /// eyes and begins a frame.
    pub fn begin_frame(&mut self) -> Result<FrameState, SessionError> {
        self.require("begin_frame", LifecycleState::SessionRunning)?;
        if self.frame.is_some() {
            return Err(SessionError::FrameInProgress);
        }

        let wait_start = Instant::now();
        let frame_state = self.runtime.wait_frame(self.session)?;
        let wait_ms = wait_start.elapsed().as_secs_f64() * 1000.0;

        let events_polled = match self.runtime.poll_event() {
            Ok(Some(event)) => {
                self.handle_event(&event);
                true
            }
            Ok(None) => true,
            Err(e) => {
                warn!("XR: event poll failed: {}", e);
                false
            }
        };

        let mut views_located = true;

        match self.runtime.locate_views(
            self.session,
            VIEW_CONFIGURATION,
            frame_state.predicted_display_time,
            self.space,
        ) {
            Ok(views) if views.len() == Eye::COUNT => self.views = views,
            Ok(views) => {
                warn!("XR: located {} views, expected {}", views.len(), Eye::COUNT);
                views_located = false;
            }
            Err(e) => {
                warn!("XR: failed to locate views: {}", e);
                views_located = false;
            }
        }

        self.runtime.begin_frame(self.session)?;
        self.frame = Some(ActiveFrame {
            state: frame_state,
            began_at: Instant::now(),
            wait_ms,
            views_located,
            events_polled,
            next_eye: 0,
            locked: None,
            skipped: false,
            projection_views: Vec::with_capacity(Eye::COUNT),
        });
        Ok(frame_state)
    }

    /// Acquires and waits on `eye`'s next swapchain image and binds it for
    /// rendering.
    ///
    /// Returns `Ok(false)` when the eye has to be skipped this frame (image
    /// wait timeout or a transient runtime failure); `unlock_swapchain` must
    /// not be called for a skipped eye.
    pub fn lock_swapchain(&mut self, eye: Eye) -> Result<bool, SessionError> {
        let frame = self.frame.as_mut().ok_or(SessionError::NoActiveFrame)?;
        if frame.locked.is_some() {
            return Err(SessionError::EyeOrder {
                requested: eye,
                expected: None,
            });
        }
        if frame.expected_eye() != Some(eye) {
            return Err(SessionError::EyeOrder {
                requested: eye,
                expected: frame.expected_eye(),
            });
        }

        let Some(swapchain) = self
            .backend
            .swapchain_handle(eye)
            .filter(|handle| !handle.is_null())
        else {
            frame.skip_eye();
            return Err(BackendError::EyeOutOfRange(eye).into());
        };

        let slot = &mut self.pending_images[eye.index()];
        let image_index = match *slot {
            Some(index) => index,
            None => match self.runtime.acquire_swapchain_image(swapchain) {
                Ok(index) => index,
                Err(e) => {
                    warn!("XR: {:?} eye acquire failed: {}", eye, e);
                    frame.skip_eye();
                    return Ok(false);
                }
            },
        };
        if let Err(e) = self
            .runtime
            .wait_swapchain_image(swapchain, self.config.image_wait_timeout)
        {
            if e.is_timeout() {
                warn!("XR: {:?} eye image {} not ready, skipping", eye, image_index);
            } else {
                warn!("XR: {:?} eye image wait failed: {}", eye, e);
            }
            *slot = Some(image_index);
            frame.skip_eye();
            return Ok(false);
        }
        *slot = None;

        if let Err(e) = self.backend.begin_eye_frame(eye, image_index) {
            warn!("XR: {:?} eye target unavailable: {}", eye, e);
            if let Err(e) = self.runtime.release_swapchain_image(swapchain) {
                warn!("XR: {:?} eye release failed: {}", eye, e);
            }
            frame.skip_eye();
            return Ok(false);
        }

        frame.locked = Some(LockedEye { eye, image_index });
        if let (Some(view), Some(config)) = (
            self.views.get(eye.index()),
            self.view_configuration_views.get(eye.index()),
        ) {
            frame.projection_views.push(ProjectionView {
                pose: view.pose,
                fov: view.fov,
                sub_image: SwapchainSubImage {
                    swapchain,
                    image_array_index: 0,
                    image_rect: Rect2Di {
                        x: 0,
                        y: 0,
                        width: config.recommended_image_rect_width as i32,
                        height: config.recommended_image_rect_height as i32,
                    },
                },
            });
        }
        Ok(true)
    }

    /// Finishes rendering `eye` and hands its image back to the runtime.
    pub fn unlock_swapchain(&mut self, eye: Eye) -> Result<(), SessionError> {
        let frame = self.frame.as_mut().ok_or(SessionError::NoActiveFrame)?;
        let locked = match frame.locked {
            Some(locked) if locked.eye == eye => locked,
            other => {
                return Err(SessionError::EyeOrder {
                    requested: eye,
                    expected: other.map(|locked| locked.eye),
                });
            }
        };
        frame.locked = None;
        frame.next_eye += 1;

        let rendered = self.backend.end_eye_frame(eye, locked.image_index);
        let released = match self.backend.swapchain_handle(eye) {
            Some(swapchain) => self
                .runtime
                .release_swapchain_image(swapchain)
                .map_err(SessionError::from),
            None => Err(BackendError::EyeOutOfRange(eye).into()),
        };
        if rendered.is_err() || released.is_err() {
            frame.skipped = true;
        }
        rendered?;
        released
    }

    /// Submits the frame. Views are only submitted when every eye rendered.
    pub fn end_frame(&mut self) -> Result<(), SessionError> {
        let mut frame = self.frame.take().ok_or(SessionError::NoActiveFrame)?;

        if let Some(locked) = frame.locked.take() {
            warn!("XR: {:?} eye still locked at frame end", locked.eye);
            frame.skipped = true;
            if let Err(e) = self.backend.end_eye_frame(locked.eye, locked.image_index) {
                warn!("XR: {:?} eye: {}", locked.eye, e);
            }
            if let Some(swapchain) = self.backend.swapchain_handle(locked.eye) {
                if let Err(e) = self.runtime.release_swapchain_image(swapchain) {
                    warn!("XR: {:?} eye release failed: {}", locked.eye, e);
                }
            }
        }

        let complete =
            frame.renders() && !frame.skipped && frame.projection_views.len() == Eye::COUNT;
        let render_ms = frame.began_at.elapsed().as_secs_f64() * 1000.0;

        let layer = match self.layer.as_mut() {
            Some(layer) if complete => {
                layer.views = frame.projection_views;
                Some(&*layer)
            }
            _ => None,
        };
        if layer.is_none() {
            debug!("XR: frame submitted without layers");
        }

        let submit_start = Instant::now();
        self.runtime.end_frame(
            self.session,
            frame.state.predicted_display_time,
            self.blend_mode,
            layer,
        )?;
        let submit_ms = submit_start.elapsed().as_secs_f64() * 1000.0;
        self.timing.record_frame(frame.wait_ms, render_ms, submit_ms);
        Ok(())
    }

    /// Runs one full frame, calling `render` for every eye whose swapchain
    /// could be locked. The frame is always ended, even when an eye fails.
    pub fn render_frame<F>(&mut self, mut render: F) -> Result<FrameState, SessionError>
    where
        F: FnMut(Eye, &View),
    {
        let frame_state = self.begin_frame()?;
        let mut eye_error = None;
        let render_eyes = self.frame.as_ref().is_some_and(ActiveFrame::renders);

        if render_eyes {
            for eye in Eye::ALL {
                match self.lock_swapchain(eye) {
                    Ok(true) => {
                        let view = self.views[eye.index()];
                        render(eye, &view);
                        if let Err(e) = self.unlock_swapchain(eye) {
                            eye_error.get_or_insert(e);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        eye_error.get_or_insert(e);
                    }
                }
            }
        }

        self.end_frame()?;
        match eye_error {
            Some(e) => Err(e),
            None => Ok(frame_state),
        }
    }

    fn handle_event(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::SessionStateChanged { session, state, .. } => {
                if *session == self.session {
                    info!(
                        "XR: session state {} -> {}",
                        self.runtime_state.as_str(),
                        state.as_str()
                    );
                    self.runtime_state = *state;
                }
            }
            RuntimeEvent::EventsLost { lost_event_count } => {
                warn!("XR: {} events lost", lost_event_count);
            }
            RuntimeEvent::InstanceLossPending { .. } => {
                warn!("XR: instance loss pending");
            }
            other => debug!("XR: event {:?}", other.event_type()),
        }
        self.callbacks.dispatch(event);
    }

    // ========================================================================
    // TEARDOWN
    // ========================================================================

    /// Requests exit and ends the running session. Must be called between
    /// frames.
    pub fn end_session(&mut self) -> Result<(), SessionError> {
        self.require("end_session", LifecycleState::SessionRunning)?;
        if self.frame.is_some() {
            return Err(SessionError::FrameInProgress);
        }

        if self.runtime_state == RuntimeSessionState::Stopping {
            debug!("XR: runtime already stopping the session");
        } else {
            self.runtime.request_exit_session(self.session)?;
        }
        self.state = LifecycleState::SessionStopping;

        for _ in 0..self.config.ready_poll_limit {
            if self.runtime_state == RuntimeSessionState::Stopping {
                break;
            }
            match self.runtime.poll_event()? {
                Some(event) => self.handle_event(&event),
                None => thread::sleep(self.config.ready_poll_interval),
            }
        }
        if self.runtime_state != RuntimeSessionState::Stopping {
            warn!("XR: session did not report stopping, ending anyway");
        }

        self.runtime.end_session(self.session)?;
        self.layer = None;
        self.views.clear();
        self.state = LifecycleState::Ended;
        info!("XR: session ended");
        Ok(())
    }

    /// Releases the backend, then space, session and instance. Returns
    /// false when nothing was left to release or the session is still
    /// running.
    pub fn free(&mut self) -> bool {
        if self.state == LifecycleState::SessionRunning {
            warn!("XR: refusing to free a running session");
            return false;
        }

        let mut released = self.backend.free(&mut *self.runtime);
        if !self.space.is_null() {
            log_release("space", self.runtime.destroy_space(self.space));
            self.space = SpaceHandle::NULL;
            released = true;
        }
        if !self.session.is_null() {
            log_release("session", self.runtime.destroy_session(self.session));
            self.session = SessionHandle::NULL;
            released = true;
        }
        if !self.instance.is_null() {
            log_release("instance", self.runtime.destroy_instance(self.instance));
            self.instance = InstanceHandle::NULL;
            released = true;
        }

        self.system = SystemId::NULL;
        self.layer = None;
        self.frame = None;
        self.views.clear();
        self.view_configuration_views.clear();
        self.swapchain_formats.clear();
        self.pending_images = [None; Eye::COUNT];
        self.runtime_state = RuntimeSessionState::Unknown;
        self.state = LifecycleState::Uninitialized;
        released
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Installs the handler for `event_type`, replacing any previous one.
    pub fn set_callback<F>(&mut self, event_type: EventType, callback: F) -> bool
    where
        F: FnMut(&RuntimeEvent) + 'static,
    {
        self.callbacks.set(event_type, Box::new(callback))
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Last session state reported by the runtime.
    pub fn runtime_state(&self) -> RuntimeSessionState {
        self.runtime_state
    }

    /// True once the runtime has asked a running session to stop. The
    /// caller should leave its frame loop and call `end_session`.
    pub fn should_end_session(&self) -> bool {
        self.state == LifecycleState::SessionRunning
            && matches!(
                self.runtime_state,
                RuntimeSessionState::Stopping
                    | RuntimeSessionState::LossPending
                    | RuntimeSessionState::Exiting
            )
    }

    pub fn instance(&self) -> InstanceHandle {
        self.instance
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn space(&self) -> SpaceHandle {
        self.space
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn GraphicsBackend {
        &*self.backend
    }

    pub fn blend_mode(&self) -> EnvironmentBlendMode {
        self.blend_mode
    }

    pub fn swapchain_formats(&self) -> &[i64] {
        &self.swapchain_formats
    }

    pub fn view_configuration_views(&self) -> &[ViewConfigurationView] {
        &self.view_configuration_views
    }

    pub fn frame_timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// "<name> v<major>.<minor>.<patch>" of the connected runtime.
    pub fn runtime_name(&self) -> Result<String, SessionError> {
        if self.instance.is_null() {
            return Err(RuntimeError::MissingObject("instance").into());
        }
        let properties = self.runtime.instance_properties()?;
        Ok(format!(
            "{} v{}",
            properties.runtime_name, properties.runtime_version
        ))
    }

    pub fn manufacturer_name(&self) -> Result<String, SessionError> {
        if self.system.is_null() {
            return Err(RuntimeError::MissingObject("system").into());
        }
        Ok(self.runtime.system_properties(self.system)?.system_name)
    }

    pub fn hmd_ideal_horiz_res(&self) -> u32 {
        self.view_configuration_views
            .first()
            .map_or(0, |view| view.recommended_image_rect_width)
    }

    pub fn hmd_ideal_vert_res(&self) -> u32 {
        self.view_configuration_views
            .first()
            .map_or(0, |view| view.recommended_image_rect_height)
    }

    fn located_view(&self, eye: Eye) -> Option<&View> {
        if self.state != LifecycleState::SessionRunning {
            return None;
        }
        self.views.get(eye.index())
    }

    /// Projection for `eye` from the most recently located field of view.
    pub fn projection_matrix(&self, eye: Eye, near: f32, far: f32) -> Option<Mat4> {
        self.located_view(eye)
            .map(|view| math::projection_from_fov(&view.fov, near, far))
    }

    /// View matrix for `eye`, composed with `base`.
    pub fn eye_modelview_matrix(&self, eye: Eye, base: Mat4) -> Option<Mat4> {
        self.located_view(eye)
            .map(|view| math::eye_modelview(&view.pose, base))
    }
}

fn log_release(what: &str, result: Result<(), RuntimeError>) {
    match result {
        Ok(()) => debug!("XR: {} destroyed", what),
        Err(e) => warn!("XR: failed to destroy {}: {}", what, e),
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.state == LifecycleState::SessionRunning {
            if self.frame.is_some() {
                if let Err(e) = self.end_frame() {
                    warn!("XR: failed to end frame on drop: {}", e);
                }
            }
            if let Err(e) = self.end_session() {
                warn!("XR: failed to end session on drop: {}", e);
                self.state = LifecycleState::SessionStopping;
            }
        }
        self.free();
    }
}

#[cfg(test)]
mod tests;
