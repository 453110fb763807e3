//! [`XrRuntime`] over the `openxr` crate.
//!
//! The runtime keeps the `openxr` objects (instance, session, frame waiter
//! and stream, spaces, swapchains) and hands out their raw handle values.
//! Graphics-API specifics (requirements, session create info, image type)
//! live in [`RuntimeGraphics`], implemented for `xr::OpenGL` on Linux and
//! `xr::D3D11` on Windows.

use std::collections::HashMap;
use std::time::Duration;

use openxr as xr;
use tracing::{debug, info};

use super::{GraphicsApi, XrRuntime};
use crate::backend::{GraphicsBinding, GraphicsRequirements};
use crate::error::RuntimeError;
use crate::events::RuntimeEvent;
use crate::types::{
    ApiVersion, EnvironmentBlendMode, Fovf, FrameState, InstanceHandle, Posef, ProjectionLayer,
    Quaternionf, Rect2Di, ReferenceSpaceKind, RuntimeProperties, RuntimeSessionState,
    SessionHandle, SpaceHandle, SwapchainCreateInfo, SwapchainHandle, SystemId,
    SystemProperties, Time, Vector3f, View, ViewConfigurationProperties, ViewConfigurationType,
    ViewConfigurationView,
};

const ENGINE_NAME: &str = "hmd-xr";

// ============================================================================
// GRAPHICS API SPECIFICS
// ============================================================================

/// Graphics API glue between the `openxr` crate and the backend-neutral types.
pub trait RuntimeGraphics: xr::Graphics {
    const API: GraphicsApi;

    /// Enables this API's extension in `enabled` if `available` has it.
    fn enable_extension(available: &xr::ExtensionSet, enabled: &mut xr::ExtensionSet) -> bool;

    fn backend_requirements(
        instance: &xr::Instance,
        system: xr::SystemId,
    ) -> Result<GraphicsRequirements, RuntimeError>;

    fn session_create_info(
        binding: &GraphicsBinding,
    ) -> Result<Self::SessionCreateInfo, RuntimeError>;

    fn image_to_raw(image: Self::SwapchainImage) -> u64;
}

#[cfg(target_os = "linux")]
impl RuntimeGraphics for xr::OpenGL {
    const API: GraphicsApi = GraphicsApi::OpenGl;

    fn enable_extension(available: &xr::ExtensionSet, enabled: &mut xr::ExtensionSet) -> bool {
        enabled.khr_opengl_enable = available.khr_opengl_enable;
        available.khr_opengl_enable
    }

    fn backend_requirements(
        instance: &xr::Instance,
        system: xr::SystemId,
    ) -> Result<GraphicsRequirements, RuntimeError> {
        let reqs = instance
            .graphics_requirements::<xr::OpenGL>(system)
            .map_err(xr_error("graphics_requirements"))?;
        Ok(GraphicsRequirements::OpenGl {
            min_api_version: version(reqs.min_api_version_supported),
            max_api_version: version(reqs.max_api_version_supported),
        })
    }

    fn session_create_info(
        binding: &GraphicsBinding,
    ) -> Result<xr::opengl::SessionCreateInfo, RuntimeError> {
        match *binding {
            GraphicsBinding::OpenGlXlib {
                x_display,
                visual_id,
                fb_config,
                drawable,
                context,
            } => Ok(xr::opengl::SessionCreateInfo::Xlib {
                x_display: x_display as _,
                visualid: visual_id as _,
                glx_fb_config: fb_config as _,
                glx_drawable: drawable as _,
                glx_context: context as _,
            }),
            _ => Err(RuntimeError::UnsupportedGraphicsApi {
                runtime: Self::API,
                requested: binding.api(),
            }),
        }
    }

    fn image_to_raw(image: u32) -> u64 {
        image as u64
    }
}

#[cfg(windows)]
impl RuntimeGraphics for xr::D3D11 {
    const API: GraphicsApi = GraphicsApi::D3D11;

    fn enable_extension(available: &xr::ExtensionSet, enabled: &mut xr::ExtensionSet) -> bool {
        enabled.khr_d3d11_enable = available.khr_d3d11_enable;
        available.khr_d3d11_enable
    }

    fn backend_requirements(
        instance: &xr::Instance,
        system: xr::SystemId,
    ) -> Result<GraphicsRequirements, RuntimeError> {
        let reqs = instance
            .graphics_requirements::<xr::D3D11>(system)
            .map_err(xr_error("graphics_requirements"))?;
        // LUID is 8 bytes and D3D_FEATURE_LEVEL is a 32-bit enum.
        let (adapter_luid, min_feature_level) = unsafe {
            (
                std::mem::transmute_copy::<_, [u8; 8]>(&reqs.adapter_luid),
                std::mem::transmute_copy::<_, u32>(&reqs.min_feature_level),
            )
        };
        Ok(GraphicsRequirements::D3D11 {
            adapter_luid,
            min_feature_level,
        })
    }

    fn session_create_info(
        binding: &GraphicsBinding,
    ) -> Result<xr::d3d::SessionCreateInfoD3D11, RuntimeError> {
        match *binding {
            GraphicsBinding::D3D11 { device } => Ok(xr::d3d::SessionCreateInfoD3D11 {
                device: device as *mut _,
            }),
            _ => Err(RuntimeError::UnsupportedGraphicsApi {
                runtime: Self::API,
                requested: binding.api(),
            }),
        }
    }

    fn image_to_raw(image: Self::SwapchainImage) -> u64 {
        image as usize as u64
    }
}

// ============================================================================
// RUNTIME
// ============================================================================

struct SessionParts<G: xr::Graphics> {
    handle: SessionHandle,
    session: xr::Session<G>,
    frame_waiter: xr::FrameWaiter,
    frame_stream: xr::FrameStream<G>,
}

pub struct OpenXrRuntime<G: RuntimeGraphics> {
    entry: xr::Entry,
    instance: Option<xr::Instance>,
    system: Option<xr::SystemId>,
    session: Option<SessionParts<G>>,
    spaces: HashMap<SpaceHandle, xr::Space>,
    swapchains: HashMap<SwapchainHandle, xr::Swapchain<G>>,
    event_buffer: xr::EventDataBuffer,
}

impl<G: RuntimeGraphics> OpenXrRuntime<G> {
    /// Load the OpenXR loader
    pub fn load() -> Result<Self, RuntimeError> {
        #[cfg(feature = "static")]
        let entry = xr::Entry::linked();
        #[cfg(not(feature = "static"))]
        let entry = unsafe { xr::Entry::load() }.map_err(|e| {
            RuntimeError::Loader(format!(
                "{e}; try enabling the \"static\" feature to link the loader"
            ))
        })?;

        Ok(Self {
            entry,
            instance: None,
            system: None,
            session: None,
            spaces: HashMap::new(),
            swapchains: HashMap::new(),
            event_buffer: xr::EventDataBuffer::new(),
        })
    }

    fn instance(&self) -> Result<&xr::Instance, RuntimeError> {
        self.instance
            .as_ref()
            .ok_or(RuntimeError::MissingObject("instance"))
    }

    fn system_id(&self, system: SystemId) -> Result<xr::SystemId, RuntimeError> {
        match self.system {
            Some(id) if id.into_raw() == system.into_raw() => Ok(id),
            _ => Err(RuntimeError::UnknownHandle {
                kind: "system",
                raw: system.into_raw(),
            }),
        }
    }

    fn swapchain(&self, handle: SwapchainHandle) -> Result<&xr::Swapchain<G>, RuntimeError> {
        lookup(&self.swapchains, handle, "swapchain", handle.into_raw())
    }

    fn swapchain_mut(
        &mut self,
        handle: SwapchainHandle,
    ) -> Result<&mut xr::Swapchain<G>, RuntimeError> {
        self.swapchains
            .get_mut(&handle)
            .ok_or(RuntimeError::UnknownHandle {
                kind: "swapchain",
                raw: handle.into_raw(),
            })
    }
}

fn lookup<'a, K: std::hash::Hash + Eq, V>(
    map: &'a HashMap<K, V>,
    key: K,
    kind: &'static str,
    raw: u64,
) -> Result<&'a V, RuntimeError> {
    map.get(&key).ok_or(RuntimeError::UnknownHandle { kind, raw })
}

fn parts<G: xr::Graphics>(
    session: &Option<SessionParts<G>>,
    handle: SessionHandle,
) -> Result<&SessionParts<G>, RuntimeError> {
    match session {
        Some(parts) if parts.handle == handle => Ok(parts),
        Some(_) => Err(RuntimeError::UnknownHandle {
            kind: "session",
            raw: handle.into_raw(),
        }),
        None => Err(RuntimeError::MissingObject("session")),
    }
}

fn parts_mut<G: xr::Graphics>(
    session: &mut Option<SessionParts<G>>,
    handle: SessionHandle,
) -> Result<&mut SessionParts<G>, RuntimeError> {
    match session {
        Some(parts) if parts.handle == handle => Ok(parts),
        Some(_) => Err(RuntimeError::UnknownHandle {
            kind: "session",
            raw: handle.into_raw(),
        }),
        None => Err(RuntimeError::MissingObject("session")),
    }
}

impl<G: RuntimeGraphics> XrRuntime for OpenXrRuntime<G> {
    fn graphics_api(&self) -> GraphicsApi {
        G::API
    }

    fn create_instance(
        &mut self,
        application_name: &str,
        extension: &str,
    ) -> Result<InstanceHandle, RuntimeError> {
        if extension != G::API.extension_name() {
            return Err(RuntimeError::ExtensionUnsupported(extension.to_string()));
        }
        let available = self
            .entry
            .enumerate_extensions()
            .map_err(xr_error("enumerate_extensions"))?;
        let mut enabled = xr::ExtensionSet::default();
        if !G::enable_extension(&available, &mut enabled) {
            return Err(RuntimeError::ExtensionUnsupported(extension.to_string()));
        }

        let instance = self
            .entry
            .create_instance(
                &xr::ApplicationInfo {
                    application_name,
                    application_version: 0,
                    engine_name: ENGINE_NAME,
                    engine_version: 0,
                    api_version: xr::Version::new(1, 0, 0),
                },
                &enabled,
                &[],
            )
            .map_err(xr_error("create_instance"))?;

        let handle = InstanceHandle::from_raw(instance.as_raw().into_raw());
        info!("XR: created instance {:?} with {}", handle, extension);
        self.instance = Some(instance);
        Ok(handle)
    }

    fn instance_properties(&self) -> Result<RuntimeProperties, RuntimeError> {
        let props = self
            .instance()?
            .properties()
            .map_err(xr_error("instance_properties"))?;
        Ok(RuntimeProperties {
            runtime_name: props.runtime_name,
            runtime_version: version(props.runtime_version),
        })
    }

    fn system(&mut self) -> Result<SystemId, RuntimeError> {
        let system = self
            .instance()?
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .map_err(xr_error("system"))?;
        self.system = Some(system);
        Ok(SystemId::from_raw(system.into_raw()))
    }

    fn system_properties(&self, system: SystemId) -> Result<SystemProperties, RuntimeError> {
        let props = self
            .instance()?
            .system_properties(self.system_id(system)?)
            .map_err(xr_error("system_properties"))?;
        Ok(SystemProperties {
            system_name: props.system_name,
            vendor_id: props.vendor_id,
            max_swapchain_image_width: props.graphics_properties.max_swapchain_image_width,
            max_swapchain_image_height: props.graphics_properties.max_swapchain_image_height,
            orientation_tracking: props.tracking_properties.orientation_tracking.into(),
            position_tracking: props.tracking_properties.position_tracking.into(),
        })
    }

    fn enumerate_view_configurations(
        &self,
        system: SystemId,
    ) -> Result<Vec<ViewConfigurationType>, RuntimeError> {
        let types = self
            .instance()?
            .enumerate_view_configurations(self.system_id(system)?)
            .map_err(xr_error("enumerate_view_configurations"))?;
        Ok(types.into_iter().map(view_type_from_xr).collect())
    }

    fn view_configuration_properties(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<ViewConfigurationProperties, RuntimeError> {
        let props = self
            .instance()?
            .view_configuration_properties(self.system_id(system)?, view_type_to_xr(ty))
            .map_err(xr_error("view_configuration_properties"))?;
        Ok(ViewConfigurationProperties {
            view_configuration_type: view_type_from_xr(props.view_configuration_type),
            fov_mutable: props.fov_mutable,
        })
    }

    fn enumerate_view_configuration_views(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<Vec<ViewConfigurationView>, RuntimeError> {
        let views = self
            .instance()?
            .enumerate_view_configuration_views(self.system_id(system)?, view_type_to_xr(ty))
            .map_err(xr_error("enumerate_view_configuration_views"))?;
        Ok(views
            .into_iter()
            .map(|v| ViewConfigurationView {
                recommended_image_rect_width: v.recommended_image_rect_width,
                max_image_rect_width: v.max_image_rect_width,
                recommended_image_rect_height: v.recommended_image_rect_height,
                max_image_rect_height: v.max_image_rect_height,
                recommended_swapchain_sample_count: v.recommended_swapchain_sample_count,
                max_swapchain_sample_count: v.max_swapchain_sample_count,
            })
            .collect())
    }

    fn graphics_requirements(
        &self,
        system: SystemId,
        api: GraphicsApi,
    ) -> Result<GraphicsRequirements, RuntimeError> {
        if api != G::API {
            return Err(RuntimeError::UnsupportedGraphicsApi {
                runtime: G::API,
                requested: api,
            });
        }
        G::backend_requirements(self.instance()?, self.system_id(system)?)
    }

    fn create_session(
        &mut self,
        system: SystemId,
        binding: &GraphicsBinding,
    ) -> Result<SessionHandle, RuntimeError> {
        let info = G::session_create_info(binding)?;
        let system = self.system_id(system)?;
        // The binding's device/context outlives the session: the backend
        // keeps it until `free`, which runs before the session is destroyed.
        let (session, frame_waiter, frame_stream) = unsafe {
            self.instance()?
                .create_session::<G>(system, &info)
                .map_err(xr_error("create_session"))?
        };
        let handle = SessionHandle::from_raw(session.as_raw().into_raw());
        debug!("XR: created session {:?}", handle);
        self.session = Some(SessionParts {
            handle,
            session,
            frame_waiter,
            frame_stream,
        });
        Ok(handle)
    }

    fn enumerate_environment_blend_modes(
        &self,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> Result<Vec<EnvironmentBlendMode>, RuntimeError> {
        let modes = self
            .instance()?
            .enumerate_environment_blend_modes(self.system_id(system)?, view_type_to_xr(ty))
            .map_err(xr_error("enumerate_environment_blend_modes"))?;
        Ok(modes.into_iter().map(blend_mode_from_xr).collect())
    }

    fn enumerate_swapchain_formats(
        &self,
        session: SessionHandle,
    ) -> Result<Vec<i64>, RuntimeError> {
        let formats = parts(&self.session, session)?
            .session
            .enumerate_swapchain_formats()
            .map_err(xr_error("enumerate_swapchain_formats"))?;
        Ok(formats.into_iter().map(G::lower_format).collect())
    }

    fn create_swapchain(
        &mut self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> Result<SwapchainHandle, RuntimeError> {
        let swapchain = parts(&self.session, session)?
            .session
            .create_swapchain(&xr::SwapchainCreateInfo {
                create_flags: xr::SwapchainCreateFlags::EMPTY,
                usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT
                    | xr::SwapchainUsageFlags::SAMPLED,
                format: G::raise_format(info.format),
                sample_count: info.sample_count,
                width: info.width,
                height: info.height,
                face_count: info.face_count,
                array_size: info.array_size,
                mip_count: info.mip_count,
            })
            .map_err(xr_error("create_swapchain"))?;
        let handle = SwapchainHandle::from_raw(swapchain.as_raw().into_raw());
        self.swapchains.insert(handle, swapchain);
        Ok(handle)
    }

    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> Result<Vec<u64>, RuntimeError> {
        let images = self
            .swapchain(swapchain)?
            .enumerate_images()
            .map_err(xr_error("enumerate_swapchain_images"))?;
        Ok(images.into_iter().map(G::image_to_raw).collect())
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError> {
        self.swapchains
            .remove(&swapchain)
            .map(drop)
            .ok_or(RuntimeError::UnknownHandle {
                kind: "swapchain",
                raw: swapchain.into_raw(),
            })
    }

    fn create_reference_space(
        &mut self,
        session: SessionHandle,
        kind: ReferenceSpaceKind,
        pose: Posef,
    ) -> Result<SpaceHandle, RuntimeError> {
        let space = parts(&self.session, session)?
            .session
            .create_reference_space(space_type_to_xr(kind), pose_to_xr(&pose))
            .map_err(xr_error("create_reference_space"))?;
        let handle = SpaceHandle::from_raw(space.as_raw().into_raw());
        self.spaces.insert(handle, space);
        Ok(handle)
    }

    fn begin_session(
        &mut self,
        session: SessionHandle,
        ty: ViewConfigurationType,
    ) -> Result<(), RuntimeError> {
        parts(&self.session, session)?
            .session
            .begin(view_type_to_xr(ty))
            .map(drop)
            .map_err(xr_error("begin_session"))
    }

    fn wait_frame(&mut self, session: SessionHandle) -> Result<FrameState, RuntimeError> {
        let state = parts_mut(&mut self.session, session)?
            .frame_waiter
            .wait()
            .map_err(xr_error("wait_frame"))?;
        Ok(FrameState {
            predicted_display_time: Time::from_nanos(state.predicted_display_time.as_nanos()),
            predicted_display_period_ns: state.predicted_display_period.as_nanos(),
            should_render: state.should_render,
        })
    }

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, RuntimeError> {
        let instance = self
            .instance
            .as_ref()
            .ok_or(RuntimeError::MissingObject("instance"))?;
        let event = instance
            .poll_event(&mut self.event_buffer)
            .map_err(xr_error("poll_event"))?;

        use xr::Event::*;
        Ok(event.map(|event| match event {
            SessionStateChanged(e) => RuntimeEvent::SessionStateChanged {
                session: SessionHandle::from_raw(e.session().into_raw()),
                state: session_state_from_xr(e.state()),
                time: Time::from_nanos(e.time().as_nanos()),
            },
            EventsLost(e) => RuntimeEvent::EventsLost {
                lost_event_count: e.lost_event_count(),
            },
            InstanceLossPending(e) => RuntimeEvent::InstanceLossPending {
                loss_time: Time::from_nanos(e.loss_time().as_nanos()),
            },
            ReferenceSpaceChangePending(e) => RuntimeEvent::ReferenceSpaceChangePending {
                change_time: Time::from_nanos(e.change_time().as_nanos()),
            },
            InteractionProfileChanged(_) => RuntimeEvent::InteractionProfileChanged,
            _ => RuntimeEvent::Other,
        }))
    }

    fn locate_views(
        &mut self,
        session: SessionHandle,
        ty: ViewConfigurationType,
        time: Time,
        space: SpaceHandle,
    ) -> Result<Vec<View>, RuntimeError> {
        let parts = parts(&self.session, session)?;
        let space = lookup(&self.spaces, space, "space", space.into_raw())?;
        let (_, views) = parts
            .session
            .locate_views(
                view_type_to_xr(ty),
                xr::Time::from_nanos(time.as_nanos()),
                space,
            )
            .map_err(xr_error("locate_views"))?;
        Ok(views
            .into_iter()
            .map(|v| View {
                pose: pose_from_xr(&v.pose),
                fov: fov_from_xr(&v.fov),
            })
            .collect())
    }

    fn begin_frame(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        parts_mut(&mut self.session, session)?
            .frame_stream
            .begin()
            .map_err(xr_error("begin_frame"))
    }

    fn acquire_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<u32, RuntimeError> {
        self.swapchain_mut(swapchain)?
            .acquire_image()
            .map_err(xr_error("acquire_swapchain_image"))
    }

    fn wait_swapchain_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout: Duration,
    ) -> Result<(), RuntimeError> {
        // Swapchain::wait_image folds TIMEOUT_EXPIRED into success, so call
        // the entry point directly to tell the two apart.
        let raw = self.swapchain(swapchain)?.as_raw();
        let info = xr::sys::SwapchainImageWaitInfo {
            ty: xr::sys::SwapchainImageWaitInfo::TYPE,
            next: std::ptr::null(),
            timeout: xr::Duration::from_nanos(timeout.as_nanos().min(i64::MAX as u128) as i64),
        };
        let result = unsafe { (self.instance()?.fp().wait_swapchain_image)(raw, &info) };
        if result == xr::sys::Result::TIMEOUT_EXPIRED {
            Err(RuntimeError::Timeout {
                call: "wait_swapchain_image",
            })
        } else if result.into_raw() < 0 {
            Err(xr_error("wait_swapchain_image")(result))
        } else {
            Ok(())
        }
    }

    fn release_swapchain_image(&mut self, swapchain: SwapchainHandle) -> Result<(), RuntimeError> {
        self.swapchain_mut(swapchain)?
            .release_image()
            .map_err(xr_error("release_swapchain_image"))
    }

    fn end_frame(
        &mut self,
        session: SessionHandle,
        display_time: Time,
        blend_mode: EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> Result<(), RuntimeError> {
        let parts = parts_mut(&mut self.session, session)?;
        let time = xr::Time::from_nanos(display_time.as_nanos());
        let blend = blend_mode_to_xr(blend_mode);

        let Some(layer) = layer else {
            return parts
                .frame_stream
                .end(time, blend, &[])
                .map_err(xr_error("end_frame"));
        };

        let space = lookup(&self.spaces, layer.space, "space", layer.space.into_raw())?;
        let mut views = Vec::with_capacity(layer.views.len());
        for view in &layer.views {
            let sub = &view.sub_image;
            let swapchain = lookup(
                &self.swapchains,
                sub.swapchain,
                "swapchain",
                sub.swapchain.into_raw(),
            )?;
            views.push(
                xr::CompositionLayerProjectionView::new()
                    .pose(pose_to_xr(&view.pose))
                    .fov(fov_to_xr(&view.fov))
                    .sub_image(
                        xr::SwapchainSubImage::new()
                            .swapchain(swapchain)
                            .image_array_index(sub.image_array_index)
                            .image_rect(rect_to_xr(&sub.image_rect)),
                    ),
            );
        }

        parts
            .frame_stream
            .end(
                time,
                blend,
                &[&xr::CompositionLayerProjection::new()
                    .space(space)
                    .views(&views)],
            )
            .map_err(xr_error("end_frame"))
    }

    fn request_exit_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        parts(&self.session, session)?
            .session
            .request_exit()
            .map_err(xr_error("request_exit_session"))
    }

    fn end_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        parts(&self.session, session)?
            .session
            .end()
            .map(drop)
            .map_err(xr_error("end_session"))
    }

    fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError> {
        self.spaces
            .remove(&space)
            .map(drop)
            .ok_or(RuntimeError::UnknownHandle {
                kind: "space",
                raw: space.into_raw(),
            })
    }

    fn destroy_session(&mut self, session: SessionHandle) -> Result<(), RuntimeError> {
        parts(&self.session, session)?;
        // Swapchains and spaces hold a reference to the session; the
        // runtime object goes away once the last of them is dropped.
        if !self.swapchains.is_empty() || !self.spaces.is_empty() {
            debug!(
                "XR: dropping {} swapchains and {} spaces with the session",
                self.swapchains.len(),
                self.spaces.len()
            );
        }
        self.swapchains.clear();
        self.spaces.clear();
        self.session = None;
        Ok(())
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) -> Result<(), RuntimeError> {
        let current = self.instance()?.as_raw().into_raw();
        if current != instance.into_raw() {
            return Err(RuntimeError::UnknownHandle {
                kind: "instance",
                raw: instance.into_raw(),
            });
        }
        self.session = None;
        self.system = None;
        self.instance = None;
        Ok(())
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

fn xr_error(call: &'static str) -> impl Fn(xr::sys::Result) -> RuntimeError {
    move |result| RuntimeError::Call {
        call,
        code: result.into_raw(),
        message: result.to_string(),
    }
}

fn version(v: xr::Version) -> ApiVersion {
    ApiVersion::new(v.major(), v.minor(), v.patch())
}

fn view_type_to_xr(ty: ViewConfigurationType) -> xr::ViewConfigurationType {
    match ty {
        ViewConfigurationType::PrimaryMono => xr::ViewConfigurationType::PRIMARY_MONO,
        ViewConfigurationType::PrimaryStereo => xr::ViewConfigurationType::PRIMARY_STEREO,
        ViewConfigurationType::Other(raw) => xr::ViewConfigurationType::from_raw(raw),
    }
}

fn view_type_from_xr(ty: xr::ViewConfigurationType) -> ViewConfigurationType {
    match ty {
        xr::ViewConfigurationType::PRIMARY_MONO => ViewConfigurationType::PrimaryMono,
        xr::ViewConfigurationType::PRIMARY_STEREO => ViewConfigurationType::PrimaryStereo,
        other => ViewConfigurationType::Other(other.into_raw()),
    }
}

fn blend_mode_to_xr(mode: EnvironmentBlendMode) -> xr::EnvironmentBlendMode {
    match mode {
        EnvironmentBlendMode::Opaque => xr::EnvironmentBlendMode::OPAQUE,
        EnvironmentBlendMode::Additive => xr::EnvironmentBlendMode::ADDITIVE,
        EnvironmentBlendMode::AlphaBlend => xr::EnvironmentBlendMode::ALPHA_BLEND,
        EnvironmentBlendMode::Other(raw) => xr::EnvironmentBlendMode::from_raw(raw),
    }
}

fn blend_mode_from_xr(mode: xr::EnvironmentBlendMode) -> EnvironmentBlendMode {
    match mode {
        xr::EnvironmentBlendMode::OPAQUE => EnvironmentBlendMode::Opaque,
        xr::EnvironmentBlendMode::ADDITIVE => EnvironmentBlendMode::Additive,
        xr::EnvironmentBlendMode::ALPHA_BLEND => EnvironmentBlendMode::AlphaBlend,
        other => EnvironmentBlendMode::Other(other.into_raw()),
    }
}

fn space_type_to_xr(kind: ReferenceSpaceKind) -> xr::ReferenceSpaceType {
    match kind {
        ReferenceSpaceKind::View => xr::ReferenceSpaceType::VIEW,
        ReferenceSpaceKind::Local => xr::ReferenceSpaceType::LOCAL,
        ReferenceSpaceKind::Stage => xr::ReferenceSpaceType::STAGE,
    }
}

fn session_state_from_xr(state: xr::SessionState) -> RuntimeSessionState {
    match state {
        xr::SessionState::IDLE => RuntimeSessionState::Idle,
        xr::SessionState::READY => RuntimeSessionState::Ready,
        xr::SessionState::SYNCHRONIZED => RuntimeSessionState::Synchronized,
        xr::SessionState::VISIBLE => RuntimeSessionState::Visible,
        xr::SessionState::FOCUSED => RuntimeSessionState::Focused,
        xr::SessionState::STOPPING => RuntimeSessionState::Stopping,
        xr::SessionState::LOSS_PENDING => RuntimeSessionState::LossPending,
        xr::SessionState::EXITING => RuntimeSessionState::Exiting,
        _ => RuntimeSessionState::Unknown,
    }
}

fn pose_to_xr(pose: &Posef) -> xr::Posef {
    let (q, p) = (&pose.orientation, &pose.position);
    xr::Posef {
        orientation: xr::Quaternionf {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        },
        position: xr::Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        },
    }
}

fn pose_from_xr(pose: &xr::Posef) -> Posef {
    let (q, p) = (&pose.orientation, &pose.position);
    Posef {
        orientation: Quaternionf {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        },
        position: Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        },
    }
}

fn fov_to_xr(fov: &Fovf) -> xr::Fovf {
    xr::Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn fov_from_xr(fov: &xr::Fovf) -> Fovf {
    Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn rect_to_xr(rect: &Rect2Di) -> xr::Rect2Di {
    xr::Rect2Di {
        offset: xr::Offset2Di {
            x: rect.x,
            y: rect.y,
        },
        extent: xr::Extent2Di {
            width: rect.width,
            height: rect.height,
        },
    }
}
