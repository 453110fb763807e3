//! Single-API backend: OpenGL through GLX on Xlib.
//!
//! The application creates and makes current its own GLX context before
//! session setup. The backend captures that context for the runtime, renders
//! into the runtime's GL textures through one framebuffer per swapchain image
//! and shares a single depth renderbuffer between both eyes.

use std::ffi::{CStr, c_void};
use std::num::NonZeroU32;
use std::ptr;

use glow::HasContext;
use tracing::{debug, info, warn};
use x11::{glx, xlib};

use super::{BackendKind, GraphicsBackend, GraphicsBinding, GraphicsRequirements, SwapchainSet};
use crate::error::BackendError;
use crate::runtime::{GraphicsApi, XrRuntime};
use crate::types::{
    ApiVersion, Eye, InstanceHandle, SessionHandle, SwapchainHandle, SystemId,
    ViewConfigurationView,
};

/// `GL_RGBA8`, the one color format the eye swapchains use.
pub const SWAPCHAIN_FORMAT: i64 = glow::RGBA8 as i64;

/// Framebuffer wrapping one runtime swapchain texture.
#[derive(Debug)]
pub struct EyeTarget {
    framebuffer: glow::Framebuffer,
    texture: glow::Texture,
}

pub struct OpenGlBackend {
    gl: Option<glow::Context>,
    swapchains: SwapchainSet<EyeTarget>,
    depth: Option<glow::Renderbuffer>,
}

impl Default for OpenGlBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenGlBackend {
    pub fn new() -> Self {
        Self {
            gl: None,
            swapchains: SwapchainSet::new(),
            depth: None,
        }
    }

    fn gl(&self) -> Result<&glow::Context, BackendError> {
        self.gl
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))
    }
}

// ============================================================================
// GLX CONTEXT CAPTURE
// ============================================================================

/// The GLX objects current on the calling thread.
struct CurrentGlx {
    display: *mut xlib::Display,
    drawable: glx::GLXDrawable,
    context: glx::GLXContext,
    fb_config: glx::GLXFBConfig,
    visual_id: xlib::VisualID,
}

impl CurrentGlx {
    unsafe fn query() -> Result<Self, BackendError> {
        unsafe {
            let display = glx::glXGetCurrentDisplay();
            let context = glx::glXGetCurrentContext();
            if display.is_null() || context.is_null() {
                return Err(BackendError::NoCurrentContext);
            }
            let drawable = glx::glXGetCurrentDrawable();

            let mut fb_config_id = 0;
            let mut screen = 0;
            glx::glXQueryContext(display, context, glx::GLX_FBCONFIG_ID, &mut fb_config_id);
            glx::glXQueryContext(display, context, glx::GLX_SCREEN, &mut screen);

            let attrs = [glx::GLX_FBCONFIG_ID, fb_config_id, 0];
            let mut count = 0;
            let configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut count);
            if configs.is_null() || count == 0 {
                return Err(BackendError::Graphics(format!(
                    "no framebuffer config with id {fb_config_id:#x}"
                )));
            }
            let fb_config = *configs;
            xlib::XFree(configs.cast());

            let visual = glx::glXGetVisualFromFBConfig(display, fb_config);
            let visual_id = if visual.is_null() {
                0
            } else {
                let id = (*visual).visualid;
                xlib::XFree(visual.cast());
                id
            };

            Ok(Self {
                display,
                drawable,
                context,
                fb_config,
                visual_id,
            })
        }
    }

    fn binding(&self) -> GraphicsBinding {
        GraphicsBinding::OpenGlXlib {
            x_display: self.display.cast(),
            visual_id: self.visual_id as u32,
            fb_config: self.fb_config.cast(),
            drawable: self.drawable as u64,
            context: self.context.cast(),
        }
    }
}

/// Loads GL entry points through `glXGetProcAddress`. A GLX context must be
/// current for the pointers to be usable.
pub fn load_gl() -> Result<glow::Context, BackendError> {
    Ok(unsafe {
        glow::Context::from_loader_function_cstr(|name: &CStr| {
            match glx::glXGetProcAddress(name.as_ptr().cast()) {
                Some(f) => f as *const c_void,
                None => ptr::null(),
            }
        })
    })
}

fn check_version(gl: &glow::Context, requirements: &GraphicsRequirements) -> Result<(), BackendError> {
    let GraphicsRequirements::OpenGl {
        min_api_version,
        max_api_version,
    } = requirements
    else {
        return Err(BackendError::Graphics(format!(
            "expected OpenGL requirements, got {requirements:?}"
        )));
    };
    let version = gl.version();
    let current = ApiVersion::new(version.major as u16, version.minor as u16, 0);
    info!(
        "GL: context {} (runtime supports {} to {})",
        current, min_api_version, max_api_version
    );
    if (current.major, current.minor) < (min_api_version.major, min_api_version.minor) {
        return Err(BackendError::Graphics(format!(
            "OpenGL {current} is older than the required {min_api_version}"
        )));
    }
    if (current.major, current.minor) > (max_api_version.major, max_api_version.minor) {
        warn!("GL: context {} is newer than the runtime has been tested with", current);
    }
    Ok(())
}

impl GraphicsBackend for OpenGlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SingleApi
    }

    fn graphics_api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn graphics_binding(
        &mut self,
        runtime: &dyn XrRuntime,
        _instance: InstanceHandle,
        system: SystemId,
    ) -> Result<GraphicsBinding, BackendError> {
        let requirements = runtime.graphics_requirements(system, GraphicsApi::OpenGl)?;
        let current = unsafe { CurrentGlx::query()? };

        let gl = load_gl()?;
        check_version(&gl, &requirements)?;
        debug!(
            "GL: binding display {:?} drawable {:#x} visual {:#x}",
            current.display, current.drawable, current.visual_id
        );
        self.gl = Some(gl);
        Ok(current.binding())
    }

    fn swapchain_format(&self) -> i64 {
        SWAPCHAIN_FORMAT
    }

    fn init_swapchains(
        &mut self,
        runtime: &mut dyn XrRuntime,
        session: SessionHandle,
        views: &[ViewConfigurationView],
    ) -> Result<(), BackendError> {
        let gl = self
            .gl
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?;
        self.swapchains
            .create(runtime, session, views, SWAPCHAIN_FORMAT, |_, _, image| {
                let texture = u32::try_from(image)
                    .ok()
                    .and_then(NonZeroU32::new)
                    .map(glow::NativeTexture)
                    .ok_or_else(|| {
                        BackendError::Graphics(format!("invalid swapchain texture {image}"))
                    })?;
                unsafe {
                    let framebuffer = gl.create_framebuffer().map_err(BackendError::Graphics)?;
                    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
                    gl.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        glow::COLOR_ATTACHMENT0,
                        glow::TEXTURE_2D,
                        Some(texture),
                        0,
                    );
                    gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                    Ok(EyeTarget {
                        framebuffer,
                        texture,
                    })
                }
            })?;
        info!(
            "GL: {} swapchains, {} framebuffers each",
            self.swapchains.len(),
            self.swapchains.max_image_count()
        );
        Ok(())
    }

    fn init_platform_resources(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if self.swapchains.is_empty() {
            return Err(BackendError::NotInitialized("swapchains"));
        }
        let gl = self.gl()?;
        let depth = unsafe {
            let depth = gl.create_renderbuffer().map_err(BackendError::Graphics)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT24,
                width as i32,
                height as i32,
            );
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            depth
        };
        debug!("GL: depth buffer {}x{}", width, height);
        self.depth = Some(depth);
        Ok(())
    }

    fn begin_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        let gl = self.gl()?;
        let target = &self.swapchains.surface(eye, image_index)?.surface;
        let chain = self
            .swapchains
            .get(eye)
            .ok_or(BackendError::EyeOutOfRange(eye))?;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(target.texture),
                0,
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                self.depth,
            );
            gl.viewport(0, 0, chain.width as i32, chain.height as i32);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        Ok(())
    }

    fn end_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        self.swapchains.surface(eye, image_index)?;
        let gl = self.gl()?;
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        Ok(())
    }

    fn swapchain_handle(&self, eye: Eye) -> Option<SwapchainHandle> {
        self.swapchains.handle(eye)
    }

    fn free(&mut self, runtime: &mut dyn XrRuntime) -> bool {
        let Some(gl) = self.gl.take() else {
            return false;
        };
        let destroyed = self.swapchains.destroy(runtime, |target| unsafe {
            gl.delete_framebuffer(target.framebuffer)
        });
        if let Some(depth) = self.depth.take() {
            unsafe { gl.delete_renderbuffer(depth) };
        }
        debug!("GL: released {} swapchains", destroyed);
        true
    }
}
