//! Drives a stereo OpenXR session end to end.
//!
//! Creates a hidden window with an OpenGL context, hands it to the platform
//! backend (OpenGL on Linux, D3D11 with OpenGL interop on Windows) and runs
//! the frame loop, clearing each eye to a slowly pulsing color.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glow::HasContext;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hmd_xr::types::{ReferenceSpaceKind, RuntimeSessionState};
use hmd_xr::{Eye, EventType, SessionConfig, SessionController, backend, runtime};

// ============================================================================
// CONSTANTS
// ============================================================================

const DEFAULT_LOG_FILTER: &str = "hmd_xr=info,hmd_demo=info";
const EYE_TINT: [[f32; 3]; Eye::COUNT] = [[0.9, 0.3, 0.2], [0.2, 0.4, 0.9]];

// ============================================================================
// COMMAND LINE
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hmd-demo", about = "Run a stereo OpenXR session and clear each eye")]
struct Cli {
    /// Application name reported to the runtime
    #[arg(long, default_value = "OpenXR App")]
    app_name: String,

    /// Reference space views are located in
    #[arg(long, value_enum, default_value_t = SpaceArg::Local)]
    reference_space: SpaceArg,

    /// Swapchain image wait timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    wait_timeout_ms: u64,

    /// Stop after this many frames (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Log frame timing every N frames (0 disables)
    #[arg(long, default_value_t = 900)]
    log_stats_every: u64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SpaceArg {
    Local,
    Stage,
    View,
}

impl From<SpaceArg> for ReferenceSpaceKind {
    fn from(arg: SpaceArg) -> Self {
        match arg {
            SpaceArg::Local => ReferenceSpaceKind::Local,
            SpaceArg::Stage => ReferenceSpaceKind::Stage,
            SpaceArg::View => ReferenceSpaceKind::View,
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();
    let cli = Cli::parse();

    // Handle interrupts gracefully
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })
    .context("setting Ctrl-C handler")?;

    #[cfg(all(windows, feature = "static"))]
    #[link(name = "advapi32")]
    unsafe extern "C" {}

    // The backend binds whatever context is current when the session is set up.
    let context = unsafe { platform::GlContext::create()? };
    let gl = backend::load_gl()?;

    let mut session = create_session(&cli)?;
    let r = running.clone();
    session.set_callback(EventType::SessionStateChanged, move |event| {
        if matches!(
            event.session_state(),
            Some(RuntimeSessionState::Exiting | RuntimeSessionState::LossPending)
        ) {
            r.store(false, Ordering::Relaxed);
        }
    });

    session.poll_until_ready().context("waiting for the session")?;
    session.begin_session()?;

    let start_time = Instant::now();
    let mut frame = 0u64;
    while running.load(Ordering::Relaxed) && (cli.frames == 0 || frame < cli.frames) {
        if session.should_end_session() {
            info!("runtime is stopping the session");
            break;
        }

        let pulse = 0.5 + 0.5 * (start_time.elapsed().as_secs_f32() * 2.0).sin();
        let result = session.render_frame(|eye, _view| {
            let [r, g, b] = EYE_TINT[eye.index()];
            unsafe {
                gl.clear_color(r * pulse, g * pulse, b * pulse, 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        });
        if let Err(e) = result {
            warn!("frame {}: {}", frame, e);
        }

        frame += 1;
        if cli.log_stats_every > 0 && frame % cli.log_stats_every == 0 {
            info!("{}", session.frame_timing().stats());
        }
    }

    info!("requesting exit after {} frames", frame);
    session.end_session()?;
    session.free();
    drop(gl);
    drop(context);

    info!("exiting cleanly");
    Ok(())
}

// ============================================================================
// HIGH-LEVEL INITIALIZATION (called directly from main)
// ============================================================================

/// Connect to the runtime and set up the session for the platform backend
fn create_session(cli: &Cli) -> Result<SessionController> {
    let config = SessionConfig {
        application_name: cli.app_name.clone(),
        reference_space: cli.reference_space.into(),
        image_wait_timeout: Duration::from_millis(cli.wait_timeout_ms),
        ..Default::default()
    };

    let runtime = runtime::platform_runtime()?;
    let mut session = SessionController::new(runtime, backend::platform_backend(), config);
    session.init().context("session setup failed")?;

    match session.runtime_name() {
        Ok(name) => info!("loaded OpenXR runtime: {}", name),
        Err(e) => warn!("runtime properties unavailable: {}", e),
    }
    if let Ok(system) = session.manufacturer_name() {
        info!("system: {}", system);
    }
    info!(
        "ideal eye resolution {}x{}",
        session.hmd_ideal_horiz_res(),
        session.hmd_ideal_vert_res()
    );
    Ok(session)
}

// ============================================================================
// GRAPHICS CONTEXT
// ============================================================================

#[cfg(target_os = "linux")]
mod platform {
    use std::ffi::CString;
    use std::ptr;

    use anyhow::{Result, bail};
    use x11::{glx, xlib};

    /// Unmapped 16x16 window with a current GLX context
    pub struct GlContext {
        display: *mut xlib::Display,
        window: xlib::Window,
        context: glx::GLXContext,
    }

    impl GlContext {
        pub unsafe fn create() -> Result<Self> {
            unsafe {
                let display = xlib::XOpenDisplay(ptr::null());
                if display.is_null() {
                    bail!("XOpenDisplay failed");
                }

                let screen = xlib::XDefaultScreen(display);
                let attrs = [
                    glx::GLX_X_RENDERABLE,
                    1,
                    glx::GLX_DRAWABLE_TYPE,
                    glx::GLX_WINDOW_BIT,
                    glx::GLX_RENDER_TYPE,
                    glx::GLX_RGBA_BIT,
                    glx::GLX_RED_SIZE,
                    8,
                    glx::GLX_GREEN_SIZE,
                    8,
                    glx::GLX_BLUE_SIZE,
                    8,
                    glx::GLX_ALPHA_SIZE,
                    8,
                    glx::GLX_DEPTH_SIZE,
                    24,
                    glx::GLX_DOUBLEBUFFER,
                    1,
                    0,
                ];
                let mut count = 0;
                let configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut count);
                if configs.is_null() || count == 0 {
                    xlib::XCloseDisplay(display);
                    bail!("glXChooseFBConfig found no RGBA8 config");
                }
                let fb_config = *configs;
                xlib::XFree(configs.cast());

                let visual = glx::glXGetVisualFromFBConfig(display, fb_config);
                if visual.is_null() {
                    xlib::XCloseDisplay(display);
                    bail!("glXGetVisualFromFBConfig failed");
                }

                let root = xlib::XDefaultRootWindow(display);
                let mut attributes: xlib::XSetWindowAttributes = std::mem::zeroed();
                attributes.colormap =
                    xlib::XCreateColormap(display, root, (*visual).visual, xlib::AllocNone);
                let window = xlib::XCreateWindow(
                    display,
                    root,
                    0,
                    0,
                    16,
                    16,
                    0,
                    (*visual).depth,
                    xlib::InputOutput as u32,
                    (*visual).visual,
                    xlib::CWColormap,
                    &mut attributes,
                );
                xlib::XFree(visual.cast());
                if let Ok(title) = CString::new("hmd-demo") {
                    xlib::XStoreName(display, window, title.as_ptr());
                }

                let context = glx::glXCreateNewContext(
                    display,
                    fb_config,
                    glx::GLX_RGBA_TYPE,
                    ptr::null_mut(),
                    1,
                );
                if context.is_null() {
                    xlib::XDestroyWindow(display, window);
                    xlib::XCloseDisplay(display);
                    bail!("glXCreateNewContext failed");
                }
                if glx::glXMakeCurrent(display, window, context) == 0 {
                    glx::glXDestroyContext(display, context);
                    xlib::XDestroyWindow(display, window);
                    xlib::XCloseDisplay(display);
                    bail!("glXMakeCurrent failed");
                }

                Ok(Self {
                    display,
                    window,
                    context,
                })
            }
        }
    }

    impl Drop for GlContext {
        fn drop(&mut self) {
            unsafe {
                glx::glXMakeCurrent(self.display, 0, ptr::null_mut());
                glx::glXDestroyContext(self.display, self.context);
                xlib::XDestroyWindow(self.display, self.window);
                xlib::XCloseDisplay(self.display);
            }
        }
    }
}

#[cfg(windows)]
mod platform {
    use anyhow::{Context, Result, bail};
    use windows::{
        Win32::Foundation::*, Win32::Graphics::Gdi::*, Win32::Graphics::OpenGL::*,
        Win32::UI::WindowsAndMessaging::*, core::w,
    };

    /// Hidden window with a current WGL context
    pub struct GlContext {
        window: HWND,
        dc: HDC,
        context: HGLRC,
    }

    impl GlContext {
        pub unsafe fn create() -> Result<Self> {
            unsafe {
                let window = CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    w!("STATIC"),
                    w!("hmd-demo"),
                    WS_OVERLAPPEDWINDOW,
                    0,
                    0,
                    16,
                    16,
                    HWND::default(),
                    HMENU::default(),
                    HINSTANCE::default(),
                    None,
                )
                .context("CreateWindowExW")?;
                let dc = GetDC(window);

                let descriptor = PIXELFORMATDESCRIPTOR {
                    nSize: std::mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16,
                    nVersion: 1,
                    dwFlags: PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL | PFD_DOUBLEBUFFER,
                    iPixelType: PFD_TYPE_RGBA,
                    cColorBits: 32,
                    cAlphaBits: 8,
                    cDepthBits: 24,
                    cStencilBits: 8,
                    ..Default::default()
                };
                let format = ChoosePixelFormat(dc, &descriptor);
                if format == 0 {
                    ReleaseDC(window, dc);
                    let _ = DestroyWindow(window);
                    bail!("ChoosePixelFormat found no RGBA8 format");
                }
                SetPixelFormat(dc, format, &descriptor).context("SetPixelFormat")?;

                let context = wglCreateContext(dc).context("wglCreateContext")?;
                if let Err(e) = wglMakeCurrent(dc, context) {
                    let _ = wglDeleteContext(context);
                    ReleaseDC(window, dc);
                    let _ = DestroyWindow(window);
                    bail!("wglMakeCurrent failed: {e}");
                }

                Ok(Self {
                    window,
                    dc,
                    context,
                })
            }
        }
    }

    impl Drop for GlContext {
        fn drop(&mut self) {
            unsafe {
                let _ = wglMakeCurrent(HDC::default(), HGLRC::default());
                let _ = wglDeleteContext(self.context);
                ReleaseDC(self.window, self.dc);
                let _ = DestroyWindow(self.window);
            }
        }
    }
}
