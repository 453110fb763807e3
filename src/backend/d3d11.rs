//! Dual-API backend: the application renders with OpenGL, the runtime
//! consumes D3D11 swapchains.
//!
//! One BGRA texture is created on the D3D11 device and aliased into OpenGL
//! as a renderbuffer through `WGL_NV_DX_interop`. Each eye renders into that
//! texture while it is locked for OpenGL; once unlocked, a textured quad
//! copies it into the acquired swapchain image.
//!
//! Swapchain images get a render target view each and no depth view: the
//! blit draws without depth testing, and depth for the scene is a
//! renderbuffer attached on the OpenGL side.

use std::ffi::{CStr, c_void};
use std::mem;
use std::ptr;

use glam::Mat4;
use glow::HasContext;
use tracing::{debug, info, warn};
use windows::{
    Win32::Foundation::*, Win32::Graphics::Direct3D::Fxc::*, Win32::Graphics::Direct3D::*,
    Win32::Graphics::Direct3D11::*, Win32::Graphics::Dxgi::Common::*, Win32::Graphics::Dxgi::*,
    Win32::Graphics::OpenGL::*, Win32::System::LibraryLoader::*,
    core::{Error, Interface, PCSTR, s},
};

use super::guard::ReleaseGuard;
use super::{BackendKind, GraphicsBackend, GraphicsBinding, GraphicsRequirements, SwapchainSet};
use crate::error::BackendError;
use crate::interop::wgl::WglInterop;
use crate::interop::{AliasTarget, InteropAccess, InteropBridge, InteropLock};
use crate::math;
use crate::runtime::{GraphicsApi, XrRuntime};
use crate::types::{Eye, InstanceHandle, SessionHandle, SwapchainHandle, SystemId};
use crate::types::ViewConfigurationView;

// ============================================================================
// CONSTANTS
// ============================================================================

/// `DXGI_FORMAT_R8G8B8A8_UNORM`, the eye swapchain format.
pub const SWAPCHAIN_FORMAT: i64 = DXGI_FORMAT_R8G8B8A8_UNORM.0 as i64;

/// The interop texture is BGRA; sampling in the blit shader reorders it.
const INTEROP_FORMAT: DXGI_FORMAT = DXGI_FORMAT_B8G8R8A8_UNORM;

const QUAD_INDICES: [u16; 6] = [2, 1, 0, 2, 0, 3];

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
struct BlitVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone)]
struct BlitConstants {
    transform: [f32; 16],
    projection: [f32; 16],
}

/// Direct3D 11 device on the runtime's adapter
struct D3DContext {
    device: ID3D11Device,
    device_context: ID3D11DeviceContext,
}

/// The aliased color buffer and the OpenGL objects rendering into it
struct InteropTarget {
    bridge: InteropBridge<WglInterop>,
    texture: ID3D11Texture2D,
    shader_view: ID3D11ShaderResourceView,
    color: glow::Renderbuffer,
    depth: glow::Renderbuffer,
    framebuffer: glow::Framebuffer,
    lock: Option<InteropLock>,
}

/// OpenGL object owned by the interop target
#[derive(Debug, Copy, Clone)]
enum GlObject {
    Renderbuffer(glow::Renderbuffer),
    Framebuffer(glow::Framebuffer),
}

/// Pipeline drawing the interop texture over a whole swapchain image
struct BlitResources {
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    input_layout: ID3D11InputLayout,
    vertex_buffer: ID3D11Buffer,
    index_buffer: ID3D11Buffer,
    constant_buffer: ID3D11Buffer,
    sampler: ID3D11SamplerState,
    rasterizer_state: ID3D11RasterizerState,
    depth_stencil_state: ID3D11DepthStencilState,
}

pub struct D3D11Backend {
    d3d: Option<D3DContext>,
    gl: Option<glow::Context>,
    swapchains: SwapchainSet<ID3D11RenderTargetView>,
    interop: Option<InteropTarget>,
    blit: Option<BlitResources>,
}

impl Default for D3D11Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl D3D11Backend {
    pub fn new() -> Self {
        Self {
            d3d: None,
            gl: None,
            swapchains: SwapchainSet::new(),
            interop: None,
            blit: None,
        }
    }

    fn d3d(&self) -> Result<&D3DContext, BackendError> {
        self.d3d
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))
    }
}

// ============================================================================
// GRAPHICS BACKEND
// ============================================================================

impl GraphicsBackend for D3D11Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::DualApi
    }

    fn graphics_api(&self) -> GraphicsApi {
        GraphicsApi::D3D11
    }

    fn graphics_binding(
        &mut self,
        runtime: &dyn XrRuntime,
        _instance: InstanceHandle,
        system: SystemId,
    ) -> Result<GraphicsBinding, BackendError> {
        let GraphicsRequirements::D3D11 {
            adapter_luid,
            min_feature_level,
        } = runtime.graphics_requirements(system, GraphicsApi::D3D11)?
        else {
            return Err(BackendError::Graphics(
                "runtime returned non-D3D11 requirements".into(),
            ));
        };

        // The OpenGL side of the interop has to exist before the device.
        if unsafe { wglGetCurrentContext() }.0.is_null() {
            return Err(BackendError::NoCurrentContext);
        }

        let d3d = unsafe {
            let adapter = find_adapter(luid_from_bytes(adapter_luid))?;
            init_d3d11(&adapter, min_feature_level)?
        };
        let gl = load_gl()?;

        let binding = GraphicsBinding::D3D11 {
            device: d3d.device.as_raw(),
        };
        self.d3d = Some(d3d);
        self.gl = Some(gl);
        Ok(binding)
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
        let device = &self
            .d3d
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?
            .device;
        self.swapchains
            .create(runtime, session, views, SWAPCHAIN_FORMAT, |_, _, image| unsafe {
                create_render_target_view(device, image)
            })?;
        info!(
            "D3D11: {} swapchains, {} render target views each",
            self.swapchains.len(),
            self.swapchains.max_image_count()
        );
        Ok(())
    }

    fn init_platform_resources(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if self.swapchains.is_empty() {
            return Err(BackendError::NotInitialized("swapchains"));
        }
        let d3d = self.d3d()?;
        let gl = self
            .gl
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?;

        // Blit resources are COM objects and release themselves on drop.
        let (blit, interop) = unsafe {
            let blit = create_blit_resources(&d3d.device, width, height)?;
            (blit, create_interop_target(d3d, gl, width, height)?)
        };
        debug!("D3D11: interop target and blit pipeline {}x{}", width, height);
        self.interop = Some(interop);
        self.blit = Some(blit);
        Ok(())
    }

    fn begin_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        let (width, height) = {
            self.swapchains.surface(eye, image_index)?;
            let chain = self.swapchains.get(eye).ok_or(BackendError::EyeOutOfRange(eye))?;
            (chain.width, chain.height)
        };
        let gl = self
            .gl
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?;
        let target = self
            .interop
            .as_mut()
            .ok_or(BackendError::NotInitialized("platform resources"))?;

        target.lock = Some(target.bridge.lock()?);
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.framebuffer));
            gl.viewport(0, 0, width as i32, height as i32);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        Ok(())
    }

    fn end_eye_frame(&mut self, eye: Eye, image_index: u32) -> Result<(), BackendError> {
        let rtv = &self.swapchains.surface(eye, image_index)?.surface;
        let chain = self.swapchains.get(eye).ok_or(BackendError::EyeOutOfRange(eye))?;
        let d3d = self
            .d3d
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?;
        let gl = self
            .gl
            .as_ref()
            .ok_or(BackendError::NotInitialized("graphics binding"))?;
        let target = self
            .interop
            .as_mut()
            .ok_or(BackendError::NotInitialized("platform resources"))?;
        let blit = self
            .blit
            .as_ref()
            .ok_or(BackendError::NotInitialized("platform resources"))?;

        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        let lock = target
            .lock
            .take()
            .ok_or(BackendError::Graphics(format!("{eye:?} eye was not begun")))?;
        target.bridge.unlock(lock)?;

        unsafe {
            draw_blit(
                &d3d.device_context,
                blit,
                &target.shader_view,
                rtv,
                (chain.width, chain.height),
            );
        }
        Ok(())
    }

    fn swapchain_handle(&self, eye: Eye) -> Option<SwapchainHandle> {
        self.swapchains.handle(eye)
    }

    fn free(&mut self, runtime: &mut dyn XrRuntime) -> bool {
        let Some(d3d) = self.d3d.take() else {
            return false;
        };
        let gl = self.gl.take();

        if let Some(mut target) = self.interop.take() {
            target.bridge.close();
            if let Some(gl) = &gl {
                unsafe {
                    gl.delete_framebuffer(target.framebuffer);
                    gl.delete_renderbuffer(target.depth);
                    gl.delete_renderbuffer(target.color);
                }
            }
            debug!("D3D11: released interop texture {:?}", target.texture);
        }
        self.blit = None;
        let destroyed = self.swapchains.destroy(runtime, drop);

        unsafe {
            d3d.device_context.ClearState();
            d3d.device_context.Flush();
        }
        debug!("D3D11: released {} swapchains and the device", destroyed);
        true
    }
}

// ============================================================================
// DEVICE CREATION
// ============================================================================

fn d3d_error(call: &'static str) -> impl Fn(Error) -> BackendError {
    move |e| BackendError::Graphics(format!("{call}: {e}"))
}

fn created<T>(value: Option<T>, what: &str) -> Result<T, BackendError> {
    value.ok_or_else(|| BackendError::Graphics(format!("{what} was not created")))
}

fn luid_from_bytes(bytes: [u8; 8]) -> LUID {
    LUID {
        LowPart: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        HighPart: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    }
}

fn adapter_name(desc: &DXGI_ADAPTER_DESC) -> String {
    let len = desc
        .Description
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(desc.Description.len());
    String::from_utf16_lossy(&desc.Description[..len])
}

/// Find the DXGI adapter the runtime asked for
unsafe fn find_adapter(luid: LUID) -> Result<IDXGIAdapter, BackendError> {
    unsafe {
        let factory: IDXGIFactory1 =
            CreateDXGIFactory1().map_err(d3d_error("CreateDXGIFactory1"))?;
        let mut index = 0;
        while let Ok(adapter) = factory.EnumAdapters(index) {
            let desc = adapter.GetDesc().map_err(d3d_error("GetDesc"))?;
            if desc.AdapterLuid.LowPart == luid.LowPart
                && desc.AdapterLuid.HighPart == luid.HighPart
            {
                info!("D3D11: using adapter {}", adapter_name(&desc));
                return Ok(adapter);
            }
            index += 1;
        }
        Err(BackendError::AdapterNotFound)
    }
}

/// Initialize Direct3D 11 device and context
unsafe fn init_d3d11(
    adapter: &IDXGIAdapter,
    min_feature_level: u32,
) -> Result<D3DContext, BackendError> {
    unsafe {
        let feature_levels = [D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_11_0];

        let mut device: Option<ID3D11Device> = None;
        let mut device_context: Option<ID3D11DeviceContext> = None;
        let mut feature_level = D3D_FEATURE_LEVEL_11_0;

        D3D11CreateDevice(
            adapter,
            D3D_DRIVER_TYPE_UNKNOWN,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            Some(&feature_levels),
            D3D11_SDK_VERSION,
            Some(&mut device),
            Some(&mut feature_level),
            Some(&mut device_context),
        )
        .map_err(d3d_error("D3D11CreateDevice"))?;

        if (feature_level.0 as u32) < min_feature_level {
            return Err(BackendError::Graphics(format!(
                "feature level {:#x} is below the required {:#x}",
                feature_level.0, min_feature_level
            )));
        }
        info!("D3D11: device with feature level {:#x}", feature_level.0);

        Ok(D3DContext {
            device: created(device, "D3D11 device")?,
            device_context: created(device_context, "D3D11 device context")?,
        })
    }
}

/// Loads GL entry points from the current WGL context, falling back to
/// `opengl32.dll` for the GL 1.1 functions `wglGetProcAddress` does not serve.
pub fn load_gl() -> Result<glow::Context, BackendError> {
    let opengl32 =
        unsafe { GetModuleHandleA(s!("opengl32.dll")) }.map_err(d3d_error("GetModuleHandleA"))?;
    Ok(unsafe {
        glow::Context::from_loader_function_cstr(|name: &CStr| {
            let name = PCSTR(name.as_ptr().cast());
            // Some drivers report failure as a small integer instead of null.
            wglGetProcAddress(name)
                .filter(|f| !matches!(*f as isize, -1 | 0..=3))
                .or_else(|| GetProcAddress(opengl32, name))
                .map_or(ptr::null(), |f| f as *const c_void)
        })
    })
}

unsafe fn create_render_target_view(
    device: &ID3D11Device,
    image: u64,
) -> Result<ID3D11RenderTargetView, BackendError> {
    unsafe {
        let raw = image as usize as *mut c_void;
        let texture = ID3D11Texture2D::from_raw_borrowed(&raw).ok_or_else(|| {
            BackendError::Graphics(format!("invalid swapchain texture {image:#x}"))
        })?;

        let rtv_desc = D3D11_RENDER_TARGET_VIEW_DESC {
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            ViewDimension: D3D11_RTV_DIMENSION_TEXTURE2D,
            Anonymous: D3D11_RENDER_TARGET_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_RTV { MipSlice: 0 },
            },
        };

        let mut rtv: Option<ID3D11RenderTargetView> = None;
        device
            .CreateRenderTargetView(texture, Some(&rtv_desc), Some(&mut rtv))
            .map_err(d3d_error("CreateRenderTargetView"))?;
        created(rtv, "render target view")
    }
}

// ============================================================================
// INTEROP TARGET
// ============================================================================

unsafe fn create_interop_target(
    d3d: &D3DContext,
    gl: &glow::Context,
    width: u32,
    height: u32,
) -> Result<InteropTarget, BackendError> {
    unsafe {
        let texture_desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: INTEROP_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: (D3D11_BIND_SHADER_RESOURCE.0 | D3D11_BIND_RENDER_TARGET.0) as u32,
            CPUAccessFlags: Default::default(),
            MiscFlags: Default::default(),
        };
        let mut texture: Option<ID3D11Texture2D> = None;
        d3d.device
            .CreateTexture2D(&texture_desc, None, Some(&mut texture))
            .map_err(d3d_error("CreateTexture2D"))?;
        let texture = created(texture, "interop texture")?;

        let mut shader_view: Option<ID3D11ShaderResourceView> = None;
        d3d.device
            .CreateShaderResourceView(&texture, None, Some(&mut shader_view))
            .map_err(d3d_error("CreateShaderResourceView"))?;
        let shader_view = created(shader_view, "interop shader resource view")?;

        // Declared before the bridge: locals drop in reverse, so `color` is
        // unregistered before it is deleted.
        let mut gl_objects = ReleaseGuard::new(|object: GlObject| match object {
            GlObject::Renderbuffer(renderbuffer) => gl.delete_renderbuffer(renderbuffer),
            GlObject::Framebuffer(framebuffer) => gl.delete_framebuffer(framebuffer),
        });
        let mut bridge = InteropBridge::open(WglInterop::load()?, d3d.device.as_raw())?;

        let color = gl.create_renderbuffer().map_err(BackendError::Graphics)?;
        gl_objects.track(GlObject::Renderbuffer(color));
        bridge.register(
            texture.as_raw(),
            color.0.get(),
            AliasTarget::Renderbuffer,
            InteropAccess::ReadWrite,
        )?;

        let depth = gl.create_renderbuffer().map_err(BackendError::Graphics)?;
        gl_objects.track(GlObject::Renderbuffer(depth));
        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
        gl.renderbuffer_storage(
            glow::RENDERBUFFER,
            glow::DEPTH_COMPONENT24,
            width as i32,
            height as i32,
        );
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        let framebuffer = gl.create_framebuffer().map_err(BackendError::Graphics)?;
        gl_objects.track(GlObject::Framebuffer(framebuffer));
        let status = bridge.with_lock(|| {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                Some(color),
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            status
        })?;
        if status != glow::FRAMEBUFFER_COMPLETE {
            return Err(BackendError::Graphics(format!(
                "interop framebuffer incomplete: {status:#x}"
            )));
        }
        gl_objects.disarm();
        info!("interop: {}x{} color buffer shared with OpenGL", width, height);

        Ok(InteropTarget {
            bridge,
            texture,
            shader_view,
            color,
            depth,
            framebuffer,
            lock: None,
        })
    }
}

// ============================================================================
// BLIT PIPELINE
// ============================================================================

/// Quad covering a `width` x `height` surface centered on the origin.
///
/// OpenGL writes rows bottom-up, so the bottom edge samples v = 0.
fn quad_vertices(width: f32, height: f32) -> [BlitVertex; 4] {
    let (x, y) = (width / 2.0, height / 2.0);
    let vertex = |position: [f32; 2], uv: [f32; 2]| BlitVertex {
        position: [position[0], position[1], 0.0],
        normal: [0.0, 0.0, -1.0],
        uv,
        color: [1.0, 1.0, 1.0, 1.0],
    };
    [
        vertex([-x, -y], [0.0, 0.0]),
        vertex([x, -y], [1.0, 0.0]),
        vertex([x, y], [1.0, 1.0]),
        vertex([-x, y], [0.0, 1.0]),
    ]
}

fn blit_constants(width: f32, height: f32) -> BlitConstants {
    BlitConstants {
        transform: Mat4::IDENTITY.to_cols_array(),
        projection: math::blit_projection(width, height).to_cols_array(),
    }
}

unsafe fn create_buffer<T>(
    device: &ID3D11Device,
    data: &[T],
    bind_flags: D3D11_BIND_FLAG,
) -> Result<ID3D11Buffer, BackendError> {
    unsafe {
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: mem::size_of_val(data) as u32,
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind_flags.0 as u32,
            CPUAccessFlags: Default::default(),
            MiscFlags: Default::default(),
            StructureByteStride: 0,
        };
        let initial = D3D11_SUBRESOURCE_DATA {
            pSysMem: data.as_ptr() as *const _,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        };
        let mut buffer: Option<ID3D11Buffer> = None;
        device
            .CreateBuffer(&desc, Some(&initial), Some(&mut buffer))
            .map_err(d3d_error("CreateBuffer"))?;
        created(buffer, "buffer")
    }
}

unsafe fn create_blit_resources(
    device: &ID3D11Device,
    width: u32,
    height: u32,
) -> Result<BlitResources, BackendError> {
    unsafe {
        let shader_code = include_str!("blit.hlsl");
        let vs_blob = compile_shader(shader_code, c"VSMain", c"vs_5_0")?;
        let ps_blob = compile_shader(shader_code, c"PSMain", c"ps_5_0")?;

        let vs_bytecode = std::slice::from_raw_parts(
            vs_blob.GetBufferPointer() as *const u8,
            vs_blob.GetBufferSize(),
        );
        let mut vertex_shader: Option<ID3D11VertexShader> = None;
        device
            .CreateVertexShader(vs_bytecode, None, Some(&mut vertex_shader))
            .map_err(d3d_error("CreateVertexShader"))?;

        let ps_bytecode = std::slice::from_raw_parts(
            ps_blob.GetBufferPointer() as *const u8,
            ps_blob.GetBufferSize(),
        );
        let mut pixel_shader: Option<ID3D11PixelShader> = None;
        device
            .CreatePixelShader(ps_bytecode, None, Some(&mut pixel_shader))
            .map_err(d3d_error("CreatePixelShader"))?;

        let element = |name: &'static CStr, format: DXGI_FORMAT, offset: u32| {
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(name.as_ptr() as _),
                SemanticIndex: 0,
                Format: format,
                InputSlot: 0,
                AlignedByteOffset: offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            }
        };
        let input_layout_desc = [
            element(c"POSITION", DXGI_FORMAT_R32G32B32_FLOAT, 0),
            element(c"NORMAL", DXGI_FORMAT_R32G32B32_FLOAT, 12),
            element(c"TEXCOORD", DXGI_FORMAT_R32G32_FLOAT, 24),
            element(c"COLOR", DXGI_FORMAT_R32G32B32A32_FLOAT, 32),
        ];
        let mut input_layout: Option<ID3D11InputLayout> = None;
        device
            .CreateInputLayout(&input_layout_desc, vs_bytecode, Some(&mut input_layout))
            .map_err(d3d_error("CreateInputLayout"))?;

        let (w, h) = (width as f32, height as f32);
        let vertex_buffer =
            create_buffer(device, &quad_vertices(w, h), D3D11_BIND_VERTEX_BUFFER)?;
        let index_buffer = create_buffer(device, &QUAD_INDICES, D3D11_BIND_INDEX_BUFFER)?;
        let constant_buffer =
            create_buffer(device, &[blit_constants(w, h)], D3D11_BIND_CONSTANT_BUFFER)?;

        let sampler_desc = D3D11_SAMPLER_DESC {
            Filter: D3D11_FILTER_MIN_MAG_MIP_POINT,
            AddressU: D3D11_TEXTURE_ADDRESS_CLAMP,
            AddressV: D3D11_TEXTURE_ADDRESS_CLAMP,
            AddressW: D3D11_TEXTURE_ADDRESS_CLAMP,
            MipLODBias: 0.0,
            MaxAnisotropy: 1,
            ComparisonFunc: D3D11_COMPARISON_NEVER,
            BorderColor: [0.0; 4],
            MinLOD: 0.0,
            MaxLOD: f32::MAX,
        };
        let mut sampler: Option<ID3D11SamplerState> = None;
        device
            .CreateSamplerState(&sampler_desc, Some(&mut sampler))
            .map_err(d3d_error("CreateSamplerState"))?;

        let rasterizer_desc = D3D11_RASTERIZER_DESC {
            FillMode: D3D11_FILL_SOLID,
            CullMode: D3D11_CULL_NONE,
            FrontCounterClockwise: FALSE,
            DepthBias: 0,
            DepthBiasClamp: 0.0,
            SlopeScaledDepthBias: 0.0,
            DepthClipEnable: TRUE,
            ScissorEnable: FALSE,
            MultisampleEnable: FALSE,
            AntialiasedLineEnable: FALSE,
        };
        let mut rasterizer_state: Option<ID3D11RasterizerState> = None;
        device
            .CreateRasterizerState(&rasterizer_desc, Some(&mut rasterizer_state))
            .map_err(d3d_error("CreateRasterizerState"))?;

        let depth_stencil_desc = D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: FALSE,
            DepthWriteMask: D3D11_DEPTH_WRITE_MASK_ZERO,
            DepthFunc: D3D11_COMPARISON_ALWAYS,
            StencilEnable: FALSE,
            StencilReadMask: 0,
            StencilWriteMask: 0,
            FrontFace: Default::default(),
            BackFace: Default::default(),
        };
        let mut depth_stencil_state: Option<ID3D11DepthStencilState> = None;
        device
            .CreateDepthStencilState(&depth_stencil_desc, Some(&mut depth_stencil_state))
            .map_err(d3d_error("CreateDepthStencilState"))?;

        Ok(BlitResources {
            vertex_shader: created(vertex_shader, "vertex shader")?,
            pixel_shader: created(pixel_shader, "pixel shader")?,
            input_layout: created(input_layout, "input layout")?,
            vertex_buffer,
            index_buffer,
            constant_buffer,
            sampler: created(sampler, "sampler")?,
            rasterizer_state: created(rasterizer_state, "rasterizer state")?,
            depth_stencil_state: created(depth_stencil_state, "depth stencil state")?,
        })
    }
}

/// Copy the interop texture into `rtv` and unbind both again
unsafe fn draw_blit(
    device_context: &ID3D11DeviceContext,
    blit: &BlitResources,
    source: &ID3D11ShaderResourceView,
    rtv: &ID3D11RenderTargetView,
    size: (u32, u32),
) {
    unsafe {
        device_context.OMSetRenderTargets(Some(&[Some(rtv.clone())]), None);
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: size.0 as f32,
            Height: size.1 as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        device_context.RSSetViewports(Some(&[viewport]));
        device_context.RSSetState(&blit.rasterizer_state);
        device_context.OMSetDepthStencilState(&blit.depth_stencil_state, 0);

        device_context.IASetInputLayout(&blit.input_layout);
        device_context.IASetPrimitiveTopology(D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        let stride = mem::size_of::<BlitVertex>() as u32;
        let offset = 0u32;
        device_context.IASetVertexBuffers(
            0,
            1,
            Some(&Some(blit.vertex_buffer.clone())),
            Some(&stride),
            Some(&offset),
        );
        device_context.IASetIndexBuffer(&blit.index_buffer, DXGI_FORMAT_R16_UINT, 0);

        device_context.VSSetShader(&blit.vertex_shader, None);
        device_context.VSSetConstantBuffers(0, Some(&[Some(blit.constant_buffer.clone())]));
        device_context.PSSetShader(&blit.pixel_shader, None);
        device_context.PSSetShaderResources(0, Some(&[Some(source.clone())]));
        device_context.PSSetSamplers(0, Some(&[Some(blit.sampler.clone())]));

        device_context.DrawIndexed(QUAD_INDICES.len() as u32, 0, 0);

        // The source must not stay bound while OpenGL renders into it.
        device_context.PSSetShaderResources(0, Some(&[None]));
        device_context.OMSetRenderTargets(None, None);
    }
}

/// Compile HLSL shader from source
unsafe fn compile_shader(
    source: &str,
    entry_point: &CStr,
    target: &CStr,
) -> Result<ID3DBlob, BackendError> {
    unsafe {
        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;

        let source_bytes = source.as_bytes();
        let result = D3DCompile(
            source_bytes.as_ptr() as *const _,
            source_bytes.len(),
            None,
            None,
            None,
            PCSTR(entry_point.as_ptr() as *const u8),
            PCSTR(target.as_ptr() as *const u8),
            D3DCOMPILE_OPTIMIZATION_LEVEL3,
            0,
            &mut blob,
            Some(&mut error_blob),
        );

        if let Err(e) = result {
            let message = match error_blob {
                Some(error_blob) => {
                    let error_msg = std::slice::from_raw_parts(
                        error_blob.GetBufferPointer() as *const u8,
                        error_blob.GetBufferSize(),
                    );
                    String::from_utf8_lossy(error_msg).into_owned()
                }
                None => e.to_string(),
            };
            warn!("D3D11: {:?} failed to compile", entry_point);
            return Err(BackendError::Graphics(format!(
                "shader compilation failed: {message}"
            )));
        }

        created(blob, "shader blob")
    }
}
