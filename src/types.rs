//! Runtime-facing data model: opaque handles, poses, views and layers.
//!
//! These mirror the OpenXR structures the session engine exchanges with the
//! runtime, without tying callers to the `openxr` crate.

use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            pub const NULL: Self = Self(0);

            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn into_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Connection to the runtime.
    InstanceHandle
);
handle!(
    /// Physical HMD class resolved from an instance.
    SystemId
);
handle!(
    /// Rendering session bound to a system and a graphics binding.
    SessionHandle
);
handle!(
    /// Reference frame poses are expressed in.
    SpaceHandle
);
handle!(
    /// Runtime-owned ring of presentable images for one eye.
    SwapchainHandle
);

/// Stereo eye. The discriminant is the view index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

impl Eye {
    pub const COUNT: usize = 2;
    pub const ALL: [Eye; Eye::COUNT] = [Eye::Left, Eye::Right];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Eye> {
        Eye::ALL.get(index).copied()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quaternionf {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternionf {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternionf {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Posef {
    pub orientation: Quaternionf,
    pub position: Vector3f,
}

impl Posef {
    pub const IDENTITY: Self = Self {
        orientation: Quaternionf::IDENTITY,
        position: Vector3f {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
    };
}

/// Field of view as four half-angles in radians (left/down are negative).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Fovf {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

/// Located pose and field of view of one eye at a predicted display time.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct View {
    pub pose: Posef,
    pub fov: Fovf,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ViewConfigurationType {
    PrimaryMono,
    PrimaryStereo,
    Other(i32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ViewConfigurationProperties {
    pub view_configuration_type: ViewConfigurationType,
    pub fov_mutable: bool,
}

/// Recommended and maximum image parameters for one view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ViewConfigurationView {
    pub recommended_image_rect_width: u32,
    pub max_image_rect_width: u32,
    pub recommended_image_rect_height: u32,
    pub max_image_rect_height: u32,
    pub recommended_swapchain_sample_count: u32,
    pub max_swapchain_sample_count: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EnvironmentBlendMode {
    Opaque,
    Additive,
    AlphaBlend,
    Other(i32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ReferenceSpaceKind {
    View,
    #[default]
    Local,
    Stage,
}

/// Runtime timestamp in nanoseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(pub i64);

impl Time {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

/// Result of a frame wait: when the frame will be displayed and whether the
/// compositor wants pixels for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub predicted_display_time: Time,
    pub predicted_display_period_ns: i64,
    pub should_render: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    pub format: i64,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
    pub face_count: u32,
    pub array_size: u32,
    pub mip_count: u32,
}

impl SwapchainCreateInfo {
    /// Single-layer, single-mip color attachment for one eye.
    pub fn for_view(view: &ViewConfigurationView, format: i64) -> Self {
        Self {
            format,
            sample_count: view.recommended_swapchain_sample_count.max(1),
            width: view.recommended_image_rect_width,
            height: view.recommended_image_rect_height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Rect2Di {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SwapchainSubImage {
    pub swapchain: SwapchainHandle,
    pub image_array_index: u32,
    pub image_rect: Rect2Di,
}

/// One eye's entry in a projection layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionView {
    pub pose: Posef,
    pub fov: Fovf,
    pub sub_image: SwapchainSubImage,
}

/// Projection layer submitted at frame end. Views are rebuilt every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionLayer {
    pub space: SpaceHandle,
    pub views: Vec<ProjectionView>,
}

/// Session state as reported by the runtime through state-change events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeSessionState {
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl RuntimeSessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Synchronized => "synchronized",
            Self::Visible => "visible",
            Self::Focused => "focused",
            Self::Stopping => "stopping",
            Self::LossPending => "loss-pending",
            Self::Exiting => "exiting",
        }
    }
}

/// Graphics API version as reported in runtime requirements.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Runtime identity, as returned by instance property queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProperties {
    pub runtime_name: String,
    pub runtime_version: ApiVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProperties {
    pub system_name: String,
    pub vendor_id: u32,
    pub max_swapchain_image_width: u32,
    pub max_swapchain_image_height: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
}
