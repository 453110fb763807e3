//! Per-eye swapchain table shared by both backends.

use tracing::{debug, warn};

use crate::error::BackendError;
use crate::runtime::XrRuntime;
use crate::types::{Eye, SessionHandle, SwapchainCreateInfo, SwapchainHandle, ViewConfigurationView};

/// One runtime image plus the backend's render target for it.
#[derive(Debug)]
pub struct SurfaceImage<S> {
    /// Native image name as enumerated by the runtime.
    pub image: u64,
    pub surface: S,
}

#[derive(Debug)]
pub struct Swapchain<S> {
    pub handle: SwapchainHandle,
    pub width: u32,
    pub height: u32,
    /// Sized to the longest chain in the set; slots past this chain's own
    /// image count stay empty.
    pub images: Vec<Option<SurfaceImage<S>>>,
    image_count: usize,
}

impl<S> Swapchain<S> {
    pub fn image_count(&self) -> usize {
        self.image_count
    }
}

/// Swapchains indexed by eye.
#[derive(Debug)]
pub struct SwapchainSet<S> {
    chains: Vec<Swapchain<S>>,
}

impl<S> Default for SwapchainSet<S> {
    fn default() -> Self {
        Self { chains: Vec::new() }
    }
}

impl<S> SwapchainSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a swapchain per view in `format` and builds a surface for
    /// every image with `make_surface(width, height, image)`.
    ///
    /// Swapchains created before a failure stay in the set so that
    /// [`destroy`](Self::destroy) can release them.
    pub fn create<F>(
        &mut self,
        runtime: &mut dyn XrRuntime,
        session: SessionHandle,
        views: &[ViewConfigurationView],
        format: i64,
        mut make_surface: F,
    ) -> Result<(), BackendError>
    where
        F: FnMut(u32, u32, u64) -> Result<S, BackendError>,
    {
        let mut enumerated = Vec::with_capacity(views.len());
        for view in views {
            let info = SwapchainCreateInfo::for_view(view, format);
            let handle = runtime.create_swapchain(session, &info)?;
            self.chains.push(Swapchain {
                handle,
                width: info.width,
                height: info.height,
                images: Vec::new(),
                image_count: 0,
            });
            let images = runtime.enumerate_swapchain_images(handle)?;
            debug!(
                "XR: swapchain {:?} {}x{} has {} images",
                handle,
                info.width,
                info.height,
                images.len()
            );
            enumerated.push(images);
        }

        // Eyes may differ in image count; pad every chain to the longest.
        let max_images = enumerated.iter().map(Vec::len).max().unwrap_or(0);
        for (chain, images) in self.chains.iter_mut().zip(enumerated) {
            chain.image_count = images.len();
            chain.images.resize_with(max_images, || None);
            for (slot, image) in chain.images.iter_mut().zip(images) {
                let surface = make_surface(chain.width, chain.height, image)?;
                *slot = Some(SurfaceImage { image, surface });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn max_image_count(&self) -> usize {
        self.chains.first().map_or(0, |chain| chain.images.len())
    }

    pub fn get(&self, eye: Eye) -> Option<&Swapchain<S>> {
        self.chains.get(eye.index())
    }

    pub fn handle(&self, eye: Eye) -> Option<SwapchainHandle> {
        self.get(eye).map(|chain| chain.handle)
    }

    pub fn surface(&self, eye: Eye, image_index: u32) -> Result<&SurfaceImage<S>, BackendError> {
        let chain = self.get(eye).ok_or(BackendError::EyeOutOfRange(eye))?;
        chain
            .images
            .get(image_index as usize)
            .and_then(Option::as_ref)
            .ok_or(BackendError::ImageOutOfRange {
                eye,
                index: image_index,
                count: chain.image_count,
            })
    }

    /// Hands every surface to `release` and destroys the swapchains, last
    /// eye first. Returns how many swapchains were destroyed.
    pub fn destroy<F>(&mut self, runtime: &mut dyn XrRuntime, mut release: F) -> usize
    where
        F: FnMut(S),
    {
        let mut destroyed = 0;
        while let Some(chain) = self.chains.pop() {
            for slot in chain.images.into_iter().rev() {
                if let Some(image) = slot {
                    release(image.surface);
                }
            }
            match runtime.destroy_swapchain(chain.handle) {
                Ok(()) => destroyed += 1,
                Err(e) => warn!("XR: failed to destroy swapchain {:?}: {}", chain.handle, e),
            }
        }
        destroyed
    }
}
