//! Scoped release of graphics objects created in several steps.

use std::mem;

/// Tracks objects as they are created and releases them, newest first,
/// unless [`ReleaseGuard::disarm`] hands them over before the guard drops.
pub(crate) struct ReleaseGuard<T, F: FnMut(T)> {
    objects: Vec<T>,
    release: F,
}

impl<T: Copy, F: FnMut(T)> ReleaseGuard<T, F> {
    pub fn new(release: F) -> Self {
        Self {
            objects: Vec::new(),
            release,
        }
    }

    /// Records `object` for release and passes it through.
    pub fn track(&mut self, object: T) -> T {
        self.objects.push(object);
        object
    }

    /// Keeps every tracked object alive; the caller now owns them.
    pub fn disarm(mut self) -> Vec<T> {
        mem::take(&mut self.objects)
    }
}

impl<T, F: FnMut(T)> Drop for ReleaseGuard<T, F> {
    fn drop(&mut self) {
        while let Some(object) = self.objects.pop() {
            (self.release)(object);
        }
    }
}
