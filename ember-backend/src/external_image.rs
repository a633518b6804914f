use std::ffi::c_void;
use std::fmt;
use std::ptr;

/// Callback used to hand an external image back to its producer.
///
/// It is guaranteed to be called on the engine's designated thread, not
/// necessarily the thread that last held the handle. See
/// [`ReleaseQueue`](crate::release::ReleaseQueue).
pub type ReleaseCallback = fn(image: *mut c_void, user: *mut c_void);

/// A reference to an image owned outside the engine, together with the
/// obligation to notify its producer exactly once when the engine is done
/// with it.
///
/// The handle never owns the image bytes and never dereferences or frees
/// `image`; it only carries the release obligation. Dropping a handle that
/// holds a callback invokes that callback with the current `image` and `user`
/// values. Dropping a handle without a callback does nothing.
///
/// The handle is move-only. Moving it by value transfers the obligation, and
/// the moved-from binding is statically dead, so the callback can never fire
/// twice. For `&mut` slots (struct fields, containers) use [`take`] to move
/// the obligation out explicitly.
///
/// [`take`]: ExternalImage::take
pub struct ExternalImage {
    /// The opaque address of the externally owned image.
    ///
    /// The holder may overwrite this after construction; the release callback
    /// receives whatever value is current when it fires.
    pub image: *mut c_void,
    callback: Option<ReleaseCallback>,
    user: *mut c_void,
}

// The handle never dereferences `image` or `user`; the producer guarantees
// both stay valid until the callback runs, on whichever thread that is.
unsafe impl Send for ExternalImage {}

static_assertions::assert_impl_all!(ExternalImage: Send);
static_assertions::assert_not_impl_any!(ExternalImage: Clone, Copy, Sync);

impl ExternalImage {
    /// Creates a handle with no release obligation.
    pub fn new(image: *mut c_void) -> Self {
        Self {
            image,
            callback: None,
            user: ptr::null_mut(),
        }
    }

    /// Creates a handle that will invoke `callback(image, user)` when dropped.
    pub fn with_callback(image: *mut c_void, callback: ReleaseCallback, user: *mut c_void) -> Self {
        Self {
            image,
            callback: Some(callback),
            user,
        }
    }

    /// Sets or replaces the release callback and its user context.
    ///
    /// This is a pure metadata update: the previous callback is discarded
    /// without being invoked. Replacing a pending obligation this way loses
    /// it, which is the caller's responsibility to avoid.
    pub fn set_callback(&mut self, callback: ReleaseCallback, user: *mut c_void) {
        self.callback = Some(callback);
        self.user = user;
    }

    /// Drops the release obligation without invoking it.
    ///
    /// Same sharp edge as [`set_callback`](Self::set_callback): the producer
    /// is never notified.
    pub fn clear_callback(&mut self) {
        self.callback = None;
        self.user = ptr::null_mut();
    }

    /// Returns whether a release callback is set.
    #[inline]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Returns the currently set release callback, if any.
    #[inline]
    pub fn callback(&self) -> Option<ReleaseCallback> {
        self.callback
    }

    /// Returns the opaque user pointer passed to the callback.
    #[inline]
    pub fn user(&self) -> *mut c_void {
        self.user
    }

    /// Moves the image reference and its release obligation out of `self`,
    /// leaving behind an empty handle whose drop is a no-op.
    pub fn take(&mut self) -> ExternalImage {
        std::mem::take(self)
    }
}

impl Default for ExternalImage {
    fn default() -> Self {
        Self::new(ptr::null_mut())
    }
}

impl fmt::Debug for ExternalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalImage")
            .field("image", &self.image)
            .field("has_callback", &self.has_callback())
            .field("user", &self.user)
            .finish()
    }
}

impl Drop for ExternalImage {
    fn drop(&mut self) {
        if let Some(callback) = self.callback {
            callback(self.image, self.user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

    /// Observation point handed to callbacks through the `user` pointer.
    #[derive(Default)]
    struct Observed {
        calls: AtomicUsize,
        image: AtomicPtr<c_void>,
    }

    impl Observed {
        fn as_user(&self) -> *mut c_void {
            self as *const Observed as *mut c_void
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn image(&self) -> *mut c_void {
            self.image.load(Ordering::SeqCst)
        }
    }

    fn record(image: *mut c_void, user: *mut c_void) {
        let observed = unsafe { &*(user as *const Observed) };
        observed.image.store(image, Ordering::SeqCst);
        observed.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn never(_image: *mut c_void, _user: *mut c_void) {
        panic!("replaced callback must not fire");
    }

    fn fake_image(tag: usize) -> *mut c_void {
        tag as *mut c_void
    }

    #[test]
    fn drop_invokes_callback_once() {
        let observed = Observed::default();
        let handle = ExternalImage::with_callback(fake_image(0x10), record, observed.as_user());
        drop(handle);
        assert_eq!(observed.calls(), 1);
        assert_eq!(observed.image(), fake_image(0x10));
    }

    #[test]
    fn default_handle_drop_is_noop() {
        let handle = ExternalImage::default();
        assert!(!handle.has_callback());
        assert!(handle.image.is_null());
        drop(handle);
    }

    #[test]
    fn handle_without_callback_drop_is_noop() {
        let handle = ExternalImage::new(fake_image(0x20));
        assert!(!handle.has_callback());
        drop(handle);
    }

    #[test]
    fn take_transfers_the_obligation() {
        let observed = Observed::default();
        let mut source = ExternalImage::with_callback(fake_image(0x30), record, observed.as_user());

        let taken = source.take();
        assert!(!source.has_callback());
        assert!(source.image.is_null());

        drop(source);
        assert_eq!(observed.calls(), 0);

        drop(taken);
        assert_eq!(observed.calls(), 1);
        assert_eq!(observed.image(), fake_image(0x30));
    }

    #[test]
    fn moving_through_containers_keeps_one_obligation() {
        let observed = Observed::default();
        let handle = ExternalImage::with_callback(fake_image(0x40), record, observed.as_user());

        let mut queue = Vec::new();
        queue.push(handle);
        let handle = queue.pop().unwrap();
        assert_eq!(observed.calls(), 0);

        drop(handle);
        assert_eq!(observed.calls(), 1);
    }

    #[test]
    fn set_callback_replaces_without_invoking() {
        let observed = Observed::default();
        let mut handle = ExternalImage::with_callback(fake_image(0x50), never, ptr::null_mut());

        handle.set_callback(record, observed.as_user());
        drop(handle);

        assert_eq!(observed.calls(), 1);
        assert_eq!(observed.image(), fake_image(0x50));
    }

    #[test]
    fn clear_callback_discards_the_obligation() {
        let mut handle = ExternalImage::with_callback(fake_image(0x60), never, ptr::null_mut());
        handle.clear_callback();
        assert!(!handle.has_callback());
        drop(handle);
    }

    #[test]
    fn callback_sees_the_current_image_value() {
        let observed = Observed::default();
        let mut handle = ExternalImage::with_callback(fake_image(0x70), record, observed.as_user());

        handle.image = fake_image(0x71);
        drop(handle);

        assert_eq!(observed.calls(), 1);
        assert_eq!(observed.image(), fake_image(0x71));
    }

    #[test]
    fn accessors_report_stored_state() {
        let observed = Observed::default();
        let handle = ExternalImage::with_callback(fake_image(0x80), record, observed.as_user());

        assert!(handle.has_callback());
        assert_eq!(handle.callback(), Some(record as ReleaseCallback));
        assert_eq!(handle.user(), observed.as_user());
        assert_eq!(handle.image, fake_image(0x80));
    }
}
