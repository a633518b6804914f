//! Zero-copy handoff of externally owned images into the rendering backend.
//!
//! An external producer (camera pipeline, video decoder, compositor) wraps an
//! image it owns in an [`ExternalImage`] and hands it to the engine. The
//! engine references the image for as long as it needs, then returns it by
//! dropping the handle, which fires the producer's release callback exactly
//! once, on the engine's designated thread. The [`release`] module provides
//! the queue the engine uses to keep that thread guarantee when handles die
//! elsewhere.

pub mod external_image;
pub mod release;

pub use external_image::*;
pub use release::*;
