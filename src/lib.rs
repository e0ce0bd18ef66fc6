//! Safe Rust layer over the OpenCL host API
//!
//! This library wraps device discovery, program compilation, device
//! memory, and asynchronous kernel dispatch behind an owned object
//! model: a [`Device`] holds the context and an in-order command queue,
//! memory objects and kernels borrow the device that created them, and
//! non-blocking operations hand back a [`Pending`] completion handle.

mod build_options;
mod device;
pub mod error;
mod event;
mod image;
mod kernel;
mod memory;
mod program;

pub use build_options::{BuildFlags, BuildOptions, LanguageVersion};
pub use device::{Device, DeviceType};
pub use error::{OclError, Result};
pub use event::{Event, Pending};
pub use image::{ChannelOrder, ChannelType, Image, ImagePixels, PixelFormat};
pub use kernel::{Arg, Dispatch, Kernel};
pub use memory::{Bytes, Vector};
pub use program::Program;

use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the OpenCL runtime for this process.
///
/// Probes platform enumeration once so later failures point at real
/// problems rather than a missing ICD loader. Safe to call redundantly;
/// after the first success every call is a no-op. Device discovery
/// before a successful `init` fails with
/// [`OclError::NotInitialized`].
pub fn init() -> Result<()> {
    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let platforms = opencl3::platform::get_platforms()
        .map_err(|e| OclError::status(e, "enumerating platforms"))?;
    if platforms.is_empty() {
        return Err(OclError::NoPlatform);
    }

    tracing::debug!("OpenCL runtime initialized with {} platform(s)", platforms.len());
    INITIALIZED.store(true, Ordering::Release);
    Ok(())
}

pub(crate) fn ensure_initialized() -> Result<()> {
    if INITIALIZED.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(OclError::NotInitialized(
            "call oclrt::init() before device discovery".to_string(),
        ))
    }
}
