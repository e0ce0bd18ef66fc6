use opencl3::context::Context;
use opencl3::program::Program as ClProgram;

use crate::build_options::BuildOptions;
use crate::{OclError, Result};

/// A compiled translation unit, built from kernel source text against
/// one device. Kernels are extracted from it by name through
/// [`Device::kernel`].
///
/// [`Device::kernel`]: crate::Device::kernel
pub struct Program {
    inner: ClProgram,
}

impl Program {
    /// Compiles `source` for every device in `context` (here: exactly
    /// the owning device).
    ///
    /// A failed build returns the compiler's build log as the error
    /// payload rather than a bare status code; during development that
    /// log is the error that matters.
    pub(crate) fn build(context: &Context, source: &str, options: &BuildOptions) -> Result<Self> {
        match ClProgram::create_and_build_from_source(context, source, &options.to_string()) {
            Ok(inner) => {
                tracing::debug!("compiled program ({} bytes of source)", source.len());
                Ok(Self { inner })
            }
            Err(log) => {
                tracing::warn!("program build failed");
                Err(OclError::BuildFailed { log })
            }
        }
    }

    pub(crate) fn cl(&self) -> &ClProgram {
        &self.inner
    }
}
