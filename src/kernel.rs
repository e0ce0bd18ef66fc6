use std::fmt;

use opencl3::kernel::{ExecuteKernel, Kernel as ClKernel};

use crate::device::Device;
use crate::event::{Event, Pending};
use crate::image::Image;
use crate::memory::{Bytes, Vector};
use crate::{OclError, Result};

/// A kernel argument.
///
/// The closed set of bindable values: small integers, 32-bit floats,
/// and each memory-object kind. `Local` denotes work-group local
/// memory; the binder does not support it yet and rejects it with
/// [`OclError::UnsupportedArgument`].
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    U8(u8),
    I8(i8),
    U32(u32),
    I32(i32),
    F32(f32),
    Bytes(&'a Bytes<'a>),
    Vector(&'a Vector<'a>),
    Image(&'a Image<'a>),
    Local(usize),
}

impl<'a> From<u8> for Arg<'a> {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl<'a> From<i8> for Arg<'a> {
    fn from(v: i8) -> Self {
        Self::I8(v)
    }
}

impl<'a> From<u32> for Arg<'a> {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl<'a> From<i32> for Arg<'a> {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl<'a> From<f32> for Arg<'a> {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl<'a> From<&'a Bytes<'a>> for Arg<'a> {
    fn from(v: &'a Bytes<'a>) -> Self {
        Self::Bytes(v)
    }
}

impl<'a> From<&'a Vector<'a>> for Arg<'a> {
    fn from(v: &'a Vector<'a>) -> Self {
        Self::Vector(v)
    }
}

impl<'a> From<&'a Image<'a>> for Arg<'a> {
    fn from(v: &'a Image<'a>) -> Self {
        Self::Image(v)
    }
}

/// A callable kernel bound to the device it was created on.
///
/// Dispatch configuration starts from [`Kernel::global`]; arguments are
/// rebound on every call.
pub struct Kernel<'d> {
    device: &'d Device,
    inner: ClKernel,
    name: String,
}

// SAFETY: a kernel handle can move between threads. It is deliberately
// not Sync: argument binding mutates the kernel object, which OpenCL
// does not make thread-safe.
unsafe impl Send for Kernel<'_> {}

impl<'d> Kernel<'d> {
    pub(crate) fn new(device: &'d Device, inner: ClKernel, name: &str) -> Self {
        Self {
            device,
            inner,
            name: name.to_string(),
        }
    }

    /// Name the kernel was looked up under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a dispatch configuration with the given global work size,
    /// one entry per dimension (1 to 3).
    pub fn global(&self, sizes: &[usize]) -> Dispatch<'_> {
        Dispatch {
            kernel: self,
            global: sizes.to_vec(),
            local: None,
            offset: None,
        }
    }

    /// Releases the kernel handle.
    pub fn release(self) {}
}

impl fmt::Debug for Kernel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel").field("name", &self.name).finish()
    }
}

/// Dispatch configuration for one kernel.
///
/// Value-style builder: each step returns a new configuration, so a
/// configured dispatch can be cloned and reused as a template for
/// repeated calls with different arguments.
#[derive(Clone)]
pub struct Dispatch<'a> {
    kernel: &'a Kernel<'a>,
    global: Vec<usize>,
    local: Option<Vec<usize>>,
    offset: Option<Vec<usize>>,
}

impl<'a> Dispatch<'a> {
    /// Replaces the global work size.
    pub fn global(mut self, sizes: &[usize]) -> Self {
        self.global = sizes.to_vec();
        self
    }

    /// Sets the local work-group size. Must have the same number of
    /// dimensions as the global size; when unset the driver picks the
    /// partition.
    pub fn local(mut self, sizes: &[usize]) -> Self {
        self.local = Some(sizes.to_vec());
        self
    }

    /// Sets the global work offset. May have fewer dimensions than the
    /// global size (missing entries are zero), never more.
    pub fn offset(mut self, offsets: &[usize]) -> Self {
        self.offset = Some(offsets.to_vec());
        self
    }

    /// Binds `args` and enqueues the dispatch. Non-blocking; the handle
    /// resolves when the kernel finishes. Validation failures resolve
    /// the handle immediately without touching the device.
    pub fn run(&self, args: &[Arg<'_>]) -> Pending {
        match self.enqueue(args, &[]) {
            Ok(event) => Pending::watch(event, ()),
            Err(e) => Pending::ready(Err(e)),
        }
    }

    /// Binds `args` and enqueues the dispatch after every event in
    /// `wait_list` has completed, returning this dispatch's own
    /// completion token for downstream chaining.
    ///
    /// Argument slots are dense from 0; binding fewer arguments than
    /// the kernel declares is a caller error.
    pub fn enqueue(&self, args: &[Arg<'_>], wait_list: &[&Event]) -> Result<Event> {
        validate_shape(
            &self.global,
            self.local.as_deref(),
            self.offset.as_deref(),
        )?;

        // A short offset is zero-padded to the work dimensionality.
        let offset = self.offset.as_ref().map(|offsets| {
            let mut padded = offsets.clone();
            padded.resize(self.global.len(), 0);
            padded
        });

        let event = unsafe {
            let mut exec = ExecuteKernel::new(&self.kernel.inner);
            for (index, arg) in args.iter().enumerate() {
                match arg {
                    Arg::U8(v) => {
                        exec.set_arg(v);
                    }
                    Arg::I8(v) => {
                        exec.set_arg(v);
                    }
                    Arg::U32(v) => {
                        exec.set_arg(v);
                    }
                    Arg::I32(v) => {
                        exec.set_arg(v);
                    }
                    Arg::F32(v) => {
                        exec.set_arg(v);
                    }
                    Arg::Bytes(b) => {
                        exec.set_arg(&b.raw_mem());
                    }
                    Arg::Vector(v) => {
                        exec.set_arg(&v.raw_mem());
                    }
                    Arg::Image(i) => {
                        exec.set_arg(&i.raw_mem());
                    }
                    other => {
                        return Err(OclError::UnsupportedArgument {
                            index,
                            value: format!("{other:?}"),
                        });
                    }
                }
            }
            exec.set_global_work_sizes(&self.global);
            if let Some(local) = &self.local {
                exec.set_local_work_sizes(local);
            }
            if let Some(offset) = &offset {
                exec.set_global_work_offsets(offset);
            }
            for event in wait_list {
                exec.set_wait_event(event.cl());
            }
            exec.enqueue_nd_range(self.kernel.device.queue())
                .map_err(|e| OclError::status(e, "enqueuing kernel"))?
        };

        tracing::debug!(
            "enqueued kernel '{}' over {:?}",
            self.kernel.name,
            self.global
        );
        Ok(Event::new(event))
    }
}

impl fmt::Debug for Dispatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("kernel", &self.kernel.name)
            .field("global", &self.global)
            .field("local", &self.local)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Shape checks that must pass before any device call.
pub(crate) fn validate_shape(
    global: &[usize],
    local: Option<&[usize]>,
    offset: Option<&[usize]>,
) -> Result<()> {
    let dims = global.len();
    if dims == 0 || dims > 3 {
        return Err(OclError::InvalidWorkDimension { dims });
    }
    if let Some(local) = local {
        if local.len() != dims {
            return Err(OclError::DimensionMismatch {
                global_dims: dims,
                local_dims: local.len(),
            });
        }
    }
    if let Some(offset) = offset {
        if offset.len() > dims {
            return Err(OclError::OffsetTooWide {
                offset_dims: offset.len(),
                global_dims: dims,
            });
        }
    }
    Ok(())
}
