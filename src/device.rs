use std::fmt;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_DEFAULT,
    CL_DEVICE_TYPE_GPU, Device as ClDevice,
};
use opencl3::error_codes::{CL_DEVICE_NOT_FOUND, CL_INVALID_KERNEL_NAME};
use opencl3::kernel::Kernel as ClKernel;
use opencl3::platform::get_platforms;
use opencl3::types::{cl_device_id, cl_device_type};

use crate::build_options::BuildOptions;
use crate::kernel::Kernel;
use crate::program::Program;
use crate::{OclError, Result};

/// Device-class filter used at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Cpu,
    Gpu,
    Accelerator,
    Default,
    All,
}

impl DeviceType {
    fn to_cl(self) -> cl_device_type {
        match self {
            Self::Cpu => CL_DEVICE_TYPE_CPU,
            Self::Gpu => CL_DEVICE_TYPE_GPU,
            Self::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
            Self::Default => CL_DEVICE_TYPE_DEFAULT,
            Self::All => CL_DEVICE_TYPE_ALL,
        }
    }
}

/// A compute device with its execution context and in-order command
/// queue. Everything else in this crate is created from a `Device` and
/// must not outlive it: memory objects and kernels borrow the device,
/// so the borrow checker rejects releasing a device while children are
/// still alive.
pub struct Device {
    // Field order is drop order: children before parents.
    programs: Vec<Program>,
    queue: CommandQueue,
    context: Context,
    device: ClDevice,
}

// SAFETY: OpenCL context, queue, and program handles are thread-safe at
// the API level; the in-order command queue serializes the operations
// submitted through it.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

impl Device {
    /// Returns every device of the given type across all platforms.
    pub fn list(kind: DeviceType) -> Result<Vec<Device>> {
        crate::ensure_initialized()?;
        let platforms =
            get_platforms().map_err(|e| OclError::status(e, "enumerating platforms"))?;

        let mut devices = Vec::new();
        for platform in &platforms {
            for id in platform_device_ids(platform, kind)? {
                devices.push(Self::from_id(id)?);
            }
        }
        Ok(devices)
    }

    /// Returns the first device of the given type, searching platforms
    /// in enumeration order.
    pub fn first(kind: DeviceType) -> Result<Device> {
        crate::ensure_initialized()?;
        let platforms =
            get_platforms().map_err(|e| OclError::status(e, "enumerating platforms"))?;

        for platform in &platforms {
            if let Some(id) = platform_device_ids(platform, kind)?.into_iter().next() {
                return Self::from_id(id);
            }
        }
        Err(OclError::DeviceNotFound)
    }

    fn from_id(id: cl_device_id) -> Result<Self> {
        let device = ClDevice::new(id);

        let context = Context::from_device(&device)
            .map_err(|e| OclError::ContextCreationFailed(e.to_string()))?;
        if context.get().is_null() {
            return Err(OclError::ContextCreationFailed(
                "driver returned a null context".to_string(),
            ));
        }

        // Default properties: an in-order queue. The ordering guarantees
        // of the whole crate rely on never enabling out-of-order mode.
        let queue = CommandQueue::create_default_with_properties(&context, 0, 0)
            .map_err(|e| OclError::QueueCreationFailed(e.to_string()))?;

        tracing::debug!("device ready: {}", device.name().unwrap_or_default());

        Ok(Self {
            programs: Vec::new(),
            queue,
            context,
            device,
        })
    }

    pub(crate) fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub(crate) fn context(&self) -> &Context {
        &self.context
    }

    /// Compiles `source` and adds the program to this device.
    ///
    /// On a failed build the returned error carries the compiler's
    /// build log verbatim; nothing panics.
    pub fn add_program(&mut self, source: &str) -> Result<()> {
        self.add_program_with_options(source, &BuildOptions::default())
    }

    /// Compiles `source` with explicit compiler options.
    pub fn add_program_with_options(
        &mut self,
        source: &str,
        options: &BuildOptions,
    ) -> Result<()> {
        let program = Program::build(&self.context, source, options)?;
        self.programs.push(program);
        Ok(())
    }

    /// Looks up a kernel by name across this device's programs, in the
    /// order they were added. Only "invalid kernel name" moves the
    /// search to the next program; any other creation failure is
    /// surfaced immediately.
    pub fn kernel(&self, name: &str) -> Result<Kernel<'_>> {
        for program in &self.programs {
            match ClKernel::create(program.cl(), name) {
                Ok(inner) => return Ok(Kernel::new(self, inner, name)),
                Err(e) if e.0 == CL_INVALID_KERNEL_NAME => continue,
                Err(e) => {
                    return Err(OclError::KernelCreationFailed {
                        name: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(OclError::KernelNotFound(name.to_string()))
    }

    /// Releases the device and everything it owns.
    ///
    /// Teardown order is children before parents: programs, then the
    /// queue, then the context, then the device handle. All steps run
    /// regardless of earlier failures; the queue drain performed first
    /// is where errors from still-outstanding work surface, and its
    /// error (if any) is returned.
    pub fn release(self) -> Result<()> {
        let drained = self
            .queue
            .finish()
            .map_err(|e| OclError::status(e, "draining queue during release"));
        tracing::debug!(
            "releasing device with {} program(s): {}",
            self.programs.len(),
            self.device.name().unwrap_or_default()
        );
        drop(self);
        drained
    }

    /// Device name.
    pub fn name(&self) -> Result<String> {
        self.device
            .name()
            .map_err(|e| OclError::status(e, "querying device name"))
    }

    /// Device vendor.
    pub fn vendor(&self) -> Result<String> {
        self.device
            .vendor()
            .map_err(|e| OclError::status(e, "querying device vendor"))
    }

    /// Device profile string.
    pub fn profile(&self) -> Result<String> {
        self.device
            .profile()
            .map_err(|e| OclError::status(e, "querying device profile"))
    }

    /// OpenCL version supported by the device.
    pub fn version(&self) -> Result<String> {
        self.device
            .version()
            .map_err(|e| OclError::status(e, "querying device version"))
    }

    /// Driver version string.
    pub fn driver_version(&self) -> Result<String> {
        self.device
            .driver_version()
            .map_err(|e| OclError::status(e, "querying driver version"))
    }

    /// Highest supported OpenCL C dialect.
    pub fn opencl_c_version(&self) -> Result<String> {
        self.device
            .opencl_c_version()
            .map_err(|e| OclError::status(e, "querying OpenCL C version"))
    }

    /// Space-separated extension list.
    pub fn extensions(&self) -> Result<String> {
        self.device
            .extensions()
            .map_err(|e| OclError::status(e, "querying device extensions"))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.device.name().unwrap_or_default(),
            self.device.vendor().unwrap_or_default()
        )
    }
}

/// Device ids of one type on one platform. A platform that has no
/// devices of the requested type reports `CL_DEVICE_NOT_FOUND`; that is
/// an empty result here, not an error.
fn platform_device_ids(
    platform: &opencl3::platform::Platform,
    kind: DeviceType,
) -> Result<Vec<cl_device_id>> {
    match platform.get_devices(kind.to_cl()) {
        Ok(ids) => Ok(ids),
        Err(e) if e.0 == CL_DEVICE_NOT_FOUND => Ok(Vec::new()),
        Err(e) => Err(OclError::status(e, "enumerating devices")),
    }
}
