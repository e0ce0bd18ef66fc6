use std::fmt;
use std::ptr;

use opencl3::memory::{Buffer, CL_MEM_READ_WRITE, ClMem};
use opencl3::types::{CL_BLOCKING, CL_NON_BLOCKING, cl_mem};

use crate::device::Device;
use crate::event::{Event, Pending};
use crate::kernel::{Arg, Kernel};
use crate::{OclError, Result};

impl Device {
    /// Allocates a read-write byte buffer of `size` bytes on this
    /// device.
    pub fn create_bytes(&self, size: usize) -> Result<Bytes<'_>> {
        Bytes::allocate(self, size)
    }

    /// Allocates a read-write f32 buffer holding `len` elements on this
    /// device.
    pub fn create_vector(&self, len: usize) -> Result<Vector<'_>> {
        Vector::allocate(self, len)
    }
}

/// An untyped region of device memory addressed in bytes.
///
/// The size is fixed at allocation; every transfer must match it
/// exactly. The device must outlive the buffer, which the borrow on it
/// enforces.
pub struct Bytes<'d> {
    device: &'d Device,
    // Zero-sized objects carry no device allocation (OpenCL rejects
    // zero-byte buffers); their transfers short-circuit host-side.
    inner: Option<Buffer<u8>>,
    size: usize,
}

impl<'d> Bytes<'d> {
    fn allocate(device: &'d Device, size: usize) -> Result<Self> {
        if size == 0 {
            return Ok(Self {
                device,
                inner: None,
                size,
            });
        }

        let buffer = unsafe {
            Buffer::<u8>::create(device.context(), CL_MEM_READ_WRITE, size, ptr::null_mut())
                .map_err(|e| OclError::AllocationFailed(format!("byte buffer: {e}")))?
        };
        if buffer.get().is_null() {
            return Err(OclError::AllocationFailed(
                "byte buffer: driver returned a null memory object".to_string(),
            ));
        }
        tracing::debug!("allocated byte buffer: {} bytes", size);

        Ok(Self {
            device,
            inner: Some(buffer),
            size,
        })
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn raw_mem(&self) -> cl_mem {
        self.inner
            .as_ref()
            .map(|b| b.get())
            .unwrap_or(ptr::null_mut())
    }

    /// Copies `data` from the host into the buffer. Non-blocking: the
    /// enqueue returns immediately and the handle resolves once the
    /// device write completes. The payload is held until then.
    ///
    /// A payload whose length differs from the buffer size fails
    /// validation without issuing any device call.
    pub fn copy_in(&mut self, data: Vec<u8>) -> Pending {
        if data.len() != self.size {
            return Pending::ready(Err(OclError::SizeMismatch {
                expected: self.size,
                actual: data.len(),
            }));
        }
        let Some(buffer) = self.inner.as_mut() else {
            return Pending::ready(Ok(()));
        };

        let enqueued = unsafe {
            self.device
                .queue()
                .enqueue_write_buffer(buffer, CL_NON_BLOCKING, 0, &data, &[])
        };
        match enqueued {
            Ok(event) => Pending::watch(Event::new(event), data),
            Err(e) => Pending::ready(Err(OclError::status(e, "enqueuing buffer write"))),
        }
    }

    /// Reads the whole buffer back to the host. Blocking; returns either
    /// all `size` bytes or an error, never partial data.
    pub fn read_out(&self) -> Result<Vec<u8>> {
        let Some(buffer) = self.inner.as_ref() else {
            return Ok(Vec::new());
        };

        let mut data = vec![0u8; self.size];
        unsafe {
            self.device
                .queue()
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut data, &[])
                .map_err(|e| OclError::status(e, "reading buffer"))?;
        }
        Ok(data)
    }

    /// Applies `kernel` to every byte of the buffer: a 1-dimensional
    /// dispatch over the byte count with the buffer as sole argument.
    pub fn map(&self, kernel: &Kernel<'_>) -> Pending {
        if self.size == 0 {
            return Pending::ready(Ok(()));
        }
        kernel
            .global(&[self.size])
            .local(&[1])
            .run(&[Arg::Bytes(self)])
    }

    /// Releases the device memory.
    pub fn release(self) {}
}

impl fmt::Debug for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytes").field("size", &self.size).finish()
    }
}

// SAFETY: the memory object is an opaque device handle; transfers on
// the shared in-order queue are serialized by the driver, and mutation
// of the host-visible state requires &mut.
unsafe impl Send for Bytes<'_> {}
unsafe impl Sync for Bytes<'_> {}

/// A region of device memory holding f32 elements.
///
/// The element count is fixed at allocation; `copy_in` validates the
/// element count, not the byte count.
pub struct Vector<'d> {
    device: &'d Device,
    inner: Option<Buffer<f32>>,
    len: usize,
}

impl<'d> Vector<'d> {
    fn allocate(device: &'d Device, len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self {
                device,
                inner: None,
                len,
            });
        }

        let buffer = unsafe {
            Buffer::<f32>::create(device.context(), CL_MEM_READ_WRITE, len, ptr::null_mut())
                .map_err(|e| OclError::AllocationFailed(format!("f32 buffer: {e}")))?
        };
        if buffer.get().is_null() {
            return Err(OclError::AllocationFailed(
                "f32 buffer: driver returned a null memory object".to_string(),
            ));
        }
        tracing::debug!("allocated f32 buffer: {} elements", len);

        Ok(Self {
            device,
            inner: Some(buffer),
            len,
        })
    }

    /// Number of f32 elements.
    pub fn length(&self) -> usize {
        self.len
    }

    pub(crate) fn raw_mem(&self) -> cl_mem {
        self.inner
            .as_ref()
            .map(|b| b.get())
            .unwrap_or(ptr::null_mut())
    }

    /// Copies `data` from the host into the vector. Non-blocking; the
    /// handle resolves once the device write completes.
    pub fn copy_in(&mut self, data: Vec<f32>) -> Pending {
        if data.len() != self.len {
            return Pending::ready(Err(OclError::LengthMismatch {
                expected: self.len,
                actual: data.len(),
            }));
        }
        let Some(buffer) = self.inner.as_mut() else {
            return Pending::ready(Ok(()));
        };

        let enqueued = unsafe {
            self.device
                .queue()
                .enqueue_write_buffer(buffer, CL_NON_BLOCKING, 0, &data, &[])
        };
        match enqueued {
            Ok(event) => Pending::watch(Event::new(event), data),
            Err(e) => Pending::ready(Err(OclError::status(e, "enqueuing vector write"))),
        }
    }

    /// Reads the whole vector back to the host. Blocking.
    pub fn read_out(&self) -> Result<Vec<f32>> {
        let Some(buffer) = self.inner.as_ref() else {
            return Ok(Vec::new());
        };

        let mut data = vec![0f32; self.len];
        unsafe {
            self.device
                .queue()
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut data, &[])
                .map_err(|e| OclError::status(e, "reading vector"))?;
        }
        Ok(data)
    }

    /// Applies `kernel` to every element: a 1-dimensional dispatch over
    /// the element count with the vector as sole argument.
    pub fn map(&self, kernel: &Kernel<'_>) -> Pending {
        if self.len == 0 {
            return Pending::ready(Ok(()));
        }
        kernel
            .global(&[self.len])
            .local(&[1])
            .run(&[Arg::Vector(self)])
    }

    /// Releases the device memory.
    pub fn release(self) {}
}

impl fmt::Debug for Vector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector").field("len", &self.len).finish()
    }
}

// SAFETY: as for Bytes above.
unsafe impl Send for Vector<'_> {}
unsafe impl Sync for Vector<'_> {}
