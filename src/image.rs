use std::fmt;
use std::os::raw::c_void;
use std::ptr;

use opencl3::memory::{
    CL_BGRA, CL_FLOAT, CL_INTENSITY, CL_MEM_COPY_HOST_PTR, CL_MEM_OBJECT_IMAGE2D,
    CL_MEM_READ_WRITE, CL_RGBA, CL_UNORM_INT8, ClMem, Image as ClImage, cl_image_desc,
    cl_image_format,
};
use opencl3::types::{CL_BLOCKING, cl_mem};

use crate::device::Device;
use crate::event::Pending;
use crate::kernel::{Arg, Kernel};
use crate::{OclError, Result};

/// Pixel channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Single channel (`CL_INTENSITY`).
    Intensity,
    /// Four channels (`CL_RGBA`).
    Rgba,
    /// Four channels, reversed layout (`CL_BGRA`).
    Bgra,
}

impl ChannelOrder {
    pub const fn channels(self) -> usize {
        match self {
            Self::Intensity => 1,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intensity => write!(f, "CL_INTENSITY"),
            Self::Rgba => write!(f, "CL_RGBA"),
            Self::Bgra => write!(f, "CL_BGRA"),
        }
    }
}

/// Per-channel sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// 8-bit normalized unsigned integer (`CL_UNORM_INT8`).
    Unorm8,
    /// 32-bit IEEE 754 float (`CL_FLOAT`).
    Float32,
}

impl ChannelType {
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Unorm8 => 1,
            Self::Float32 => 4,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unorm8 => write!(f, "CL_UNORM_INT8"),
            Self::Float32 => write!(f, "CL_FLOAT"),
        }
    }
}

/// A channel order paired with a sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub order: ChannelOrder,
    pub sample: ChannelType,
}

impl PixelFormat {
    pub const fn new(order: ChannelOrder, sample: ChannelType) -> Self {
        Self { order, sample }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        self.order.channels() * self.sample.byte_size()
    }

    /// Only 8-bit intensity and 8-bit RGBA survive host-side decoding;
    /// everything else is rejected at `read_out`.
    pub(crate) fn is_decodable(self) -> bool {
        matches!(
            (self.order, self.sample),
            (ChannelOrder::Intensity, ChannelType::Unorm8)
                | (ChannelOrder::Rgba, ChannelType::Unorm8)
        )
    }

    fn to_cl(self) -> cl_image_format {
        cl_image_format {
            image_channel_order: match self.order {
                ChannelOrder::Intensity => CL_INTENSITY,
                ChannelOrder::Rgba => CL_RGBA,
                ChannelOrder::Bgra => CL_BGRA,
            },
            image_channel_data_type: match self.sample {
                ChannelType::Unorm8 => CL_UNORM_INT8,
                ChannelType::Float32 => CL_FLOAT,
            },
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.order, self.sample)
    }
}

/// A host-side 2D pixel buffer, the interchange type for image
/// transfers. `row_pitch` of zero means rows are tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePixels {
    pub format: PixelFormat,
    pub width: usize,
    pub height: usize,
    pub row_pitch: usize,
    pub data: Vec<u8>,
}

impl Device {
    /// Creates a 2D image of `width` x `height` pixels, initialized
    /// with `pixels`. `row_pitch` is in bytes; zero means tightly
    /// packed rows. The payload length must match the image extent
    /// exactly or the call fails before any device call.
    pub fn create_image(
        &self,
        format: PixelFormat,
        width: usize,
        height: usize,
        row_pitch: usize,
        pixels: &[u8],
    ) -> Result<Image<'_>> {
        Image::create(self, format, width, height, row_pitch, pixels)
    }
}

/// A 2D image on the device, carrying its pixel format, bounds, and
/// row pitch alongside the native memory object.
pub struct Image<'d> {
    device: &'d Device,
    inner: ClImage,
    format: PixelFormat,
    width: usize,
    height: usize,
    row_pitch: usize,
    size: usize,
}

impl<'d> Image<'d> {
    fn create(
        device: &'d Device,
        format: PixelFormat,
        width: usize,
        height: usize,
        row_pitch: usize,
        pixels: &[u8],
    ) -> Result<Self> {
        let row_bytes = if row_pitch == 0 {
            width * format.bytes_per_pixel()
        } else {
            row_pitch
        };
        let expected = row_bytes * height;
        if pixels.len() != expected {
            return Err(OclError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let cl_format = format.to_cl();
        let mut desc = cl_image_desc {
            image_type: CL_MEM_OBJECT_IMAGE2D,
            image_width: width,
            image_height: height,
            image_depth: 0,
            image_array_size: 0,
            image_row_pitch: row_pitch,
            image_slice_pitch: 0,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: ptr::null_mut(),
        };

        // CL_MEM_COPY_HOST_PTR: the driver copies the pixels during
        // creation, so the borrow on `pixels` is enough.
        let inner = unsafe {
            ClImage::create(
                device.context(),
                CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR,
                &cl_format,
                &mut desc,
                pixels.as_ptr() as *mut c_void,
            )
            .map_err(|e| OclError::AllocationFailed(format!("image: {e}")))?
        };
        if inner.get().is_null() {
            return Err(OclError::AllocationFailed(
                "image: driver returned a null memory object".to_string(),
            ));
        }
        tracing::debug!(
            "allocated {}x{} image ({}, {} bytes)",
            width,
            height,
            format,
            pixels.len()
        );

        Ok(Self {
            device,
            inner,
            format,
            width,
            height,
            row_pitch,
            size: pixels.len(),
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn raw_mem(&self) -> cl_mem {
        self.inner.get()
    }

    /// Reads the image back as a 2D pixel buffer, honoring the row
    /// pitch it was created with. Blocking. Formats other than 8-bit
    /// intensity and 8-bit RGBA are rejected before any device call.
    pub fn read_out(&self) -> Result<ImagePixels> {
        if !self.format.is_decodable() {
            return Err(OclError::UnsupportedFormat(self.format.to_string()));
        }

        let mut data = vec![0u8; self.size];
        let origin = [0usize, 0, 0];
        let region = [self.width, self.height, 1];
        unsafe {
            self.device
                .queue()
                .enqueue_read_image(
                    &self.inner,
                    CL_BLOCKING,
                    origin.as_ptr(),
                    region.as_ptr(),
                    self.row_pitch,
                    0,
                    data.as_mut_ptr() as *mut c_void,
                    &[],
                )
                .map_err(|e| OclError::status(e, "reading image"))?;
        }

        Ok(ImagePixels {
            format: self.format,
            width: self.width,
            height: self.height,
            row_pitch: self.row_pitch,
            data,
        })
    }

    /// Applies `kernel` across all pixels: a 1-dimensional dispatch
    /// over the pixel count with the image as sole argument.
    pub fn map(&self, kernel: &Kernel<'_>) -> Pending {
        kernel
            .global(&[self.width * self.height])
            .local(&[1])
            .run(&[Arg::Image(self)])
    }

    /// Releases the device memory.
    pub fn release(self) {}
}

// SAFETY: the image is an opaque device handle; transfers on the
// shared in-order queue are serialized by the driver.
unsafe impl Send for Image<'_> {}
unsafe impl Sync for Image<'_> {}

impl fmt::Debug for Image<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("row_pitch", &self.row_pitch)
            .finish()
    }
}
