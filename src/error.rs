use opencl3::error_codes::{
    CL_DEVICE_NOT_AVAILABLE, CL_DEVICE_NOT_FOUND, CL_INVALID_KERNEL_ARGS, CL_INVALID_MEM_OBJECT,
    CL_INVALID_WORK_GROUP_SIZE, CL_MEM_OBJECT_ALLOCATION_FAILURE, CL_OUT_OF_HOST_MEMORY,
    CL_OUT_OF_RESOURCES, ClError,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OclError>;

#[derive(Debug, Error)]
pub enum OclError {
    #[error("OpenCL runtime not initialized: {0}")]
    NotInitialized(String),

    #[error("no OpenCL platform available")]
    NoPlatform,

    #[error("no OpenCL device of the requested type found")]
    DeviceNotFound,

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("context creation failed: {0}")]
    ContextCreationFailed(String),

    #[error("queue creation failed: {0}")]
    QueueCreationFailed(String),

    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),

    #[error("invalid memory object: {0}")]
    InvalidMemObject(String),

    #[error("program build failed:\n{log}")]
    BuildFailed { log: String },

    #[error("kernel not found: {0}")]
    KernelNotFound(String),

    #[error("kernel creation failed for '{name}': {reason}")]
    KernelCreationFailed { name: String, reason: String },

    #[error("invalid kernel arguments: {0}")]
    InvalidKernelArgs(String),

    #[error("invalid work-group size: {0}")]
    InvalidWorkGroupSize(String),

    #[error("size mismatch: memory object holds {expected} bytes, payload is {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("length mismatch: vector holds {expected} elements, payload is {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unsupported argument at index {index}: {value}")]
    UnsupportedArgument { index: usize, value: String },

    #[error(
        "work dimensions differ: global size is {global_dims}-dimensional, local size is {local_dims}-dimensional"
    )]
    DimensionMismatch {
        global_dims: usize,
        local_dims: usize,
    },

    #[error("invalid work dimension: {dims} (must be 1 to 3)")]
    InvalidWorkDimension { dims: usize },

    #[error(
        "work offset is {offset_dims}-dimensional but global size is {global_dims}-dimensional"
    )]
    OffsetTooWide {
        offset_dims: usize,
        global_dims: usize,
    },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("out of device resources: {0}")]
    OutOfResources(String),

    #[error("out of host memory: {0}")]
    OutOfHostMemory(String),

    #[error("completion result was lost before delivery")]
    CompletionLost,

    #[error("OpenCL error {code} ({description}): {context}")]
    Status {
        code: i32,
        description: String,
        context: String,
    },
}

impl OclError {
    /// Maps a native status code to a named error kind, keeping the raw
    /// code and the driver's description for anything unmapped.
    pub(crate) fn status(err: ClError, context: &str) -> Self {
        let description = err.to_string();
        let detail = format!("{context}: {description}");

        match err.0 {
            CL_DEVICE_NOT_FOUND => Self::DeviceNotFound,
            CL_DEVICE_NOT_AVAILABLE => Self::DeviceNotAvailable(detail),
            CL_MEM_OBJECT_ALLOCATION_FAILURE => Self::AllocationFailed(detail),
            CL_INVALID_MEM_OBJECT => Self::InvalidMemObject(detail),
            CL_INVALID_KERNEL_ARGS => Self::InvalidKernelArgs(detail),
            CL_INVALID_WORK_GROUP_SIZE => Self::InvalidWorkGroupSize(detail),
            CL_OUT_OF_RESOURCES => Self::OutOfResources(detail),
            CL_OUT_OF_HOST_MEMORY => Self::OutOfHostMemory(detail),
            code => Self::Status {
                code,
                description,
                context: context.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_named_kinds() {
        let err = OclError::status(ClError(CL_MEM_OBJECT_ALLOCATION_FAILURE), "allocating");
        assert!(matches!(err, OclError::AllocationFailed(_)));

        let err = OclError::status(ClError(CL_OUT_OF_RESOURCES), "dispatching");
        assert!(matches!(err, OclError::OutOfResources(_)));

        let err = OclError::status(ClError(CL_DEVICE_NOT_FOUND), "enumerating");
        assert!(matches!(err, OclError::DeviceNotFound));
    }

    #[test]
    fn unmapped_codes_keep_the_raw_number() {
        // -9999 is no OpenCL status; it must fall through unchanged.
        let err = OclError::status(ClError(-9999), "doing something");
        match err {
            OclError::Status { code, context, .. } => {
                assert_eq!(code, -9999);
                assert_eq!(context, "doing something");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn status_display_includes_code_and_context() {
        let err = OclError::status(ClError(-9999), "reading buffer");
        let text = err.to_string();
        assert!(text.contains("-9999"), "missing code: {text}");
        assert!(text.contains("reading buffer"), "missing context: {text}");
    }

    #[test]
    fn build_failure_carries_the_log_verbatim() {
        let log = "1:1: error: unknown type name 'flaot'".to_string();
        let err = OclError::BuildFailed { log: log.clone() };
        assert!(err.to_string().contains(&log));
    }
}
