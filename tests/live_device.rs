//! Device-backed integration tests.
//!
//! Every test opens a real device and skips (with a note) when the host
//! has no usable OpenCL platform or device, so the suite still passes
//! on machines without a driver.

use oclrt::{Arg, BuildFlags, BuildOptions, ChannelOrder, ChannelType, Device, DeviceType, OclError, PixelFormat};

const KERNEL_SRC: &str = r#"
__kernel void add_one(__global float* data) {
    const int i = get_global_id(0);
    data[i] += 1.0f;
}

__kernel void add_one_byte(__global char* data) {
    const int i = get_global_id(0);
    data[i] += 1;
}
"#;

fn open_device() -> Option<Device> {
    if oclrt::init().is_err() {
        eprintln!("no OpenCL platform available, skipping");
        return None;
    }
    match Device::first(DeviceType::Default) {
        Ok(device) => Some(device),
        Err(_) => {
            eprintln!("no OpenCL device available, skipping");
            None
        }
    }
}

#[test]
fn init_is_idempotent() {
    if oclrt::init().is_err() {
        eprintln!("no OpenCL platform available, skipping");
        return;
    }
    oclrt::init().expect("second init must be a no-op");
    oclrt::init().expect("third init must be a no-op");
}

#[test]
fn device_info_strings_are_readable() {
    let Some(device) = open_device() else { return };
    let name = device.name().expect("device name");
    assert!(!name.is_empty());
    device.vendor().expect("device vendor");
    device.profile().expect("device profile");
    device.version().expect("device version");
    assert!(!device.to_string().is_empty());
}

#[test]
fn bytes_round_trip_all_lengths() {
    let Some(device) = open_device() else { return };
    for len in [0usize, 1, 64, 4096] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut buffer = device.create_bytes(len).expect("allocate");
        assert_eq!(buffer.size(), len);
        buffer.copy_in(data.clone()).wait().expect("copy in");
        let read = buffer.read_out().expect("read out");
        assert_eq!(read, data, "round trip mismatch at length {len}");
        buffer.release();
    }
}

#[test]
fn copy_in_rejects_wrong_size_without_device_call() {
    let Some(device) = open_device() else { return };
    let mut buffer = device.create_bytes(16).expect("allocate");

    match buffer.copy_in(vec![0u8; 8]).wait() {
        Err(OclError::SizeMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (16, 8));
        }
        other => panic!("undersized payload must fail validation, got {other:?}"),
    }
    match buffer.copy_in(vec![0u8; 32]).wait() {
        Err(OclError::SizeMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (16, 32));
        }
        other => panic!("oversized payload must fail validation, got {other:?}"),
    }
}

#[test]
fn vector_round_trip_validates_element_count() {
    let Some(device) = open_device() else { return };
    let mut vector = device.create_vector(16).expect("allocate");
    assert_eq!(vector.length(), 16);

    match vector.copy_in(vec![0.0; 15]).wait() {
        Err(OclError::LengthMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (16, 15));
        }
        other => panic!("short payload must fail validation, got {other:?}"),
    }

    let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
    vector.copy_in(data.clone()).wait().expect("copy in");
    assert_eq!(vector.read_out().expect("read out"), data);
}

#[test]
fn kernel_lookup_searches_programs_in_order() {
    let Some(mut device) = open_device() else { return };
    device
        .add_program("__kernel void alpha(__global float* d) { d[get_global_id(0)] *= 2.0f; }")
        .expect("first program");
    device
        .add_program("__kernel void foo(__global float* d) { d[get_global_id(0)] += 1.0f; }")
        .expect("second program");

    // Only the second program defines foo; lookup must keep searching
    // past the first.
    let kernel = device.kernel("foo").expect("foo is defined");
    assert_eq!(kernel.name(), "foo");
    kernel.release();

    match device.kernel("bar") {
        Err(OclError::KernelNotFound(name)) => assert_eq!(name, "bar"),
        other => panic!("bar is defined nowhere, got {other:?}"),
    }
}

#[test]
fn unsupported_argument_aborts_before_dispatch() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");

    let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let mut vector = device.create_vector(16).expect("allocate");
    vector.copy_in(data.clone()).wait().expect("copy in");

    let kernel = device.kernel("add_one").expect("lookup");
    match kernel.global(&[16]).local(&[1]).enqueue(&[Arg::Local(64)], &[]) {
        Err(OclError::UnsupportedArgument { index, value }) => {
            assert_eq!(index, 0);
            assert!(value.contains("Local"), "value should identify the argument: {value}");
        }
        other => panic!("local-memory argument must be rejected, got {other:?}"),
    }

    // Nothing was enqueued, so the data is untouched.
    assert_eq!(vector.read_out().expect("read out"), data);
}

#[test]
fn dispatch_increments_and_map_increments_again() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");

    let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let mut vector = device.create_vector(16).expect("allocate");
    vector.copy_in(data.clone()).wait().expect("copy in");

    let kernel = device.kernel("add_one").expect("lookup");
    kernel
        .global(&[16])
        .local(&[1])
        .run(&[Arg::Vector(&vector)])
        .wait()
        .expect("dispatch");

    let once: Vec<f32> = data.iter().map(|v| v + 1.0).collect();
    assert_eq!(vector.read_out().expect("read out"), once);

    // Same memory object, second dispatch through the map convenience:
    // the data dependency must flow even though the handle is reused.
    vector.map(&kernel).wait().expect("map dispatch");
    let twice: Vec<f32> = data.iter().map(|v| v + 2.0).collect();
    assert_eq!(vector.read_out().expect("read out"), twice);
}

#[test]
fn bytes_map_applies_kernel_per_byte() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");

    let data = b"abcdefgh".to_vec();
    let mut buffer = device.create_bytes(data.len()).expect("allocate");
    buffer.copy_in(data.clone()).wait().expect("copy in");

    let kernel = device.kernel("add_one_byte").expect("lookup");
    buffer.map(&kernel).wait().expect("map dispatch");

    let expected: Vec<u8> = data.iter().map(|b| b + 1).collect();
    assert_eq!(buffer.read_out().expect("read out"), expected);
}

#[test]
fn empty_objects_short_circuit() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");
    let kernel = device.kernel("add_one_byte").expect("lookup");

    let mut buffer = device.create_bytes(0).expect("allocate empty");
    buffer.copy_in(Vec::new()).wait().expect("empty copy");
    assert!(buffer.read_out().expect("empty read").is_empty());
    buffer.map(&kernel).wait().expect("empty map");
}

#[test]
fn dimension_mismatch_fails_before_enqueue() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");

    let vector = device.create_vector(16).expect("allocate");
    let kernel = device.kernel("add_one").expect("lookup");

    match kernel
        .global(&[4, 4])
        .local(&[1])
        .enqueue(&[Arg::Vector(&vector)], &[])
    {
        Err(OclError::DimensionMismatch {
            global_dims,
            local_dims,
        }) => assert_eq!((global_dims, local_dims), (2, 1)),
        other => panic!("2-d global with 1-d local must be rejected, got {other:?}"),
    }
}

#[test]
fn build_failure_surfaces_the_compiler_log() {
    let Some(mut device) = open_device() else { return };
    match device.add_program("meh") {
        Err(OclError::BuildFailed { log }) => {
            assert!(!log.trim().is_empty(), "build log must not be empty");
        }
        Ok(()) => panic!("nonsense source must not compile"),
        Err(other) => panic!("expected BuildFailed, got {other:?}"),
    }
}

#[test]
fn compile_accepts_build_options() {
    let Some(mut device) = open_device() else { return };
    let options = BuildOptions::new(BuildFlags::MAD_ENABLE | BuildFlags::NO_SIGNED_ZEROS);
    device
        .add_program_with_options(KERNEL_SRC, &options)
        .expect("compile with options");
    device.kernel("add_one").expect("lookup");
}

#[test]
fn rgba_image_round_trip() {
    let Some(device) = open_device() else { return };
    let format = PixelFormat::new(ChannelOrder::Rgba, ChannelType::Unorm8);
    let (width, height) = (4usize, 4usize);
    let pixels: Vec<u8> = (0..width * height * 4).map(|i| i as u8).collect();

    let image = match device.create_image(format, width, height, 0, &pixels) {
        Ok(image) => image,
        Err(e) => {
            // Some CPU drivers ship without image support.
            eprintln!("image creation unsupported here ({e}), skipping");
            return;
        }
    };
    let read = image.read_out().expect("read out");
    assert_eq!(read.width, width);
    assert_eq!(read.height, height);
    assert_eq!(read.data, pixels);
}

#[test]
fn image_payload_must_match_extent() {
    let Some(device) = open_device() else { return };
    let format = PixelFormat::new(ChannelOrder::Rgba, ChannelType::Unorm8);
    match device.create_image(format, 4, 4, 0, &[0u8; 3]) {
        Err(OclError::SizeMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (64, 3));
        }
        other => panic!("short pixel payload must fail validation, got {other:?}"),
    }
}

#[test]
fn dispatches_chain_through_wait_list() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");

    let mut vector = device.create_vector(16).expect("allocate");
    vector.copy_in(vec![0.0; 16]).wait().expect("copy in");

    let kernel = device.kernel("add_one").expect("lookup");
    let dispatch = kernel.global(&[16]).local(&[1]);

    let first = dispatch.enqueue(&[Arg::Vector(&vector)], &[]).expect("first");
    let second = dispatch
        .enqueue(&[Arg::Vector(&vector)], &[&first])
        .expect("second");
    second.wait().expect("chained completion");
    first.release();
    second.release();

    assert_eq!(vector.read_out().expect("read out"), vec![2.0f32; 16]);
}

#[test]
fn release_succeeds_after_work() {
    let Some(mut device) = open_device() else { return };
    device.add_program(KERNEL_SRC).expect("compile");
    {
        let mut vector = device.create_vector(16).expect("allocate");
        vector.copy_in(vec![1.0; 16]).wait().expect("copy in");
        let kernel = device.kernel("add_one").expect("lookup");
        vector.map(&kernel).wait().expect("dispatch");
        vector.release();
        // kernel dropped here, before the device
    }
    device.release().expect("ordered release");
}
