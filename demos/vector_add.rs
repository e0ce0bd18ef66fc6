use oclrt::{Arg, Device, DeviceType, Result};

const SOURCE: &str = r#"
__kernel void saxpy(__global float* x, __global float* y, float a) {
    const int i = get_global_id(0);
    y[i] = a * x[i] + y[i];
}
"#;

fn main() -> Result<()> {
    // One-time runtime setup
    oclrt::init()?;

    let mut device = Device::first(DeviceType::Default)?;
    println!("Device: {device}");
    println!("OpenCL: {}", device.version()?);

    // Compile the kernel source against this device
    device.add_program(SOURCE)?;
    let kernel = device.kernel("saxpy")?;
    println!("Kernel '{}' ready", kernel.name());

    // Upload the inputs
    let n = 16usize;
    let x_data: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let y_data = vec![1.0f32; n];

    let mut x = device.create_vector(n)?;
    let mut y = device.create_vector(n)?;
    let x_done = x.copy_in(x_data);
    let y_done = y.copy_in(y_data);
    x_done.wait()?;
    y_done.wait()?;

    // y = 2x + y over a 1-D range of n work items
    kernel
        .global(&[n])
        .local(&[1])
        .run(&[Arg::Vector(&x), Arg::Vector(&y), Arg::F32(2.0)])
        .wait()?;

    let result = y.read_out()?;
    println!("saxpy result: {result:?}");

    x.release();
    y.release();
    kernel.release();
    device.release()?;
    Ok(())
}
