// src/utils/candle.rs
use candle_core::Device;
use once_cell::sync::Lazy;

static CANDLE_DEVICE: Lazy<Device> = Lazy::new(|| {
    // Metal is only available when candle-core was built with the "metal"
    // feature on macOS; everywhere else this falls through to the CPU.
    match Device::new_metal(0) {
        Ok(metal_device) if metal_device.is_metal() => {
            log::info!("Successfully initialized Candle Metal device (GPU) for model inference.");
            metal_device
        }
        Ok(_) => {
            log::warn!("Device::new_metal(0) succeeded but the device is not Metal. Using CPU.");
            Device::Cpu
        }
        Err(err) => {
            log::debug!("Candle Metal device unavailable ({}); using CPU.", err);
            log::info!("Using Candle CPU device for model inference.");
            Device::Cpu
        }
    }
});

/// The device every model tensor is created on.
pub fn inference_device() -> &'static Device {
    &CANDLE_DEVICE
}
