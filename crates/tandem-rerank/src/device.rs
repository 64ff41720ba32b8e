use candle_core::Device;
use tracing::debug;

/// Prefer Metal when the feature is compiled in, fall back to CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            debug!("reranker device: metal");
            return dev;
        }
    }
    debug!("reranker device: cpu");
    Device::Cpu
}
