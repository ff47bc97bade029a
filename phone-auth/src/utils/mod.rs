pub mod fingerprint;
pub mod nonce;
pub mod validation;

pub use fingerprint::{device_fingerprint, DeviceProfile};
pub use nonce::NonceGenerator;
