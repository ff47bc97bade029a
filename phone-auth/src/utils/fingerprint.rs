use sha2::{Digest, Sha256};

/// Fingerprints are truncated to this many hex characters.
pub const FINGERPRINT_LEN: usize = 32;

/// Client/device attributes the fingerprint is derived from. A weak
/// correlation signal only, never a security boundary.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub brand: String,
    pub model: String,
    pub platform: String,
    pub system: String,
    pub language: String,
    pub pixel_ratio: f64,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// Derive a bounded-length descriptor string from the device profile.
pub fn device_fingerprint(profile: &DeviceProfile) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{:.2}|{}x{}",
        profile.brand,
        profile.model,
        profile.platform,
        profile.system,
        profile.language,
        profile.pixel_ratio,
        profile.screen_width,
        profile.screen_height,
    );

    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    digest[..FINGERPRINT_LEN].to_string()
}
