use rand::Rng;

/// Produces the single-use random token embedded in each signed request.
/// 128 bits of randomness per nonce; repetition within a validity window
/// is not a practical concern at that size.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonceGenerator;

impl NonceGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let nonce_bytes: [u8; 16] = rng.gen();
        hex::encode(nonce_bytes)
    }
}
