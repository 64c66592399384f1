//! Volume Naming
//!
//! Derives PersistentVolume names from (entry, node, storage class) with a
//! 32-bit FNV-1a hash. The mapping is stateless; collisions are not detected.

/// Prefix of every discovered volume name
pub const PV_NAME_PREFIX: &str = "local-pv-";

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// Incremental 32-bit FNV-1a hasher
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a32 {
    state: u32,
}

impl Default for Fnv1a32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Fnv1a32 {
    pub fn new() -> Self {
        Self {
            state: FNV32_OFFSET_BASIS,
        }
    }

    /// Feed bytes into the hash
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u32;
            self.state = self.state.wrapping_mul(FNV32_PRIME);
        }
    }

    #[inline]
    pub fn finish(&self) -> u32 {
        self.state
    }
}

/// Name of the volume backing `entry` under `class` on `node`
pub fn generate_pv_name(entry: &str, node: &str, class: &str) -> String {
    let mut h = Fnv1a32::new();
    h.write(entry.as_bytes());
    h.write(node.as_bytes());
    h.write(class.as_bytes());
    format!("{}{:x}", PV_NAME_PREFIX, h.finish())
}
