/// Username shown for a group member whose identity has not resolved yet.
pub const PLACEHOLDER_USERNAME: &str = "Fetching…";

/// Version tag embedded in marshaled identity envelopes.
pub const IDENTITY_ENVELOPE_VERSION: u8 = 1;

/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Ed25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Group identifier size in bytes
pub const GROUP_ID_SIZE: usize = 32;

/// Capacity of the store-event broadcast channel
pub const STORE_EVENT_CAPACITY: usize = 256;

/// Capacity of the client-event broadcast channel
pub const CLIENT_EVENT_CAPACITY: usize = 256;

/// Capacity of the engine notification channel
pub const ENGINE_NOTIFICATION_CAPACITY: usize = 64;
