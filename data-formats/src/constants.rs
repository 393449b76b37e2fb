use openssl::nid::Nid;

/// Key derivation iteration count used when the caller does not pick one.
pub const DEFAULT_ITER: i32 = 2048;

/// MAC iteration count used when the caller does not pick one. The backend
/// treats zero as a single iteration.
pub const DEFAULT_MAC_ITER: i32 = 0;

/// MAC iteration count that leaves the integrity MAC out of an archive.
pub const NO_MAC: i32 = -1;

/// Password based encryption used for both the key bags and the certificate bags.
pub const ARCHIVE_PBE: Nid = Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC;

// Non-standard MSIE key usage extension, never set
pub(crate) const KEY_TYPE_UNSPECIFIED: i32 = 0;
