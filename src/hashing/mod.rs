use blake3::Hasher;

/// Cache key for a normalized query under a set of entity filters.
///
/// Filters are order-insensitive: they are sorted and deduplicated before hashing, so
/// `["RUMC", "RMG"]` and `["RMG", "RUMC"]` share a key. Each component is length-prefixed,
/// which keeps `("a b", [])` and `("a", ["B"])` from ever feeding identical bytes to the hasher.
pub fn hash_query_key<S: AsRef<str>>(normalized: &str, entity_filters: &[S]) -> [u8; 32] {
    let mut filters: Vec<&str> = entity_filters.iter().map(AsRef::as_ref).collect();
    filters.sort_unstable();
    filters.dedup();

    let mut hasher = Hasher::new();
    hasher.update(b"q");
    update_prefixed(&mut hasher, normalized.as_bytes());
    hasher.update(b"f");
    hasher.update(&(filters.len() as u64).to_le_bytes());
    for filter in filters {
        update_prefixed(&mut hasher, filter.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

#[inline]
fn update_prefixed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for client identifiers in the request budget, where a rare collision only means two
/// clients share a budget. Use [`hash_query_key`] where the full 256-bit output matters.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub fn hash_client_id(client: &str) -> u64 {
    hash_to_u64(client.as_bytes())
}

/// Hex rendering of a cache key, for logs.
pub fn key_hex(key: &[u8; 32]) -> String {
    key.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
