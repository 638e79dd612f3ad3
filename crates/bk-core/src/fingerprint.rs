use sha2::{Digest, Sha256};

/// Stable, anonymous identifier of this machine sent with every request.
///
/// Derived from the host name so that it survives restarts without
/// revealing the name itself.
#[must_use]
pub fn machine_fingerprint() -> String {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    digest(&host)
}

fn digest(host: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(host.as_bytes());
    hex::encode(hasher.finalize())
}
