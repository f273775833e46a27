//! Host identification

use tracing::warn;

/// Name of the machine the devices are attached to
///
/// Falls back to "localhost" when the name cannot be determined.
pub fn host_name() -> String {
    match read_host_name() {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!("Could not determine host name, using \"localhost\"");
            "localhost".to_string()
        }
    }
}

#[cfg(unix)]
fn read_host_name() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn read_host_name() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}
