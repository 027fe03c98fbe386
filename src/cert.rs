//! Self-signed certificate material for the TLS listener.
//!
//! Browsers only hand out screen capture on secure origins, so the server
//! needs some certificate even when the operator never supplies one. The
//! generated pair covers localhost and the machine's LAN address; viewers
//! click through the usual self-signed warning once per browser.

use anyhow::{Context, Result};
use std::fs;
use std::net::{IpAddr, UdpSocket};
use std::path::Path;
use tracing::info;

/// Make sure a certificate and key exist at the given paths, generating a
/// fresh pair when either is missing. Returns true if generation happened.
pub fn ensure_certificate(cert_path: &Path, key_path: &Path) -> Result<bool> {
    if cert_path.exists() && key_path.exists() {
        return Ok(false);
    }
    generate_certificate(cert_path, key_path)?;
    Ok(true)
}

/// Generate a self-signed certificate and private key as PEM files.
pub fn generate_certificate(cert_path: &Path, key_path: &Path) -> Result<()> {
    let mut subject_alt_names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    if let Some(ip) = local_ip() {
        let ip = ip.to_string();
        if !subject_alt_names.contains(&ip) {
            subject_alt_names.push(ip);
        }
    }

    info!("Generating self-signed certificate for {:?}", subject_alt_names);

    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(subject_alt_names)
            .context("Failed to generate certificate")?;

    // Ensure parent directories exist
    if let Some(parent) = cert_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(parent) = key_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(cert_path, cert.pem())?;
    fs::write(key_path, key_pair.serialize_pem())?;

    // Set permissions to 0600 (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(key_path, perms)?;
    }

    Ok(())
}

/// Best-effort LAN address discovery: let the routing table pick the local
/// endpoint for an outward UDP socket. No packet is ever sent.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    match addr.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(IpAddr::V4(ip)),
        _ => None,
    }
}
