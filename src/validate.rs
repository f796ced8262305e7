//! Field validation predicates
//!
//! Pure checks shared by the declarative config loader and the wizard steps.
//! Each returns `Ok(())` or a `Validation` error whose message is shown to the
//! operator verbatim.

use crate::error::{InstallerError, Result};

/// SSH public key algorithms accepted in `authorized_keys`
const SSH_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-ed25519",
    "ssh-dss",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// Hostname per RFC 952: starts with a letter, letters/digits/hyphens, max 63 chars.
pub fn hostname(s: &str) -> Result<()> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InstallerError::validation("hostname cannot be empty"));
    }
    let starts_with_letter = s.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_chars = s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !starts_with_letter || !valid_chars || s.len() > 63 {
        return Err(InstallerError::validation(
            "invalid hostname: must start with a letter, contain only letters/digits/hyphens, max 63 chars",
        ));
    }
    Ok(())
}

/// Linux username: starts with a lowercase letter or `_`, max 32 chars.
pub fn username(s: &str) -> Result<()> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InstallerError::validation("username cannot be empty"));
    }
    let starts_ok = s
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_chars = s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !starts_ok || !valid_chars || s.len() > 32 {
        return Err(InstallerError::validation(
            "invalid username: must start with a lowercase letter or _, contain only lowercase letters/digits/_/-, max 32 chars",
        ));
    }
    Ok(())
}

/// Returns true for sizes like `512M` or `1G`.
fn is_unit_size(s: &str) -> bool {
    match s.char_indices().last() {
        Some((idx, unit)) if matches!(unit, 'M' | 'm' | 'G' | 'g') => {
            let digits = &s[..idx];
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Returns true for zram-generator expressions like `ram / 2`.
fn is_ram_expression(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("ram") else {
        return false;
    };
    let Some(divisor) = rest.trim_start().strip_prefix('/') else {
        return false;
    };
    let divisor = divisor.trim_start();
    !divisor.is_empty() && divisor.chars().all(|c| c.is_ascii_digit())
}

/// Partition size such as `512M` or `1G`.
pub fn partition_size(s: &str) -> Result<()> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InstallerError::validation("partition size cannot be empty"));
    }
    if !is_unit_size(s) {
        return Err(InstallerError::validation(
            "invalid partition size: use format like 512M or 1G",
        ));
    }
    Ok(())
}

/// ZRAM size: an explicit size like `8G` or a zram-generator expression like `ram / 2`.
pub fn zram_size(s: &str) -> Result<()> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InstallerError::validation("ZRAM size cannot be empty"));
    }
    if is_unit_size(s) || is_ram_expression(s) {
        return Ok(());
    }
    Err(InstallerError::validation(
        "invalid ZRAM size: use format like 8G, 4096M, or ram / 2",
    ))
}

/// Account password: at least 4 characters.
pub fn password(s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(InstallerError::validation("password cannot be empty"));
    }
    if s.chars().count() < 4 {
        return Err(InstallerError::validation("password must be at least 4 characters"));
    }
    Ok(())
}

/// LUKS passphrase: at least 8 characters.
pub fn passphrase(s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(InstallerError::validation("passphrase cannot be empty"));
    }
    if s.chars().count() < 8 {
        return Err(InstallerError::validation("passphrase must be at least 8 characters"));
    }
    Ok(())
}

fn is_key_type(t: &str) -> bool {
    if SSH_KEY_TYPES.contains(&t) {
        return true;
    }
    t.strip_prefix("ecdsa-sha2-nistp")
        .is_some_and(|bits| !bits.is_empty() && bits.chars().all(|c| c.is_ascii_digit()))
}

fn is_base64_blob(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

/// SSH public key in `authorized_keys` format: `<type> <base64> [comment]`.
pub fn ssh_pubkey(s: &str) -> Result<()> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InstallerError::validation("SSH public key cannot be empty"));
    }
    let mut fields = s.split_whitespace();
    let key_type = fields.next().unwrap_or_default();
    let blob = fields.next().unwrap_or_default();
    if !is_key_type(key_type) || !is_base64_blob(blob) {
        return Err(InstallerError::validation(
            "invalid SSH public key: expected format like 'ssh-ed25519 AAAA... comment'",
        ));
    }
    Ok(())
}
