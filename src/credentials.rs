//! Keychain-backed storage for the sudo credential.
//!
//! The store is a black box: any failure talking to it is tolerated by
//! treating the credential as absent. At most one credential is cached in
//! memory process-wide (owned by the UI state), never persisted elsewhere.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::errors::UpdateError;

const SERVICE: &str = "dock_updater";
const ACCOUNT: &str = "sudo_password";

fn entry() -> Result<keyring::Entry, UpdateError> {
    keyring::Entry::new(SERVICE, ACCOUNT)
        .map_err(|e| UpdateError::CredentialStore(e.to_string()))
}

/// Load the stored credential, if any. A missing entry is not an error.
pub fn load() -> Result<Option<String>, UpdateError> {
    match entry()?.get_password() {
        Ok(secret) => Ok(Some(secret)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(UpdateError::CredentialStore(e.to_string())),
    }
}

/// Persist the credential, overwriting any previous one.
pub fn store(secret: &str) -> Result<(), UpdateError> {
    entry()?
        .set_password(secret)
        .map_err(|e| UpdateError::CredentialStore(e.to_string()))
}

/// Test the candidate password against sudo before it is saved. `-k` drops
/// any cached ticket so a stale grant cannot mask a wrong password.
pub fn verify_sudo(secret: &str) -> bool {
    let child = Command::new("sudo")
        .args(["-S", "-k", "true"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            log::warn!("could not spawn sudo to verify credentials: {e}");
            return false;
        }
    };
    if let Some(mut stdin) = child.stdin.take() {
        let _ = writeln!(stdin, "{secret}");
    }
    child.wait().map(|s| s.success()).unwrap_or(false)
}
