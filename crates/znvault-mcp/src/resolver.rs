//! Alias-first identifier resolution.
//!
//! A caller-supplied identifier may be an alias or a primary key; nothing in
//! its form says which. Aliases are the common case, so the alias lookup runs
//! first and the key lookup runs only if it fails. When both fail, the key
//! lookup's error is the one reported.

use tracing::{debug, warn};
use znvault_client::{Secret, SecretBackend, VaultError};

use crate::params::Identifier;

/// Which lookup found the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPath {
    Alias,
    Id,
}

/// A secret and the lookup that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub secret: Secret,
    pub via: LookupPath,
}

/// Resolve an identifier to secret metadata: alias lookup, then key lookup.
///
/// The key lookup runs after *any* alias failure, not only not-found. An
/// alias failure that is not a not-found is logged at `warn` before it is
/// discarded, so a transient backend problem stays visible in the logs even
/// when the caller only sees the key lookup's outcome.
///
/// # Errors
///
/// Returns the key lookup's error when both lookups fail.
pub async fn resolve<B>(backend: &B, identifier: &Identifier) -> Result<Resolved, VaultError>
where
    B: SecretBackend + ?Sized,
{
    let id = identifier.as_str();
    match backend.secret_by_alias(id).await {
        Ok(secret) => Ok(Resolved {
            secret,
            via: LookupPath::Alias,
        }),
        Err(alias_err) => {
            if alias_err.is_not_found() {
                debug!(identifier = id, "no secret with this alias, trying as id");
            } else {
                warn!(
                    identifier = id,
                    error = %alias_err,
                    "alias lookup failed, falling back to id lookup"
                );
            }
            let secret = backend.secret_by_id(id).await?;
            Ok(Resolved {
                secret,
                via: LookupPath::Id,
            })
        }
    }
}
