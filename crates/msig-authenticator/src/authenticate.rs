//! Signature aggregation and signer resolution.

use std::collections::{HashMap, HashSet};

use msig_types::envelope::{Envelope, SignatureEntry};
use msig_types::error::{AuthError, SignerRef};
use msig_types::identity::UserProfile;
use msig_types::scheme::{Recovery, SchemeRegistry, SignatureScheme};

use crate::chaincode;
use crate::context::Context;
use crate::profile_store::ProfileStore;

/// The outcome of authenticating an envelope.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The first authenticated user, or the synthetic `service|` profile on
    /// the origin-chaincode branch.
    pub calling_user: UserProfile,
    /// All authenticated users, in signature order, deduplicated by alias.
    /// Empty on the origin-chaincode branch.
    pub users: Vec<UserProfile>,
    /// The signature count the operation demanded.
    pub min_signatures: usize,
}

/// Validates and aggregates envelope signatures into user profiles.
///
/// Holds the scheme registry; everything per-request lives in the
/// [`Context`].
pub struct Authenticator {
    schemes: SchemeRegistry,
}

impl Default for Authenticator {
    /// An authenticator with the ETH and TON schemes registered.
    fn default() -> Self {
        Authenticator::new(
            SchemeRegistry::new()
                .register(Box::new(msig_scheme_eth::EthScheme))
                .register(Box::new(msig_scheme_ton::TonScheme)),
        )
    }
}

impl Authenticator {
    pub fn new(schemes: SchemeRegistry) -> Self {
        Authenticator { schemes }
    }

    /// Authenticates every signature entry of `envelope` and resolves the
    /// signers to user profiles, in signature order.
    ///
    /// On success `ctx.calling_users` is set to the resolved list. An
    /// envelope without signatures authenticates only through the
    /// origin-chaincode branch (`signerAddress` of shape `service|<name>`).
    ///
    /// Failures raised for an individual entry are annotated with
    /// `(signer: <address ?? public key ?? index>)`.
    pub async fn authenticate(
        &self,
        ctx: &mut Context<'_>,
        envelope: &Envelope,
        min_signatures: usize,
    ) -> Result<AuthResult, AuthError> {
        let entries = envelope.signature_entries()?;
        if entries.is_empty() {
            if let Some(sender) = envelope.signer_address()
                && let Some(name) = sender.strip_prefix("service|")
            {
                let calling_user =
                    chaincode::authenticate_origin_chaincode(ctx.ledger(), name).await?;
                ctx.set_calling_users(Vec::new());
                return Ok(AuthResult {
                    calling_user,
                    users: Vec::new(),
                    min_signatures,
                });
            }
            return Err(AuthError::MissingSignature);
        }

        let signing = envelope.signing()?;
        let scheme = self.schemes.scheme(signing)?;
        let message = envelope.signed_bytes()?;

        // Steps 2-3: per-entry resolution and signer uniqueness.
        let mut resolved = Vec::with_capacity(entries.len());
        let mut seen_addresses = HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let signer = signer_ref(entry, index);
            let (address, public_key) = resolve_entry(scheme, entry, &message, index)
                .map_err(|e| e.with_signer(signer.clone()))?;
            tracing::debug!(index, address = %address, "resolved signer");
            if !seen_addresses.insert(address.clone()) {
                return Err(AuthError::DuplicateSigner { address });
            }
            resolved.push(ResolvedSigner {
                signature: entry.signature.clone(),
                address,
                public_key,
                signer,
            });
        }

        // Step 4: batch profile resolution.
        let store = ProfileStore::new(ctx.ledger(), ctx.config());
        let addresses: Vec<String> = resolved.iter().map(|r| r.address.clone()).collect();
        let found = store.get_user_profiles(&addresses).await?;
        let mut by_address: HashMap<&str, &UserProfile> = HashMap::new();
        for profile in &found {
            if let Some(address) = profile.eth_address.as_deref() {
                by_address.insert(address, profile);
            }
            if let Some(address) = profile.ton_address.as_deref() {
                by_address.insert(address, profile);
            }
        }

        let mut users = Vec::with_capacity(resolved.len());
        let mut seen_aliases = HashSet::new();
        for signer in &resolved {
            let (profile, synthesized) = match by_address.get(signer.address.as_str()) {
                Some(profile) => ((*profile).clone(), false),
                None if ctx.config().allow_non_registered_users
                    && signer.public_key.is_some() =>
                {
                    (UserProfile::synthesized(signing, &signer.address), true)
                }
                None => {
                    return Err(AuthError::UserNotRegistered {
                        user_id: signer.address.clone(),
                        signer: signer.signer.clone(),
                    });
                }
            };

            // Step 5: entries that declared only an address resolve their key
            // through the profile's stored record.
            let public_key = match &signer.public_key {
                Some(public_key) => public_key.clone(),
                None => {
                    let record = store.get_public_key(&profile.alias).await?.ok_or_else(|| {
                        AuthError::PkMissing {
                            alias: profile.alias.to_string(),
                            signer: signer.signer.clone(),
                        }
                    })?;
                    record.public_key
                }
            };

            // Step 6: verify with the resolved key.
            let valid = scheme
                .verify(&signer.signature, &message, &public_key)
                .map_err(|e| e.with_signer(signer.signer.clone()))?;
            if !valid {
                let alias = if synthesized {
                    signer.address.clone()
                } else {
                    profile.alias.to_string()
                };
                return Err(AuthError::PkInvalidSignature {
                    alias,
                    signer: signer.signer.clone(),
                });
            }

            // Step 7: signature order, deduplicated by alias, first wins.
            if seen_aliases.insert(profile.alias.clone()) {
                users.push(profile);
            }
        }

        let calling_user = users.first().cloned().ok_or(AuthError::MissingSignature)?;
        ctx.set_calling_users(users.clone());
        Ok(AuthResult {
            calling_user,
            users,
            min_signatures,
        })
    }
}

struct ResolvedSigner {
    signature: String,
    address: String,
    public_key: Option<String>,
    signer: SignerRef,
}

fn signer_ref(entry: &SignatureEntry, index: usize) -> SignerRef {
    if let Some(address) = &entry.signer_address {
        SignerRef::Address(address.clone())
    } else if let Some(public_key) = &entry.signer_public_key {
        SignerRef::PublicKey(public_key.clone())
    } else {
        SignerRef::Index(index)
    }
}

/// Resolves one entry to its `(address, public key)` pair.
///
/// For a recoverable scheme the signature itself is the identity, and any
/// matching declaration is redundant while any differing one is a mismatch.
/// When recovery is unavailable the declared identity stands in, and the
/// public key may stay unknown until profile lookup.
fn resolve_entry(
    scheme: &dyn SignatureScheme,
    entry: &SignatureEntry,
    message: &[u8],
    index: usize,
) -> Result<(String, Option<String>), AuthError> {
    let placeholder = SignerRef::Index(index);
    let declared_public_key = entry.signer_public_key.as_deref();
    let declared_address = entry.signer_address.as_deref();

    let recovery = if scheme.is_recoverable() {
        scheme.recover_public_key(&entry.signature, message)?
    } else {
        Recovery::NotRecoverable
    };

    if let (Some(public_key), Some(address)) = (declared_public_key, declared_address) {
        if scheme.is_recoverable() {
            return Err(AuthError::RedundantSignerPublicKey {
                recovered: recovery.recovered().map(str::to_string),
                in_dto: public_key.to_string(),
                signer: placeholder,
            });
        }
        // Without recovery both declarations are allowed, but they must
        // agree with each other.
        let public_key = scheme.normalize_public_key(public_key)?;
        let derived = scheme.public_key_to_address(&public_key)?;
        let declared = scheme.normalize_address(address)?;
        if derived != declared {
            return Err(AuthError::AddressMismatch {
                recovered: derived,
                provided: declared,
                signer: placeholder,
            });
        }
        return Ok((derived, Some(public_key)));
    }

    match recovery {
        Recovery::Recovered(recovered) => {
            if let Some(public_key) = declared_public_key {
                let provided = scheme.normalize_public_key(public_key)?;
                if provided != recovered {
                    Err(AuthError::PublicKeyMismatch {
                        recovered,
                        provided,
                        signer: placeholder,
                    })
                } else {
                    Err(AuthError::RedundantSignerPublicKey {
                        recovered: Some(recovered),
                        in_dto: public_key.to_string(),
                        signer: placeholder,
                    })
                }
            } else if let Some(address) = declared_address {
                let provided = scheme.normalize_address(address)?;
                let derived = scheme.public_key_to_address(&recovered)?;
                if derived != provided {
                    Err(AuthError::AddressMismatch {
                        recovered: derived,
                        provided,
                        signer: placeholder,
                    })
                } else {
                    Err(AuthError::RedundantSignerAddress {
                        recovered: Some(derived),
                        in_dto: address.to_string(),
                        signer: placeholder,
                    })
                }
            } else {
                let address = scheme.public_key_to_address(&recovered)?;
                Ok((address, Some(recovered)))
            }
        }
        Recovery::NotRecoverable => {
            if let Some(public_key) = declared_public_key {
                let public_key = scheme.normalize_public_key(public_key)?;
                let address = scheme.public_key_to_address(&public_key)?;
                Ok((address, Some(public_key)))
            } else if let Some(address) = declared_address {
                Ok((scheme.normalize_address(address)?, None))
            } else {
                Err(AuthError::MissingSigner {
                    signature: entry.signature.clone(),
                    signer: placeholder,
                })
            }
        }
    }
}
