//! Typed read-through access to public keys and user profiles.

use msig_types::alias::UserAlias;
use msig_types::envelope::SigningScheme;
use msig_types::error::AuthError;
use msig_types::identity::{PublicKeyRecord, UserProfile, admin_roles};
use msig_types::store::{Ledger, get_json, keys, put_json};

use crate::config::AuthConfig;

/// Reads and writes `GCPK|` and `GCUP|` records over a [`Ledger`].
///
/// When the configuration carries a bootstrap admin identity, lookups for the
/// admin's alias or address that miss on-ledger resolve to a synthetic record
/// instead. Those synthetic records exist only for the current request and
/// are never written back.
pub struct ProfileStore<'a> {
    ledger: &'a dyn Ledger,
    config: &'a AuthConfig,
}

impl<'a> ProfileStore<'a> {
    pub fn new(ledger: &'a dyn Ledger, config: &'a AuthConfig) -> Self {
        ProfileStore { ledger, config }
    }

    /// The stored public key for an alias, or the admin key when the alias is
    /// the bootstrap admin's and nothing is stored.
    pub async fn get_public_key(
        &self,
        alias: &UserAlias,
    ) -> Result<Option<PublicKeyRecord>, AuthError> {
        let key = self
            .ledger
            .create_composite_key(keys::PUBLIC_KEY, &[&alias.to_string()]);
        if let Some(record) = get_json::<PublicKeyRecord>(self.ledger, &key).await? {
            return Ok(Some(record));
        }
        if let Some(admin) = &self.config.admin
            && admin.alias == *alias
        {
            return Ok(Some(PublicKeyRecord {
                public_key: admin.public_key.clone(),
                signing: SigningScheme::Eth,
            }));
        }
        Ok(None)
    }

    /// The stored profile for an address, or the synthetic admin profile when
    /// the address derives from the bootstrap key and nothing is stored.
    pub async fn get_user_profile(
        &self,
        address: &str,
    ) -> Result<Option<UserProfile>, AuthError> {
        let key = self
            .ledger
            .create_composite_key(keys::USER_PROFILE, &[address]);
        if let Some(profile) = get_json::<UserProfile>(self.ledger, &key).await? {
            return Ok(Some(profile));
        }
        Ok(self.admin_profile_for(address))
    }

    /// Loads profiles for a batch of addresses as one ledger round trip.
    ///
    /// The returned list contains only the profiles that were found; order
    /// does not necessarily match the input.
    pub async fn get_user_profiles(
        &self,
        addresses: &[String],
    ) -> Result<Vec<UserProfile>, AuthError> {
        let profile_keys: Vec<String> = addresses
            .iter()
            .map(|address| {
                self.ledger
                    .create_composite_key(keys::USER_PROFILE, &[address])
            })
            .collect();
        let values = self.ledger.get_states(&profile_keys).await?;
        let mut profiles = Vec::with_capacity(addresses.len());
        for (address, value) in addresses.iter().zip(values) {
            match value {
                Some(bytes) => profiles.push(serde_json::from_slice(&bytes)?),
                None => {
                    if let Some(admin) = self.admin_profile_for(address) {
                        profiles.push(admin);
                    }
                }
            }
        }
        Ok(profiles)
    }

    fn admin_profile_for(&self, address: &str) -> Option<UserProfile> {
        let admin = self.config.admin.as_ref()?;
        if admin.eth_address != address {
            return None;
        }
        Some(UserProfile {
            alias: admin.alias.clone(),
            eth_address: Some(admin.eth_address.clone()),
            ton_address: None,
            roles: admin_roles(),
        })
    }

    /// Stores a public key record under its alias.
    pub async fn put_public_key(
        &self,
        alias: &UserAlias,
        record: &PublicKeyRecord,
    ) -> Result<(), AuthError> {
        let key = self
            .ledger
            .create_composite_key(keys::PUBLIC_KEY, &[&alias.to_string()]);
        put_json(self.ledger, &key, record).await
    }

    /// Stores a profile under its own address.
    pub async fn put_user_profile(&self, profile: &UserProfile) -> Result<(), AuthError> {
        let address = profile.address().ok_or_else(|| {
            AuthError::validation(format!("profile {} carries no address", profile.alias))
        })?;
        let key = self
            .ledger
            .create_composite_key(keys::USER_PROFILE, &[address]);
        put_json(self.ledger, &key, profile).await
    }

    /// Overwrites a rotated-away address slot with the tombstone profile.
    pub async fn invalidate_user_profile(&self, address: &str) -> Result<(), AuthError> {
        let key = self
            .ledger
            .create_composite_key(keys::USER_PROFILE, &[address]);
        put_json(self.ledger, &key, &UserProfile::tombstone()).await
    }
}
