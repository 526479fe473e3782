//! Device identity, fetched once at startup.

use core::fmt;

use log::{error, info};
use thiserror_no_std::Error;

/// Longest client id accepted
pub const CLIENT_ID_CAPACITY: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {details}")]
    Unavailable { details: &'static str },
    #[error("Client id is empty")]
    Empty,
    #[error("Client id longer than {max} bytes")]
    TooLong { max: usize },
}

/// Source of the device's client id (e.g. a secure element or provisioning store).
pub trait IdentityProvider {
    fn client_id(&mut self) -> impl Future<Output = Result<ClientIdentity, IdentityError>>;
}

/// Opaque client id, immutable once obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(heapless::String<CLIENT_ID_CAPACITY>);

impl ClientIdentity {
    pub fn new(id: &str) -> Result<Self, IdentityError> {
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        heapless::String::try_from(id)
            .map(Self)
            .map_err(|_| IdentityError::TooLong {
                max: CLIENT_ID_CAPACITY,
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fetch the client id. Callers treat an error as fatal.
pub async fn load_identity<P: IdentityProvider>(
    provider: &mut P,
) -> Result<ClientIdentity, IdentityError> {
    match provider.client_id().await {
        Ok(id) => {
            info!("Client id: {}", id);
            Ok(id)
        }
        Err(e) => {
            error!("Could not obtain client id: {}", e);
            Err(e)
        }
    }
}
