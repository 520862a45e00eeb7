mod session;
mod store;

pub use session::{ClientCredentials, EXPIRY_GRACE_SECS, SessionState, TokenSession};
pub use store::{CredentialStore, FileCredentialStore};
