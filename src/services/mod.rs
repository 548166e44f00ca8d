//! Business logic services

pub mod authenticator;
pub mod credentials;
pub mod secret_store;

pub use authenticator::{sign_body, AuthError, Authenticator, SignedRequest};
pub use credentials::{CredentialIssuer, IssueError, IssuedCredentials, NewEnterprise};
pub use secret_store::{DecryptionError, MasterKey, SecretStore, SecretStoreError};
