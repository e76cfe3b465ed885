//! # mssql-auth
//!
//! Authentication strategies for SQL Server connections.
//!
//! This crate provides various authentication methods, isolated from
//! connection logic for better modularity and testing.
//!
//! ## Supported Authentication Strategies
//!
//! Exactly three top-level strategies, matching [`AuthMethod`]:
//!
//! | Method | Feature Flag | Description |
//! |--------|--------------|-------------|
//! | SQL Authentication | default | Username/password encoded directly in Login7 |
//! | FedAuth (embedded token) | default | Pre-acquired Azure AD token carried in the Login7 feature extension |
//! | FedAuth (ADAL handshake) | `azure-identity`, `cert-auth` | Server-driven FEDAUTHINFO exchange; token supplied by a pluggable provider (managed identity, service principal, or certificate-signed assertion) |
//!
//! Windows-integrated (SSPI/Kerberos) authentication is not supported.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod azure_ad;
#[cfg(feature = "azure-identity")]
pub mod azure_identity_auth;
#[cfg(feature = "cert-auth")]
pub mod cert_auth;
pub mod credentials;
pub mod error;
pub mod provider;

pub use azure_ad::{AzureAdAuth, FedAuthLibrary, FedAuthWorkflow};
#[cfg(feature = "azure-identity")]
pub use azure_identity_auth::{ManagedIdentityAuth, ServicePrincipalAuth};
#[cfg(feature = "cert-auth")]
pub use cert_auth::CertificateAuth;
pub use credentials::Credentials;
pub use error::AuthError;
pub use provider::{AsyncAuthProvider, AuthData, AuthMethod, AuthProvider};
