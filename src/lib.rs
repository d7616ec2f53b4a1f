//! # CertTree - Certificate Hierarchy Issuance in Pure Rust
//!
//! CertTree mints the certificates of a small PKI: a self-signed root, intermediate
//! sub-CAs, and leaf `server` and `client` certificates. Every certificate gets the
//! X.509 extensions that match its role, and every issuance rebuilds its signing
//! context from the issuer's persisted certificate and key, so the hierarchy only
//! ever lives in the record store.
//!
//! ## Roles
//!
//! | Role     | BasicConstraints       | KeyUsage                                             | ExtendedKeyUsage              |
//! |----------|------------------------|------------------------------------------------------|-------------------------------|
//! | `root`   | CA, no path limit      | keyCertSign, cRLSign, digitalSignature               |                               |
//! | `subca`  | CA, pathLen 1          | keyCertSign, cRLSign, digitalSignature               |                               |
//! | `server` | not a CA               | digitalSignature, keyEncipherment                    | serverAuth                    |
//! | `client` | not a CA               | digitalSignature, contentCommitment, keyEncipherment | clientAuth, emailProtection   |
//!
//! A root issues sub-CAs and leaves; a sub-CA issues leaves only.
//!
//! ## Key Features
//!
//! - **RSA-2048 / SHA-256**: Keys and signatures built with rustcrypto libraries
//! - **Key Identifiers**: SKI from the subject key, AKI copied from the issuer's SKI
//! - **Idempotent Issuance**: Re-issuing an identical request returns the stored record
//! - **Chain Assembly**: Walk issuer references from any leaf up to the root
//! - **Stores**: In-memory and directory-backed record stores with atomic saves
//! - **PKCS#12**: Optional export through OpenSSL (`pkcs12` feature)
//!
//! ## Quick Start
//!
//! ### Issuing a Hierarchy
//!
//! ```rust,no_run
//! use certtree::{
//!     role::Role,
//!     service::IssuanceService,
//!     store::MemoryStore,
//! };
//!
//! # fn main() -> Result<(), certtree::error::CertTreeError> {
//! let service = IssuanceService::new(MemoryStore::new());
//!
//! service.issue("ca", Role::Root, None)?;
//! service.issue("subca1", Role::SubCa, Some("ca"))?;
//! let client = service.issue("client1", Role::Client, Some("subca1"))?;
//! println!("client1 fingerprint: {}", client.fingerprint);
//!
//! // subca1 first, then the root
//! let chain = service.assemble_chain("client1")?;
//! assert_eq!(chain.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing Without a Store
//!
//! ```rust,no_run
//! use certtree::{
//!     cert::{CertificateWithPrivateKey, params::CertificateRequest},
//!     issuer::{Issuer, self_signed},
//!     key::{KeyPair, PublicKey},
//!     role::Role,
//! };
//!
//! # fn main() -> Result<(), certtree::error::CertTreeError> {
//! let ca_key = KeyPair::generate()?;
//! let ca_request = CertificateRequest::builder()
//!     .subject("ca")
//!     .role(Role::Root)
//!     .subject_public_key(PublicKey::from_key_pair(&ca_key))
//!     .build();
//! let ca = CertificateWithPrivateKey::new(self_signed(&ca_request, &ca_key)?, ca_key);
//!
//! let server_key = KeyPair::generate()?;
//! let server_request = CertificateRequest::builder()
//!     .subject("server.example.com")
//!     .role(Role::Server)
//!     .subject_public_key(PublicKey::from_key_pair(&server_key))
//!     .valid_days(90)
//!     .build();
//! let server_cert = ca.issue(&server_request)?;
//! println!("{}", server_cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`error::CertTreeError`]; [`error::CertTreeError::category`]
//! tells bad input apart from missing dependencies and corrupted state:
//!
//! ```rust
//! use certtree::{error::{CertTreeError, ErrorCategory}, role::Role};
//!
//! match "intermediate".parse::<Role>() {
//!     Ok(role) => println!("role {role}"),
//!     Err(e @ CertTreeError::InvalidRole(_)) => {
//!         assert_eq!(e.category(), ErrorCategory::BadInput)
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key generation, import/export, and signing
//! - [`cert`]: Certificate encoding/decoding and X.509 extensions
//! - [`policy`]: Role profiles and the extensions they produce
//! - [`issuer`]: Certificate issuing and self-signed roots
//! - [`service`]: Store-backed issuance
//! - [`chain`]: Trust chain assembly
//! - [`store`]: Record store trait and implementations
//! - [`config`]: Issuance settings and provisioning plans
//! - [`provision`]: Running provisioning plans
//! - [`error`]: Error types and categories

pub mod cert;
pub mod chain;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod issuer;
pub mod key;
pub mod pem_utils;
#[cfg(feature = "pkcs12")]
pub mod pkcs12;
pub mod policy;
pub mod provision;
pub mod record;
pub mod role;
pub mod service;
pub mod store;
pub mod tbs_certificate;

pub use error::{CertTreeError, ErrorCategory, Result};
pub use fingerprint::Fingerprint;
pub use record::CertificateRecord;
pub use role::Role;
pub use service::IssuanceService;
