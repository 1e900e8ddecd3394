//! # bigdrop-auth
//!
//! Bearer token contract for BigDrop. Tokens are HS256 JWTs whose subject is
//! the caller's [`OwnerId`](bigdrop_core::types::id::OwnerId). Credential
//! handling (login, signup, password storage) lives outside this service.

pub mod jwt;

pub use jwt::{Claims, IssuedToken, JwtDecoder, JwtEncoder};
