// SPDX-License-Identifier: MIT

//! Services module - identity provider integration.

pub mod oidc;

pub use oidc::{OidcClient, ProviderEndpoints, TokenResponse};
