//! # Consentflow Testkit
//!
//! Testing utilities for Consentflow.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fakes**: [`FakeWallet`] and [`FakeRegistry`], collaborators that count
//!   calls and fail on demand
//! - **Fixtures**: a holder wired to both fakes, plus grant and terms builders
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use consentflow_testkit::fixtures::{share_all, TestFixture};
//!
//! let fixture = TestFixture::with_page_size(2);
//! fixture.add_credentials(5, "Achievement");
//! fixture.live_grant("did:web:x", "lc:terms:1", share_all("Achievement"));
//! assert_eq!(fixture.wallet.uploads(), 0);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use consentflow_testkit::generators::draft;
//!
//! proptest! {
//!     #[test]
//!     fn drafts_validate(draft in draft()) {
//!         prop_assert!(consentflow_core::validate_draft(&draft).is_ok());
//!     }
//! }
//! ```

pub mod fakes;
pub mod fixtures;
pub mod generators;

pub use fakes::{FakeRegistry, FakeWallet, RegistryCalls};
pub use fixtures::{TestFixture, DAY, HOLDER};
