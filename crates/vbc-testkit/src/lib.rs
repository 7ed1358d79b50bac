//! # vbc Testkit
//!
//! Shared test support for the vbc crates:
//!
//! - **Golden vectors**: pinned ledger key encodings, so stores written by
//!   earlier releases stay readable
//! - **Generators**: proptest strategies for identifiers, timestamps and posts
//! - **Fixtures**: an account wired to in-memory source, destination and ledger
//!
//! ## Golden Vectors
//!
//! ```rust
//! use vbc_testkit::vectors::{all_vectors, verify_vector};
//!
//! for vector in all_vectors() {
//!     verify_vector(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vbc_testkit::generators::{post_from_params, PostParams};
//!
//! proptest! {
//!     #[test]
//!     fn replies_are_rejected(params: PostParams) {
//!         let post = post_from_params(&params);
//!         prop_assert_eq!(post.is_reply(), params.reply);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use vbc_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.history(3);
//! let controller = fixture.controller(1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::TestFixture;
