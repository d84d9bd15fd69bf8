#![forbid(unsafe_code)]

//! String identifiers for pans and products.
//!
//! Ids are opaque strings on the wire so that case files written by older
//! planners (which used short random base36 ids) round-trip unchanged.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 8;

fn random_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(random_id())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for the empty string, which import validation rejects.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a pan within a case.
    PanId
);

string_id!(
    /// Identifier of a catalog product.
    ProductId
);

impl PanId {
    /// A random id not used by any of `taken`.
    pub fn fresh<'a>(taken: impl Iterator<Item = &'a PanId> + Clone) -> Self {
        loop {
            let id = Self::random();
            if !taken.clone().any(|t| *t == id) {
                return id;
            }
        }
    }
}
