// Copyright © 2025 linkrpc contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

//! # MESSAGE MODEL
//!
//! Defines the minimal shape every message exchanged through the runtime must
//! have: a unique [Id], and a predicate that lets the correlation layer
//! (see [crate::correlation]) recognize a response without understanding its
//! payload.

use uuid::Uuid;

/// ## ID
///
/// A 128-bit opaque identifier, unique within the life of a [Client][crate::Client].
///
/// Implementations must ensure that two distinct in-flight requests never
/// share an [Id] within a single [Transport][crate::Transport].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Uuid);

impl Id {
  /// Generates a fresh, random [Id].
  ///
  /// Backed by a random (v4) UUID rather than a hand-rolled counter or
  /// random-bytes routine, so collisions across concurrently-running
  /// clients are as unlikely as the underlying RNG allows.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  /// The 16 raw bytes of this id, for transports that frame it directly
  /// on the wire rather than through a textual encoding.
  pub fn to_bytes(self) -> [u8; 16] {
    *self.0.as_bytes()
  }

  /// Reconstructs an [Id] from the 16 raw bytes produced by
  /// [Id::to_bytes].
  pub fn from_bytes(bytes: [u8; 16]) -> Self {
    Self(Uuid::from_bytes(bytes))
  }
}

impl Default for Id {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Display for Id {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    std::fmt::Display::fmt(&self.0, f)
  }
}

/// ## MESSAGE
/// **Based on §3, §4.1**
///
/// Every message carried by the runtime, request or response, is opaque to
/// the core beyond its [Id] and its ability to answer whether it is a
/// response to some other message.
///
/// The core never inspects a message's payload; it is free to carry
/// whatever the concrete wire protocol needs.
pub trait Message: Clone + Send + 'static {
  /// ### MESSAGE ID
  ///
  /// Returns the [Id] of this message, unique within the life of the
  /// client that produced it.
  fn message_id(&self) -> Id;

  /// ### IS RESPONSE FOR
  ///
  /// Returns true iff `self` is a response correlated to `other`.
  ///
  /// A request always returns `false` here; only responses correlate.
  /// Implementations typically compare `self`'s correlation id against
  /// `other.message_id()`, but the predicate is given full latitude to
  /// use whatever information the protocol provides.
  fn is_response_for(&self, other: &Self) -> bool;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_unique() {
    let a = Id::new();
    let b = Id::new();
    assert_ne!(a, b);
  }

  #[test]
  fn id_is_copy_and_displays() {
    let a = Id::new();
    let b = a;
    assert_eq!(a, b);
    assert!(!format!("{a}").is_empty());
  }

  #[test]
  fn id_roundtrips_through_bytes() {
    let a = Id::new();
    assert_eq!(Id::from_bytes(a.to_bytes()), a);
  }
}
