use crate::{Digest, HashAlgorithm, ZERO_DIGEST};

/// Sibling of the path node at one level, tagged with the side it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sibling {
  Left(Digest),
  Right(Digest),
}

/// Leaf-to-top authentication path of one ring position.
///
/// `siblings[i]` belongs to level `i + 1`; `top` is the stored node at level `B-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
  pub position: u64,
  pub leaf: Digest,
  pub siblings: Vec<Sibling>,
  pub top: Digest,
}

impl MerklePath {
  /// Recomputes the level `B-1` node from the leaf, applying the same empty-child rule as appends.
  pub fn fold(&self, algorithm: HashAlgorithm) -> Digest {
    self.siblings.iter().fold(self.leaf, |node, sibling| {
      let parent = match sibling {
        Sibling::Left(left) => algorithm.merge(left, &node),
        Sibling::Right(right) => algorithm.merge(&node, right),
      };
      parent.unwrap_or(ZERO_DIGEST)
    })
  }

  pub fn verify(&self, algorithm: HashAlgorithm) -> bool {
    self.fold(algorithm) == self.top
  }
}
