//! The closed `Right` enumeration and its bit-set representation.
//!
//! Represented as a `u32` bit-set (not a `HashSet<Right>`) so the Rights
//! Evaluator can union/intersect a caller's effective rights in O(1).

use serde::{Deserialize, Serialize};

macro_rules! rights {
    ($($name:ident = $bit:expr),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum Right {
            $($name,)+
        }

        impl Right {
            pub const ALL: &'static [Right] = &[$(Right::$name,)+];

            pub fn bit(self) -> u32 {
                match self {
                    $(Right::$name => 1 << $bit,)+
                }
            }
        }
    };
}

rights! {
    ArtifactRead = 0,
    ArtifactCreate = 1,
    ArtifactDelete = 2,
    BenchmarkRead = 3,
    BenchmarkCreate = 4,
    BenchmarkDelete = 5,
    EpisodeRead = 6,
    EpisodeCreate = 7,
    EpisodeDelete = 8,
    UserRead = 9,
    UserCreate = 10,
    UserDelete = 11,
    UserUpdate = 12,
    RoleRead = 13,
    RoleCreate = 14,
    RoleDelete = 15,
    GroupRead = 16,
    GroupCreate = 17,
    GroupDelete = 18,
    GroupUpdate = 19,
}

/// A set of [`Right`]s, stored as a bit-set for cheap union/intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RightSet(u32);

impl RightSet {
    pub const EMPTY: RightSet = RightSet(0);

    pub fn from_rights(rights: impl IntoIterator<Item = Right>) -> Self {
        let mut set = RightSet::EMPTY;
        for r in rights {
            set.insert(r);
        }
        set
    }

    pub fn all() -> Self {
        Self::from_rights(Right::ALL.iter().copied())
    }

    pub fn insert(&mut self, right: Right) {
        self.0 |= right.bit();
    }

    pub fn contains(&self, right: Right) -> bool {
        self.0 & right.bit() != 0
    }

    pub fn union(&self, other: &RightSet) -> RightSet {
        RightSet(self.0 | other.0)
    }

    pub fn union_with(&mut self, other: &RightSet) {
        self.0 |= other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Right> + '_ {
        Right::ALL.iter().copied().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<Right> for RightSet {
    fn from_iter<T: IntoIterator<Item = Right>>(iter: T) -> Self {
        RightSet::from_rights(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_commutative_and_idempotent() {
        let a = RightSet::from_rights([Right::ArtifactRead, Right::BenchmarkRead]);
        let b = RightSet::from_rights([Right::BenchmarkRead, Right::EpisodeRead]);
        let ab = a.union(&b);
        let ba = b.union(&a);
        assert_eq!(ab, ba);
        assert!(ab.contains(Right::ArtifactRead));
        assert!(ab.contains(Right::EpisodeRead));
        assert_eq!(ab.union(&ab), ab);
    }

    #[test]
    fn empty_set_contains_nothing() {
        let empty = RightSet::EMPTY;
        assert!(!empty.contains(Right::ArtifactRead));
        assert!(empty.is_empty());
    }

    #[test]
    fn all_covers_every_right() {
        let all = RightSet::all();
        for r in Right::ALL {
            assert!(all.contains(*r));
        }
    }
}
