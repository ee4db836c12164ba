//! TrajectoryId - Cheap-to-clone moving object identifier
//!
//! Every sample carries one, and the engine clones it into per-trajectory
//! state, the eviction arena and the output map, so cloning must be O(1).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Trajectory identifier (vessel MMSI, animal tag, vehicle id...).
///
/// Internally uses `Arc<str>`; numeric ids are stored as their decimal text.
///
/// # Examples
/// ```
/// use contracts::TrajectoryId;
///
/// let id: TrajectoryId = "219000123".into();
/// let id2 = id.clone();
/// assert_eq!(id, id2);
/// assert_eq!(TrajectoryId::from(219000123u64), id);
/// ```
#[derive(Clone, Default)]
pub struct TrajectoryId(Arc<str>);

impl TrajectoryId {
    /// Create a new id from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for TrajectoryId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for TrajectoryId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TrajectoryId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrajectoryId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for TrajectoryId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<u64> for TrajectoryId {
    fn from(id: u64) -> Self {
        Self::from(id.to_string())
    }
}

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrajectoryId({:?})", self.0)
    }
}

impl PartialEq for TrajectoryId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for TrajectoryId {}

impl PartialEq<str> for TrajectoryId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for TrajectoryId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Ordered so that finalized output can live in a BTreeMap with reproducible
// iteration order.
impl PartialOrd for TrajectoryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrajectoryId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

// Same as str hash so lookups by &str work in HashMaps.
impl Hash for TrajectoryId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for TrajectoryId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Accepts both JSON strings and unsigned integers (AIS feeds use numeric MMSIs).
impl<'de> Deserialize<'de> for TrajectoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self::from(s),
            Raw::Number(n) => Self::from(n),
        })
    }
}
