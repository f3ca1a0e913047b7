//! Leaf cache lifetime policy.

use std::time::Duration;

/// How long a fetched parameter value stays cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheTtl {
    /// Always refetch from the backend
    Disabled,
    /// Cache until the next refresh
    #[default]
    Forever,
    /// Cache for the given duration
    Expires(Duration),
}

impl CacheTtl {
    /// Cache for `secs` seconds; zero means forever
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::from(Duration::from_secs(secs))
    }

    /// Lifetime to stamp on a freshly fetched value, if any
    #[must_use]
    pub fn lifetime(self) -> Option<Duration> {
        match self {
            CacheTtl::Expires(duration) => Some(duration),
            CacheTtl::Disabled | CacheTtl::Forever => None,
        }
    }
}

impl From<Duration> for CacheTtl {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            CacheTtl::Forever
        } else {
            CacheTtl::Expires(duration)
        }
    }
}

impl From<Option<Duration>> for CacheTtl {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(CacheTtl::Forever, CacheTtl::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_caches_forever() {
        assert_eq!(CacheTtl::from_secs(0), CacheTtl::Forever);
        assert_eq!(CacheTtl::from(None), CacheTtl::Forever);
    }

    #[test]
    fn test_lifetime_only_for_expiring_policy() {
        assert_eq!(
            CacheTtl::from_secs(5).lifetime(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(CacheTtl::Forever.lifetime(), None);
        assert_eq!(CacheTtl::Disabled.lifetime(), None);
    }
}
