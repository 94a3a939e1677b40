//! Contract-violation checks.
//!
//! A failed check is a caller bug; it aborts immediately and is never
//! surfaced as a recoverable error. `disable-tag-checks` compiles the tag
//! validation out entirely.

macro_rules! check_tag {
    ($tag:expr) => {{
        #[cfg(not(feature = "disable-tag-checks"))]
        assert!($tag <= $crate::granule::MAX_TAG, "tag value out of range");
        #[cfg(feature = "disable-tag-checks")]
        let _ = $tag;
    }};
}

pub(crate) use check_tag;
