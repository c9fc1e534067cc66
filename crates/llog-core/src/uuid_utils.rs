//! Time-ordered identifiers.
//!
//! Jobs and request ids use UUIDv7: the leading 48 bits are a
//! millisecond timestamp, so ids sort in creation order and the
//! `(created_at, id)` index stays append-friendly.

use uuid::Uuid;

/// A fresh UUIDv7.
///
/// # Example
///
/// ```
/// use llog_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// // ids minted later compare greater
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Whether `uuid` carries version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_ids_are_version_7() {
        assert!(is_v7(&new_v7()));
    }

    #[test]
    fn test_ids_sort_by_mint_time() {
        let earlier = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = new_v7();

        assert!(later > earlier);
    }

    #[test]
    fn test_random_uuids_are_not_v7() {
        assert!(!is_v7(&Uuid::new_v4()));
    }
}
