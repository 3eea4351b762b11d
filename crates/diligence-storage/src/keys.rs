//! Shared key generation for storage backends.
//!
//! Key format: `{owner_id}/{subcategory}/{millis}-{filename}`. The
//! timestamp prefix keeps repeated uploads of the same filename distinct.

use chrono::Utc;
use diligence_core::models::Subcategory;
use uuid::Uuid;

/// Generate a storage key for an owner's upload.
///
/// All backends must use this format for consistency.
pub fn object_key(owner_id: Uuid, subcategory: Subcategory, filename: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        owner_id,
        subcategory,
        Utc::now().timestamp_millis(),
        filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let owner = Uuid::new_v4();
        let key = object_key(owner, Subcategory::Invoice, "march.pdf");

        let mut parts = key.splitn(3, '/');
        assert_eq!(parts.next().unwrap(), owner.to_string());
        assert_eq!(parts.next().unwrap(), "invoice");
        assert!(parts.next().unwrap().ends_with("-march.pdf"));
    }
}
