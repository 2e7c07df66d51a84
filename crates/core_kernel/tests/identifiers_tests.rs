//! Unit tests for the Identifiers module
//!
//! Tests cover creation, parsing, conversion and display of the ledger and
//! legacy record identifiers.

use core_kernel::{AccountId, BatchId, EntryId, OrderId, PartyId, PaymentId, PurchaseBillId};
use std::collections::HashSet;
use uuid::Uuid;

mod batch_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let ids: HashSet<BatchId> = (0..100).map(|_| BatchId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = BatchId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = BatchId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_display_format() {
        let uuid = Uuid::new_v4();
        let id = BatchId::from_uuid(uuid);
        assert_eq!(id.to_string(), format!("JVB-{}", uuid));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("JVB-not-a-uuid".parse::<BatchId>().is_err());
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(AccountId::prefix(), "ACC");
        assert_eq!(BatchId::prefix(), "JVB");
        assert_eq!(EntryId::prefix(), "LE");
        assert_eq!(PartyId::prefix(), "PTY");
        assert_eq!(OrderId::prefix(), "ORD");
        assert_eq!(PaymentId::prefix(), "PAY");
        assert_eq!(PurchaseBillId::prefix(), "PB");
    }

    #[test]
    fn test_other_prefix_is_not_stripped() {
        let id = AccountId::new();
        let foreign = format!("PTY-{}", id.as_uuid());
        assert!(foreign.parse::<AccountId>().is_err());
    }
}

mod serde_tests {
    use super::*;

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = PartyId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: PartyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
