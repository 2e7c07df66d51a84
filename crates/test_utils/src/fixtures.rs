//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for ledger tests: a handful of fixed dates,
//! deterministic identifiers and a small shop whose legacy books reconcile
//! with the ledger once migrated.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{OrderId, PartyId, PaymentId, PurchaseBillId};
use domain_ledger::memory::InMemoryLegacyBooks;
use domain_ledger::ports::{
    LegacyCustomer, LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacySupplier,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::builders::LegacyPaymentBuilder;

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A shop trading day, 2026-01-05
    pub fn trading_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    /// 06:00 UTC on the given day; the same calendar day in Asia/Kolkata
    pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 6, 0, 0).unwrap()
    }

    /// 20:00 UTC on 2026-01-05, already 2026-01-06 in Asia/Kolkata
    pub fn late_evening_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 20, 0, 0).unwrap()
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn customer_id() -> PartyId {
        PartyId::from_uuid(Uuid::parse_str("7b1e0c62-5d0a-4f1e-9a51-000000000001").unwrap())
    }

    pub fn supplier_id() -> PartyId {
        PartyId::from_uuid(Uuid::parse_str("7b1e0c62-5d0a-4f1e-9a51-000000000002").unwrap())
    }

    pub fn order_id() -> OrderId {
        OrderId::from_uuid(Uuid::parse_str("7b1e0c62-5d0a-4f1e-9a51-000000000003").unwrap())
    }

    pub fn payment_id() -> PaymentId {
        PaymentId::from_uuid(Uuid::parse_str("7b1e0c62-5d0a-4f1e-9a51-000000000004").unwrap())
    }

    pub fn purchase_bill_id() -> PurchaseBillId {
        PurchaseBillId::from_uuid(Uuid::parse_str("7b1e0c62-5d0a-4f1e-9a51-000000000005").unwrap())
    }
}

/// A complete set of legacy records
#[derive(Debug, Clone, Default)]
pub struct LegacyShop {
    pub customers: Vec<LegacyCustomer>,
    pub suppliers: Vec<LegacySupplier>,
    pub orders: Vec<LegacyOrder>,
    pub payments: Vec<LegacyPayment>,
    pub purchase_bills: Vec<LegacyPurchaseBill>,
}

impl LegacyShop {
    /// Loads the records into in-memory legacy books
    pub fn into_memory_books(self) -> InMemoryLegacyBooks {
        let mut books = InMemoryLegacyBooks::new();
        for customer in self.customers {
            books = books.with_customer(customer);
        }
        for supplier in self.suppliers {
            books = books.with_supplier(supplier);
        }
        for order in self.orders {
            books = books.with_order(order);
        }
        for payment in self.payments {
            books = books.with_payment(payment);
        }
        for bill in self.purchase_bills {
            books = books.with_purchase_bill(bill);
        }
        books
    }

    pub fn customer(&self, name: &str) -> Option<&LegacyCustomer> {
        self.customers.iter().find(|c| c.name == name)
    }

    pub fn supplier(&self, name: &str) -> Option<&LegacySupplier> {
        self.suppliers.iter().find(|s| s.name == name)
    }
}

/// The corner shop used across integration tests
///
/// After migration the ledger should show:
///
/// | Party | Ledger balance |
/// |-------|----------------|
/// | Asha  | 400.00 receivable (INV-1 1000, paid 400 at the counter, PAY-1 200) |
/// | Bala  | 300.00 receivable (INV-2, found by name only) |
/// | Metro | 2200.00 payable (opening 1000, PB-1 2000, paid 500, PAY-S1 300) |
pub struct ShopFixtures;

impl ShopFixtures {
    pub fn asha() -> LegacyCustomer {
        LegacyCustomer {
            id: IdFixtures::customer_id(),
            name: "Asha".to_string(),
            opening_balance: Decimal::ZERO,
            current_balance: dec!(400.00),
            created_at: TemporalFixtures::at(2026, 1, 1),
        }
    }

    pub fn bala() -> LegacyCustomer {
        LegacyCustomer {
            id: PartyId::new(),
            name: "Bala".to_string(),
            opening_balance: Decimal::ZERO,
            current_balance: dec!(300.00),
            created_at: TemporalFixtures::at(2026, 1, 1),
        }
    }

    pub fn metro() -> LegacySupplier {
        LegacySupplier {
            id: IdFixtures::supplier_id(),
            name: "Metro Wholesale".to_string(),
            opening_balance: dec!(1000.00),
            current_balance: dec!(2200.00),
            created_at: TemporalFixtures::at(2026, 1, 1),
        }
    }

    pub fn shop() -> LegacyShop {
        let asha = Self::asha();
        let bala = Self::bala();
        let metro = Self::metro();

        let invoice = LegacyOrder {
            id: IdFixtures::order_id(),
            order_number: "INV-1".to_string(),
            customer_id: Some(asha.id),
            customer_name: Some(asha.name.clone()),
            total: dec!(1000.00),
            paid_amount: dec!(400.00),
            due_amount: dec!(400.00),
            created_at: TemporalFixtures::at(2026, 1, 5),
        };
        let walk_in = LegacyOrder {
            id: OrderId::new(),
            order_number: "INV-2".to_string(),
            customer_id: None,
            customer_name: Some(bala.name.clone()),
            total: dec!(300.00),
            paid_amount: Decimal::ZERO,
            due_amount: dec!(300.00),
            created_at: TemporalFixtures::at(2026, 1, 6),
        };
        let customer_payment = LegacyPaymentBuilder::from_customer("PAY-1", &asha, dec!(200.00))
            .with_id(IdFixtures::payment_id())
            .against(invoice.id)
            .build();
        let bill = LegacyPurchaseBill {
            id: IdFixtures::purchase_bill_id(),
            bill_number: "PB-1".to_string(),
            supplier_id: metro.id,
            supplier_name: Some(metro.name.clone()),
            total: dec!(2000.00),
            paid_amount: dec!(500.00),
            due_amount: dec!(1200.00),
            created_at: TemporalFixtures::at(2026, 1, 3),
        };
        let supplier_payment = LegacyPaymentBuilder::to_supplier("PAY-S1", &metro, dec!(300.00))
            .against(bill.id)
            .created_at(TemporalFixtures::at(2026, 1, 9))
            .build();

        LegacyShop {
            customers: vec![asha, bala],
            suppliers: vec![metro],
            orders: vec![invoice, walk_in],
            payments: vec![customer_payment, supplier_payment],
            purchase_bills: vec![bill],
        }
    }
}
