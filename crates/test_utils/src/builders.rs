//! Test Data Builders
//!
//! Builders for legacy records and posting events. Tests set only the fields
//! they care about and take defaults for the rest.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{OrderId, PartyId, PaymentId, PurchaseBillId};
use domain_ledger::ports::{LegacyCustomer, LegacyOrder, LegacyPayment, LegacySupplier};
use domain_ledger::posting::{InvoiceEvent, PaymentEvent, PurchaseEvent};
use domain_ledger::PartyType;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::TemporalFixtures;

/// Builder for legacy customers and suppliers
pub struct LegacyPartyBuilder {
    id: PartyId,
    name: String,
    opening_balance: Decimal,
    current_balance: Decimal,
    created_at: DateTime<Utc>,
}

impl LegacyPartyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PartyId::new(),
            name: name.into(),
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            created_at: TemporalFixtures::at(2026, 1, 1),
        }
    }

    pub fn with_id(mut self, id: PartyId) -> Self {
        self.id = id;
        self
    }

    /// Sets the opening balance; the running counter starts from it
    pub fn with_opening_balance(mut self, amount: Decimal) -> Self {
        self.opening_balance = amount;
        self.current_balance = amount;
        self
    }

    pub fn with_current_balance(mut self, amount: Decimal) -> Self {
        self.current_balance = amount;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn customer(self) -> LegacyCustomer {
        LegacyCustomer {
            id: self.id,
            name: self.name,
            opening_balance: self.opening_balance,
            current_balance: self.current_balance,
            created_at: self.created_at,
        }
    }

    pub fn supplier(self) -> LegacySupplier {
        LegacySupplier {
            id: self.id,
            name: self.name,
            opening_balance: self.opening_balance,
            current_balance: self.current_balance,
            created_at: self.created_at,
        }
    }
}

/// Builder for legacy sales invoices
pub struct LegacyOrderBuilder {
    order: LegacyOrder,
}

impl LegacyOrderBuilder {
    /// An unpaid invoice of 100.00 for the given customer
    pub fn new(number: impl Into<String>, customer: &LegacyCustomer) -> Self {
        Self {
            order: LegacyOrder {
                id: OrderId::new(),
                order_number: number.into(),
                customer_id: Some(customer.id),
                customer_name: Some(customer.name.clone()),
                total: dec!(100.00),
                paid_amount: Decimal::ZERO,
                due_amount: dec!(100.00),
                created_at: TemporalFixtures::at(2026, 1, 5),
            },
        }
    }

    /// Sets the total; the invoice stays fully due
    pub fn total(mut self, total: Decimal) -> Self {
        self.order.total = total;
        self.order.due_amount = total - self.order.paid_amount;
        self
    }

    /// Amount collected when the invoice was raised
    pub fn paid(mut self, paid: Decimal) -> Self {
        self.order.paid_amount = paid;
        self.order.due_amount = self.order.total - paid;
        self
    }

    pub fn due(mut self, due: Decimal) -> Self {
        self.order.due_amount = due;
        self
    }

    /// Drops the customer link, leaving only the name
    pub fn name_only(mut self) -> Self {
        self.order.customer_id = None;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.order.created_at = at;
        self
    }

    pub fn build(self) -> LegacyOrder {
        self.order
    }
}

/// Builder for legacy payments
pub struct LegacyPaymentBuilder {
    payment: LegacyPayment,
}

impl LegacyPaymentBuilder {
    pub fn from_customer(number: impl Into<String>, customer: &LegacyCustomer, amount: Decimal) -> Self {
        Self::new(number, PartyType::Customer, customer.id, &customer.name, amount)
    }

    pub fn to_supplier(number: impl Into<String>, supplier: &LegacySupplier, amount: Decimal) -> Self {
        Self::new(number, PartyType::Supplier, supplier.id, &supplier.name, amount)
    }

    fn new(number: impl Into<String>, party_type: PartyType, party_id: PartyId, name: &str, amount: Decimal) -> Self {
        let reference = match party_type {
            PartyType::Customer => domain_ledger::ports::PaymentReference::Order,
            PartyType::Supplier => domain_ledger::ports::PaymentReference::Purchase,
        };
        Self {
            payment: LegacyPayment {
                id: PaymentId::new(),
                payment_number: number.into(),
                party_type,
                party_id,
                party_name: name.to_string(),
                amount,
                reference,
                reference_id: None,
                created_at: TemporalFixtures::at(2026, 1, 8),
            },
        }
    }

    /// Links the payment to the order or bill it settles
    pub fn against(mut self, reference_id: impl Into<uuid::Uuid>) -> Self {
        self.payment.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_id(mut self, id: PaymentId) -> Self {
        self.payment.id = id;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.payment.created_at = at;
        self
    }

    pub fn build(self) -> LegacyPayment {
        self.payment
    }
}

/// Builder for real-time posting events
pub struct EventBuilder;

impl EventBuilder {
    pub fn invoice(number: impl Into<String>, customer_id: PartyId, total: Decimal) -> InvoiceEvent {
        InvoiceEvent {
            order_id: OrderId::new(),
            order_number: number.into(),
            customer_id: Some(customer_id),
            customer_name: None,
            total,
            paid_amount: Decimal::ZERO,
            transaction_date: Some(TemporalFixtures::trading_day()),
        }
    }

    pub fn customer_payment(number: impl Into<String>, customer_id: PartyId, amount: Decimal) -> PaymentEvent {
        PaymentEvent {
            payment_id: PaymentId::new(),
            payment_number: number.into(),
            party_type: PartyType::Customer,
            party_id: Some(customer_id),
            party_name: "Customer".to_string(),
            amount,
            transaction_date: Some(TemporalFixtures::trading_day()),
        }
    }

    pub fn supplier_payment(number: impl Into<String>, supplier_id: PartyId, amount: Decimal) -> PaymentEvent {
        PaymentEvent {
            party_type: PartyType::Supplier,
            party_name: "Supplier".to_string(),
            ..Self::customer_payment(number, supplier_id, amount)
        }
    }

    pub fn purchase(number: impl Into<String>, supplier_id: PartyId, total: Decimal) -> PurchaseEvent {
        PurchaseEvent {
            bill_id: PurchaseBillId::new(),
            bill_number: number.into(),
            supplier_id: Some(supplier_id),
            supplier_name: "Supplier".to_string(),
            total,
            transaction_date: Some(TemporalFixtures::trading_day()),
        }
    }

    /// Moves an event onto another accounting date
    pub fn on(event: InvoiceEvent, date: NaiveDate) -> InvoiceEvent {
        InvoiceEvent { transaction_date: Some(date), ..event }
    }
}
