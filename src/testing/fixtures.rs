//! Canned datasets.

use super::MemorySource;
use rust_decimal::Decimal;
use sync_core::SourceValue;

/// `orders` listed before `customers`, so every order references a customer
/// that has not been loaded yet.
///
/// - orders(id, customer_id → customers.id, total)
///   - 1 → customer 7
///   - 2 → no customer (NULL)
///   - 3 → customer 8
/// - customers(id, name): 7 Alice, 8 Bob
pub fn customers_orders() -> MemorySource {
    MemorySource::new()
        .with_table(
            "orders",
            &["id", "customer_id", "total"],
            vec![
                vec![
                    SourceValue::Int(1),
                    SourceValue::Int(7),
                    SourceValue::Decimal(Decimal::new(1999, 2)),
                ],
                vec![
                    SourceValue::Int(2),
                    SourceValue::Null,
                    SourceValue::Decimal(Decimal::new(500, 2)),
                ],
                vec![
                    SourceValue::Int(3),
                    SourceValue::Int(8),
                    SourceValue::Decimal(Decimal::new(4250, 2)),
                ],
            ],
        )
        .with_table(
            "customers",
            &["id", "name"],
            vec![
                vec![SourceValue::Int(7), SourceValue::from("Alice")],
                vec![SourceValue::Int(8), SourceValue::from("Bob")],
            ],
        )
        .with_reference("orders_customer_fk", ("orders", "customer_id"), ("customers", "id"))
}
