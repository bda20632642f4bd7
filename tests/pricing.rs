use chrono::Utc;
use furniture_checkout_api::checkout::{
    CartLine, DiscountType, Voucher,
    pricing::{price, vat},
    vouchers::eligible_vouchers,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn cart() -> Vec<CartLine> {
    vec![CartLine {
        product_id: Uuid::new_v4(),
        seller_id: Some(Uuid::new_v4()),
        title: "Narra Dining Table".into(),
        unit_price: 1000,
        quantity: 2,
        image_ref: None,
    }]
}

fn voucher(discount_type: DiscountType, value: i64) -> Voucher {
    Voucher {
        id: Uuid::new_v4(),
        owner_seller_id: None,
        name: "Promo".into(),
        code: "PROMO".into(),
        discount_type,
        discount_value: Decimal::from(value),
        min_purchase: Some(Decimal::from(1_000_000)),
        max_discount: Some(Decimal::from(1)),
        status: "active".into(),
        start_date: None,
        end_date: None,
    }
}

#[test]
fn no_voucher() {
    let result = price(&cart(), None);
    assert_eq!(result.subtotal, 2000);
    assert_eq!(result.vat, 240);
    assert_eq!(result.discount, 0);
    assert_eq!(result.total, 2240);
}

#[test]
fn ten_percent_voucher() {
    let result = price(&cart(), Some(&voucher(DiscountType::Percentage, 10)));
    assert_eq!(result.discount, 200);
    assert_eq!(result.total, 2040);
}

#[test]
fn fixed_voucher() {
    let result = price(&cart(), Some(&voucher(DiscountType::Fixed, 500)));
    assert_eq!(result.discount, 500);
    assert_eq!(result.total, 1740);
}

#[test]
fn min_purchase_and_max_discount_are_not_applied() {
    // Both limits would change the result if they were enforced.
    let result = price(&cart(), Some(&voucher(DiscountType::Percentage, 50)));
    assert_eq!(result.discount, 1000);
    assert_eq!(result.total, 1240);
}

#[test]
fn total_matches_formula_for_many_subtotals() {
    let fixed = voucher(DiscountType::Fixed, 300);
    for subtotal in (0..5_000).chain([99_999, 100_000, 1_234_567]) {
        let lines = vec![CartLine {
            product_id: Uuid::new_v4(),
            seller_id: None,
            title: "Stool".into(),
            unit_price: subtotal,
            quantity: 1,
            image_ref: None,
        }];
        let result = price(&lines, Some(&fixed));
        let expected_discount = if subtotal > 0 { 300 } else { 0 };
        assert_eq!(result.subtotal, subtotal);
        assert_eq!(result.vat, vat(subtotal));
        assert_eq!(result.discount, expected_discount);
        assert_eq!(result.total, (subtotal + vat(subtotal) - expected_discount).max(0));
        assert!(result.total >= 0);
    }
    assert_eq!(vat(100_000), 12_000);
}

#[test]
fn seller_scoped_voucher_follows_first_line() {
    let seller_x = Uuid::new_v4();
    let mut scoped = voucher(DiscountType::Fixed, 100);
    scoped.owner_seller_id = Some(seller_x);
    let platform = voucher(DiscountType::Fixed, 50);

    let eligible = eligible_vouchers(
        [scoped.clone(), platform.clone()],
        Utc::now(),
        Some(Uuid::new_v4()),
    );
    assert_eq!(eligible, vec![platform.clone()]);

    let eligible = eligible_vouchers([scoped.clone(), platform.clone()], Utc::now(), Some(seller_x));
    assert_eq!(eligible, vec![scoped, platform]);
}
