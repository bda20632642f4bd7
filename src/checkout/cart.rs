use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Largest quantity the cart endpoints accept for a single product.
pub const MAX_LINE_QUANTITY: i32 = 9_999;

/// One product in a buyer's cart. `unit_price` is in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub title: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub image_ref: Option<String>,
}

impl CartLine {
    /// Saturates at `i64::MAX` instead of overflowing.
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}

/// Total quantity across lines, saturating at `i32::MAX`.
pub fn count_items(lines: &[CartLine]) -> i32 {
    lines
        .iter()
        .fold(0i32, |acc, line| acc.saturating_add(line.quantity.max(0)))
}

/// Insertion-ordered cart, at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn first_line(&self) -> Option<&CartLine> {
        self.lines.first()
    }

    /// Seller of the first line. Voucher scoping keys off this value even for
    /// carts that mix sellers.
    pub fn seller_id(&self) -> Option<Uuid> {
        self.first_line().and_then(|line| line.seller_id)
    }

    pub fn item_count(&self) -> i32 {
        count_items(&self.lines)
    }

    /// Adds a line, merging into an existing line for the same product.
    /// The merged line keeps its position and takes the newest snapshot fields.
    pub fn add(&mut self, line: CartLine) {
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                let quantity = existing.quantity.saturating_add(line.quantity);
                *existing = CartLine { quantity, ..line };
            }
            None => self.lines.push(line),
        }
        self.prune();
    }

    /// Sets the quantity of a line; zero or below removes it.
    /// Returns false when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) -> bool {
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return false;
        };
        line.quantity = quantity;
        self.prune();
        true
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        before != self.lines.len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn prune(&mut self) {
        self.lines.retain(|line| line.quantity > 0);
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut cart = Cart::new();
        for line in iter {
            cart.add(line);
        }
        cart
    }
}

/// Per-buyer cart persistence. Each buyer session owns exactly one cart.
pub trait CartStore: Send + Sync {
    fn load(&self, buyer_id: Uuid) -> Cart;
    fn save(&self, buyer_id: Uuid, cart: Cart);
    fn clear(&self, buyer_id: Uuid);
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<Uuid, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn load(&self, buyer_id: Uuid) -> Cart {
        let carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        carts.get(&buyer_id).cloned().unwrap_or_default()
    }

    fn save(&self, buyer_id: Uuid, cart: Cart) {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        if cart.is_empty() {
            carts.remove(&buyer_id);
        } else {
            carts.insert(buyer_id, cart);
        }
    }

    fn clear(&self, buyer_id: Uuid) {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        carts.remove(&buyer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32) -> CartLine {
        CartLine {
            product_id,
            seller_id: None,
            title: "Oak chair".into(),
            unit_price: 1000,
            quantity,
            image_ref: None,
        }
    }

    #[test]
    fn add_merges_by_product_and_keeps_order() {
        let chair = Uuid::new_v4();
        let table = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(chair, 1));
        cart.add(line(table, 1));
        cart.add(line(chair, 2));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].product_id, chair);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn quantity_at_or_below_zero_removes_line() {
        let chair = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(chair, 2));
        assert!(cart.set_quantity(chair, 0));
        assert!(cart.is_empty());

        cart.add(line(chair, 2));
        cart.add(line(chair, -5));
        assert!(cart.is_empty());
    }

    #[test]
    fn item_count_saturates_instead_of_overflowing() {
        let mut cart = Cart::new();
        cart.add(line(Uuid::new_v4(), i32::MAX));
        cart.add(line(Uuid::new_v4(), 1));

        assert_eq!(cart.item_count(), i32::MAX);
        assert_eq!(count_items(cart.lines()), cart.item_count());
    }

    #[test]
    fn line_total_saturates_instead_of_overflowing() {
        let huge = CartLine {
            unit_price: 10_000_000_000,
            quantity: 1_000_000_000,
            ..line(Uuid::new_v4(), 1)
        };
        assert_eq!(huge.line_total(), i64::MAX);
        assert_eq!(line(Uuid::new_v4(), 3).line_total(), 3000);
    }

    #[test]
    fn store_is_scoped_per_buyer() {
        let store = InMemoryCartStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.save(alice, [line(Uuid::new_v4(), 1)].into_iter().collect());

        assert_eq!(store.load(alice).lines().len(), 1);
        assert!(store.load(bob).is_empty());

        store.clear(alice);
        assert!(store.load(alice).is_empty());
    }
}
