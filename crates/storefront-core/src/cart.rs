//! ============================================================================
//! Cart Store - Line items, stock limits and running total
//! ============================================================================
//! Lines carry a copy of the catalog item taken when it entered the cart.
//! Stock checks use that copy (or the snapshot passed to `add_item`), never
//! the live catalog, so a line can go stale if the catalog's stock changes
//! afterwards.
//!
//! Rejected mutations leave the cart untouched and publish one message on
//! the error channel; nothing is returned to the caller.
//! ============================================================================

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ErrorChannel;
use crate::observable::{Publication, Subscription};
use crate::types::{round_cents, CartLine, CatalogItem, StoreError};

struct CartState {
    lines: Vec<CartLine>,
    revision: u64,
}

/// Sum of price x quantity over all lines, rounded to cents
pub fn cart_total(lines: &[CartLine]) -> f64 {
    round_cents(lines.iter().map(CartLine::subtotal).sum())
}

/// Shared cart state; construct once and hand out through `Arc`
pub struct CartStore {
    errors: Arc<ErrorChannel>,
    state: Mutex<CartState>,
    lines: Publication<Vec<CartLine>>,
    total: Publication<f64>,
}

impl CartStore {
    pub fn new(errors: Arc<ErrorChannel>) -> Self {
        Self {
            errors,
            state: Mutex::new(CartState {
                lines: Vec::new(),
                revision: 0,
            }),
            lines: Publication::new(Vec::new()),
            total: Publication::new(0.0),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add `quantity` units of `item`, merging with an existing line
    pub fn add_item(&self, item: CatalogItem, quantity: u32) {
        let result = self.mutate(|lines| {
            if quantity == 0 {
                return Err(StoreError::InvalidQuantity);
            }

            match lines.iter_mut().find(|line| line.item.id == item.id) {
                Some(line) => {
                    let requested = line.quantity.saturating_add(quantity);
                    if requested > item.stock {
                        return Err(StoreError::InsufficientStock {
                            requested,
                            available: item.stock,
                        });
                    }
                    line.quantity = requested;
                }
                None => {
                    if quantity > item.stock {
                        return Err(StoreError::InsufficientStock {
                            requested: quantity,
                            available: item.stock,
                        });
                    }
                    lines.push(CartLine { item, quantity });
                }
            }
            Ok(true)
        });
        self.report(result);
    }

    /// Drop the line for `id`; absent lines are ignored
    pub fn remove_item(&self, id: &str) {
        let result = self.mutate(|lines| {
            let before = lines.len();
            lines.retain(|line| line.item.id != id);
            Ok(lines.len() != before)
        });
        self.report(result);
    }

    /// Overwrite a line's quantity in place
    pub fn set_quantity(&self, id: &str, quantity: u32) {
        let result = self.mutate(|lines| {
            if quantity == 0 {
                return Err(StoreError::InvalidQuantity);
            }

            let line = lines
                .iter_mut()
                .find(|line| line.item.id == id)
                .ok_or_else(|| StoreError::LineNotFound(id.to_string()))?;

            if quantity > line.item.stock {
                return Err(StoreError::InsufficientStock {
                    requested: quantity,
                    available: line.item.stock,
                });
            }

            line.quantity = quantity;
            Ok(true)
        });
        self.report(result);
    }

    pub fn clear(&self) {
        let result = self.mutate(|lines| {
            lines.clear();
            Ok(true)
        });
        self.report(result);
    }

    // ========================================================================
    // Snapshots and publications
    // ========================================================================

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.get()
    }

    pub fn total(&self) -> f64 {
        self.total.get()
    }

    /// Quantity currently in the cart for `id` (0 when absent)
    pub fn quantity_of(&self, id: &str) -> u32 {
        self.state
            .lock()
            .lines
            .iter()
            .find(|line| line.item.id == id)
            .map_or(0, |line| line.quantity)
    }

    pub fn subscribe_lines(
        &self,
        handler: impl Fn(&Vec<CartLine>) + Send + Sync + 'static,
    ) -> Subscription {
        self.lines.subscribe(handler)
    }

    pub fn subscribe_total(&self, handler: impl Fn(&f64) + Send + Sync + 'static) -> Subscription {
        self.total.subscribe(handler)
    }

    /// Run `change` on a working copy; commit and publish only when it
    /// succeeds and reports a modification.
    ///
    /// The total is derived from the committed lines and published under
    /// the same revision, before the lines, so a lines subscriber reading
    /// `total()` already sees the matching amount.
    fn mutate(
        &self,
        change: impl FnOnce(&mut Vec<CartLine>) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        let published = {
            let mut state = self.state.lock();
            let mut working = state.lines.clone();
            if !change(&mut working)? {
                return Ok(());
            }
            state.lines = working;
            state.revision += 1;
            (state.revision, state.lines.clone())
        };

        let (revision, lines) = published;
        debug!("Cart revision {}: {} lines", revision, lines.len());
        self.total.publish_revision(revision, cart_total(&lines));
        self.lines.publish_revision(revision, lines);
        Ok(())
    }

    fn report(&self, result: Result<(), StoreError>) {
        if let Err(e) = result {
            self.errors.report(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: f64, stock: u32) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: format!("item {}", id),
            brand: "Acme".to_string(),
            price,
            category: "Misc".to_string(),
            description: String::new(),
            stock,
            image: String::new(),
        }
    }

    fn cart() -> (CartStore, Arc<Mutex<Vec<String>>>) {
        let errors = Arc::new(ErrorChannel::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = errors.subscribe(move |m| sink.lock().push(m.clone()));
        (CartStore::new(errors), seen)
    }

    fn quantities(cart: &CartStore) -> Vec<(String, u32)> {
        cart.lines()
            .into_iter()
            .map(|line| (line.item.id, line.quantity))
            .collect()
    }

    #[test]
    fn test_stock_scenario() {
        let (cart, errors) = cart();
        let a = item("1", 12.5, 2);
        let b = item("2", 30.0, 0);

        cart.add_item(a.clone(), 1);
        cart.add_item(a.clone(), 1);
        assert_eq!(quantities(&cart), vec![("1".to_string(), 2)]);
        assert_eq!(cart.total(), 25.0);
        assert!(errors.lock().is_empty());

        cart.add_item(a.clone(), 1);
        assert_eq!(quantities(&cart), vec![("1".to_string(), 2)]);
        assert_eq!(cart.total(), 25.0);
        assert_eq!(
            *errors.lock(),
            vec!["Insufficient stock: requested 3, available 2".to_string()]
        );

        cart.add_item(b, 1);
        assert_eq!(quantities(&cart), vec![("1".to_string(), 2)]);
        assert_eq!(errors.lock().len(), 2);
    }

    #[test]
    fn test_new_lines_keep_insertion_order() {
        let (cart, _) = cart();
        cart.add_item(item("b", 1.0, 5), 1);
        cart.add_item(item("a", 1.0, 5), 1);
        cart.add_item(item("b", 1.0, 5), 2);

        assert_eq!(
            quantities(&cart),
            vec![("b".to_string(), 3), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn test_total_is_rounded_and_tracks_mutations() {
        let (cart, _) = cart();
        let totals = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&totals);
        let sub = cart.subscribe_total(move |t| sink.lock().push(*t));

        cart.add_item(item("1", 19.99, 10), 3);
        cart.add_item(item("2", 0.1, 10), 2);
        assert_eq!(cart.total(), 60.17);

        cart.set_quantity("1", 1);
        assert_eq!(cart.total(), 20.19);

        cart.remove_item("2");
        assert_eq!(cart.total(), 19.99);

        cart.clear();
        assert_eq!(cart.total(), 0.0);

        assert_eq!(*totals.lock(), vec![0.0, 59.97, 60.17, 20.19, 19.99, 0.0]);
        sub.release();
    }

    #[test]
    fn test_failed_mutation_does_not_republish() {
        let (cart, errors) = cart();
        cart.add_item(item("1", 5.0, 1), 1);

        let published = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&published);
        let _sub = cart.subscribe_lines(move |_| *sink.lock() += 1);
        assert_eq!(*published.lock(), 1);

        cart.add_item(item("1", 5.0, 1), 1);
        cart.set_quantity("1", 4);
        cart.set_quantity("missing", 1);

        assert_eq!(*published.lock(), 1);
        assert_eq!(cart.total(), 5.0);
        assert_eq!(errors.lock().len(), 3);
        assert_eq!(errors.lock()[2], "Item not found in cart: missing");
    }

    #[test]
    fn test_reentrant_subscriber_sees_latest_lines() {
        let (cart, errors) = cart();
        let cart = Arc::new(cart);

        // One view bumps the quantity as soon as the line appears
        let writer = Arc::clone(&cart);
        let _bump = cart.subscribe_lines(move |lines| {
            if lines.iter().any(|l| l.item.id == "x" && l.quantity == 1) {
                writer.set_quantity("x", 2);
            }
        });

        // Another view remembers what it saw last
        let last = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&last);
        let _view = cart.subscribe_lines(move |lines| {
            *sink.lock() = lines.iter().map(|l| l.quantity).collect::<Vec<_>>();
        });
        let last_total = Arc::new(Mutex::new(0.0));
        let sink = Arc::clone(&last_total);
        let _total_view = cart.subscribe_total(move |t| *sink.lock() = *t);

        cart.add_item(item("x", 3.0, 5), 1);

        assert_eq!(cart.quantity_of("x"), 2);
        assert_eq!(*last.lock(), vec![2]);
        assert_eq!(cart.total(), 6.0);
        assert_eq!(*last_total.lock(), 6.0);
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_lines_subscriber_reads_matching_total() {
        let (cart, _) = cart();
        let cart = Arc::new(cart);

        let reader = Arc::clone(&cart);
        let pairs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pairs);
        let _sub = cart.subscribe_lines(move |lines| {
            sink.lock().push((cart_total(lines), reader.total()));
        });

        cart.add_item(item("1", 2.5, 9), 2);
        cart.add_item(item("2", 1.1, 9), 3);
        cart.clear();

        for (from_lines, published) in pairs.lock().iter() {
            assert_eq!(from_lines, published);
        }
        assert_eq!(pairs.lock().len(), 4);
    }

    #[test]
    fn test_concurrent_writers_settle_consistently() {
        let (cart, errors) = cart();
        let catalog: Vec<CatalogItem> = (0..4).map(|i| item(&i.to_string(), 1.5, 1000)).collect();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let cart = &cart;
                let catalog = &catalog;
                scope.spawn(move || {
                    for step in 0..50 {
                        let target = &catalog[(worker + step) % catalog.len()];
                        cart.add_item(target.clone(), 1);
                        if step % 7 == 0 {
                            cart.remove_item(&target.id);
                        }
                    }
                });
            }
        });

        assert_eq!(cart.total(), cart_total(&cart.lines()));
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (cart, errors) = cart();
        cart.add_item(item("1", 5.0, 3), 1);
        cart.add_item(item("2", 7.0, 3), 2);

        cart.remove_item("1");
        let once = cart.lines();
        cart.remove_item("1");

        assert_eq!(cart.lines(), once);
        assert_eq!(cart.total(), 14.0);
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_set_quantity_preserves_position() {
        let (cart, _) = cart();
        cart.add_item(item("1", 1.0, 9), 1);
        cart.add_item(item("2", 1.0, 9), 1);
        cart.add_item(item("3", 1.0, 9), 1);

        cart.set_quantity("2", 9);

        assert_eq!(
            quantities(&cart),
            vec![
                ("1".to_string(), 1),
                ("2".to_string(), 9),
                ("3".to_string(), 1)
            ]
        );
        assert_eq!(cart.quantity_of("2"), 9);
        assert_eq!(cart.quantity_of("nope"), 0);
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let (cart, errors) = cart();
        cart.add_item(item("1", 1.0, 9), 0);
        assert!(cart.lines().is_empty());

        cart.add_item(item("1", 1.0, 9), 2);
        cart.set_quantity("1", 0);
        assert_eq!(cart.quantity_of("1"), 2);

        assert_eq!(
            *errors.lock(),
            vec![
                "Quantity must be at least 1".to_string(),
                "Quantity must be at least 1".to_string()
            ]
        );
    }

    #[test]
    fn test_stale_snapshot_stock() {
        // Lines keep the stock they were added with; a later catalog change
        // is only seen through the snapshot passed to add_item
        let (cart, errors) = cart();
        cart.add_item(item("1", 4.0, 5), 4);

        // Catalog stock drops to 2: the existing line is not re-validated
        assert_eq!(cart.quantity_of("1"), 4);
        cart.set_quantity("1", 5);
        assert_eq!(cart.quantity_of("1"), 5);

        // A fresh snapshot is checked against its own stock
        cart.add_item(item("1", 4.0, 2), 1);
        assert_eq!(cart.quantity_of("1"), 5);
        assert_eq!(errors.lock().len(), 1);
    }

    #[test]
    fn test_lines_never_exceed_stock_on_insert() {
        let (cart, errors) = cart();
        let catalog = [item("a", 2.5, 3), item("b", 1.25, 1), item("c", 9.0, 0)];
        let mut rejected = 0;

        for step in 0..40u32 {
            let candidate = catalog[(step % 3) as usize].clone();
            let quantity = step % 4 + 1;
            let before = cart.lines();
            let already = cart.quantity_of(&candidate.id);

            cart.add_item(candidate.clone(), quantity);

            if already + quantity > candidate.stock {
                rejected += 1;
                assert_eq!(cart.lines(), before);
            }
            for line in cart.lines() {
                assert!(line.quantity <= line.item.stock);
            }
            assert_eq!(cart.total(), cart_total(&cart.lines()));
        }

        assert_eq!(errors.lock().len(), rejected);
    }
}
