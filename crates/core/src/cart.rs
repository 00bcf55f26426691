//! Stock-aware cart ledger.
//!
//! The ledger is an ordered list of lines keyed by product id. Quantities are
//! always at least one (a line that would drop to zero is removed) and never
//! exceed the product's tracked stock when the ledger itself makes the change.
//! When a product carries no stock figure, no cap applies.
//!
//! Totals are derived from the lines on every call; nothing is cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Product, ProductId};

/// One product in the cart with its quantity.
///
/// On the wire the product fields are flattened next to `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// `price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// Result of [`CartLedger::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The full requested amount was added; the line now holds `quantity`.
    Added { quantity: u32 },
    /// Only part of the request fit; the line was raised to the stock level.
    Capped { quantity: u32, requested: u32, stock: u32 },
    /// The line already holds every unit in stock. Nothing changed.
    LimitReached { stock: u32 },
    /// Stock is tracked and zero. Nothing changed.
    OutOfStock,
    /// A quantity of zero was requested. Nothing changed.
    ZeroQuantity,
}

impl AddOutcome {
    /// Whether the ledger changed.
    #[must_use]
    pub const fn mutated(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Capped { .. })
    }

    /// Whether every requested unit ended up in the cart.
    #[must_use]
    pub const fn fully_honored(&self) -> bool {
        matches!(self, Self::Added { .. })
    }

    /// Resulting line quantity, if the line exists after the call.
    #[must_use]
    pub const fn quantity(&self) -> Option<u32> {
        match self {
            Self::Added { quantity } | Self::Capped { quantity, .. } => Some(*quantity),
            Self::LimitReached { stock } => Some(*stock),
            Self::OutOfStock | Self::ZeroQuantity => None,
        }
    }
}

/// Result of [`CartLedger::set_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// The requested quantity was applied.
    Set { quantity: u32 },
    /// The request exceeded stock; the stock level was applied instead.
    /// A stock level of zero removes the line.
    Clamped { quantity: u32, requested: u32, stock: u32 },
    /// A quantity of zero or less removed the line (absent lines included).
    Removed,
    /// No line exists for the product. Nothing changed.
    Missing,
}

impl QuantityOutcome {
    /// Whether the exact requested value was honored.
    #[must_use]
    pub const fn honored(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::Removed)
    }
}

/// In-memory list of cart lines for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a ledger from lines, see [`Self::replace`].
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut ledger = Self::new();
        ledger.replace(lines);
        ledger
    }

    /// Replace every line wholesale.
    ///
    /// Zero-quantity lines are dropped and repeated product ids are merged
    /// into the first occurrence. Quantities are otherwise taken as given.
    pub fn replace(&mut self, lines: impl IntoIterator<Item = CartLine>) {
        self.lines.clear();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match self.position(&line.product.id) {
                Some(index) => {
                    if let Some(existing) = self.lines.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => self.lines.push(line),
            }
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product.id == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` units of `product`.
    ///
    /// The stock figure of `product` (the freshest catalog data) is used for
    /// the cap, and it replaces the snapshot stored on an existing line.
    pub fn add(&mut self, product: &Product, quantity: u32) -> AddOutcome {
        if quantity == 0 {
            return AddOutcome::ZeroQuantity;
        }
        if product.is_out_of_stock() {
            return AddOutcome::OutOfStock;
        }

        let current = self.get(&product.id).map_or(0, |line| line.quantity);
        let requested = current.saturating_add(quantity);

        let outcome = match product.stock_quantity {
            Some(stock) if requested > stock => {
                if current >= stock {
                    return AddOutcome::LimitReached { stock };
                }
                AddOutcome::Capped {
                    quantity: stock,
                    requested,
                    stock,
                }
            }
            _ => AddOutcome::Added {
                quantity: requested,
            },
        };

        if let Some(quantity) = outcome.quantity() {
            self.upsert(product, quantity);
        }
        outcome
    }

    /// Delete the line for `product_id`.
    ///
    /// Removing an absent id is a no-op and not an error; the removed line is
    /// returned when there was one.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        self.position(product_id).map(|index| self.lines.remove(index))
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or negative quantities behave like [`Self::remove`]. Requests above
    /// the line's tracked stock are clamped to it.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> QuantityOutcome {
        if quantity <= 0 {
            self.remove(product_id);
            return QuantityOutcome::Removed;
        }
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);

        let Some(index) = self.position(product_id) else {
            return QuantityOutcome::Missing;
        };
        let stock = self
            .lines
            .get(index)
            .and_then(|line| line.product.stock_quantity);

        match stock {
            Some(stock) if requested > stock => {
                if stock == 0 {
                    self.lines.remove(index);
                } else if let Some(line) = self.lines.get_mut(index) {
                    line.quantity = stock;
                }
                QuantityOutcome::Clamped {
                    quantity: stock,
                    requested,
                    stock,
                }
            }
            _ => {
                if let Some(line) = self.lines.get_mut(index) {
                    line.quantity = requested;
                }
                QuantityOutcome::Set {
                    quantity: requested,
                }
            }
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| &line.product.id == product_id)
    }

    fn upsert(&mut self, product: &Product, quantity: u32) {
        match self.position(&product.id) {
            Some(index) => {
                if let Some(line) = self.lines.get_mut(index) {
                    line.product = product.clone();
                    line.quantity = quantity;
                }
            }
            None => self.lines.push(CartLine {
                product: product.clone(),
                quantity,
            }),
        }
    }
}
