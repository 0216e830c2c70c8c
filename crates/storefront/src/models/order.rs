//! Orders: frozen cart snapshots plus delivery details.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fruit_store_core::{ContactNumber, OrderId, OrderStatus, Pincode, Price, ProductId, UserId, Username};

use super::validation::FieldErrors;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Upi,
    Card,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Upi => "upi",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cod" => Ok(Self::Cod),
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            _ => Err("Payment method must be one of cod, upi, card".to_owned()),
        }
    }
}

/// Where one item ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: String,
    pub pincode: Pincode,
}

impl DeliveryAddress {
    fn validate(address: &str, city: &str, pincode: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let address = errors.min_chars("address", "Address", address, 10);
        let city = errors.required("city", "City", city);
        let pincode = errors.check("pincode", Pincode::parse(pincode));
        match (address, city, pincode) {
            (Some(address), Some(city), Some(pincode)) => Ok(Self {
                address,
                city,
                pincode,
            }),
            _ => Err(errors),
        }
    }
}

/// Order-level delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub name: String,
    pub contact: ContactNumber,
    #[serde(flatten)]
    pub address: DeliveryAddress,
    pub payment_method: PaymentMethod,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub delivery_address: DeliveryAddress,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_name: Username,
    #[serde(flatten)]
    pub delivery: DeliveryInfo,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Case-insensitive substring search over customer name, account name,
    /// contact, address, city and pincode. Matches if any field contains the
    /// query; an empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            self.delivery.name.as_str(),
            self.user_name.as_str(),
            self.delivery.contact.as_str(),
            self.delivery.address.address.as_str(),
            self.delivery.address.city.as_str(),
            self.delivery.address.pincode.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }
}

/// An order as returned over HTTP, with its position on the tracking
/// timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub step: usize,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            step: order.status.step(),
            order,
        }
    }
}

/// An order about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_name: Username,
    pub delivery: DeliveryInfo,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

impl NewOrder {
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id,
            user_name: self.user_name,
            delivery: self.delivery,
            items: self.items,
            total: self.total,
            status: self.status,
            placed_at: self.placed_at,
        }
    }
}

/// A per-item delivery address override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemAddressInput {
    pub product_id: Option<ProductId>,
    pub address: String,
    pub city: String,
    pub pincode: String,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub payment_method: String,
    pub item_addresses: Vec<ItemAddressInput>,
}

/// Checkout fields after validation.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub delivery: DeliveryInfo,
    pub item_addresses: HashMap<ProductId, DeliveryAddress>,
}

impl Checkout {
    /// The address an item ships to: its override, else the order address.
    #[must_use]
    pub fn address_for(&self, product: ProductId) -> DeliveryAddress {
        self.item_addresses
            .get(&product)
            .unwrap_or(&self.delivery.address)
            .clone()
    }
}

impl CheckoutRequest {
    /// # Errors
    ///
    /// Returns every failing field; override fields are reported as
    /// `itemAddresses[i].<field>`.
    pub fn validate(self) -> Result<Checkout, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required("name", "Name", &self.name);
        let contact = errors.check("contact", ContactNumber::parse(&self.contact));
        let payment_method = errors.check("paymentMethod", self.payment_method.parse::<PaymentMethod>());
        let address = match DeliveryAddress::validate(&self.address, &self.city, &self.pincode) {
            Ok(address) => Some(address),
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        let mut item_addresses = HashMap::new();
        for (i, item) in self.item_addresses.into_iter().enumerate() {
            let prefix = format!("itemAddresses[{i}].");
            let Some(product_id) = item.product_id else {
                errors.add(format!("{prefix}productId"), "Product is required");
                continue;
            };
            match DeliveryAddress::validate(&item.address, &item.city, &item.pincode) {
                Ok(address) => {
                    item_addresses.insert(product_id, address);
                }
                Err(e) => errors.extend(e.nested(&prefix)),
            }
        }

        match (name, contact, payment_method, address) {
            (Some(name), Some(contact), Some(payment_method), Some(address)) if errors.is_empty() => {
                Ok(Checkout {
                    delivery: DeliveryInfo {
                        name,
                        contact,
                        address,
                        payment_method,
                    },
                    item_addresses,
                })
            }
            _ => Err(errors),
        }
    }
}

/// The in-progress checkout form kept under `checkoutForm`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub payment_method: String,
}
