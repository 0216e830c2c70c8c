//! `PostgreSQL` order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use fruit_store_core::{ContactNumber, OrderId, OrderStatus, Pincode, UserId, Username};

use super::{OrderRepository, PgStore, RepositoryError};
use crate::models::{DeliveryAddress, DeliveryInfo, NewOrder, Order, OrderItem, PaymentMethod};

const ORDER_COLUMNS: &str = "id, customer_id, customer_name, delivery_name, contact, address, \
                             city, pincode, payment_method, items, total, status, placed_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    customer_name: String,
    delivery_name: String,
    contact: String,
    address: String,
    city: String,
    pincode: String,
    payment_method: String,
    items: Json<Vec<OrderItem>>,
    total: Decimal,
    status: String,
    placed_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} for order {}: {e}", row.id))
        };
        let user_name = Username::parse(&row.customer_name).map_err(|e| corrupt("customer", &e))?;
        let contact = ContactNumber::parse(&row.contact).map_err(|e| corrupt("contact", &e))?;
        let pincode = Pincode::parse(&row.pincode).map_err(|e| corrupt("pincode", &e))?;
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|e: String| corrupt("payment method", &e))?;
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| corrupt("status", &e))?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.customer_id),
            user_name,
            delivery: DeliveryInfo {
                name: row.delivery_name,
                contact,
                address: DeliveryAddress {
                    address: row.address,
                    city: row.city,
                    pincode,
                },
                payment_method,
            },
            items: row.items.0,
            total: row.total,
            status,
            placed_at: row.placed_at,
        })
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.customer_order
                (customer_id, customer_name, delivery_name, contact, address, city, pincode,
                 payment_method, items, total, status, placed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(&order.user_name)
        .bind(&order.delivery.name)
        .bind(order.delivery.contact.as_str())
        .bind(&order.delivery.address.address)
        .bind(&order.delivery.address.city)
        .bind(order.delivery.address.pincode.as_str())
        .bind(order.delivery.payment_method.as_str())
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.placed_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order ORDER BY placed_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM storefront.customer_order
            WHERE customer_id = $1
            ORDER BY placed_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.customer_order
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => match OrderRepository::get(self, id).await? {
                Some(current) => Err(RepositoryError::Conflict(format!(
                    "order {id} is {} now, not {expected}",
                    current.status
                ))),
                None => Err(RepositoryError::NotFound),
            },
        }
    }
}
