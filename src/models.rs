use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Declares a closed set of upper-case text values stored as `TEXT` columns.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

text_enum!(
    /// Order lifecycle. Declaration order is the delivery order.
    OrderStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Completed => "COMPLETED",
    }
);

text_enum!(
    PaymentMethod {
        Balance => "BALANCE",
        Cod => "COD",
    }
);

text_enum!(
    TransactionKind {
        Deposit => "DEPOSIT",
        Withdrawal => "WITHDRAWAL",
        Purchase => "PURCHASE",
        Earning => "EARNING",
        Referral => "REFERRAL",
    }
);

text_enum!(
    TransactionStatus {
        Pending => "PENDING",
        Rejected => "REJECTED",
        Completed => "COMPLETED",
    }
);

text_enum!(
    NotificationKind {
        Info => "INFO",
        Success => "SUCCESS",
        Warning => "WARNING",
        Error => "ERROR",
    }
);

impl OrderStatus {
    pub const STAGES: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
    ];

    /// Position in [`OrderStatus::STAGES`].
    pub fn step_index(self) -> usize {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Completed => 4,
        }
    }

    /// Fraction of the lifecycle reached, `0.0` for pending and `1.0` for completed.
    pub fn progress(self) -> f64 {
        self.step_index() as f64 / (Self::STAGES.len() - 1) as f64
    }

    /// Whether the owner may mark the order as received.
    pub fn can_user_confirm(self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    pub fn is_forward_to(self, next: OrderStatus) -> bool {
        next.step_index() > self.step_index()
    }

    /// Targets the admin console may set.
    pub fn is_admin_target(self) -> bool {
        matches!(
            self,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub balance: i64,
    pub is_admin: bool,
    pub verification_code: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub withdrawal_account: Option<String>,
    pub invited_by: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> &'static str {
        if self.is_admin { "admin" } else { "user" }
    }
}

/// A user row together with its password hash. Never serialized to clients.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart row with its product embedded.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}

/// Most units a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 9_999;
/// Highest accepted unit price.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

impl CartLine {
    /// Display total; saturates instead of overflowing.
    pub fn line_total(&self) -> i64 {
        self.product.price.saturating_mul(i64::from(self.quantity))
    }

    /// Exact sum of `lines`, or `None` if it does not fit in an `i64`.
    pub fn checked_total(lines: &[CartLine]) -> Option<i64> {
        lines.iter().try_fold(0i64, |acc, line| {
            line.product
                .price
                .checked_mul(i64::from(line.quantity))
                .and_then(|total| acc.checked_add(total))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub tracking_number: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_phone: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: i64,
    pub status: TransactionStatus,
    pub reference_id: Option<String>,
    pub method: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Favorite {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
