use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AdminTransactionList, LowStockList, SetBalanceRequest, UserList},
        auth::{
            ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
            UpdateProfileRequest, WithdrawalAccountRequest,
        },
        cart::{AddToCartRequest, CartCount, CartItemDto, CartView},
        notifications::{NotificationList, UnreadCount},
        orders::{
            CheckoutReceipt, CheckoutRequest, ConfirmDeliveryRequest, OrderList, OrderWithItems,
            TrackLookup, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest, UploadedImage},
        wallet::{DepositRequest, TransactionList, WalletReceipt, WalletSummary, WithdrawalRequest},
        wishlist::{ToggleWishlistRequest, WishlistProducts, WishlistToggle},
    },
    models::{
        CartItem, Notification, NotificationKind, Order, OrderItem, OrderStatus, PaymentMethod,
        Product, Transaction, TransactionKind, TransactionStatus, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, notifications, orders, products, wallet, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_profile,
        auth::upload_avatar,
        auth::set_withdrawal_account,
        auth::change_password,
        products::list_products,
        products::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::cart_count,
        cart::remove_from_cart,
        wishlist::list_wishlist,
        wishlist::toggle_wishlist,
        orders::list_orders,
        orders::checkout,
        orders::track_order,
        orders::get_order,
        orders::confirm_delivery,
        wallet::wallet_summary,
        wallet::list_transactions,
        wallet::request_deposit,
        wallet::request_withdrawal,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::stream_notifications,
        admin::list_all_orders,
        admin::update_order_status,
        admin::list_transactions,
        admin::approve_transaction,
        admin::reject_transaction,
        admin::list_users,
        admin::set_balance,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::upload_product_image,
        admin::list_low_stock
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            Transaction,
            Notification,
            OrderStatus,
            PaymentMethod,
            TransactionKind,
            TransactionStatus,
            NotificationKind,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            WithdrawalAccountRequest,
            ChangePasswordRequest,
            AddToCartRequest,
            CartView,
            CartItemDto,
            CartCount,
            ToggleWishlistRequest,
            WishlistToggle,
            WishlistProducts,
            CheckoutRequest,
            CheckoutReceipt,
            ConfirmDeliveryRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            TrackLookup,
            DepositRequest,
            WithdrawalRequest,
            WalletReceipt,
            WalletSummary,
            TransactionList,
            NotificationList,
            UnreadCount,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            UploadedImage,
            SetBalanceRequest,
            UserList,
            AdminTransactionList,
            LowStockList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutReceipt>,
            ApiResponse<WalletReceipt>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Profile", description = "Current user profile"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Orders", description = "Checkout and order tracking"),
        (name = "Wallet", description = "Deposits, withdrawals and ledger"),
        (name = "Notifications", description = "Notification feed"),
        (name = "Admin", description = "Admin console endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
