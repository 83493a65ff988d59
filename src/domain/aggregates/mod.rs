//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod promo;
pub mod ticket;
pub mod user;
pub mod review;

pub use product::{Category, Product, ProductDraft, ProductError, Specification};
pub use order::{Customer, LineItem, Order, OrderError, OrderStatus, OrderTotals, PaymentStatus, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
pub use promo::{PromoCode, PromoDiscount, PromoDraft, PromoError, PromoKind, PromoRedemption};
pub use ticket::{Message, Sender, SupportTicket, TicketError, TicketStatus};
pub use user::{AccountError, Address, AddressForm, Gender, PaymentMethod, PaymentMethodForm, Profile, User, WishlistItem};
pub use review::{average_rating, CommentForm, ProductComment};
