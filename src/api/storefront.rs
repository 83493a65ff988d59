use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppJson, AppPath, AppQuery, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{AddressForm, Cart, Category, CommentForm, Customer, Order, PaymentMethodForm, Product, ProductComment, SupportTicket, User};
use crate::domain::pricing::PriceQuote;
use crate::registration::{RegistrationForm, VerificationChallenge};
use crate::shop::{AccentColor, CheckoutRequest, ProductFilter};

// ----- catalogue -----

pub async fn list_products(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>, AppQuery(f): AppQuery<ProductFilter>) -> Json<PaginatedResponse<Product>> {
    let shop = s.shop.lock().await;
    Json(p.paginate(shop.list_products(&f)))
}

pub async fn featured_products(State(s): State<AppState>) -> Json<Vec<Product>> { Json(s.shop.lock().await.featured_products()) }

pub async fn get_product(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<Product>> {
    Ok(Json(s.shop.lock().await.get_product(&id)?))
}

pub async fn recommended_products(State(s): State<AppState>, AppPath(id): AppPath<String>) -> Json<Vec<Product>> {
    Json(s.shop.lock().await.recommended_products(Some(&id)))
}

pub async fn list_categories(State(s): State<AppState>) -> Json<Vec<Category>> { Json(s.shop.lock().await.categories()) }

pub async fn list_comments(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<Vec<ProductComment>>> {
    Ok(Json(s.shop.lock().await.product_comments(&id)?))
}

pub async fn add_comment(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(form): AppJson<CommentForm>) -> ApiResult<(StatusCode, Json<ProductComment>)> {
    let comment = s.write(move |shop| shop.add_comment(&id, form)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse { pub product_id: String, pub average_rating: Option<Decimal>, pub count: usize }

pub async fn product_rating(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<RatingResponse>> {
    let shop = s.shop.lock().await;
    let count = shop.product_comments(&id)?.len();
    let average_rating = shop.product_rating(&id)?;
    Ok(Json(RatingResponse { product_id: id, average_rating, count }))
}

// ----- cart and checkout -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest { pub product_id: String, #[serde(default = "one")] pub quantity: u32 }

#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub quantity: u32 }

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest { pub promo_code: Option<String>, pub customer_email: Option<String> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody { pub session_id: String, #[serde(flatten)] pub request: CheckoutRequest }

fn one() -> u32 { 1 }

pub async fn get_cart(State(s): State<AppState>, AppPath(session): AppPath<String>) -> Json<Cart> { Json(s.shop.lock().await.cart(&session)) }

pub async fn add_to_cart(State(s): State<AppState>, AppPath(session): AppPath<String>, AppJson(r): AppJson<AddToCartRequest>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.write(move |shop| shop.add_to_cart(&session, &r.product_id, r.quantity)).await?))
}

pub async fn update_cart_item(State(s): State<AppState>, AppPath((session, product_id)): AppPath<(String, String)>, AppJson(r): AppJson<UpdateQuantityRequest>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.write(move |shop| shop.update_cart_item(&session, &product_id, r.quantity)).await?))
}

pub async fn decrement_cart_item(State(s): State<AppState>, AppPath((session, product_id)): AppPath<(String, String)>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.write(move |shop| shop.decrement_cart_item(&session, &product_id)).await?))
}

pub async fn remove_cart_item(State(s): State<AppState>, AppPath((session, product_id)): AppPath<(String, String)>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.write(move |shop| shop.remove_cart_item(&session, &product_id)).await?))
}

pub async fn clear_cart(State(s): State<AppState>, AppPath(session): AppPath<String>) -> ApiResult<StatusCode> {
    s.write(move |shop| shop.clear_cart(&session)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn quote_cart(State(s): State<AppState>, AppPath(session): AppPath<String>, AppJson(r): AppJson<QuoteRequest>) -> ApiResult<Json<PriceQuote>> {
    Ok(Json(s.shop.lock().await.quote_cart(&session, r.promo_code.as_deref(), r.customer_email.as_deref())?))
}

pub async fn checkout(State(s): State<AppState>, AppJson(body): AppJson<CheckoutBody>) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = s.write(move |shop| shop.checkout(&body.session_id, body.request)).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest { pub code: String, pub subtotal: Decimal, pub customer_email: Option<String> }

pub async fn validate_promo_code(State(s): State<AppState>, AppJson(r): AppJson<ValidatePromoRequest>) -> ApiResult<Json<PriceQuote>> {
    Ok(Json(s.shop.lock().await.validate_promo_code(&r.code, r.subtotal, r.customer_email.as_deref())?))
}

// ----- registration and account -----

#[derive(Debug, Deserialize)] pub struct VerifyRequest { pub email: String, pub code: String }
#[derive(Debug, Deserialize)] pub struct ResendRequest { pub email: String }

pub async fn register(State(s): State<AppState>, AppJson(form): AppJson<RegistrationForm>) -> ApiResult<(StatusCode, Json<VerificationChallenge>)> {
    let challenge = s.write(move |shop| shop.start_registration(form)).await?;
    Ok((StatusCode::ACCEPTED, Json(challenge)))
}

pub async fn verify_registration(State(s): State<AppState>, AppJson(r): AppJson<VerifyRequest>) -> ApiResult<(StatusCode, Json<User>)> {
    let user = s.write(move |shop| shop.verify_registration(&r.email, &r.code)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn resend_code(State(s): State<AppState>, AppJson(r): AppJson<ResendRequest>) -> ApiResult<Json<VerificationChallenge>> {
    Ok(Json(s.write(move |shop| shop.resend_verification_code(&r.email)).await?))
}

pub async fn user_orders(State(s): State<AppState>, AppPath(id): AppPath<String>, AppQuery(p): AppQuery<ListParams>) -> ApiResult<Json<PaginatedResponse<Order>>> {
    let shop = s.shop.lock().await;
    let user = shop.get_user(&id)?;
    Ok(Json(p.paginate(shop.customer_orders(user.email()))))
}

pub async fn add_address(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(form): AppJson<AddressForm>) -> ApiResult<(StatusCode, Json<User>)> {
    let user = s.write(move |shop| shop.add_address(&id, form)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_address(State(s): State<AppState>, AppPath((id, address_id)): AppPath<(String, String)>, AppJson(form): AppJson<AddressForm>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.update_address(&id, &address_id, form)).await?))
}

pub async fn set_default_address(State(s): State<AppState>, AppPath((id, address_id)): AppPath<(String, String)>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.set_default_address(&id, &address_id)).await?))
}

pub async fn remove_address(State(s): State<AppState>, AppPath((id, address_id)): AppPath<(String, String)>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.remove_address(&id, &address_id)).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest { pub product_id: String }

pub async fn add_to_wishlist(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(r): AppJson<WishlistRequest>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.add_to_wishlist(&id, &r.product_id)).await?))
}

pub async fn remove_from_wishlist(State(s): State<AppState>, AppPath((id, product_id)): AppPath<(String, String)>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.remove_from_wishlist(&id, &product_id)).await?))
}

pub async fn add_payment_method(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(form): AppJson<PaymentMethodForm>) -> ApiResult<(StatusCode, Json<User>)> {
    let user = s.write(move |shop| shop.add_payment_method(&id, form)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn remove_payment_method(State(s): State<AppState>, AppPath((id, method_id)): AppPath<(String, String)>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.remove_payment_method(&id, &method_id)).await?))
}

// ----- support -----

#[derive(Debug, Deserialize)] pub struct OpenTicketRequest { pub subject: String, pub customer: Customer, pub message: String }

pub async fn open_ticket(State(s): State<AppState>, AppJson(r): AppJson<OpenTicketRequest>) -> ApiResult<(StatusCode, Json<SupportTicket>)> {
    let ticket = s.write(move |shop| shop.open_ticket(&r.subject, r.customer, &r.message)).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

// ----- preferences -----

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccentColorBody { pub accent_color: AccentColor }

pub async fn get_accent_color(State(s): State<AppState>) -> Json<AccentColorBody> {
    Json(AccentColorBody { accent_color: s.shop.lock().await.accent_color() })
}

pub async fn set_accent_color(State(s): State<AppState>, AppJson(body): AppJson<AccentColorBody>) -> ApiResult<Json<AccentColorBody>> {
    let accent_color = s.write(move |shop| shop.set_accent_color(body.accent_color)).await?;
    Ok(Json(AccentColorBody { accent_color }))
}
