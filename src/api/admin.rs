use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::{ApiResult, AppJson, AppPath, AppQuery, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{Order, OrderStatus, Product, ProductDraft, PromoCode, PromoDraft, Sender, SupportTicket, TicketStatus, User};
use crate::domain::analytics::{Behavior, BehaviorPoint, DashboardStats, Period, SalesPoint, TopProduct};
use crate::shop::{OrderFilter, TicketFilter, UserFilter};

// ----- products -----

pub async fn create_product(State(s): State<AppState>, AppJson(draft): AppJson<ProductDraft>) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = s.write(move |shop| shop.create_product(draft)).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(draft): AppJson<ProductDraft>) -> ApiResult<Json<Product>> {
    Ok(Json(s.write(move |shop| shop.update_product(&id, draft)).await?))
}

pub async fn delete_product(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    s.write(move |shop| shop.delete_product(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- orders -----

#[derive(Debug, Deserialize)] pub struct StatusRequest<S> { pub status: S }

pub async fn list_orders(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>, AppQuery(f): AppQuery<OrderFilter>) -> Json<PaginatedResponse<Order>> {
    Json(p.paginate(s.shop.lock().await.list_orders(&f)))
}

pub async fn get_order(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<Order>> { Ok(Json(s.shop.lock().await.get_order(&id)?)) }

pub async fn update_order_status(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(r): AppJson<StatusRequest<OrderStatus>>) -> ApiResult<Json<Order>> {
    Ok(Json(s.write(move |shop| shop.update_order_status(&id, r.status)).await?))
}

// ----- users -----

pub async fn list_users(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>, AppQuery(f): AppQuery<UserFilter>) -> Json<PaginatedResponse<User>> {
    Json(p.paginate(s.shop.lock().await.list_users(&f)))
}

pub async fn get_user(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<User>> { Ok(Json(s.shop.lock().await.get_user(&id)?)) }

pub async fn toggle_user_active(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<User>> {
    Ok(Json(s.write(move |shop| shop.toggle_user_active(&id)).await?))
}

// ----- promo codes -----

#[derive(Debug, Default, Deserialize)] pub struct SearchParams { pub search: Option<String> }

pub async fn list_promo_codes(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>, AppQuery(q): AppQuery<SearchParams>) -> Json<PaginatedResponse<PromoCode>> {
    Json(p.paginate(s.shop.lock().await.list_promo_codes(q.search.as_deref())))
}

pub async fn get_promo_code(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<PromoCode>> {
    Ok(Json(s.shop.lock().await.get_promo_code(&id)?))
}

pub async fn create_promo_code(State(s): State<AppState>, AppJson(draft): AppJson<PromoDraft>) -> ApiResult<(StatusCode, Json<PromoCode>)> {
    let promo = s.write(move |shop| shop.create_promo_code(draft)).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

pub async fn update_promo_code(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(draft): AppJson<PromoDraft>) -> ApiResult<Json<PromoCode>> {
    Ok(Json(s.write(move |shop| shop.update_promo_code(&id, draft)).await?))
}

pub async fn delete_promo_code(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    s.write(move |shop| shop.delete_promo_code(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_promo_code(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<PromoCode>> {
    Ok(Json(s.write(move |shop| shop.toggle_promo_code(&id)).await?))
}

// ----- support tickets -----

#[derive(Debug, Deserialize)] pub struct MessageRequest { pub sender: Sender, pub text: String }

pub async fn list_tickets(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>, AppQuery(f): AppQuery<TicketFilter>) -> Json<PaginatedResponse<SupportTicket>> {
    Json(p.paginate(s.shop.lock().await.list_tickets(&f)))
}

pub async fn get_ticket(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<SupportTicket>> { Ok(Json(s.shop.lock().await.get_ticket(&id)?)) }

pub async fn post_ticket_message(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(r): AppJson<MessageRequest>) -> ApiResult<(StatusCode, Json<SupportTicket>)> {
    let ticket = s.write(move |shop| shop.post_ticket_message(&id, r.sender, &r.text)).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn set_ticket_status(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(r): AppJson<StatusRequest<TicketStatus>>) -> ApiResult<Json<SupportTicket>> {
    Ok(Json(s.write(move |shop| shop.set_ticket_status(&id, r.status)).await?))
}

pub async fn close_ticket(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<SupportTicket>> {
    Ok(Json(s.write(move |shop| shop.close_ticket(&id)).await?))
}

// ----- dashboard -----

#[derive(Debug, Default, Deserialize)] pub struct PeriodParams { #[serde(default)] pub period: Period }

#[derive(Debug, Default, Deserialize)] pub struct BehaviorParams { #[serde(default, rename = "type")] pub kind: Behavior }

pub async fn dashboard_stats(State(s): State<AppState>) -> Json<DashboardStats> { Json(s.shop.lock().await.dashboard_stats()) }

pub async fn sales_series(State(s): State<AppState>, AppQuery(p): AppQuery<PeriodParams>) -> Json<Vec<SalesPoint>> { Json(s.shop.lock().await.sales_series(p.period)) }

pub async fn top_products(State(s): State<AppState>) -> Json<Vec<TopProduct>> { Json(s.shop.lock().await.top_products()) }

pub async fn customer_behavior(State(s): State<AppState>, AppQuery(p): AppQuery<BehaviorParams>) -> Json<Vec<BehaviorPoint>> {
    Json(s.shop.lock().await.customer_behavior(p.kind))
}
