//! Request handler definitions.
//!
//! Handlers are generic over the storage traits so the endpoint tests can run the full HTTP stack
//! against mocks. The concrete types are pinned when the app is assembled in [`crate::server`].
use actix_web::{web, HttpResponse};
use log::{debug, error, trace};
use loyalty_points_engine::{
    db_types::OrderNumber,
    traits::{AccrualRegistry, BalanceManagement, OrderManagement, UserManagement},
    AuthApi, BalanceApi, OrderApi, OrderSubmission,
};

use crate::{
    auth::{hash_password, verify_password, AuthenticatedUser, TokenIssuer, MAX_PASSWORD_LENGTH},
    data_objects::{Credentials, WithdrawRequest},
    errors::ServerError,
};

fn sanitized(creds: Credentials) -> Result<(String, String), ServerError> {
    let login = creds.login.trim().to_string();
    let password = creds.password.trim().to_string();
    if login.is_empty() || password.is_empty() {
        return Err(ServerError::InvalidRequestBody("login and password must not be empty".to_string()));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ServerError::InvalidRequestBody(format!(
            "password is too long - must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok((login, password))
}

fn bearer_response(token: &str) -> HttpResponse {
    HttpResponse::Ok().insert_header(("Authorization", format!("Bearer {token}"))).finish()
}

/// POST /api/user/register
pub async fn register<B: UserManagement + 'static>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received registration request");
    let (login, password) = sanitized(body.into_inner())?;
    let password_hash = hash_password(&password)?;
    let user = api.register_user(&login, &password_hash).await?;
    debug!("💻️ User [{login}] registered with id {}", user.id);
    let token = signer.issue_token(user.id)?;
    Ok(bearer_response(&token))
}

/// POST /api/user/login
pub async fn login<B: UserManagement + 'static>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received login request");
    let (login, password) = sanitized(body.into_inner())?;
    let user = api
        .user_by_login(&login)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("wrong login or password".to_string()))?;
    if !verify_password(&user.password_hash, &password) {
        return Err(ServerError::Unauthorized("wrong login or password".to_string()));
    }
    debug!("💻️ User [{login}] logged in");
    let token = signer.issue_token(user.id)?;
    Ok(bearer_response(&token))
}

/// POST /api/user/orders
///
/// The body is the raw order number. 202 for a fresh order, 200 when the same user resubmits,
/// 409 when the number belongs to someone else, 422 when it fails the Luhn check.
pub async fn post_orders<B: OrderManagement + 'static, P: AccrualRegistry + 'static>(
    user: AuthenticatedUser,
    body: String,
    api: web::Data<OrderApi<B>>,
    poller: web::Data<P>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(body.trim());
    number.validate()?;
    match api.submit_order(number.clone(), user.user_id).await? {
        OrderSubmission::Accepted => {
            debug!("💻️ Order [{number}] accepted for user {}", user.user_id);
            // the order row is committed; a poller failure here only delays accrual until restart
            if let Err(e) = poller.register_new_order(number.clone()).await {
                error!("💻️ Could not hand order {number} to the accrual poller: {e}");
            }
            Ok(HttpResponse::Accepted().finish())
        },
        OrderSubmission::AlreadyUploaded => Ok(HttpResponse::Ok().finish()),
    }
}

/// GET /api/user/orders
pub async fn get_orders<B: OrderManagement + 'static>(
    user: AuthenticatedUser,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_user(user.user_id).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/user/balance
pub async fn get_balance<B: BalanceManagement + 'static>(
    user: AuthenticatedUser,
    api: web::Data<BalanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let balance = api.balance(user.user_id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

/// POST /api/user/balance/withdraw
pub async fn withdraw<B: BalanceManagement + 'static>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawRequest>,
    api: web::Data<BalanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    request.order.validate()?;

    // Informational pre-check only. It is racy by nature; the database check constraint is the
    // authoritative overdraft rejection.
    let balance = api.balance(user.user_id).await?;
    if balance.balance < request.sum {
        return Err(ServerError::InsufficientPoints);
    }

    api.withdraw(request.sum, user.user_id, &request.order).await?;
    debug!("💻️ User {} withdrew {} in favour of order [{}]", user.user_id, request.sum, request.order);
    Ok(HttpResponse::Ok().finish())
}

/// GET /api/user/withdrawals
pub async fn get_withdrawals<B: BalanceManagement + 'static>(
    user: AuthenticatedUser,
    api: web::Data<BalanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let history = api.withdrawals(user.user_id).await?;
    if history.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(history))
}
