use actix_web::{
    middleware::{Compress, Logger},
    web,
    App,
    HttpServer,
};
use log::info;
use loyalty_points_engine::{
    accrual::{AccrualPoller, HttpAccrualClient},
    AuthApi,
    BalanceApi,
    OrderApi,
    PostgresDatabase,
};

use crate::{auth::TokenIssuer, config::ServerConfig, errors::ServerError, routes};

const MAX_DB_CONNECTIONS: u32 = 25;
const SHUTDOWN_DEADLINE_SECS: u64 = 5;

type Poller = AccrualPoller<PostgresDatabase, HttpAccrualClient>;

/// Connects storage, starts the accrual poller and runs the HTTP server until SIGINT/SIGTERM.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = PostgresDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let client =
        HttpAccrualClient::new(&config.accrual_address).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let poller = web::Data::new(AccrualPoller::new(db.clone(), client));
    poller.start().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let signer = TokenIssuer::new(&config.secret, config.token_lifetime());

    info!("🚀️ Starting server on {}", config.run_address);
    HttpServer::new(move || {
        let auth_api = AuthApi::new(db.clone());
        let order_api = OrderApi::new(db.clone());
        let balance_api = BalanceApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %U"))
            .wrap(Compress::default())
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(balance_api))
            .app_data(web::Data::new(signer.clone()))
            .app_data(poller.clone())
            .service(
                web::scope("/api/user")
                    .route("/register", web::post().to(routes::register::<PostgresDatabase>))
                    .route("/login", web::post().to(routes::login::<PostgresDatabase>))
                    .route("/orders", web::post().to(routes::post_orders::<PostgresDatabase, Poller>))
                    .route("/orders", web::get().to(routes::get_orders::<PostgresDatabase>))
                    .route("/balance", web::get().to(routes::get_balance::<PostgresDatabase>))
                    .route("/balance/withdraw", web::post().to(routes::withdraw::<PostgresDatabase>))
                    .route("/withdrawals", web::get().to(routes::get_withdrawals::<PostgresDatabase>)),
            )
    })
    .shutdown_timeout(SHUTDOWN_DEADLINE_SECS)
    .bind(config.run_address.as_str())?
    .run()
    .await?;
    Ok(())
}
