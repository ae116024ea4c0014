use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{connect_database, connect_redis},
    middlewares::authentication,
    modules::{
        conversation::{repository_pg::ConversationRepositoryPg, service::ConversationService},
        friend::{repository_pg::FriendRepositoryPg, service::FriendService},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        presence::tracker::PresenceTracker,
        realtime::{
            broker::ServerBroker, handler::websocket_handler, server::ChatServer,
        },
        user::{repository_pg::UserRepositoryPg, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .map_err(|_| std::io::Error::other("Database migration error"))?;

    let redis_pool =
        connect_redis().map_err(|_| std::io::Error::other("Redis connection error"))?;

    // The actor layer logs through tracing; env_logger (installed by the
    // ENV initializer) keeps owning the `log` side.
    let subscriber = tracing_subscriber::fmt().finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("Tracing subscriber already installed");
    }

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationRepositoryPg::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));

    let chat_server = ChatServer::new().start();
    let broker = Arc::new(ServerBroker::new(chat_server.clone()));

    let user_service = UserService::with_dependencies(user_repo.clone());
    let friend_service = FriendService::with_dependencies(
        friend_repo.clone(),
        user_repo.clone(),
        broker.clone(),
    );
    let conversation_service = ConversationService::with_dependencies(
        conversation_repo.clone(),
        friend_repo.clone(),
        user_repo.clone(),
    );
    let message_service =
        MessageService::with_dependencies(message_repo, conversation_repo, friend_repo, broker);
    let presence_tracker = PresenceTracker::new(redis_pool.clone());

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(friend_service.clone()))
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(presence_tracker.clone()))
            .app_data(web::Data::new(chat_server.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
            .service(
                web::scope("/api").service(
                    web::scope("")
                        .wrap(from_fn(authentication))
                        .configure(modules::user::route::configure)
                        .configure(modules::friend::route::configure)
                        .configure(modules::conversation::route::configure)
                        .configure(modules::presence::route::configure),
                ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
