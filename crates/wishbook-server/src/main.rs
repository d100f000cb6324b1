use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wishbook_api::auth::{self, AppState, AppStateInner};
use wishbook_api::middleware::require_auth;
use wishbook_api::{messages, reactions, uploads, users};
use wishbook_core::Engine;
use wishbook_core::storage::Storage;
use wishbook_gateway::connection;
use wishbook_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wishbook=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("WISHBOOK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("WISHBOOK_DB_PATH").unwrap_or_else(|_| "wishbook.db".into());
    let upload_dir =
        std::env::var("WISHBOOK_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
    let host = std::env::var("WISHBOOK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WISHBOOK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and blob storage
    let db = Arc::new(wishbook_db::Database::open(&PathBuf::from(&db_path))?);
    let storage = Storage::new(PathBuf::from(&upload_dir)).await?;
    let engine = Engine::new(db, storage);

    // First-boot admin seeding keeps the always-one-admin invariant
    // satisfiable from the start.
    match (
        std::env::var("WISHBOOK_ADMIN_NAME"),
        std::env::var("WISHBOOK_ADMIN_PASSWORD"),
    ) {
        (Ok(name), Ok(password)) => engine.ensure_admin(&name, &password).await?,
        _ => {
            if engine.db.count_admins()? == 0 {
                warn!(
                    "No admin account exists and WISHBOOK_ADMIN_NAME/PASSWORD are unset; \
                     moderation endpoints will be unusable"
                );
            }
        }
    }

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        engine,
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/visitor", post(auth::visitor))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/uploads/{storage_ref}", get(uploads::download))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/messages", get(messages::list_messages))
        .route("/messages", post(messages::create_message))
        .route("/messages/{id}", put(messages::update_message))
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/messages/{id}/pin", post(messages::toggle_pin))
        .route("/messages/{id}/reactions", get(reactions::get_reactions))
        .route("/messages/{id}/reactions", post(reactions::add_reaction))
        .route("/messages/{id}/reactions", delete(reactions::remove_reaction))
        .route("/uploads", post(uploads::upload))
        .route("/users", get(users::list_users))
        .route("/users/{id}", delete(users::delete_user))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(ServerState {
            dispatcher,
            jwt_secret,
        });

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Wishbook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
