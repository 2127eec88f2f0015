//! Demo server for the unified router.
//!
//! Serves a small in-memory users API through the dispatch core, with the
//! diagnostics endpoints mounted next to it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

use unified_router::config::{load_config, RouterConfig};
use unified_router::lifecycle::{signals, startup, Shutdown};
use unified_router::observability::logging;
use unified_router::{
    DispatchRequest, FieldSchema, HandlerError, HandlerResult, ObjectSchema, Reply,
    RouteDefinition, RouteSchemas, UnifiedRouter,
};

#[derive(Parser, Debug)]
#[command(name = "unified-router")]
#[command(about = "Route registry, validation and analytics demo server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    email: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    email: String,
    name: Option<String>,
}

#[derive(Default)]
struct UserStore {
    users: DashMap<u64, User>,
    next_id: AtomicU64,
}

impl UserStore {
    fn insert(&self, new: NewUser) -> User {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user = User {
            id,
            email: new.email,
            name: new.name,
        };
        self.users.insert(id, user.clone());
        user
    }
}

fn user_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field("id", FieldSchema::integer().required())
        .field("email", FieldSchema::string().required())
        .field("name", FieldSchema::string())
}

fn id_params() -> ObjectSchema {
    ObjectSchema::new().field("id", FieldSchema::integer().required().min(1.0))
}

async fn health(_req: DispatchRequest) -> HandlerResult {
    Ok(Reply::Value(json!({ "status": "ok" })))
}

async fn list_users(store: Arc<UserStore>, req: DispatchRequest) -> HandlerResult {
    let limit = req.query()["limit"].as_u64().unwrap_or(50) as usize;
    let mut users: Vec<User> = store.users.iter().map(|u| u.value().clone()).collect();
    users.sort_by_key(|u| u.id);
    users.truncate(limit);
    Reply::json(&users)
}

async fn get_user(store: Arc<UserStore>, req: DispatchRequest) -> HandlerResult {
    let id: u64 = req.param_as("id")?;
    let user = store
        .users
        .get(&id)
        .map(|u| u.value().clone())
        .ok_or_else(|| HandlerError::not_found(format!("User {} not found", id)))?;
    Reply::json(&user)
}

async fn create_user(store: Arc<UserStore>, req: DispatchRequest) -> HandlerResult {
    let new: NewUser = req.body_as()?;
    if store.users.iter().any(|u| u.email == new.email) {
        return Err(HandlerError::conflict(format!("{} is already registered", new.email)));
    }
    Reply::json(&store.insert(new))
}

async fn delete_user(store: Arc<UserStore>, req: DispatchRequest) -> HandlerResult {
    let id: u64 = req.param_as("id")?;
    match store.users.remove(&id) {
        Some(_) => Ok(Reply::Empty),
        None => Err(HandlerError::not_found(format!("User {} not found", id))),
    }
}

fn user_routes(store: Arc<UserStore>) -> Vec<RouteDefinition> {
    let list = store.clone();
    let get = store.clone();
    let create = store.clone();
    let delete = store;

    vec![
        RouteDefinition::get("/users", move |req: DispatchRequest| list_users(list.clone(), req))
            .with_name("users.list")
            .with_validation(
                RouteSchemas::new().with_query(
                    ObjectSchema::new()
                        .field("limit", FieldSchema::integer().min(1.0).max(500.0)),
                ),
            ),
        RouteDefinition::get("/users/:id", move |req: DispatchRequest| get_user(get.clone(), req))
            .with_name("users.get")
            .with_validation(
                RouteSchemas::new()
                    .with_params(id_params())
                    .with_response(user_schema()),
            ),
        RouteDefinition::post("/users", move |req: DispatchRequest| {
            create_user(create.clone(), req)
        })
        .with_name("users.create")
        .with_validation(
            RouteSchemas::new()
                .with_body(
                    ObjectSchema::new()
                        .field("email", FieldSchema::string().required().min(3.0))
                        .field("name", FieldSchema::string().max(100.0)),
                )
                .with_response(user_schema()),
        ),
        RouteDefinition::delete("/users/:id", move |req: DispatchRequest| {
            delete_user(delete.clone(), req)
        })
        .with_name("users.delete")
        .with_validation(RouteSchemas::new().with_params(id_params())),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    logging::init(&config.observability)?;

    tracing::info!("unified-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        strict_mode = config.router.strict_mode,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let router = UnifiedRouter::new();
    let options = config.router.options();
    router.register_routes(&[RouteDefinition::get("/health", health)], &options)?;
    router.register_routes(
        &user_routes(Arc::new(UserStore::default())),
        &options.clone().with_prefix("/api"),
    )?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());
    startup::run(config, router, listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
