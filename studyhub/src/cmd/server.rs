use crate::cmd::connect;
use crate::modules::{
    auth::SessionKeys,
    error::handle_layer_error,
    handlers::{
        activity::{
            create_assignment, create_study_session, study_session_stats, submit_quiz_attempt,
            update_assignment_status,
        },
        friends::{accept_friend, add_friend, list_friends},
        leaderboard::get_friend_leaderboard,
        liveness, not_found, readiness,
    },
};
use anyhow::{Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing, Router, Server,
};
use clap::Args;
use std::{env, net::SocketAddr, sync::Arc, time::Duration};
use studyhub_libs::{
    migration::MIGRATOR,
    store::{HealthCheck, PgStore},
    LeaderboardAggregator, Store,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run(args: ServerArgs) -> Result<()> {
    let secret = env::var("JWT_SECRET").with_context(|| {
        let message = "JWT_SECRET environment variable must be set";
        tracing::error!(message);
        message
    })?;
    let timeout = match env::var("REQUEST_TIMEOUT_SECONDS") {
        Ok(value) => value.parse::<u64>().with_context(|| {
            let message = format!("REQUEST_TIMEOUT_SECONDS must be a number, got `{}`", value);
            tracing::error!(message);
            message
        })?,
        Err(_) => DEFAULT_REQUEST_TIMEOUT_SECONDS,
    };
    let origin = match env::var("FRONTEND_ORIGIN_URL") {
        Ok(origin) => Some(origin.parse::<HeaderValue>().with_context(|| {
            let message = format!("FRONTEND_ORIGIN_URL is not a valid origin: `{}`", origin);
            tracing::error!(message);
            message
        })?),
        Err(_) => None,
    };

    let pool = connect().await?;
    MIGRATOR.run(&pool).await.with_context(|| {
        let message = "Failed to run database migrations.";
        tracing::error!(message);
        message
    })?;

    let store = PgStore::new(pool);
    store.ping().await.with_context(|| {
        let message = "database is not available";
        tracing::error!(message);
        message
    })?;

    let app = create_router(
        store,
        SessionKeys::new(&secret),
        Duration::from_secs(timeout),
        origin,
    );
    let port = match args.port {
        Some(port) => port,
        None => {
            tracing::warn!("API server will be launched at default port number 8000");
            8000u16
        }
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server start at port {}", port);
    Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind server to port {}.", port))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server stopped unexpectedly")?;

    Ok(())
}

pub fn create_router<S>(
    store: S,
    keys: SessionKeys,
    timeout: Duration,
    origin: Option<HeaderValue>,
) -> Router
where
    S: Store + Clone + 'static,
{
    let aggregator = Arc::new(LeaderboardAggregator::new(store.clone()));

    let router = Router::new()
        .route(
            "/api/trpc/leaderboard.getFriendLeaderboard",
            routing::get(get_friend_leaderboard::<S>),
        )
        .route("/api/trpc/friends.list", routing::get(list_friends::<S>))
        .route("/api/trpc/friends.add", routing::post(add_friend::<S>))
        .route(
            "/api/trpc/friends.accept",
            routing::post(accept_friend::<S>),
        )
        .route(
            "/api/trpc/studySessions.create",
            routing::post(create_study_session::<S>),
        )
        .route(
            "/api/trpc/studySessions.stats",
            routing::get(study_session_stats::<S>),
        )
        .route(
            "/api/trpc/assignments.create",
            routing::post(create_assignment::<S>),
        )
        .route(
            "/api/trpc/assignments.updateStatus",
            routing::post(update_assignment_status::<S>),
        )
        .route(
            "/api/trpc/quizzes.submitAttempt",
            routing::post(submit_quiz_attempt::<S>),
        )
        .route("/api/liveness", routing::get(liveness))
        .route("/api/readiness", routing::get(readiness::<S>))
        .fallback(not_found)
        .layer(Extension(aggregator))
        .layer(Extension(store))
        .layer(Extension(Arc::new(keys)));
    let router = with_timeout(router, timeout);

    // credentialed requests need an exact origin
    let router = match origin {
        Some(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true),
        ),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

fn with_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_layer_error))
            .timeout(timeout),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, starting graceful shutdown.");
}
