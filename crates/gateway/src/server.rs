use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{ConnectInfo, Query, State, WebSocketUpgrade},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::get,
    },
    axum_extra::extract::cookie::{Cookie, CookieJar, SameSite},
    lansite_config::{LansiteConfig, validate_startup},
    lansite_protocol::{CREDENTIAL_COOKIE_MAX_AGE_SECS, PROTOCOL_VERSION},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{
    auth::{CodeLogin, Credentials, DeveloperLogin, IdentityProvider, login},
    state::GatewayState,
    ws::handle_connection,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let developer_mode = state.config.auth.developer_mode;
    let app_state = AppState { gateway: state };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .route("/api/config", get(client_config_handler))
        .route("/login", get(code_login_handler));

    let router = if developer_mode {
        router.route("/devlogin", get(developer_login_handler))
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the gateway HTTP + WebSocket server.
pub async fn start_gateway(config: LansiteConfig) -> anyhow::Result<()> {
    validate_startup(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = GatewayState::new(config);
    let app = build_gateway_app(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let login_mode = if state.config.auth.login_with_code {
        format!("codes ({} configured)", state.codes.len())
    } else if state.config.auth.offline_mode {
        "offline".to_string()
    } else {
        "steam".to_string()
    };

    // Startup banner.
    let lines = [
        format!("lansite gateway v{}", state.version),
        format!("protocol v{PROTOCOL_VERSION}, listening on {addr}"),
        format!("public url: {}:{}", state.config.server.url, state.config.server.port),
        format!("login: {login_mode}"),
        format!(
            "admin approval: {}, developer mode: {}",
            state.config.stream.require_admin_verification, state.config.auth.developer_mode
        ),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));
    if state.config.auth.developer_mode {
        warn!("developer mode is on: /devlogin accepts any username");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let count = state.gateway.socket_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "protocol": PROTOCOL_VERSION,
        "connections": count,
    }))
}

async fn client_config_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.gateway.config;
    Json(serde_json::json!({
        "loginWithCode": config.auth.login_with_code,
        "offlineMode": config.auth.offline_mode,
        "developerMode": config.auth.developer_mode,
        "privateMessaging": config.stream.private_messaging,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.gateway, addr))
}

async fn code_login_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    login_response(&state, &CodeLogin, &params, jar).await
}

async fn developer_login_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    login_response(&state, &DeveloperLogin, &params, jar).await
}

async fn login_response(
    state: &AppState,
    provider: &dyn IdentityProvider,
    params: &HashMap<String, String>,
    jar: CookieJar,
) -> Response {
    match login(&state.gateway, provider, params).await {
        Ok(creds) => (credential_cookies(jar, &creds), Json(creds)).into_response(),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "login rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        },
    }
}

/// `id` and `secret` cookies the browser presents on its next WebSocket login.
fn credential_cookies(jar: CookieJar, creds: &Credentials) -> CookieJar {
    let max_age = time::Duration::seconds(CREDENTIAL_COOKIE_MAX_AGE_SECS);
    jar.add(
        Cookie::build(("id", creds.id.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(max_age),
    )
    .add(
        Cookie::build(("secret", creds.secret.clone()))
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(max_age),
    )
}
