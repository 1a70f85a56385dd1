//! HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use pwapush_core::{NotificationMessage, SubscriptionCandidate, SubscriptionRepository};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::notifications::fanout::DEFAULT_DELIVERY_TIMEOUT;
use crate::notifications::{
    BroadcastSummary, NotificationRelay, PushTransport, SubscriptionRegistrar,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriptionRepository>,
    pub registrar: Arc<SubscriptionRegistrar>,
    pub relay: Arc<NotificationRelay>,
    pub vapid_public_key: Arc<str>,
}

impl AppState {
    /// Wire the registrar and relay over one store and one transport.
    pub fn new(
        store: Arc<dyn SubscriptionRepository>,
        transport: Arc<dyn PushTransport>,
        vapid_public_key: &str,
        options: RelayOptions,
    ) -> Self {
        let welcome = options.welcome.then(NotificationMessage::welcome);
        let registrar = SubscriptionRegistrar::new(Arc::clone(&store), Arc::clone(&transport))
            .with_welcome(welcome);
        let relay = NotificationRelay::new(Arc::clone(&store), transport)
            .with_delivery_timeout(options.delivery_timeout);
        Self {
            store,
            registrar: Arc::new(registrar),
            relay: Arc::new(relay),
            vapid_public_key: Arc::from(vapid_public_key),
        }
    }
}

/// Tunables for [`AppState::new`].
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    pub delivery_timeout: Duration,
    /// Greet new subscriptions with a welcome notification.
    pub welcome: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            welcome: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub summary: Option<BroadcastSummary>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subscriptions: usize,
}

/// Build the router with permissive CORS, so the PWA can be served from
/// another origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/vapid-public-key", get(vapid_public_key))
        .route("/subscribe", post(subscribe))
        .route("/send-notification", post(send_notification))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /vapid-public-key`
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.vapid_public_key.to_string(),
    })
}

/// `POST /subscribe`
pub async fn subscribe(
    State(state): State<AppState>,
    body: Result<Json<SubscriptionCandidate>, JsonRejection>,
) -> (StatusCode, Json<MessageResponse>) {
    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                message: "Invalid subscription object".to_string(),
            }),
        )
    };

    let Json(candidate) = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Unreadable subscription body");
            return invalid();
        }
    };

    match state.registrar.register(candidate).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Subscription added successfully".to_string(),
            }),
        ),
        Err(_) => invalid(),
    }
}

/// `POST /send-notification`
pub async fn send_notification(
    State(state): State<AppState>,
    body: Result<Json<NotificationMessage>, JsonRejection>,
) -> (StatusCode, Json<SendResponse>) {
    let missing = || {
        (
            StatusCode::BAD_REQUEST,
            Json(SendResponse {
                success: false,
                message: "Missing required fields".to_string(),
                summary: None,
            }),
        )
    };

    let Json(message) = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Unreadable notification body");
            return missing();
        }
    };

    let Ok(summary) = state.relay.broadcast(&message).await else {
        return missing();
    };

    let text = if summary.attempted == 0 {
        "No active subscriptions to send notifications to".to_string()
    } else {
        format!(
            "Notifications sent: {} successful, {} failed",
            summary.delivered, summary.failed
        )
    };
    (
        StatusCode::OK,
        Json(SendResponse {
            success: true,
            message: text,
            summary: Some(summary),
        }),
    )
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscriptions: state.store.count().await,
    })
}
