//! HTTP surface for the hub app's direct-connect webhook.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    middleware,
    response::Response,
    routing::{get, post},
};
use serde_json::Value;
use tracing::debug;

use hubsync_core::{HubApi, IngestEndpoint, IngestOperation, IngestStatus, RequestBody};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Build the webhook router: `GET /` plus one `POST` route per operation.
pub fn router<C: HubApi>(endpoint: IngestEndpoint<C>) -> Router {
    let mut router = Router::new().route("/", get(liveness));
    for operation in IngestOperation::all() {
        router = router.route(
            &format!("/{operation}"),
            post(
                move |state: State<IngestEndpoint<C>>, headers: HeaderMap, body: Bytes| {
                    ingest(operation, state, headers, body)
                },
            ),
        );
    }
    router
        .layer(middleware::map_response(with_cors))
        .with_state(endpoint)
}

async fn liveness() -> &'static str {
    "WebApp is running..."
}

async fn ingest<C: HubApi>(
    operation: IngestOperation,
    State(endpoint): State<IngestEndpoint<C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<IngestStatus> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let body = parse_body(content_type, &body);
    debug!(operation = %operation, keys = body.len(), "inbound request");
    Json(endpoint.handle(operation, &body))
}

/// Form bodies decode to string fields. Anything else must be a JSON
/// object; what is not counts as an empty body.
fn parse_body(content_type: Option<&str>, raw: &[u8]) -> RequestBody {
    let is_form = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
    if is_form {
        return url::form_urlencoded::parse(raw)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
    }
    serde_json::from_slice(raw).unwrap_or_default()
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}
