// AWS Lambda entry point.
//
// API Gateway v2 HTTP events arrive through the Lambda runtime; each one is
// routed exactly like an HTTP request to the local server. Events that do not
// decode are reported back to the runtime by `lambda_runtime` itself.

use std::sync::Arc;

use anyhow::Result;
use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
use aws_lambda_events::encodings::Body;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_TYPE;
use fcddns_core::{DdnsResponse, DdnsService, InvocationContext};
use lambda_runtime::{LambdaEvent, service_fn};
use tracing::{debug, info};

use crate::server;

/// Translate a gateway response into the API Gateway v2 shape
fn into_http_response(response: DdnsResponse) -> ApiGatewayV2httpResponse {
    let mut http = ApiGatewayV2httpResponse::default();
    http.status_code = i64::from(response.status_code);
    http.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    http.body = Some(Body::Text(response.body));
    http
}

/// Handle one decoded event
///
/// `aws_request_id` is used when the event carries no API Gateway request id.
pub async fn handle_event(
    service: &DdnsService,
    event: &ApiGatewayV2httpRequest,
    aws_request_id: &str,
) -> ApiGatewayV2httpResponse {
    let context = &event.request_context;
    let request_id = context
        .request_id
        .clone()
        .unwrap_or_else(|| aws_request_id.to_string());
    let ctx = InvocationContext::new().with_request_id(request_id);

    let path = event
        .raw_path
        .as_deref()
        .or(context.http.path.as_deref())
        .unwrap_or("/");
    let client_ip = context.http.source_ip.clone().filter(|ip| !ip.is_empty());
    debug!("Lambda invocation {} {}", aws_request_id, path);

    into_http_response(server::dispatch(service, &ctx, path, client_ip).await)
}

/// Serve invocations until the execution environment is shut down
pub async fn run(service: DdnsService) -> Result<()> {
    let service = Arc::new(service);
    info!("Lambda runtime loop started");

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<ApiGatewayV2httpRequest>| {
            let service = Arc::clone(&service);
            async move {
                let response =
                    handle_event(&service, &event.payload, &event.context.request_id).await;
                Ok::<_, lambda_runtime::Error>(response)
            }
        },
    ))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime failed: {e}"))
}
