use furniture_checkout_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");
    assert!(response.0.meta.is_none());

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "furniture-checkout-api");
    assert_eq!(data.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn liveness_body_omits_readiness_fields() {
    let response = health_check().await;
    let body = serde_json::to_value(&response.0).expect("serializable");

    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"].get("database").is_none());
    assert!(body["data"].get("payment_gateway").is_none());
    assert!(body.get("meta").is_none());
}
