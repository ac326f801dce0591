//! Request authentication integration tests.

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use crate::{client, endpoint_url, key_id, key_secret, signed_request, static_request};

    async fn json(resp: reqwest::Response) -> serde_json::Value {
        resp.json().await.expect("JSON body")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health_without_credentials() {
        let resp = client()
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .expect("health");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("x-sms4dev-request-id").is_some());
        assert_eq!(json(resp).await["status"], "ok");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_static_credentials() {
        let client = client();
        let resp = static_request(&client, Method::GET, "/api/auth/verify", &key_secret())
            .send()
            .await
            .expect("verify");
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["keyId"], key_id());
        assert_eq!(body["mode"], "static");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_wrong_static_secret() {
        let client = client();
        let resp = static_request(&client, Method::GET, "/api/keys", "definitely-wrong")
            .send()
            .await
            .expect("list");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(resp).await["Code"], "AuthFailure");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_missing_credentials() {
        let resp = client()
            .get(format!("{}/api/keys", endpoint_url()))
            .send()
            .await
            .expect("list");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json(resp).await;
        assert_eq!(body["Code"], "MissingCredentials");
        assert!(body["RequestId"].is_string());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_signed_request() {
        let client = client();
        let resp = signed_request(
            &client,
            Method::GET,
            "/api/auth/verify",
            &[("page", "1"), ("limit", "20")],
            None,
            &key_secret(),
            None,
        )
        .send()
        .await
        .expect("verify");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["mode"], "hmac");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_signature_from_wrong_secret() {
        let client = client();
        let resp = signed_request(
            &client,
            Method::GET,
            "/api/keys",
            &[],
            None,
            "not-the-secret",
            None,
        )
        .send()
        .await
        .expect("list");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(resp).await["Code"], "SignatureDoesNotMatch");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_stale_timestamp() {
        let client = client();
        let resp = signed_request(
            &client,
            Method::GET,
            "/api/keys",
            &[],
            None,
            &key_secret(),
            Some("2000-01-01T00:00:00.000Z"),
        )
        .send()
        .await
        .expect("list");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(resp).await["Code"], "TimestampExpired");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unparsable_timestamp() {
        let client = client();
        let resp = signed_request(
            &client,
            Method::GET,
            "/api/keys",
            &[],
            None,
            &key_secret(),
            Some("not-a-date"),
        )
        .send()
        .await
        .expect("list");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["Code"], "InvalidTimestamp");
    }
}
