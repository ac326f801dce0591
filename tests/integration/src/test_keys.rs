//! Access key lifecycle integration tests.

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use crate::{client, endpoint_url, key_secret, signed_request};

    async fn json(resp: reqwest::Response) -> serde_json::Value {
        resp.json().await.expect("JSON body")
    }

    async fn validate(client: &reqwest::Client, key_id: &str, secret: &str) -> serde_json::Value {
        let resp = client
            .post(format!("{}/api/keys/validate", endpoint_url()))
            .header("content-type", "application/json")
            .body(serde_json::json!({"keyId": key_id, "secret": secret}).to_string())
            .send()
            .await
            .expect("validate");
        assert_eq!(resp.status(), StatusCode::OK);
        json(resp).await
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_generate_validate_list_and_delete() {
        let client = client();

        let resp = signed_request(
            &client,
            Method::POST,
            "/api/keys/generate",
            &[],
            None,
            &key_secret(),
            None,
        )
        .send()
        .await
        .expect("generate");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let generated = json(resp).await;
        let new_id = generated["keyId"].as_str().expect("keyId").to_owned();
        let new_secret = generated["secret"].as_str().expect("secret").to_owned();
        assert!(new_id.starts_with("SMS4DEV"));

        assert_eq!(validate(&client, &new_id, &new_secret).await["valid"], true);

        let resp = signed_request(&client, Method::GET, "/api/keys", &[], None, &key_secret(), None)
            .send()
            .await
            .expect("list");
        let listing = json(resp).await;
        assert!(!listing.to_string().contains(&new_secret));
        assert!(
            listing["keys"]
                .as_array()
                .expect("keys")
                .iter()
                .any(|k| k["keyId"] == new_id.as_str())
        );

        let resp = signed_request(
            &client,
            Method::DELETE,
            &format!("/api/keys/{new_id}"),
            &[],
            None,
            &key_secret(),
            None,
        )
        .send()
        .await
        .expect("delete");
        assert_eq!(resp.status(), StatusCode::OK);

        let after = validate(&client, &new_id, &new_secret).await;
        assert_eq!(after["valid"], false);
        assert_eq!(after["reason"], "not_found");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_duplicate_create() {
        let client = client();
        let key = format!("ITEST{}", std::process::id());
        let body = serde_json::json!({"keyId": key, "secret": "integration-secret"});

        let create = || {
            signed_request(
                &client,
                Method::POST,
                "/api/keys",
                &[],
                Some(body.clone()),
                &key_secret(),
                None,
            )
            .send()
        };

        let first = create().await.expect("create");
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = create().await.expect("create again");
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json(second).await["Code"], "KeyAlreadyExists");

        let _ = signed_request(
            &client,
            Method::DELETE,
            &format!("/api/keys/{key}"),
            &[],
            None,
            &key_secret(),
            None,
        )
        .send()
        .await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_key_on_delete() {
        let client = client();
        let resp = signed_request(
            &client,
            Method::DELETE,
            "/api/keys/SMS4DEVDOESNOTEXIST",
            &[],
            None,
            &key_secret(),
            None,
        )
        .send()
        .await
        .expect("delete");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["Code"], "KeyNotFound");
    }
}
