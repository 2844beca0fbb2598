use serde::Serialize;

use crate::error::AiError;

/// POSTs `body` as JSON with bearer auth and returns the raw 2xx body.
///
/// 429 maps to [`AiError::RateLimited`]; any other non-2xx status to
/// [`AiError::Status`] carrying the response body.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> Result<String, AiError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AiError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.text().await?)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("https://api.example.test/v1/", "embeddings"),
            "https://api.example.test/v1/embeddings"
        );
        assert_eq!(
            endpoint("https://api.example.test/v1", "chat/completions"),
            "https://api.example.test/v1/chat/completions"
        );
    }
}
