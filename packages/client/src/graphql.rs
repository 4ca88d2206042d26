//! GraphQL request boundary.
//!
//! Operations are plain request/response: an operation name, a query document
//! and JSON variables go out; typed `data` or a [`GraphqlError`] comes back.

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use unihub_shared::protocol::MemberData;

use crate::{endpoint::TokenStore, error::GraphqlError, store::MemberProfile};

const GET_MEMBER_QUERY: &str = "query GetMember($memberId: String!) {
  getMember(memberId: $memberId) {
    _id
    nickname
    fullName
    avatarPath
  }
}";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    operation_name: &'a str,
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GetMemberData {
    #[serde(rename = "getMember")]
    get_member: MemberData,
}

impl From<MemberData> for MemberProfile {
    fn from(member: MemberData) -> Self {
        Self {
            id: member.id,
            nickname: member.nickname,
            full_name: member.full_name,
            avatar_path: member.avatar_path,
        }
    }
}

#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenStore>,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one operation, attaching the stored token as a bearer credential.
    ///
    /// # Errors
    ///
    /// * [`GraphqlError::Http`] when the request cannot be sent
    /// * [`GraphqlError::Operation`] when the response lists errors
    /// * [`GraphqlError::Status`] for a non-success status without errors
    /// * [`GraphqlError::MissingData`] when `data` is absent
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GraphqlError> {
        let body = GraphqlRequest {
            operation_name,
            query,
            variables,
        };
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = self.tokens.load_token() {
            request = request.bearer_auth(token);
        }

        tracing::debug!("GraphQL {} -> {}", operation_name, self.endpoint);
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        decode_response(operation_name, status, &bytes)
    }

    /// Fetch a member profile by id.
    pub async fn get_member(&self, member_id: &str) -> Result<MemberProfile, GraphqlError> {
        let data: GetMemberData = self
            .execute(
                "GetMember",
                GET_MEMBER_QUERY,
                serde_json::json!({ "memberId": member_id }),
            )
            .await?;
        Ok(data.get_member.into())
    }
}

fn decode_response<T: DeserializeOwned>(
    operation: &str,
    status: u16,
    body: &[u8],
) -> Result<T, GraphqlError> {
    let success = (200..300).contains(&status);
    let envelope: GraphqlResponse<T> = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !success => return Err(GraphqlError::Status(status)),
        Err(e) => return Err(e.into()),
    };

    if !envelope.errors.is_empty() {
        let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
        tracing::warn!("GraphQL {} failed: {}", operation, messages.join("; "));
        return Err(GraphqlError::Operation {
            operation: operation.to_string(),
            messages,
        });
    }
    if !success {
        return Err(GraphqlError::Status(status));
    }
    envelope
        .data
        .ok_or_else(|| GraphqlError::MissingData(operation.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        // テスト項目: リクエストボディが operationName / query / variables を持つ
        // given (前提条件):
        let body = GraphqlRequest {
            operation_name: "GetMember",
            query: GET_MEMBER_QUERY,
            variables: serde_json::json!({ "memberId": "m-1" }),
        };

        // when (操作):
        let value = serde_json::to_value(&body).unwrap();

        // then (期待する結果):
        assert_eq!(value["operationName"], "GetMember");
        assert_eq!(value["variables"]["memberId"], "m-1");
        assert!(value["query"].as_str().unwrap().contains("getMember"));
    }

    #[test]
    fn test_decode_member_data() {
        // テスト項目: data が型付きで取り出され、プロフィールに変換される
        // given (前提条件):
        let body = br#"{"data":{"getMember":{"_id":"m-1","nickname":"alice","fullName":"Alice Park","avatarPath":null}}}"#;

        // when (操作):
        let data: GetMemberData = decode_response("GetMember", 200, body).unwrap();
        let profile = MemberProfile::from(data.get_member);

        // then (期待する結果):
        assert_eq!(profile.id, "m-1");
        assert_eq!(profile.full_name.as_deref(), Some("Alice Park"));
        assert_eq!(profile.avatar_path, None);
    }

    #[test]
    fn test_errors_list_becomes_operation_error() {
        // テスト項目: errors 配列はメッセージ一覧を持つエラーになる
        // given (前提条件):
        let body = br#"{"data":null,"errors":[{"message":"Not authenticated"},{"message":"Bad input"}]}"#;

        // when (操作):
        let result: Result<GetMemberData, _> = decode_response("GetMember", 200, body);

        // then (期待する結果):
        match result {
            Err(GraphqlError::Operation {
                operation,
                messages,
            }) => {
                assert_eq!(operation, "GetMember");
                assert_eq!(messages, vec!["Not authenticated", "Bad input"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_errors_win_over_http_status() {
        // テスト項目: エラーステータスでも errors があればその内容を優先する
        // given (前提条件):
        let body = br#"{"errors":[{"message":"Unauthorized"}]}"#;

        // when (操作):
        let result: Result<GetMemberData, _> = decode_response("GetMember", 401, body);

        // then (期待する結果):
        assert!(matches!(result, Err(GraphqlError::Operation { .. })));
    }

    #[test]
    fn test_non_json_error_status() {
        // テスト項目: JSON でないエラー応答は HTTP ステータスエラーになる
        // given (前提条件):
        let body = b"<html>Bad Gateway</html>";

        // when (操作):
        let result: Result<GetMemberData, _> = decode_response("GetMember", 502, body);

        // then (期待する結果):
        assert!(matches!(result, Err(GraphqlError::Status(502))));
    }

    #[test]
    fn test_missing_data() {
        // テスト項目: data も errors も無い応答は MissingData になる
        // given (前提条件):
        let body = br#"{}"#;

        // when (操作):
        let result: Result<GetMemberData, _> = decode_response("GetMember", 200, body);

        // then (期待する結果):
        assert!(matches!(result, Err(GraphqlError::MissingData(op)) if op == "GetMember"));
    }

    #[test]
    fn test_malformed_success_body_is_decode_error() {
        // テスト項目: 成功ステータスで壊れた JSON はデコードエラーになる
        // given (前提条件):
        let body = b"{not json";

        // when (操作):
        let result: Result<GetMemberData, _> = decode_response("GetMember", 200, body);

        // then (期待する結果):
        assert!(matches!(result, Err(GraphqlError::Decode(_))));
    }
}
