use crate::shared::errors::AppError;
use serde::{Deserialize, Serialize};

/// 認証済みユーザーの識別情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    /// ユーザーID（経費行の所有者IDとして使用される）
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// 表示名
    pub full_name: Option<String>,
}

/// 認証セッション
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// アクセストークン
    pub access_token: String,
    /// トークンタイプ（通常は"bearer"）
    pub token_type: String,
    /// トークンの有効期限（秒）
    pub expires_in: Option<u64>,
    /// ユーザー情報
    pub user: UserIdentity,
}

/// 認証サービスからのユーザー情報レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    /// ユーザーID
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// サインアップ時に登録されたメタデータ
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

/// サインアップ時のユーザーメタデータ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    /// 表示名
    #[serde(default)]
    pub full_name: Option<String>,
}

/// 認証サービスからのトークンレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// アクセストークン
    pub access_token: String,
    /// トークンタイプ
    pub token_type: String,
    /// トークンの有効期限（秒）
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// ユーザー情報
    pub user: UserResponse,
}

/// 認証サービスからのエラーレスポンス
///
/// サービスはエラーの形をいくつか使い分けるため、候補をすべて受ける
#[derive(Debug, Default, Deserialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    /// 候補のうち最初に見つかったメッセージを返す
    pub fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

impl From<UserResponse> for UserIdentity {
    fn from(response: UserResponse) -> Self {
        let full_name = response
            .user_metadata
            .and_then(|metadata| metadata.full_name);
        Self {
            id: response.id,
            email: response.email,
            full_name,
        }
    }
}

impl From<TokenResponse> for Session {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            user: UserIdentity::from(response.user),
        }
    }
}

/// 認証エラーの種類
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 認証設定エラー
    #[error("認証設定エラー: {0}")]
    Config(String),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// 認証サービスが返したエラー
    #[error("{0}")]
    Service(String),

    /// 入力値のバリデーションエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 無効なトークンエラー
    #[error("無効なトークンです")]
    InvalidToken,
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        AuthError::Network(error.to_string())
    }
}

/// 認証エラーを統一エラー型へ変換する（境界での写像）
impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Config(message) => AppError::Configuration(message),
            AuthError::Validation(message) => AppError::Validation(message),
            AuthError::Network(message) | AuthError::Service(message) => AppError::Remote(message),
            AuthError::InvalidToken => AppError::Remote("無効なトークンです".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialization() {
        // 認証サービスのトークンレスポンスを解析できる
        let json = r#"{
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {
                "id": "user-123",
                "email": "taro@example.com",
                "user_metadata": {"full_name": "テスト太郎"}
            }
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        let session = Session::from(response);
        assert_eq!(session.access_token, "jwt-token");
        assert_eq!(session.user.id, "user-123");
        assert_eq!(session.user.full_name, Some("テスト太郎".to_string()));
    }

    #[test]
    fn test_user_response_without_metadata() {
        // メタデータなしのレスポンスでも表示名はNoneとして解析できる
        let json = r#"{"id": "user-1", "email": "a@example.com"}"#;
        let response: UserResponse = serde_json::from_str(json).unwrap();
        let identity = UserIdentity::from(response);
        assert_eq!(identity.full_name, None);
    }

    #[test]
    fn test_auth_error_body_message_priority() {
        let body: AuthErrorBody =
            serde_json::from_str(r#"{"error_description": "Invalid login credentials"}"#).unwrap();
        assert_eq!(
            body.into_message(),
            Some("Invalid login credentials".to_string())
        );

        let body: AuthErrorBody = serde_json::from_str(r#"{"msg": "User already registered"}"#).unwrap();
        assert_eq!(body.into_message(), Some("User already registered".to_string()));

        let body: AuthErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }

    #[test]
    fn test_auth_error_mapping() {
        // AuthErrorはAppErrorへ境界で写像される
        let error: AppError = AuthError::Validation("パスワードが短すぎます".to_string()).into();
        assert!(matches!(error, AppError::Validation(_)));

        let error: AppError = AuthError::Service("Invalid login credentials".to_string()).into();
        match error {
            AppError::Remote(message) => assert_eq!(message, "Invalid login credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
