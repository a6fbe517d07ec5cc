/// 認証サービス
///
/// APIサーバーの`/auth/v1`エンドポイント群に対してサインアップ・
/// サインイン・サインアウト・セッション復元を行う。現在のセッションは
/// このサービスのインスタンスが保持し、グローバル状態は使用しない。
/// セッションの変化は`subscribe()`で購読できる。
use crate::features::auth::models::{
    AuthError, AuthErrorBody, Session, TokenResponse, UserIdentity, UserResponse,
};
use crate::features::auth::session::SessionProvider;
use crate::shared::config::environment::ApiConfig;
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// パスワードの最小文字数
const MIN_PASSWORD_LENGTH: usize = 6;

/// 認証サービス
pub struct AuthService {
    /// APIサーバーのベースURL（末尾スラッシュなしに正規化済み）
    base_url: String,
    /// APIキー
    api_key: String,
    /// HTTPクライアント
    http_client: Client,
    /// 現在のセッション
    session: Arc<RwLock<Option<Session>>>,
    /// セッション変化の通知チャネル
    notifier: watch::Sender<Option<UserIdentity>>,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `config` - API設定
    ///
    /// # 戻り値
    /// AuthServiceインスタンス、または設定が不正な場合はエラー
    pub fn new(config: &ApiConfig) -> Result<Self, AuthError> {
        config.validate().map_err(AuthError::Config)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AuthError::Config(format!("HTTPクライアント作成エラー: {e}")))?;

        let (notifier, _) = watch::channel(None);

        info!(
            "AuthServiceを初期化しました: base_url={}",
            config.base_url
        );

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
            session: Arc::new(RwLock::new(None)),
            notifier,
        })
    }

    /// 環境変数の設定からAuthServiceを作成する
    pub fn from_env() -> Result<Self, AuthError> {
        let config = ApiConfig::from_env().map_err(|e| AuthError::Config(e.to_string()))?;
        Self::new(&config)
    }

    /// 新規ユーザーを登録してセッションを確立する
    ///
    /// # 引数
    /// * `email` - メールアドレス
    /// * `password` - パスワード（6文字以上）
    /// * `full_name` - 表示名（サインアップメタデータとして登録される）
    ///
    /// # 戻り値
    /// 確立されたセッション、または失敗時はエラー
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Session, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(
                "パスワードは6文字以上で入力してください".to_string(),
            ));
        }

        let url = format!("{}/auth/v1/signup", self.base_url);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });

        debug!("サインアップリクエスト送信: email={email}");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("サインアップリクエストエラー: {e}")))?;

        let token_response = parse_token_response(response, "サインアップ").await?;
        let session = Session::from(token_response);
        self.install_session(session.clone());

        Ok(session)
    }

    /// メールアドレスとパスワードでサインインする
    ///
    /// # 戻り値
    /// 確立されたセッション、または失敗時はエラー
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });

        debug!("サインインリクエスト送信: email={email}");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("サインインリクエストエラー: {e}")))?;

        let token_response = parse_token_response(response, "サインイン").await?;
        let session = Session::from(token_response);
        self.install_session(session.clone());

        Ok(session)
    }

    /// サインアウトする
    ///
    /// リモートのログアウト呼び出しはベストエフォートであり、失敗しても
    /// ローカルセッションは必ず破棄される
    pub async fn sign_out(&self) {
        let token = self.read_session().map(|session| session.access_token);

        if let Some(token) = token {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let result = self
                .http_client
                .post(&url)
                .header("apikey", &self.api_key)
                .bearer_auth(&token)
                .send()
                .await;

            if let Err(e) = result {
                warn!("ログアウトリクエストに失敗しましたが、ローカルセッションは破棄します: {e}");
            }
        }

        self.clear_session();
        info!("サインアウト処理が完了しました");
    }

    /// 保存済みトークンからセッションを復元する
    ///
    /// # 引数
    /// * `access_token` - 以前のセッションのアクセストークン
    ///
    /// # 戻り値
    /// 復元されたセッション、またはトークンが無効な場合はエラー
    pub async fn restore_session(&self, access_token: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        debug!("セッション復元のためトークン検証リクエストを送信");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("トークン検証リクエストエラー: {e}")))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidToken);
        }

        if !response.status().is_success() {
            return Err(service_error(response, "トークン検証").await);
        }

        let user_response: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Service(format!("トークン検証レスポンスのパースエラー: {e}")))?;

        let session = Session {
            access_token: access_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            user: UserIdentity::from(user_response),
        };
        self.install_session(session.clone());

        Ok(session)
    }

    /// 現在の認証済みユーザーを取得する（未認証の場合はNone）
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.read_session().map(|session| session.user)
    }

    /// 現在のセッションを取得する（未認証の場合はNone）
    pub fn current_session(&self) -> Option<Session> {
        self.read_session()
    }

    /// セッション変化の通知ストリームを購読する
    ///
    /// UI層が起動時に購読し、認証済みビューの表示可否を判断する
    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.notifier.subscribe()
    }

    /// セッションを確立し、購読者へ通知する
    fn install_session(&self, session: Session) {
        let identity = session.user.clone();
        if let Ok(mut guard) = self.session.write() {
            *guard = Some(session);
        }
        let _ = self.notifier.send(Some(identity.clone()));
        info!("セッションを確立しました: user_id={}", identity.id);
    }

    /// セッションを破棄し、購読者へ通知する
    fn clear_session(&self) {
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
        let _ = self.notifier.send(None);
    }

    fn read_session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }
}

impl SessionProvider for AuthService {
    fn current_identity(&self) -> Option<UserIdentity> {
        self.current_user()
    }

    fn access_token(&self) -> Option<String> {
        self.read_session().map(|session| session.access_token)
    }
}

/// トークンレスポンスを解析する（失敗時はサービスのメッセージを保持）
async fn parse_token_response(
    response: Response,
    context: &str,
) -> Result<TokenResponse, AuthError> {
    if !response.status().is_success() {
        return Err(service_error(response, context).await);
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Service(format!("{context}レスポンスのパースエラー: {e}")))
}

/// エラーレスポンスからAuthErrorを作成する
async fn service_error(response: Response, context: &str) -> AuthError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(AuthErrorBody::into_message)
        .unwrap_or_else(|| format!("{context}が失敗しました (HTTP {})", status.as_u16()));

    AuthError::Service(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        // 到達不能なローカルアドレス。ネットワークに出る前のパスのみを検証する
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-anon-key".to_string(),
            timeout_seconds: 1,
        };
        AuthService::new(&config).unwrap()
    }

    #[test]
    fn test_initial_state_is_unauthenticated() {
        let service = test_service();
        assert!(service.current_user().is_none());
        assert!(service.current_session().is_none());
        assert!(service.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        // パスワードが短い場合はリモート呼び出しの前に拒否される
        let service = test_service();
        let result = service.sign_up("taro@example.com", "12345", "テスト太郎").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        assert!(service.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_clears_state() {
        // セッションがない状態のサインアウトは何も送信せずに完了する
        let service = test_service();
        let receiver = service.subscribe();

        service.sign_out().await;

        assert!(service.current_user().is_none());
        assert!(receiver.borrow().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_notifies_subscribers() {
        // セッション確立と破棄はどちらも購読者へ通知される
        let service = test_service();
        let receiver = service.subscribe();

        let session = Session {
            access_token: "token-1".to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            user: UserIdentity {
                id: "user-1".to_string(),
                email: "taro@example.com".to_string(),
                full_name: None,
            },
        };
        service.install_session(session);
        assert_eq!(
            receiver.borrow().as_ref().map(|user| user.id.clone()),
            Some("user-1".to_string())
        );

        service.sign_out().await;
        assert!(receiver.borrow().is_none());
        assert!(service.current_user().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            api_key: "key".to_string(),
            timeout_seconds: 30,
        };
        assert!(matches!(AuthService::new(&config), Err(AuthError::Config(_))));
    }
}
