use crate::features::auth::models::{Session, UserIdentity};
use std::sync::Arc;

/// リポジトリへ渡すセッション情報の提供者
///
/// プロセス全体のグローバル状態として認証情報を持たず、リポジトリの
/// 構築時に明示的に渡すための境界。未認証時の挙動はヌルセッションで
/// そのままテストできる。
pub trait SessionProvider {
    /// 現在の認証済みユーザー（未認証の場合はNone）
    fn current_identity(&self) -> Option<UserIdentity>;

    /// 現在のアクセストークン（未認証の場合はNone）
    fn access_token(&self) -> Option<String>;
}

/// 固定のセッションを提供する実装（テスト・バッチ処理用）
pub struct StaticSession {
    session: Option<Session>,
}

impl StaticSession {
    /// 指定されたセッションを提供するプロバイダーを作成する
    pub fn new(session: Option<Session>) -> Self {
        Self { session }
    }

    /// 未認証状態のプロバイダーを作成する
    pub fn none() -> Self {
        Self { session: None }
    }

    /// 指定されたユーザーの認証済みプロバイダーを作成する
    ///
    /// # 引数
    /// * `user_id` - ユーザーID
    /// * `email` - メールアドレス
    /// * `access_token` - アクセストークン
    pub fn for_user(user_id: &str, email: &str, access_token: &str) -> Self {
        Self {
            session: Some(Session {
                access_token: access_token.to_string(),
                token_type: "bearer".to_string(),
                expires_in: None,
                user: UserIdentity {
                    id: user_id.to_string(),
                    email: email.to_string(),
                    full_name: None,
                },
            }),
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_identity(&self) -> Option<UserIdentity> {
        self.session.as_ref().map(|session| session.user.clone())
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}

/// Arc越しの委譲（サービスをリポジトリ間で共有するため）
impl<T: SessionProvider + ?Sized> SessionProvider for Arc<T> {
    fn current_identity(&self) -> Option<UserIdentity> {
        (**self).current_identity()
    }

    fn access_token(&self) -> Option<String> {
        (**self).access_token()
    }
}
