/// プロフィールリポジトリ
///
/// 自分のプロフィール行の取得を提供する。行はサインアップ時に
/// 認証サービス側で作成されるため、このリポジトリは読み取り専用。
use crate::features::auth::session::SessionProvider;
use crate::features::profiles::models::Profile;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::store::{Filter, StoreClient};
use log::debug;

/// プロフィールのリレーション名
const RELATION: &str = "profiles";

/// プロフィールリポジトリ
pub struct ProfileRepository<S: StoreClient, P: SessionProvider> {
    store: S,
    session: P,
}

impl<S: StoreClient, P: SessionProvider> ProfileRepository<S, P> {
    /// 新しいProfileRepositoryを作成する
    pub fn new(store: S, session: P) -> Self {
        Self { store, session }
    }

    /// 現在のユーザーのプロフィールを取得する
    ///
    /// # 戻り値
    /// プロフィール。行が存在しない場合はエラー
    pub async fn own_profile(&self) -> AppResult<Profile> {
        let identity = self
            .session
            .current_identity()
            .ok_or(AppError::NotAuthenticated)?;
        let token = self.session.access_token();

        debug!("プロフィールを取得します: user_id={}", identity.id);

        let rows = self
            .store
            .select(
                RELATION,
                Some(&Filter::eq("id", identity.id.as_str())),
                None,
                None,
                token.as_deref(),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::remote("プロフィールが見つかりません"))?;

        Ok(serde_json::from_value(row)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::session::StaticSession;
    use crate::shared::store::memory::MemoryStoreClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_own_profile_returns_only_own_row() {
        let store = MemoryStoreClient::new();
        store.register_token("token-1", "user-1");
        store.seed_row(
            "profiles",
            json!({
                "id": "user-1",
                "email": "taro@example.com",
                "full_name": "テスト太郎",
                "created_at": "2024-01-01T00:00:00.000000Z",
            }),
        );
        store.seed_row(
            "profiles",
            json!({
                "id": "user-2",
                "email": "jiro@example.com",
                "full_name": null,
                "created_at": "2024-01-02T00:00:00.000000Z",
            }),
        );

        let repository = ProfileRepository::new(
            store,
            StaticSession::for_user("user-1", "taro@example.com", "token-1"),
        );

        let profile = repository.own_profile().await.unwrap();
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.full_name, Some("テスト太郎".to_string()));
    }

    #[tokio::test]
    async fn test_own_profile_requires_authentication() {
        let store = MemoryStoreClient::new();
        let repository = ProfileRepository::new(store.clone(), StaticSession::none());

        let result = repository.own_profile().await;
        assert!(matches!(result, Err(AppError::NotAuthenticated)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_own_profile_missing_row() {
        let store = MemoryStoreClient::new();
        store.register_token("token-1", "user-1");
        let repository = ProfileRepository::new(
            store,
            StaticSession::for_user("user-1", "taro@example.com", "token-1"),
        );

        let result = repository.own_profile().await;
        assert!(matches!(result, Err(AppError::Remote(_))));
    }
}
