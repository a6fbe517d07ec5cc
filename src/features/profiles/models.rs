use serde::{Deserialize, Serialize};

/// ユーザープロフィール
///
/// サインアップ時に認証サービス側のトリガーが作成する行。`id`は
/// 認証ユーザーのIDと同一で、行の所有者スコープもこのカラムで効く。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// ユーザーID（認証ユーザーのIDと同一）
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// 表示名
    #[serde(default)]
    pub full_name: Option<String>,
    /// 作成日時（RFC 3339、ストアが割り当てる）
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserialization_without_full_name() {
        let json = r#"{"id": "user-1", "email": "taro@example.com", "created_at": "2024-01-01T00:00:00.000000Z"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.full_name, None);
    }
}
