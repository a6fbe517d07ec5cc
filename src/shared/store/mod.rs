/// リモートストアクライアントの境界
///
/// ホスト型のリレーショナルストアに対する認証付きCRUD操作を抽象化する。
/// 行の所有者スコープ（自分の行しか見えない・触れない）はストア側で
/// 強制されるため、このモジュールはその保証を前提として利用するだけで、
/// 再実装はしない。
// サブモジュールの宣言
pub mod http;
pub mod memory;

use crate::shared::errors::AppResult;
use serde_json::Value;

/// 行の等値フィルタ（このシステムが必要とする唯一のフィルタ種別）
#[derive(Debug, Clone)]
pub struct Filter {
    /// カラム名
    pub column: String,
    /// 一致させる値
    pub value: String,
}

impl Filter {
    /// 等値フィルタを作成する
    ///
    /// # 引数
    /// * `column` - カラム名
    /// * `value` - 一致させる値
    pub fn eq<C: Into<String>, V: Into<String>>(column: C, value: V) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// 行の並び順
#[derive(Debug, Clone)]
pub struct Order {
    /// カラム名
    pub column: String,
    /// 昇順の場合はtrue
    pub ascending: bool,
}

impl Order {
    /// 降順の並び順を作成する
    pub fn desc<C: Into<String>>(column: C) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// 昇順の並び順を作成する
    pub fn asc<C: Into<String>>(column: C) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }
}

/// 取得範囲の制限（ページネーション用）
#[derive(Debug, Clone)]
pub struct Page {
    /// 最大取得件数
    pub limit: usize,
    /// 先頭からのオフセット
    pub offset: usize,
}

impl Page {
    /// 取得範囲を作成する
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// リモートストアに対するCRUD操作のインターフェース
///
/// すべての操作は認証付きで行われ、ストア側が呼び出し元の所有する行のみを
/// 対象とすることを保証する。失敗時はストアのメッセージを保持した
/// `AppError::Remote` を返す。リトライは行わない。
#[allow(async_fn_in_trait)]
pub trait StoreClient {
    /// 行を取得する
    ///
    /// # 引数
    /// * `relation` - リレーション名
    /// * `filter` - 等値フィルタ（オプション）
    /// * `order` - 並び順（オプション）
    /// * `page` - 取得範囲（オプション）
    /// * `token` - アクセストークン
    async fn select(
        &self,
        relation: &str,
        filter: Option<&Filter>,
        order: Option<&Order>,
        page: Option<&Page>,
        token: Option<&str>,
    ) -> AppResult<Vec<Value>>;

    /// 行を挿入する
    ///
    /// # 戻り値
    /// ストアがID・タイムスタンプを割り当てた後の行
    async fn insert(&self, relation: &str, row: Value, token: Option<&str>) -> AppResult<Value>;

    /// フィルタに一致する行を部分更新する
    ///
    /// # 戻り値
    /// 更新後の行。一致する行がない（または所有していない）場合はエラー
    async fn update(
        &self,
        relation: &str,
        changes: Value,
        filter: &Filter,
        token: Option<&str>,
    ) -> AppResult<Value>;

    /// フィルタに一致する行を削除する
    ///
    /// 一致する行がない（または所有していない）場合はエラー
    async fn delete(&self, relation: &str, filter: &Filter, token: Option<&str>) -> AppResult<()>;
}
