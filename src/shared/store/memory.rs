/// インメモリストアクライアント
///
/// ホスト型ストアの振る舞い（ID・タイムスタンプの割り当て、行の所有者
/// スコープ）をローカルで再現する`StoreClient`実装。ネットワークなしで
/// リポジトリの契約をテストするために使用する。
use crate::shared::errors::{AppError, AppResult};
use crate::shared::store::{Filter, Order, Page, StoreClient};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// ストアが割り当てるカラム（クライアントからの変更は無視される）
const PROTECTED_COLUMNS: [&str; 4] = ["id", "user_id", "created_at", "updated_at"];

#[derive(Default)]
struct Inner {
    /// リレーション名 -> 行のリスト（挿入順）
    relations: HashMap<String, Vec<Value>>,
    /// アクセストークン -> ユーザーID
    tokens: HashMap<String, String>,
    /// ストア呼び出し回数（select/insert/update/delete）
    calls: u64,
}

/// インメモリストアクライアント
#[derive(Clone, Default)]
pub struct MemoryStoreClient {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStoreClient {
    /// 空のストアを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// アクセストークンとユーザーIDの対応を登録する
    ///
    /// # 引数
    /// * `token` - アクセストークン
    /// * `user_id` - トークンに対応するユーザーID
    pub fn register_token(&self, token: &str, user_id: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.tokens.insert(token.to_string(), user_id.to_string());
        }
    }

    /// ストア割り当て処理を介さずに行を直接投入する（テストデータ用）
    ///
    /// 認証サービス側のトリガーが作成する`profiles`行の再現などに使用する
    pub fn seed_row(&self, relation: &str, row: Value) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .relations
                .entry(relation.to_string())
                .or_default()
                .push(row);
        }
    }

    /// これまでのストア呼び出し回数を取得する
    pub fn call_count(&self) -> u64 {
        self.inner.lock().map(|inner| inner.calls).unwrap_or(0)
    }
}

/// トークンから所有者のユーザーIDを解決する
fn owner_for(inner: &Inner, token: Option<&str>) -> AppResult<String> {
    token
        .and_then(|token| inner.tokens.get(token))
        .cloned()
        .ok_or_else(|| AppError::remote("認証されていません。有効なトークンが必要です"))
}

/// 行が所有者から見えるかどうかを判定する
///
/// `user_id`カラムを持つ行はその値で、持たない行（profilesなど）は
/// `id`カラムでスコープされる。ホスト型ストアの行レベルポリシーの再現。
fn row_visible(row: &Value, owner: &str) -> bool {
    match row.get("user_id").and_then(Value::as_str) {
        Some(user_id) => user_id == owner,
        None => row.get("id").and_then(Value::as_str) == Some(owner),
    }
}

/// 行がフィルタに一致するかどうかを判定する
fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => s == &filter.value,
        Some(other) => other.to_string() == filter.value,
        None => false,
    }
}

/// 並び替え用にカラム値を文字列として取り出す
fn column_text(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// ストア割り当てのタイムスタンプを生成する
///
/// 固定精度のRFC 3339表記なので、文字列比較がそのまま時刻比較になる
fn store_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl StoreClient for MemoryStoreClient {
    async fn select(
        &self,
        relation: &str,
        filter: Option<&Filter>,
        order: Option<&Order>,
        page: Option<&Page>,
        token: Option<&str>,
    ) -> AppResult<Vec<Value>> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AppError::remote("ストアのロック取得に失敗しました"))?;
        inner.calls += 1;

        let owner = owner_for(&inner, token)?;
        let mut rows: Vec<(usize, Value)> = inner
            .relations
            .get(relation)
            .map(|rows| rows.iter().cloned().enumerate().collect())
            .unwrap_or_default();

        rows.retain(|(_, row)| row_visible(row, &owner));
        if let Some(filter) = filter {
            rows.retain(|(_, row)| matches_filter(row, filter));
        }

        if let Some(order) = order {
            rows.sort_by(|(index_a, a), (index_b, b)| {
                let value_a = column_text(a, &order.column);
                let value_b = column_text(b, &order.column);
                // 同値の場合は挿入順で決定的に並べる（降順なら新しい行が先）
                if order.ascending {
                    value_a.cmp(&value_b).then_with(|| index_a.cmp(index_b))
                } else {
                    value_b.cmp(&value_a).then_with(|| index_b.cmp(index_a))
                }
            });
        }

        let rows = rows.into_iter().map(|(_, row)| row);
        let rows = match page {
            Some(page) => rows.skip(page.offset).take(page.limit).collect(),
            None => rows.collect(),
        };

        Ok(rows)
    }

    async fn insert(&self, relation: &str, row: Value, token: Option<&str>) -> AppResult<Value> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AppError::remote("ストアのロック取得に失敗しました"))?;
        inner.calls += 1;

        let owner = owner_for(&inner, token)?;
        let mut object: Map<String, Value> = match row {
            Value::Object(object) => object,
            _ => return Err(AppError::remote("行データはオブジェクトである必要があります")),
        };

        // ストア割り当てカラム: ID・所有者・タイムスタンプ
        let now = store_timestamp();
        object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        object.insert("user_id".to_string(), Value::String(owner));
        object.insert("created_at".to_string(), Value::String(now.clone()));
        object.insert("updated_at".to_string(), Value::String(now));

        let stored = Value::Object(object);
        inner
            .relations
            .entry(relation.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn update(
        &self,
        relation: &str,
        changes: Value,
        filter: &Filter,
        token: Option<&str>,
    ) -> AppResult<Value> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AppError::remote("ストアのロック取得に失敗しました"))?;
        inner.calls += 1;

        let owner = owner_for(&inner, token)?;
        let changes = match changes {
            Value::Object(object) => object,
            _ => return Err(AppError::remote("更新データはオブジェクトである必要があります")),
        };

        let rows = inner.relations.entry(relation.to_string()).or_default();
        // 一致行なしと所有権なしは区別されない
        let target = rows
            .iter_mut()
            .find(|row| row_visible(row, &owner) && matches_filter(row, filter))
            .ok_or_else(|| AppError::remote(format!("対象の行が見つかりません: {relation}")))?;

        if let Value::Object(object) = target {
            for (key, value) in changes {
                if PROTECTED_COLUMNS.contains(&key.as_str()) {
                    continue;
                }
                object.insert(key, value);
            }
            object.insert("updated_at".to_string(), Value::String(store_timestamp()));
        }

        Ok(target.clone())
    }

    async fn delete(&self, relation: &str, filter: &Filter, token: Option<&str>) -> AppResult<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AppError::remote("ストアのロック取得に失敗しました"))?;
        inner.calls += 1;

        let owner = owner_for(&inner, token)?;
        let rows = inner.relations.entry(relation.to_string()).or_default();
        let position = rows
            .iter()
            .position(|row| row_visible(row, &owner) && matches_filter(row, filter))
            .ok_or_else(|| AppError::remote(format!("対象の行が見つかりません: {relation}")))?;

        rows.remove(position);
        Ok(())
    }
}
