/// 経費リポジトリ
///
/// 経費のCRUD操作とカテゴリ別集計を提供する。すべてのリモート操作は
/// 構築時に渡されたセッションのトークンで認証され、ストア側が所有者の
/// 行のみを対象とすることを保証する。未認証の場合はリモート呼び出しの
/// 前に`AppError::NotAuthenticated`を返す。
use crate::features::auth::session::SessionProvider;
use crate::features::expenses::models::{
    CategorySummaryEntry, CreateExpenseDto, Expense, UpdateExpenseDto,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::store::{Filter, Order, Page, StoreClient};
use log::{debug, info};
use serde_json::json;
use std::cmp::Ordering;

/// 経費のリレーション名
const RELATION: &str = "expenses";

/// 経費リポジトリ
pub struct ExpenseRepository<S: StoreClient, P: SessionProvider> {
    store: S,
    session: P,
}

impl<S: StoreClient, P: SessionProvider> ExpenseRepository<S, P> {
    /// 新しいExpenseRepositoryを作成する
    ///
    /// # 引数
    /// * `store` - ストアクライアント
    /// * `session` - セッション提供者
    pub fn new(store: S, session: P) -> Self {
        Self { store, session }
    }

    /// 現在のユーザーの経費を作成日時の降順ですべて取得する
    ///
    /// # 戻り値
    /// 経費のリスト（最新が先頭）、または失敗時はエラー
    pub async fn list_all(&self) -> AppResult<Vec<Expense>> {
        let token = self.session.access_token();
        debug!("経費一覧を取得します");

        let rows = self
            .store
            .select(
                RELATION,
                None,
                Some(&Order::desc("created_at")),
                None,
                token.as_deref(),
            )
            .await?;

        decode_expenses(rows)
    }

    /// 現在のユーザーの経費を作成日時の降順でページ取得する
    ///
    /// # 引数
    /// * `limit` - 最大取得件数
    /// * `offset` - 先頭からのオフセット
    pub async fn list_page(&self, limit: usize, offset: usize) -> AppResult<Vec<Expense>> {
        let token = self.session.access_token();
        debug!("経費一覧をページ取得します: limit={limit}, offset={offset}");

        let rows = self
            .store
            .select(
                RELATION,
                None,
                Some(&Order::desc("created_at")),
                Some(&Page::new(limit, offset)),
                token.as_deref(),
            )
            .await?;

        decode_expenses(rows)
    }

    /// 経費を作成する
    ///
    /// バリデーションと認証チェックはリモート呼び出しの前に行われる。
    /// メモが省略された場合は空文字列として保存される。
    ///
    /// # 引数
    /// * `dto` - 作成する経費の内容
    ///
    /// # 戻り値
    /// ストアがID・タイムスタンプを割り当てた後の経費
    pub async fn create(&self, dto: CreateExpenseDto) -> AppResult<Expense> {
        validate_category(&dto.category)?;
        validate_amount(dto.amount)?;

        let identity = self
            .session
            .current_identity()
            .ok_or(AppError::NotAuthenticated)?;
        let token = self.session.access_token();

        let row = json!({
            "user_id": identity.id,
            "category": dto.category,
            "amount": dto.amount,
            "comments": dto.comments.unwrap_or_default(),
        });

        let stored = self.store.insert(RELATION, row, token.as_deref()).await?;
        let expense: Expense = serde_json::from_value(stored)?;

        info!("経費を作成しました: id={}", expense.id);
        Ok(expense)
    }

    /// 経費を部分更新する
    ///
    /// 指定されたフィールドのみが検証・更新される。対象の行が存在しない
    /// 場合と所有していない場合は区別されず、同じエラーになる。
    ///
    /// # 引数
    /// * `id` - 更新する経費のID
    /// * `dto` - 更新内容（Noneのフィールドは変更されない）
    ///
    /// # 戻り値
    /// 更新後の経費
    pub async fn update(&self, id: &str, dto: UpdateExpenseDto) -> AppResult<Expense> {
        if let Some(category) = &dto.category {
            validate_category(category)?;
        }
        if let Some(amount) = dto.amount {
            validate_amount(amount)?;
        }

        if self.session.current_identity().is_none() {
            return Err(AppError::NotAuthenticated);
        }
        let token = self.session.access_token();

        let changes = serde_json::to_value(&dto)?;
        let stored = self
            .store
            .update(RELATION, changes, &Filter::eq("id", id), token.as_deref())
            .await?;
        let expense: Expense = serde_json::from_value(stored)?;

        info!("経費を更新しました: id={}", expense.id);
        Ok(expense)
    }

    /// 経費を削除する
    ///
    /// 対象の行が存在しない場合と所有していない場合は区別されず、
    /// 同じエラーになる
    ///
    /// # 引数
    /// * `id` - 削除する経費のID
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.session.current_identity().is_none() {
            return Err(AppError::NotAuthenticated);
        }
        let token = self.session.access_token();

        self.store
            .delete(RELATION, &Filter::eq("id", id), token.as_deref())
            .await?;

        info!("経費を削除しました: id={id}");
        Ok(())
    }

    /// 現在のユーザーの経費をカテゴリ別に集計する
    ///
    /// 全件取得と同じ取得処理の上に構築された導出値であり、取得が
    /// 失敗した場合は同じエラーをそのまま返す。
    ///
    /// # 戻り値
    /// 合計金額の降順の集計リスト。経費がない場合は空リスト
    pub async fn category_summary(&self) -> AppResult<Vec<CategorySummaryEntry>> {
        let expenses = self.list_all().await?;
        Ok(summarize_by_category(&expenses))
    }
}

/// 経費のリストをカテゴリ別に集計する
///
/// 合計金額の降順に並べる。合計が等しいカテゴリ同士は入力での初出順を
/// 保つ（安定ソート）。
pub fn summarize_by_category(expenses: &[Expense]) -> Vec<CategorySummaryEntry> {
    let mut entries: Vec<CategorySummaryEntry> = Vec::new();

    for expense in expenses {
        match entries
            .iter_mut()
            .find(|entry| entry.category == expense.category)
        {
            Some(entry) => entry.total += expense.amount,
            None => entries.push(CategorySummaryEntry {
                category: expense.category.clone(),
                total: expense.amount,
            }),
        }
    }

    entries.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    entries
}

/// カテゴリを検証する（空白のみは不可）
fn validate_category(category: &str) -> AppResult<()> {
    if category.trim().is_empty() {
        return Err(AppError::validation("カテゴリを入力してください"));
    }
    Ok(())
}

/// 金額を検証する（0以上の有限値のみ）
fn validate_amount(amount: f64) -> AppResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::validation("金額は0以上の数値で入力してください"));
    }
    Ok(())
}

/// ストアの行を経費のリストへ変換する
fn decode_expenses(rows: Vec<serde_json::Value>) -> AppResult<Vec<Expense>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::session::StaticSession;
    use crate::shared::store::memory::MemoryStoreClient;
    use quickcheck_macros::quickcheck;
    use std::time::Duration;

    fn repository_for(
        user_id: &str,
        token: &str,
    ) -> (
        ExpenseRepository<MemoryStoreClient, StaticSession>,
        MemoryStoreClient,
    ) {
        let store = MemoryStoreClient::new();
        store.register_token(token, user_id);
        let session = StaticSession::for_user(user_id, "taro@example.com", token);
        (ExpenseRepository::new(store.clone(), session), store)
    }

    fn dto(category: &str, amount: f64) -> CreateExpenseDto {
        CreateExpenseDto {
            category: category.to_string(),
            amount,
            comments: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list_roundtrip() {
        let (repository, _) = repository_for("user-1", "token-1");

        let created = repository
            .create(CreateExpenseDto {
                category: "Food & Dining".to_string(),
                amount: 1200.5,
                comments: Some("ランチ".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(created.user_id, "user-1");
        assert_eq!(created.comments, "ランチ");
        assert_eq!(created.created_at, created.updated_at);

        let listed = repository.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].category, "Food & Dining");
        assert_eq!(listed[0].amount, 1200.5);
    }

    #[tokio::test]
    async fn test_create_defaults_comments_to_empty() {
        // メモを省略した場合は空文字列として保存される
        let (repository, _) = repository_for("user-1", "token-1");

        let created = repository.create(dto("Travel", 50.0)).await.unwrap();
        assert_eq!(created.comments, "");
    }

    #[tokio::test]
    async fn test_list_all_orders_newest_first() {
        let (repository, _) = repository_for("user-1", "token-1");
        for name in ["a", "b", "c"] {
            repository.create(dto(name, 1.0)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let listed = repository.list_all().await.unwrap();
        let categories: Vec<&str> = listed.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_list_page_returns_requested_window() {
        let (repository, _) = repository_for("user-1", "token-1");
        for name in ["a", "b", "c", "d"] {
            repository.create(dto(name, 1.0)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let page = repository.list_page(2, 1).await.unwrap();
        let categories: Vec<&str> = page.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let (repository, _) = repository_for("user-1", "token-1");
        let created = repository
            .create(CreateExpenseDto {
                category: "Food & Dining".to_string(),
                amount: 100.0,
                comments: Some("朝食".to_string()),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let updated = repository
            .update(
                &created.id,
                UpdateExpenseDto {
                    amount: Some(250.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 指定したフィールドだけが変わり、更新日時が進む
        assert_eq!(updated.amount, 250.0);
        assert_eq!(updated.category, "Food & Dining");
        assert_eq!(updated.comments, "朝食");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_then_operations_fail() {
        let (repository, _) = repository_for("user-1", "token-1");
        let created = repository.create(dto("Travel", 10.0)).await.unwrap();

        repository.delete(&created.id).await.unwrap();

        assert!(repository.list_all().await.unwrap().is_empty());

        let result = repository
            .update(&created.id, UpdateExpenseDto::default())
            .await;
        assert!(matches!(result, Err(AppError::Remote(_))));

        let result = repository.delete(&created.id).await;
        assert!(matches!(result, Err(AppError::Remote(_))));
    }

    #[tokio::test]
    async fn test_category_summary_totals_and_order() {
        let (repository, _) = repository_for("user-1", "token-1");
        repository.create(dto("Food & Dining", 10.0)).await.unwrap();
        repository.create(dto("Food & Dining", 5.5)).await.unwrap();
        repository.create(dto("Travel", 20.0)).await.unwrap();

        let summary = repository.category_summary().await.unwrap();
        assert_eq!(
            summary,
            vec![
                CategorySummaryEntry {
                    category: "Travel".to_string(),
                    total: 20.0,
                },
                CategorySummaryEntry {
                    category: "Food & Dining".to_string(),
                    total: 15.5,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_category_summary_empty_when_no_expenses() {
        let (repository, _) = repository_for("user-1", "token-1");
        let summary = repository.category_summary().await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_store_call() {
        // バリデーションエラー時はストアへ一切到達しない
        let (repository, store) = repository_for("user-1", "token-1");

        let result = repository.create(dto("", 100.0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = repository.create(dto("   ", 100.0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = repository.create(dto("Food & Dining", -1.0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = repository.create(dto("Food & Dining", f64::NAN)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = repository
            .update(
                "any-id",
                UpdateExpenseDto {
                    amount: Some(-5.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_rejects_before_store_call() {
        // 未認証の変更操作はストアへ到達する前に拒否される
        let store = MemoryStoreClient::new();
        let repository = ExpenseRepository::new(store.clone(), StaticSession::none());

        let result = repository.create(dto("Food & Dining", 10.0)).await;
        assert!(matches!(result, Err(AppError::NotAuthenticated)));

        let result = repository
            .update("some-id", UpdateExpenseDto::default())
            .await;
        assert!(matches!(result, Err(AppError::NotAuthenticated)));

        let result = repository.delete("some-id").await;
        assert!(matches!(result, Err(AppError::NotAuthenticated)));

        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_user_isolation_between_repositories() {
        // 別ユーザーのリポジトリからは行が見えず、操作も失敗する
        let store = MemoryStoreClient::new();
        store.register_token("token-1", "user-1");
        store.register_token("token-2", "user-2");

        let repository_1 = ExpenseRepository::new(
            store.clone(),
            StaticSession::for_user("user-1", "a@example.com", "token-1"),
        );
        let repository_2 = ExpenseRepository::new(
            store.clone(),
            StaticSession::for_user("user-2", "b@example.com", "token-2"),
        );

        let created = repository_1.create(dto("Food & Dining", 100.0)).await.unwrap();

        assert!(repository_2.list_all().await.unwrap().is_empty());

        let result = repository_2
            .update(
                &created.id,
                UpdateExpenseDto {
                    amount: Some(1.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Remote(_))));

        let result = repository_2.delete(&created.id).await;
        assert!(matches!(result, Err(AppError::Remote(_))));

        // 所有者側からは引き続き見える
        assert_eq!(repository_1.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_error_matches_list_error() {
        // 取得が失敗した場合、集計も同じエラーを返す
        let store = MemoryStoreClient::new();
        let session = StaticSession::for_user("user-1", "a@example.com", "unregistered-token");
        let repository = ExpenseRepository::new(store, session);

        let list_error = repository.list_all().await.unwrap_err();
        let summary_error = repository.category_summary().await.unwrap_err();
        assert_eq!(String::from(list_error), String::from(summary_error));
    }

    #[test]
    fn test_summarize_preserves_first_seen_order_on_ties() {
        // 合計が等しいカテゴリは初出順を保つ
        let expense = |category: &str, amount: f64| Expense {
            id: String::new(),
            user_id: String::new(),
            category: category.to_string(),
            amount,
            comments: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        };

        let expenses = vec![
            expense("b", 10.0),
            expense("a", 10.0),
            expense("c", 10.0),
        ];

        let summary = summarize_by_category(&expenses);
        let categories: Vec<&str> = summary.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, vec!["b", "a", "c"]);
    }

    #[quickcheck]
    fn prop_summary_totals_partition_expenses(amounts: Vec<(u8, u32)>) -> bool {
        // 集計の合計は元の経費の合計と一致する（カテゴリごとの加算順が
        // 同じなので浮動小数点でも厳密に一致する）
        let expenses: Vec<Expense> = amounts
            .iter()
            .map(|(category, cents)| Expense {
                id: String::new(),
                user_id: String::new(),
                category: format!("category-{}", category % 4),
                amount: f64::from(*cents) / 100.0,
                comments: String::new(),
                created_at: String::new(),
                updated_at: String::new(),
            })
            .collect();

        let summary = summarize_by_category(&expenses);

        let mut per_category: Vec<(String, f64)> = Vec::new();
        for expense in &expenses {
            match per_category
                .iter_mut()
                .find(|(category, _)| category == &expense.category)
            {
                Some((_, total)) => *total += expense.amount,
                None => per_category.push((expense.category.clone(), expense.amount)),
            }
        }

        summary.len() == per_category.len()
            && per_category.iter().all(|(category, total)| {
                summary
                    .iter()
                    .any(|entry| &entry.category == category && entry.total == *total)
            })
    }

    #[quickcheck]
    fn prop_summary_sorted_by_total_desc(amounts: Vec<(u8, u32)>) -> bool {
        let expenses: Vec<Expense> = amounts
            .iter()
            .map(|(category, cents)| Expense {
                id: String::new(),
                user_id: String::new(),
                category: format!("category-{}", category % 8),
                amount: f64::from(*cents) / 100.0,
                comments: String::new(),
                created_at: String::new(),
                updated_at: String::new(),
            })
            .collect();

        let summary = summarize_by_category(&expenses);
        summary.windows(2).all(|pair| pair[0].total >= pair[1].total)
    }
}
