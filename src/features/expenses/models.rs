use serde::{Deserialize, Serialize};

/// 経費データモデル
///
/// `id`・`user_id`は作成後に変更されない。`created_at`は挿入時に、
/// `updated_at`は変更のたびにストアが割り当てる。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Expense {
    /// 経費ID（ストアが作成時に割り当てる）
    pub id: String,
    /// 所有者のユーザーID（作成時のセッションから設定される）
    pub user_id: String,
    /// カテゴリ
    pub category: String,
    /// 金額（0以上）
    pub amount: f64,
    /// メモ（省略時は空文字列）
    pub comments: String,
    /// 作成日時（RFC 3339）
    pub created_at: String,
    /// 更新日時（RFC 3339）
    pub updated_at: String,
}

/// 経費作成用DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseDto {
    /// カテゴリ（空文字列は不可）
    pub category: String,
    /// 金額（0以上）
    pub amount: f64,
    /// メモ（省略時は空文字列になる）
    #[serde(default)]
    pub comments: Option<String>,
}

/// 経費更新用DTO
///
/// 指定されたフィールドのみが更新される。Noneのフィールドは
/// シリアライズされず、ストア側でも従来の値が保持される
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpenseDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// カテゴリ別集計の1エントリ（導出値であり永続化されない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummaryEntry {
    /// カテゴリ
    pub category: String,
    /// そのカテゴリの金額合計
    pub total: f64,
}
