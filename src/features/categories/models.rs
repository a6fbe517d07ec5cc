//! カテゴリの定義
//!
//! カテゴリは経費行の自由な文字列として保存されるため、ここでの一覧は
//! 入力フォームに提示する候補にすぎない。候補にないカテゴリも有効。

/// 入力フォームに提示するカテゴリ候補
pub const SUGGESTED_CATEGORIES: [&str; 10] = [
    "Food & Dining",
    "Transportation",
    "Entertainment",
    "Shopping",
    "Bills & Utilities",
    "Healthcare",
    "Education",
    "Travel",
    "Personal Care",
    "Other",
];

/// カテゴリが候補一覧に含まれるかどうかを判定する
pub fn is_suggested(category: &str) -> bool {
    SUGGESTED_CATEGORIES.contains(&category)
}
