// カテゴリモジュールの宣言
pub mod models;
