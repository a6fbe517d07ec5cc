// プロフィールモジュールの宣言
pub mod models;
pub mod repository;
