// 機能モジュールの宣言
pub mod auth;
pub mod categories;
pub mod expenses;
pub mod profiles;
