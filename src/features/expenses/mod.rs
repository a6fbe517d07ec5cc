// 経費モジュールの宣言
pub mod models;
pub mod repository;
