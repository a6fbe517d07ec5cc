// 認証モジュールの宣言
pub mod models;
pub mod service;
pub mod session;
