// 共有モジュールの宣言
pub mod config;
pub mod errors;
pub mod store;
