// 設定モジュールの宣言
pub mod environment;
