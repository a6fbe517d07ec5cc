//! 個人向け経費トラッカーのクライアントライブラリ
//!
//! ホスト型のリモートストアに対する認証付きの経費CRUDと、カテゴリ別
//! 集計を提供する。行の所有者スコープ（自分の行しか見えない・触れない）
//! はストア側で強制され、このライブラリはその保証を前提として利用する。
//!
//! # 構成
//! * `features::auth` - サインアップ・サインイン・セッション管理
//! * `features::expenses` - 経費のCRUDとカテゴリ別集計
//! * `features::profiles` - ユーザープロフィールの取得
//! * `features::categories` - 入力フォーム向けのカテゴリ候補
//! * `shared::store` - リモートストアクライアント（HTTP実装とテスト用のインメモリ実装）
//! * `shared::config` - 環境変数ベースの設定
//! * `shared::errors` - 統一エラー型

// モジュールの宣言
pub mod features;
pub mod shared;

// 主要な型の再エクスポート
pub use features::auth::models::{AuthError, Session, UserIdentity};
pub use features::auth::service::AuthService;
pub use features::auth::session::{SessionProvider, StaticSession};
pub use features::categories::models::SUGGESTED_CATEGORIES;
pub use features::expenses::models::{
    CategorySummaryEntry, CreateExpenseDto, Expense, UpdateExpenseDto,
};
pub use features::expenses::repository::ExpenseRepository;
pub use features::profiles::models::Profile;
pub use features::profiles::repository::ProfileRepository;
pub use shared::config::environment::{
    initialize_logging_system, load_environment_variables, ApiConfig,
};
pub use shared::errors::{AppError, AppResult};
pub use shared::store::http::HttpStoreClient;
pub use shared::store::memory::MemoryStoreClient;
pub use shared::store::{Filter, Order, Page, StoreClient};
