use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// 認証されていない状態で所有者情報が必要な操作を行った場合のエラー
    ///
    /// リモート呼び出しの前にローカルで発生する
    #[error("認証が必要です")]
    NotAuthenticated,

    /// リモートストア／認証サービスから返されたエラー
    ///
    /// ストア側のメッセージをそのまま保持する（分類・翻訳は行わない）
    #[error("リモートストアエラー: {0}")]
    Remote(String),

    /// 入力値のバリデーションエラー（リモート呼び出しは発生しない）
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// ユーザーに表示するためのメッセージを取得
    ///
    /// # 戻り値
    /// そのまま画面表示可能なエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "ログインしてから操作してください".to_string(),
            AppError::Remote(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Configuration(_) => "設定エラーが発生しました".to_string(),
            AppError::Json(_) => "データ形式の解析でエラーが発生しました".to_string(),
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// リモートエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - ストアから返されたエラーメッセージ
    pub fn remote<S: Into<String>>(message: S) -> Self {
        AppError::Remote(message.into())
    }

    /// バリデーションエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - バリデーションエラーメッセージ
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - 設定エラーメッセージ
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }
}

/// AppErrorからStringへの変換（UI層での表示のため）
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.user_message()
    }
}

/// reqwest::ErrorからAppErrorへの変換
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Remote(error.to_string())
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;
