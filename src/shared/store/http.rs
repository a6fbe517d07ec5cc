/// HTTPリモートストアクライアント
///
/// APIサーバーの`/rest/v1/{relation}`エンドポイントに対して
/// 認証付きCRUDリクエストを送信する`StoreClient`実装。
/// 各操作は単一のリクエスト/レスポンス往復であり、リトライは行わない。
/// 失敗はストアのメッセージを保持したまま呼び出し元へ伝播する。
use crate::shared::config::environment::ApiConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::store::{Filter, Order, Page, StoreClient};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// ストアからの構造化エラーレスポンス
#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// HTTPリモートストアクライアント
pub struct HttpStoreClient {
    client: Client,
    /// ベースURL（末尾スラッシュなしに正規化済み）
    base_url: String,
    api_key: String,
}

impl HttpStoreClient {
    /// 設定を指定してストアクライアントを作成する
    ///
    /// # 引数
    /// * `config` - API設定
    ///
    /// # 戻り値
    /// ストアクライアント、または設定が不正な場合はエラー
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::configuration)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// 環境変数の設定からストアクライアントを作成する
    pub fn from_env() -> AppResult<Self> {
        let config = ApiConfig::from_env()?;
        Self::new(&config)
    }

    /// リレーションのエンドポイントURLを構築する
    ///
    /// # 引数
    /// * `relation` - リレーション名
    /// * `select_all` - `select=*`を付与するか（取得系のみ）
    /// * `filter` - 等値フィルタ（`{column}=eq.{value}`形式）
    /// * `order` - 並び順（`order={column}.{asc|desc}`形式）
    /// * `page` - 取得範囲（`limit`/`offset`形式）
    fn rest_url(
        &self,
        relation: &str,
        select_all: bool,
        filter: Option<&Filter>,
        order: Option<&Order>,
        page: Option<&Page>,
    ) -> AppResult<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{relation}", self.base_url))
            .map_err(|e| AppError::configuration(format!("エンドポイントURLが不正です: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            if select_all {
                pairs.append_pair("select", "*");
            }
            if let Some(filter) = filter {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{direction}", order.column));
            }
            if let Some(page) = page {
                pairs.append_pair("limit", &page.limit.to_string());
                pairs.append_pair("offset", &page.offset.to_string());
            }
        }

        Ok(url)
    }

    /// 認証ヘッダーを付与する
    fn with_auth(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let request = request.header("apikey", &self.api_key);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// リクエストを送信し、行の配列としてレスポンスを解析する
    async fn send_rows(&self, request: RequestBuilder, context: &str) -> AppResult<Vec<Value>> {
        let response = request.send().await.map_err(|e| {
            AppError::remote(format!("リモートストアへの接続に失敗しました: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AppError::remote(format!("レスポンス解析エラー: {e}")))?;

        debug!("{context}: rows={}", rows.len());
        Ok(rows)
    }
}

/// エラーレスポンスからAppErrorを作成する
///
/// ストアが構造化エラーボディを返した場合はそのメッセージをそのまま保持し、
/// それ以外はHTTPステータスに応じた汎用メッセージを使用する。
async fn error_from_response(response: Response) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());
    error_from_status_and_body(status, &body)
}

fn error_from_status_and_body(status: StatusCode, body: &str) -> AppError {
    // 構造化エラーレスポンスの解析を試行
    if let Ok(parsed) = serde_json::from_str::<StoreErrorBody>(body) {
        if let Some(message) = parsed.message {
            debug!(
                "ストアから構造化エラーレスポンスを受信: code={:?}, message={message}",
                parsed.code
            );
            return AppError::remote(message);
        }
    }

    let user_message = match status.as_u16() {
        400 => "リクエストの形式が正しくありません",
        401 => "認証に失敗しました。再度ログインしてください",
        403 => "この操作を実行する権限がありません",
        404 => "指定されたリソースが見つかりません",
        409 => "データの制約に違反しています",
        429 => "リクエストが多すぎます。しばらく待ってから再試行してください",
        500 => "サーバー内部エラーが発生しました",
        503 => "ストアサービスが一時的に利用できません",
        _ => "不明なエラーが発生しました",
    };

    AppError::remote(format!("{user_message} (HTTP {})", status.as_u16()))
}

impl StoreClient for HttpStoreClient {
    async fn select(
        &self,
        relation: &str,
        filter: Option<&Filter>,
        order: Option<&Order>,
        page: Option<&Page>,
        token: Option<&str>,
    ) -> AppResult<Vec<Value>> {
        let url = self.rest_url(relation, true, filter, order, page)?;
        debug!("行取得リクエスト送信: relation={relation}");

        let request = self.with_auth(self.client.get(url), token);
        self.send_rows(request, "行取得成功").await
    }

    async fn insert(&self, relation: &str, row: Value, token: Option<&str>) -> AppResult<Value> {
        let url = self.rest_url(relation, false, None, None, None)?;
        debug!("行挿入リクエスト送信: relation={relation}");

        let request = self
            .with_auth(self.client.post(url), token)
            .header("Prefer", "return=representation")
            .json(&row);

        let rows = self.send_rows(request, "行挿入成功").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::remote("作成された行がストアから返されませんでした"))
    }

    async fn update(
        &self,
        relation: &str,
        changes: Value,
        filter: &Filter,
        token: Option<&str>,
    ) -> AppResult<Value> {
        let url = self.rest_url(relation, false, Some(filter), None, None)?;
        debug!(
            "行更新リクエスト送信: relation={relation}, {}={}",
            filter.column, filter.value
        );

        let request = self
            .with_auth(self.client.patch(url), token)
            .header("Prefer", "return=representation")
            .json(&changes);

        let rows = self.send_rows(request, "行更新成功").await?;
        // 一致行なしと所有権なしはストア上区別できないため、同一のエラーになる
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::remote(format!("対象の行が見つかりません: {relation}")))
    }

    async fn delete(&self, relation: &str, filter: &Filter, token: Option<&str>) -> AppResult<()> {
        let url = self.rest_url(relation, false, Some(filter), None, None)?;
        info!(
            "行削除リクエスト送信: relation={relation}, {}={}",
            filter.column, filter.value
        );

        let request = self
            .with_auth(self.client.delete(url), token)
            .header("Prefer", "return=representation");

        let rows = self.send_rows(request, "行削除成功").await?;
        if rows.is_empty() {
            return Err(AppError::remote(format!(
                "対象の行が見つかりません: {relation}"
            )));
        }
        Ok(())
    }
}
