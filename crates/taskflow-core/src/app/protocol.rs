//! Protocol - 実行ユースケースで共有するステータス遷移
//!
//! # 学習ポイント
//! - 遷移はすべてストアの `transition`（compare-and-swap）で行う
//!   - 開始: 読み込んだときのステータス → 実行中
//!   - 終了: 実行中 → 結果のステータス
//! - 書き込むのはステータスだけ。実行中に受け付けた名前変更などは残る
//! - 実行中に別の呼び出しが終端状態（Cancelled など）へ動かしていたら、
//!   終了側の CAS が負けて `InvalidState`。上書きも publish もしない
//! - publish の失敗はログに残すだけで、結果には影響しない

use crate::domain::{EngineError, ErrorKind};
use crate::ports::{Entity, EventPublisher, Store};

/// 実行中の `status` に入る
///
/// 別の呼び出しが先にステータスを動かしていれば `InvalidState`。
/// 成功すると `entity` は保存済みの最新の値に置き換わる。
pub(crate) async fn begin<E: Entity>(
    store: &dyn Store<E>,
    publisher: &dyn EventPublisher,
    entity: &mut E,
    status: E::Status,
) -> Result<(), EngineError> {
    advance(store, publisher, entity, status, None).await
}

/// 実行中のステータスから結果の `status` へ
///
/// `cause` は executor が返したエラー。永続化に失敗したとき Storage エラーの
/// 文脈に残す。
pub(crate) async fn finish<E: Entity>(
    store: &dyn Store<E>,
    publisher: &dyn EventPublisher,
    entity: &mut E,
    status: E::Status,
    cause: Option<&EngineError>,
) -> Result<(), EngineError> {
    advance(store, publisher, entity, status, cause).await
}

async fn advance<E: Entity>(
    store: &dyn Store<E>,
    publisher: &dyn EventPublisher,
    entity: &mut E,
    status: E::Status,
    cause: Option<&EngineError>,
) -> Result<(), EngineError> {
    let expected = entity.status();
    let updated = store
        .transition(entity.id(), expected, status)
        .await
        .map_err(|err| persist_error(entity, status, cause, err))?;
    *entity = updated;
    publish(publisher, entity).await;
    Ok(())
}

/// 現在のステータスを publish する。失敗はログに残して捨てる
pub(crate) async fn publish<E: Entity>(publisher: &dyn EventPublisher, entity: &E) {
    if let Err(err) = publisher.publish(&entity.status_changed()).await {
        tracing::warn!(
            entity = %E::KIND,
            id = %entity.id(),
            status = %entity.status(),
            error = %err,
            "failed to publish status change"
        );
    }
}

// CAS の負けは状態の衝突であってストレージ障害ではない
fn persist_error<E: Entity>(
    entity: &E,
    status: E::Status,
    cause: Option<&EngineError>,
    err: EngineError,
) -> EngineError {
    if err.kind() == ErrorKind::InvalidState {
        return err;
    }
    let context = match cause {
        Some(cause) => format!("persist {status} status (original error: {cause})"),
        None => format!("persist {status} status"),
    };
    EngineError::storage(E::KIND, entity.id(), context, err)
}
