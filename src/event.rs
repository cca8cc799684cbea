//! 상태 머신 입력 이벤트
//!
//! 플랫폼 콜백(구독 완료, 전송 가능, 값 갱신)을 이벤트로 옮겨
//! 각 역할이 하나씩 순서대로 처리한다.

use bytes::Bytes;

/// 송신측 이벤트
#[derive(Debug, Clone)]
pub enum SenderEvent {
    /// 페이로드 전송 시작 (즉시 drain)
    Send(Bytes),

    /// 페이로드만 준비, 링크 준비 이벤트에서 drain 시작
    Stage(Bytes),

    /// 상대가 구독함
    LinkReady,

    /// 포화됐던 전송 큐가 다시 받을 수 있음
    TransportReady,

    /// 링크 끊김
    LinkLost,
}

/// 수신측 이벤트
#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    /// 청크 도착
    Chunk(Bytes),

    /// 링크 끊김
    LinkLost,
}
