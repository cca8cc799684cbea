//! 청크 전송 계층 추상화
//!
//! 실제 구현은 플랫폼 BLE 스택(notify characteristic)이 담당한다.
//! 이 크레이트는 연결/구독이 끝난 링크만 가정한다.

use bytes::Bytes;

use crate::Result;

/// `try_send` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 전송 큐에 들어감
    Accepted,

    /// 큐 포화, 나중에 ready 신호가 온다
    Busy,
}

/// 송신측 청크 전송 계층
///
/// - `Ok(Accepted)`: 청크가 큐에 들어감
/// - `Ok(Busy)`: 포화 상태, 링크가 나중에 ready 를 통지
/// - `Err(_)`: 링크 끊김 등 복구 불가
///
/// 수락된 청크는 수락된 순서 그대로 상대에게 도착해야 한다.
pub trait ChunkTransport {
    fn try_send(&mut self, chunk: Bytes) -> Result<SendOutcome>;
}
