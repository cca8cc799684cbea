//! 에러 타입 정의

use thiserror::Error;

/// CTP 에러 타입
///
/// 전송 큐 포화(busy)는 에러가 아니라 [`crate::SendOutcome::Busy`] 로 표현된다.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("전송 실패: offset={offset}, total={total}")]
    TransportFailure { offset: usize, total: usize },

    #[error("링크 종료")]
    LinkClosed,

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("채널 에러")]
    ChannelError,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
