//! # CTP (Chunk Transfer Protocol)
//!
//! MTU 제한 notify 링크(BLE GATT 등) 위의 청크 분할 전송 프로토콜
//!
//! ## 핵심 특징
//! - **청크 분할**: 페이로드를 MTU 크기 청크로 잘라 순서대로 전송
//! - **백프레셔**: 전송 큐가 가득 차면 멈추고 ready 신호에서 재개
//! - **이벤트 구동**: 송신/수신 상태 머신은 이벤트 하나씩 처리
//! - **임계값 완료 판정**: 누적 바이트가 임계값을 넘으면 페이로드 완료
//!
//! ## 주의
//! 청크에는 헤더가 없다. 수신측은 실제 페이로드 길이를 모르므로
//! `completion_threshold` 보다 큰 페이로드는 중간에 잘려서 전달된다.
//! 임계값을 실제 길이에 맞춰 설정해야 한다 ([`Config::for_payload_len`]).

pub mod chunk;
pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod memory;
pub mod receiver;
pub mod runtime;
pub mod sender;
pub mod stats;
pub mod transport;

pub use chunk::{ChunkSlicer, SendCursor};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{ReceiverEvent, SenderEvent};
pub use link::LoopbackLink;
pub use memory::{ChunkStream, MemoryTransport};
pub use receiver::{ChunkReceiver, PayloadSink};
pub use runtime::{ReceiverHandle, SendReport, SenderHandle};
pub use sender::{ChunkSender, DrainStatus, SenderState};
pub use stats::TransferStats;
pub use transport::{ChunkTransport, SendOutcome};

/// 기본 최대 청크 크기 (바이트), BLE 4.x 기본 MTU 기준
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 20;

/// 기본 완료 임계값 (바이트)
pub const DEFAULT_COMPLETION_THRESHOLD: usize = 5000;

/// ATT 헤더 크기 (opcode 1 + handle 2)
pub const ATT_HEADER_SIZE: usize = 3;

/// ATT MTU에서 notify 한 번에 실을 수 있는 청크 크기
pub fn chunk_size_for_mtu(mtu: usize) -> usize {
    mtu.saturating_sub(ATT_HEADER_SIZE).max(1)
}
