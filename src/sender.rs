//! 송신자 (peripheral 측)
//!
//! - 페이로드를 최대 청크 크기로 잘라 순서대로 전송
//! - 전송 큐가 busy 면 멈추고 ready 신호에서 같은 offset 부터 재개
//! - 한 번에 하나의 페이로드만 전송 (새 요청은 이전 컨텍스트를 덮어씀)

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::chunk::SendCursor;
use crate::event::SenderEvent;
use crate::stats::TransferStats;
use crate::transport::{ChunkTransport, SendOutcome};
use crate::{Config, Error, Result};

/// drain 한 번의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// 보낼 페이로드 없음
    Idle,

    /// 전송 큐 포화로 중단, ready 신호 대기
    Suspended { offset: usize, total: usize },

    /// 페이로드 전송 완료
    Completed { total: usize },
}

/// 외부에서 보는 송신자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Idle,
    Staged { total: usize },
    Sending { offset: usize, total: usize },
    Failed { offset: usize, total: usize },
}

/// 송신 컨텍스트
#[derive(Debug)]
enum SendContext {
    Idle,
    Staged(SendCursor),
    Active(SendCursor),
    Failed { offset: usize, total: usize },
}

/// 청크 송신자
pub struct ChunkSender<T> {
    config: Config,
    transport: T,
    context: SendContext,
    stats: TransferStats,
}

impl<T: ChunkTransport> ChunkSender<T> {
    /// 새 송신자 생성
    pub fn new(config: Config, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            context: SendContext::Idle,
            stats: TransferStats::new(),
        })
    }

    /// 페이로드 전송 시작
    ///
    /// 진행 중인 전송이 있으면 덮어쓴다. 큐 없음.
    pub fn begin_send(&mut self, payload: Bytes) -> Result<DrainStatus> {
        self.replace_context(payload, true);
        self.drain()
    }

    /// 페이로드만 준비하고 링크 준비 이벤트를 기다림
    pub fn stage(&mut self, payload: Bytes) {
        self.replace_context(payload, false);
    }

    /// 상대 구독 완료: 준비된 페이로드가 있으면 drain 시작
    pub fn on_link_ready(&mut self) -> Result<DrainStatus> {
        self.context = match std::mem::replace(&mut self.context, SendContext::Idle) {
            SendContext::Staged(cursor) => SendContext::Active(cursor),
            other => other,
        };
        self.drain()
    }

    /// 전송 큐가 다시 받을 수 있음
    ///
    /// 활성 전송이 없으면 아무 일도 하지 않는다.
    pub fn on_transport_ready(&mut self) -> Result<DrainStatus> {
        if let SendContext::Active(_) = self.context {
            self.stats.ready_signals += 1;
        }
        self.drain()
    }

    /// 링크 끊김: 진행 중인 전송 폐기
    ///
    /// 폐기된 전송이 있었으면 `true`.
    pub fn on_link_lost(&mut self) -> bool {
        match self.cancel() {
            Some(cursor) => {
                warn!(
                    "링크 끊김, 전송 폐기: {}/{} bytes",
                    cursor.offset(),
                    cursor.total()
                );
                self.context = SendContext::Failed {
                    offset: cursor.offset(),
                    total: cursor.total(),
                };
                self.stats.payloads_failed += 1;
                true
            }
            None => false,
        }
    }

    /// 진행 중(또는 준비된) 전송을 제거하고 반환
    pub fn cancel(&mut self) -> Option<SendCursor> {
        match std::mem::replace(&mut self.context, SendContext::Idle) {
            SendContext::Staged(cursor) | SendContext::Active(cursor) => Some(cursor),
            other => {
                self.context = other;
                None
            }
        }
    }

    /// 이벤트 하나 처리
    pub fn handle(&mut self, event: SenderEvent) -> Result<DrainStatus> {
        match event {
            SenderEvent::Send(payload) => self.begin_send(payload),
            SenderEvent::Stage(payload) => {
                self.stage(payload);
                Ok(DrainStatus::Idle)
            }
            SenderEvent::LinkReady => self.on_link_ready(),
            SenderEvent::TransportReady => self.on_transport_ready(),
            SenderEvent::LinkLost => {
                self.on_link_lost();
                Ok(DrainStatus::Idle)
            }
        }
    }

    /// 현재 상태
    pub fn state(&self) -> SenderState {
        match &self.context {
            SendContext::Idle => SenderState::Idle,
            SendContext::Staged(cursor) => SenderState::Staged {
                total: cursor.total(),
            },
            SendContext::Active(cursor) => SenderState::Sending {
                offset: cursor.offset(),
                total: cursor.total(),
            },
            SendContext::Failed { offset, total } => SenderState::Failed {
                offset: *offset,
                total: *total,
            },
        }
    }

    /// 통계 반환
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn replace_context(&mut self, payload: Bytes, active: bool) {
        if let SendContext::Staged(old) | SendContext::Active(old) = &self.context {
            debug!(
                "이전 페이로드 덮어씀: {}/{} bytes 전송됨",
                old.offset(),
                old.total()
            );
        }

        info!(
            "페이로드 전송 준비: {} bytes, {} chunks",
            payload.len(),
            self.config.chunks_for(payload.len())
        );

        let cursor = SendCursor::new(payload);
        self.context = if active {
            SendContext::Active(cursor)
        } else {
            SendContext::Staged(cursor)
        };
        self.stats.payloads_started += 1;
    }

    /// 전송 큐가 받는 만큼 연속으로 청크 전송
    fn drain(&mut self) -> Result<DrainStatus> {
        let cursor = match &mut self.context {
            SendContext::Active(cursor) => cursor,
            _ => return Ok(DrainStatus::Idle),
        };

        while let Some(chunk) = cursor.next_chunk(self.config.max_chunk_size) {
            let len = chunk.len();
            debug_assert!(len >= 1 && len <= self.config.max_chunk_size);

            match self.transport.try_send(chunk) {
                Ok(SendOutcome::Accepted) => {
                    cursor.advance(len);
                    self.stats.record_chunk(len);
                }
                Ok(SendOutcome::Busy) => {
                    self.stats.busy_responses += 1;
                    debug!(
                        "전송 큐 포화, ready 대기: {}/{} bytes",
                        cursor.offset(),
                        cursor.total()
                    );
                    return Ok(DrainStatus::Suspended {
                        offset: cursor.offset(),
                        total: cursor.total(),
                    });
                }
                Err(e) => {
                    let (offset, total) = (cursor.offset(), cursor.total());
                    warn!("전송 실패 ({}): {}/{} bytes", e, offset, total);
                    self.context = SendContext::Failed { offset, total };
                    self.stats.payloads_failed += 1;
                    return Err(Error::TransportFailure { offset, total });
                }
            }
        }

        let total = cursor.total();
        self.context = SendContext::Idle;
        self.stats.payloads_completed += 1;
        debug!("페이로드 전송 완료: {} bytes", total);

        Ok(DrainStatus::Completed { total })
    }
}
