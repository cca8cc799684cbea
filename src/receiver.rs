//! 수신자 (central 측)
//!
//! - 도착 순서대로 청크를 누적
//! - 누적 크기가 임계값을 넘으면 페이로드 하나로 보고 전달 후 버퍼 비움
//!
//! 청크에 길이/종료 표시가 없으므로 완료 판정은 크기 임계값뿐이다.
//! 임계값보다 작은 페이로드는 다음 페이로드와 섞이고, 큰 페이로드는
//! 중간에 잘린다. 임계값은 실제 페이로드 길이에 맞춰야 한다.

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::event::ReceiverEvent;
use crate::stats::TransferStats;
use crate::Config;

/// 완료된 페이로드를 받는 쪽
///
/// 완료를 일으킨 청크 처리 안에서 동기적으로 호출된다.
pub trait PayloadSink {
    fn deliver(&mut self, payload: Bytes);
}

impl<F> PayloadSink for F
where
    F: FnMut(Bytes),
{
    fn deliver(&mut self, payload: Bytes) {
        self(payload)
    }
}

impl PayloadSink for Vec<Bytes> {
    fn deliver(&mut self, payload: Bytes) {
        self.push(payload);
    }
}

impl PayloadSink for crossbeam_channel::Sender<Bytes> {
    fn deliver(&mut self, payload: Bytes) {
        if self.send(payload).is_err() {
            warn!("페이로드 수신측 종료, 페이로드 버림");
        }
    }
}

impl PayloadSink for tokio::sync::mpsc::UnboundedSender<Bytes> {
    fn deliver(&mut self, payload: Bytes) {
        if self.send(payload).is_err() {
            warn!("페이로드 수신측 종료, 페이로드 버림");
        }
    }
}

/// 청크 수신자
pub struct ChunkReceiver<S> {
    completion_threshold: usize,
    buffer: BytesMut,
    sink: S,
    stats: TransferStats,
}

impl<S: PayloadSink> ChunkReceiver<S> {
    /// 새 수신자 생성
    pub fn new(config: &Config, sink: S) -> Self {
        Self {
            completion_threshold: config.completion_threshold,
            buffer: BytesMut::new(),
            sink,
            stats: TransferStats::new(),
        }
    }

    /// 청크 수신
    ///
    /// 페이로드가 완료되어 전달됐으면 그 길이를 반환.
    pub fn on_chunk_received(&mut self, chunk: &[u8]) -> Option<usize> {
        if self.buffer.is_empty() && !chunk.is_empty() {
            self.stats.payloads_started += 1;
        }

        let before = self.buffer.len();
        self.buffer.extend_from_slice(chunk);
        debug_assert_eq!(self.buffer.len(), before + chunk.len());
        self.stats.record_chunk(chunk.len());

        if self.buffer.len() <= self.completion_threshold {
            return None;
        }

        let payload = self.buffer.split().freeze();
        let len = payload.len();
        debug_assert!(self.buffer.is_empty());

        info!("페이로드 수신 완료: {} bytes", len);
        self.stats.payloads_completed += 1;
        self.sink.deliver(payload);

        Some(len)
    }

    /// 링크 끊김: 누적 중이던 바이트 폐기
    ///
    /// 버린 바이트 수를 반환.
    pub fn on_link_lost(&mut self) -> usize {
        let discarded = self.buffer.len();
        if discarded > 0 {
            warn!("링크 끊김, 미완성 페이로드 폐기: {} bytes", discarded);
            self.buffer.clear();
            self.stats.payloads_failed += 1;
            self.stats.discarded_bytes += discarded as u64;
        }
        discarded
    }

    /// 누적 중인 바이트를 완료 판정 없이 꺼냄
    pub fn take_partial(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }
        debug!("미완성 페이로드 반환: {} bytes", self.buffer.len());
        Some(self.buffer.split().freeze())
    }

    /// 이벤트 하나 처리
    pub fn handle(&mut self, event: ReceiverEvent) -> Option<usize> {
        match event {
            ReceiverEvent::Chunk(chunk) => self.on_chunk_received(&chunk),
            ReceiverEvent::LinkLost => {
                self.on_link_lost();
                None
            }
        }
    }

    /// 누적 중인 바이트 수
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// 통계 반환
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
