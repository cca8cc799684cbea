//! 루프백 링크
//!
//! 송신자와 수신자를 메모리 링크로 직접 연결해 한 스레드에서 펌프한다.
//! 실제 무선 없이 전송 흐름 전체를 돌려볼 때 사용.

use bytes::Bytes;

use crate::memory::{self, ChunkStream, MemoryTransport};
use crate::receiver::{ChunkReceiver, PayloadSink};
use crate::sender::{ChunkSender, DrainStatus};
use crate::{Config, Result};

/// 단일 스레드 루프백 링크
pub struct LoopbackLink<S> {
    sender: ChunkSender<MemoryTransport>,
    stream: ChunkStream,
    receiver: ChunkReceiver<S>,
}

impl<S: PayloadSink> LoopbackLink<S> {
    /// 새 링크 생성
    pub fn new(config: Config, sink: S) -> Result<Self> {
        let (transport, stream) = memory::channel(config.link_queue_depth);
        let receiver = ChunkReceiver::new(&config, sink);
        let sender = ChunkSender::new(config, transport)?;

        Ok(Self {
            sender,
            stream,
            receiver,
        })
    }

    /// 전송 시작 (큐가 받는 만큼만 즉시 보냄)
    pub fn send(&mut self, payload: Bytes) -> Result<DrainStatus> {
        self.sender.begin_send(payload)
    }

    /// 큐에 쌓인 청크를 수신자에 전달하고 ready 신호를 송신자에 전달
    ///
    /// 더 진행할 것이 없을 때까지 반복. 전달한 청크 수를 반환.
    pub fn pump(&mut self) -> Result<usize> {
        let mut delivered = 0;

        loop {
            let mut progressed = false;

            while let Some(chunk) = self.stream.try_recv()? {
                self.receiver.on_chunk_received(&chunk);
                delivered += 1;
                progressed = true;
            }

            if self.stream.poll_ready() {
                self.sender.on_transport_ready()?;
                progressed = true;
            }

            if !progressed {
                return Ok(delivered);
            }
        }
    }

    /// 전송 시작 후 끝까지 펌프
    pub fn transfer(&mut self, payload: Bytes) -> Result<usize> {
        self.send(payload)?;
        self.pump()
    }

    /// 링크 끊김을 양쪽에 통지
    ///
    /// 큐에 남은 청크는 전달되지 않는다.
    pub fn disconnect(&mut self) -> usize {
        while let Ok(Some(_)) = self.stream.try_recv() {}
        self.sender.on_link_lost();
        self.receiver.on_link_lost()
    }

    pub fn sender(&self) -> &ChunkSender<MemoryTransport> {
        &self.sender
    }

    pub fn receiver(&self) -> &ChunkReceiver<S> {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut ChunkReceiver<S> {
        &mut self.receiver
    }
}
