//! 메모리 링크 (프로세스 내 전송 계층)
//!
//! BLE notify 큐를 고정 깊이의 bounded 채널로 흉내낸다.
//! 큐가 가득 차면 `Busy`, 수신측이 슬롯을 비우면 ready 신호가 한 번 발생한다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::transport::{ChunkTransport, SendOutcome};
use crate::{Error, Result};

/// 깊이 `depth` 의 메모리 링크 생성
pub fn channel(depth: usize) -> (MemoryTransport, ChunkStream) {
    let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
    let saturated = Arc::new(AtomicBool::new(false));

    (
        MemoryTransport {
            tx,
            saturated: saturated.clone(),
        },
        ChunkStream { rx, saturated },
    )
}

/// 송신측 끝
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Sender<Bytes>,

    /// busy 응답 이후 ready 신호 대기 중
    saturated: Arc<AtomicBool>,
}

impl ChunkTransport for MemoryTransport {
    fn try_send(&mut self, chunk: Bytes) -> Result<SendOutcome> {
        match self.tx.try_send(chunk) {
            Ok(()) => Ok(SendOutcome::Accepted),
            Err(TrySendError::Full(_)) => {
                self.saturated.store(true, Ordering::SeqCst);
                Ok(SendOutcome::Busy)
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::LinkClosed),
        }
    }
}

/// 수신측 끝
#[derive(Debug)]
pub struct ChunkStream {
    rx: Receiver<Bytes>,
    saturated: Arc<AtomicBool>,
}

impl ChunkStream {
    /// 도착한 청크 하나 꺼내기
    ///
    /// 큐가 비었으면 `Ok(None)`, 송신측이 사라졌으면 `Err(LinkClosed)`.
    pub fn try_recv(&self) -> Result<Option<Bytes>> {
        match self.rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::LinkClosed),
        }
    }

    /// ready 신호 확인
    ///
    /// busy 응답 이후 큐에 빈 슬롯이 생기면 정확히 한 번 `true`.
    pub fn poll_ready(&self) -> bool {
        if self.rx.is_full() {
            return false;
        }
        self.saturated.swap(false, Ordering::SeqCst)
    }

    /// 큐에 대기 중인 청크 수
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_when_full() {
        let (mut transport, stream) = channel(2);

        assert_eq!(transport.try_send(Bytes::from_static(b"a")).unwrap(), SendOutcome::Accepted);
        assert_eq!(transport.try_send(Bytes::from_static(b"b")).unwrap(), SendOutcome::Accepted);
        assert_eq!(transport.try_send(Bytes::from_static(b"c")).unwrap(), SendOutcome::Busy);
        assert_eq!(stream.len(), 2);

        // 가득 찬 동안에는 ready 없음
        assert!(!stream.poll_ready());
    }

    #[test]
    fn test_ready_fires_once_after_busy() {
        let (mut transport, stream) = channel(1);

        transport.try_send(Bytes::from_static(b"a")).unwrap();
        assert_eq!(transport.try_send(Bytes::from_static(b"b")).unwrap(), SendOutcome::Busy);

        assert_eq!(stream.try_recv().unwrap().unwrap(), Bytes::from_static(b"a"));
        assert!(stream.poll_ready());
        assert!(!stream.poll_ready());
    }

    #[test]
    fn test_no_ready_without_busy() {
        let (mut transport, stream) = channel(4);
        transport.try_send(Bytes::from_static(b"a")).unwrap();
        stream.try_recv().unwrap();
        assert!(!stream.poll_ready());
    }

    #[test]
    fn test_order_preserved() {
        let (mut transport, stream) = channel(8);
        for i in 0..5u8 {
            transport.try_send(Bytes::from(vec![i])).unwrap();
        }
        let received: Vec<u8> = std::iter::from_fn(|| stream.try_recv().unwrap())
            .map(|c| c[0])
            .collect();
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_disconnect() {
        let (mut transport, stream) = channel(4);
        drop(stream);
        assert!(matches!(
            transport.try_send(Bytes::from_static(b"a")),
            Err(Error::LinkClosed)
        ));

        let (transport, stream) = channel(4);
        drop(transport);
        assert!(matches!(stream.try_recv(), Err(Error::LinkClosed)));
    }
}
