//! 역할 태스크 (멀티스레드 호스트용)
//!
//! 상태 머신 하나를 tokio 태스크 하나가 소유하고, 모든 이벤트는
//! 명령 채널을 통해 한 번에 하나씩 처리된다. 락 없이 직렬화됨.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::{ReceiverEvent, SenderEvent};
use crate::memory::ChunkStream;
use crate::receiver::ChunkReceiver;
use crate::sender::{ChunkSender, DrainStatus, SenderState};
use crate::stats::TransferStats;
use crate::transport::ChunkTransport;
use crate::{Config, Error, Result};

/// 완료된 페이로드 채널 수신기 타입
pub type PayloadReceiver = mpsc::UnboundedReceiver<Bytes>;

/// 송신 결과 보고
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReport {
    /// 페이로드 전체가 전송 큐에 들어감
    Completed { total: usize },

    /// 링크 끊김으로 폐기됨
    Failed { offset: usize, total: usize },
}

/// 내부 명령
enum SenderCmd {
    Event(SenderEvent),
    Stop,
}

enum ReceiverCmd {
    Event(ReceiverEvent),
    Stop,
}

/// 송신자 핸들 (외부에서 제어용)
#[derive(Clone)]
pub struct SenderHandle {
    cmd_tx: mpsc::Sender<SenderCmd>,
    stats: Arc<RwLock<TransferStats>>,
    state: Arc<RwLock<SenderState>>,
    running: Arc<AtomicBool>,
}

impl SenderHandle {
    /// 송신 태스크 생성
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn spawn<T>(config: Config, transport: T) -> Result<(Self, mpsc::Receiver<SendReport>)>
    where
        T: ChunkTransport + Send + 'static,
    {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<SenderCmd>(config.command_buffer);
        let (report_tx, report_rx) = mpsc::channel::<SendReport>(config.payload_buffer);

        let mut sender = ChunkSender::new(config, transport)?;

        let stats = Arc::new(RwLock::new(TransferStats::new()));
        let state = Arc::new(RwLock::new(SenderState::Idle));
        let running = Arc::new(AtomicBool::new(true));

        let stats_main = stats.clone();
        let state_main = state.clone();
        let running_main = running.clone();

        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let event = match cmd {
                    SenderCmd::Event(event) => event,
                    SenderCmd::Stop => break,
                };

                let report = match event {
                    SenderEvent::LinkLost => {
                        if sender.on_link_lost() {
                            match sender.state() {
                                SenderState::Failed { offset, total } => {
                                    Some(SendReport::Failed { offset, total })
                                }
                                _ => None,
                            }
                        } else {
                            None
                        }
                    }
                    event => match sender.handle(event) {
                        Ok(DrainStatus::Completed { total }) => {
                            Some(SendReport::Completed { total })
                        }
                        Ok(_) => None,
                        Err(Error::TransportFailure { offset, total }) => {
                            Some(SendReport::Failed { offset, total })
                        }
                        Err(e) => {
                            warn!("송신 이벤트 처리 에러: {}", e);
                            None
                        }
                    },
                };

                // 통계 업데이트
                *stats_main.write() = sender.stats().clone();
                *state_main.write() = sender.state();

                // 보고 채널이 막혀도 이벤트 처리는 계속
                if let Some(report) = report {
                    match report_tx.try_send(report) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(report)) => {
                            warn!("상태 보고 채널 포화, 보고 버림: {:?}", report);
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {}
                    }
                }
            }

            debug!("송신 태스크 종료");
            running_main.store(false, Ordering::SeqCst);
        });

        let handle = Self {
            cmd_tx,
            stats,
            state,
            running,
        };

        Ok((handle, report_rx))
    }

    async fn event(&self, event: SenderEvent) -> Result<()> {
        self.cmd_tx
            .send(SenderCmd::Event(event))
            .await
            .map_err(|_| Error::ChannelError)
    }

    /// 페이로드 전송 시작
    pub async fn send(&self, payload: Bytes) -> Result<()> {
        self.event(SenderEvent::Send(payload)).await
    }

    /// 페이로드 준비 (링크 준비 시 전송)
    pub async fn stage(&self, payload: Bytes) -> Result<()> {
        self.event(SenderEvent::Stage(payload)).await
    }

    /// 상대 구독 완료 통지
    pub async fn link_ready(&self) -> Result<()> {
        self.event(SenderEvent::LinkReady).await
    }

    /// 전송 큐 ready 통지
    pub async fn transport_ready(&self) -> Result<()> {
        self.event(SenderEvent::TransportReady).await
    }

    /// 링크 끊김 통지
    pub async fn link_lost(&self) -> Result<()> {
        self.event(SenderEvent::LinkLost).await
    }

    /// 정지
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(SenderCmd::Stop).await;
    }

    /// 통계 반환
    pub fn stats(&self) -> TransferStats {
        self.stats.read().clone()
    }

    /// 현재 상태
    pub fn state(&self) -> SenderState {
        *self.state.read()
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// 수신자 핸들 (외부에서 제어용)
#[derive(Clone)]
pub struct ReceiverHandle {
    cmd_tx: mpsc::Sender<ReceiverCmd>,
    stats: Arc<RwLock<TransferStats>>,
    pending: Arc<AtomicUsize>,
    completed_count: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl ReceiverHandle {
    /// 수신 태스크 생성
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn spawn(config: Config) -> Result<(Self, PayloadReceiver)> {
        config.validate()?;

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ReceiverCmd>(config.command_buffer);
        let (payload_tx, payload_rx) = mpsc::unbounded_channel::<Bytes>();

        let mut receiver = ChunkReceiver::new(&config, payload_tx);

        let stats = Arc::new(RwLock::new(TransferStats::new()));
        let pending = Arc::new(AtomicUsize::new(0));
        let completed_count = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let stats_main = stats.clone();
        let pending_main = pending.clone();
        let completed_count_main = completed_count.clone();
        let running_main = running.clone();

        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    ReceiverCmd::Event(event) => {
                        receiver.handle(event);
                    }
                    ReceiverCmd::Stop => break,
                }

                // 통계 업데이트
                *stats_main.write() = receiver.stats().clone();
                pending_main.store(receiver.pending_len(), Ordering::Relaxed);
                completed_count_main.store(receiver.stats().payloads_completed, Ordering::Relaxed);
            }

            debug!("수신 태스크 종료");
            running_main.store(false, Ordering::SeqCst);
        });

        let handle = Self {
            cmd_tx,
            stats,
            pending,
            completed_count,
            running,
        };

        Ok((handle, payload_rx))
    }

    /// 청크 전달
    pub async fn push_chunk(&self, chunk: Bytes) -> Result<()> {
        self.cmd_tx
            .send(ReceiverCmd::Event(ReceiverEvent::Chunk(chunk)))
            .await
            .map_err(|_| Error::ChannelError)
    }

    /// 링크 끊김 통지
    pub async fn link_lost(&self) -> Result<()> {
        self.cmd_tx
            .send(ReceiverCmd::Event(ReceiverEvent::LinkLost))
            .await
            .map_err(|_| Error::ChannelError)
    }

    /// 정지
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(ReceiverCmd::Stop).await;
    }

    /// 통계 반환
    pub fn stats(&self) -> TransferStats {
        self.stats.read().clone()
    }

    /// 누적 중인 바이트 수
    pub fn pending_len(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// 완료된 페이로드 수
    pub fn completed_payloads(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// 메모리 링크 펌프 태스크 생성
///
/// 연결 간격마다 큐의 청크를 수신 태스크로 넘기고, ready 신호를 송신 태스크로 넘긴다.
/// 송신측 전송 계층이 사라지면 수신측에 링크 끊김을 알리고 끝난다.
pub fn spawn_link_pump(
    stream: ChunkStream,
    sender: SenderHandle,
    receiver: ReceiverHandle,
    interval: Duration,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let idle_wait = if interval.is_zero() {
            Duration::from_millis(1)
        } else {
            interval
        };

        loop {
            let mut progressed = false;

            loop {
                match stream.try_recv() {
                    Ok(Some(chunk)) => {
                        receiver.push_chunk(chunk).await?;
                        progressed = true;
                    }
                    Ok(None) => break,
                    Err(Error::LinkClosed) => {
                        info!("링크 종료, 펌프 정지");
                        let _ = receiver.link_lost().await;
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }

            if stream.poll_ready() {
                // 송신 태스크가 이미 끝났으면 다음 루프에서 링크 종료로 처리됨
                let _ = sender.transport_ready().await;
                progressed = true;
            }

            if !receiver.is_running() {
                return Ok(());
            }

            if !progressed || !interval.is_zero() {
                tokio::time::sleep(idle_wait).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory;

    fn payload(len: usize) -> Bytes {
        (0..len).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>().into()
    }

    #[tokio::test]
    async fn test_round_trip_over_tasks() {
        let data = payload(5001);
        let config = Config {
            link_queue_depth: 4,
            ..Config::default()
        };

        let (transport, stream) = memory::channel(config.link_queue_depth);
        let (sender, mut reports) = SenderHandle::spawn(config.clone(), transport).unwrap();
        let (receiver, mut payloads) = ReceiverHandle::spawn(config).unwrap();
        let pump = spawn_link_pump(stream, sender.clone(), receiver.clone(), Duration::ZERO);

        sender.send(data.clone()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), payloads.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, data);

        let report = reports.recv().await.unwrap();
        assert_eq!(report, SendReport::Completed { total: 5001 });

        sender.stop().await;
        tokio::time::timeout(Duration::from_secs(5), pump)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(receiver.completed_payloads(), 1);
        assert_eq!(sender.state(), SenderState::Idle);
        assert_eq!(sender.stats().total_bytes, 5001);
    }

    /// 태스크가 끝날 때까지 대기 (앞서 보낸 명령은 모두 처리된 상태)
    async fn wait_stopped(sender: &SenderHandle) {
        sender.stop().await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while sender.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_stage_waits_for_link_ready() {
        let config = Config::for_payload_len(30);

        // 준비만 하고 ready 가 와도 전송하지 않음
        let (transport, stream) = memory::channel(config.link_queue_depth);
        let (sender, mut reports) = SenderHandle::spawn(config.clone(), transport).unwrap();
        sender.stage(payload(30)).await.unwrap();
        sender.transport_ready().await.unwrap();
        wait_stopped(&sender).await;

        assert!(stream.is_empty());
        assert_eq!(sender.state(), SenderState::Staged { total: 30 });
        assert!(reports.recv().await.is_none());

        // 링크 준비 이벤트에서 전송 시작
        let (transport, stream) = memory::channel(config.link_queue_depth);
        let (sender, mut reports) = SenderHandle::spawn(config, transport).unwrap();
        sender.stage(payload(30)).await.unwrap();
        sender.link_ready().await.unwrap();
        assert_eq!(
            reports.recv().await.unwrap(),
            SendReport::Completed { total: 30 }
        );
        assert_eq!(stream.len(), 2);
    }

    #[tokio::test]
    async fn test_unread_reports_do_not_stall_sender() {
        let config = Config::default();
        let sends = config.payload_buffer + 4;

        let (transport, stream) = memory::channel(1000);
        let (sender, _reports) = SenderHandle::spawn(config, transport).unwrap();

        for _ in 0..sends {
            sender.send(Bytes::from_static(b"abc")).await.unwrap();
        }
        wait_stopped(&sender).await;

        assert_eq!(stream.len(), sends);
        assert_eq!(sender.stats().payloads_started, sends as u64);
        assert_eq!(sender.stats().payloads_completed, sends as u64);
    }

    #[tokio::test]
    async fn test_link_lost_reports_failure() {
        let config = Config {
            link_queue_depth: 1,
            ..Config::default()
        };
        let (transport, _stream) = memory::channel(config.link_queue_depth);
        let (sender, mut reports) = SenderHandle::spawn(config, transport).unwrap();

        sender.send(payload(100)).await.unwrap();
        sender.link_lost().await.unwrap();

        assert_eq!(
            reports.recv().await.unwrap(),
            SendReport::Failed { offset: 20, total: 100 }
        );

        // 실패 후 ready 는 아무 일도 하지 않음
        sender.transport_ready().await.unwrap();
        sender.stop().await;
        assert!(reports.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_stop() {
        let (receiver, mut payloads) = ReceiverHandle::spawn(Config::for_payload_len(4)).unwrap();

        receiver.push_chunk(Bytes::from_static(b"ab")).await.unwrap();
        receiver.push_chunk(Bytes::from_static(b"cd")).await.unwrap();
        assert_eq!(payloads.recv().await.unwrap(), Bytes::from_static(b"abcd"));

        receiver.stop().await;
        assert!(payloads.recv().await.is_none());
        assert!(receiver.push_chunk(Bytes::from_static(b"x")).await.is_err());
    }
}
