//! 전송 통계

use std::time::{Duration, Instant};

/// 송신/수신 공용 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 시작된 페이로드 수
    pub payloads_started: u64,

    /// 완료된 페이로드 수
    pub payloads_completed: u64,

    /// 실패/취소된 페이로드 수
    pub payloads_failed: u64,

    /// 전송(수신)된 청크 수
    pub total_chunks: u64,

    /// 전송(수신)된 바이트
    pub total_bytes: u64,

    /// busy 응답 수
    pub busy_responses: u64,

    /// ready 신호 수
    pub ready_signals: u64,

    /// 링크 끊김으로 버려진 바이트
    pub discarded_bytes: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            payloads_started: 0,
            payloads_completed: 0,
            payloads_failed: 0,
            total_chunks: 0,
            total_bytes: 0,
            busy_responses: 0,
            ready_signals: 0,
            discarded_bytes: 0,
        }
    }

    /// 청크 기록
    pub fn record_chunk(&mut self, size: usize) {
        self.total_chunks += 1;
        self.total_bytes += size as u64;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / elapsed
    }

    /// 청크당 평균 크기
    pub fn average_chunk_size(&self) -> f64 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        self.total_bytes as f64 / self.total_chunks as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Payloads: {}/{} (failed {}) | Chunks: {} | Bytes: {} | Throughput: {:.2} KB/s | Busy: {} | Ready: {}",
            self.elapsed().as_secs_f64(),
            self.payloads_completed,
            self.payloads_started,
            self.payloads_failed,
            self.total_chunks,
            self.total_bytes,
            self.throughput() / 1000.0,
            self.busy_responses,
            self.ready_signals,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_chunk() {
        let mut stats = TransferStats::new();
        stats.record_chunk(20);
        stats.record_chunk(5);

        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_bytes, 25);
        assert!((stats.average_chunk_size() - 12.5).abs() < f64::EPSILON);
        assert!(stats.summary().contains("Chunks: 2"));
    }
}
