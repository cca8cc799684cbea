//! 프로토콜 설정

use crate::chunk::ChunkSlicer;
use crate::{chunk_size_for_mtu, Error, Result, DEFAULT_COMPLETION_THRESHOLD, DEFAULT_MAX_CHUNK_SIZE};

/// CTP 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 최대 청크 크기 (바이트)
    /// 링크 MTU에서 ATT 헤더를 뺀 값
    pub max_chunk_size: usize,

    /// 완료 임계값 (바이트)
    /// 누적 버퍼가 이 값을 "초과"하면 페이로드 하나로 간주
    pub completion_threshold: usize,

    /// 역할 태스크 명령 채널 크기
    pub command_buffer: usize,

    /// 완료 페이로드/상태 보고 채널 크기
    pub payload_buffer: usize,

    /// 메모리 링크 큐 깊이 (notify 큐 슬롯 수)
    pub link_queue_depth: usize,

    /// 연결 간격 시뮬레이션 (밀리초)
    /// 0이면 간격 없이 바로 전달
    pub connection_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            command_buffer: 1000,
            payload_buffer: 16,
            link_queue_depth: 8,
            connection_interval_ms: 0,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// BLE 4.x 기본 MTU(23)용 설정
    pub fn ble_legacy() -> Self {
        Self {
            max_chunk_size: chunk_size_for_mtu(23),
            connection_interval_ms: 30,
            ..Self::default()
        }
    }

    /// BLE 5 DLE(MTU 247)용 설정
    pub fn ble_extended() -> Self {
        Self {
            max_chunk_size: chunk_size_for_mtu(247),
            link_queue_depth: 16,
            connection_interval_ms: 15,
            ..Self::default()
        }
    }

    /// 정확히 `len` 바이트 페이로드가 완료되도록 임계값을 맞춘 설정
    ///
    /// 완료 조건이 `len > threshold` 이므로 임계값은 `len - 1`.
    /// 빈 페이로드는 어떤 임계값으로도 완료되지 않는다.
    pub fn for_payload_len(len: usize) -> Self {
        Self::default().with_expected_len(len)
    }

    /// 예상 페이로드 길이로 임계값 설정
    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.completion_threshold = len.saturating_sub(1);
        self
    }

    /// 최대 청크 크기 설정
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// 페이로드 크기에 필요한 청크 수
    pub fn chunks_for(&self, payload_len: usize) -> usize {
        ChunkSlicer::new(self.max_chunk_size).chunk_count(payload_len)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(Error::InvalidConfig("max_chunk_size는 1 이상이어야 함".into()));
        }
        if self.command_buffer == 0 || self.payload_buffer == 0 {
            return Err(Error::InvalidConfig("채널 크기는 1 이상이어야 함".into()));
        }
        if self.link_queue_depth == 0 {
            return Err(Error::InvalidConfig("link_queue_depth는 1 이상이어야 함".into()));
        }
        Ok(())
    }
}
