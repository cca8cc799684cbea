//! 청크와 송신 커서 정의
//!
//! - Payload: 전송할 전체 바이트열
//! - Chunk: notify 한 번에 실리는 조각 (헤더 없음, 도착 순서가 곧 순서)

use bytes::Bytes;

/// 송신 커서
///
/// `offset` 은 아직 보내지 않은 첫 바이트의 인덱스.
/// 항상 `0 <= offset <= payload.len()`.
#[derive(Debug, Clone)]
pub struct SendCursor {
    payload: Bytes,
    offset: usize,
}

impl SendCursor {
    /// offset 0에서 시작하는 커서 생성
    pub fn new(payload: Bytes) -> Self {
        Self { payload, offset: 0 }
    }

    /// 다음 미전송 바이트 위치
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 전체 페이로드 크기
    pub fn total(&self) -> usize {
        self.payload.len()
    }

    /// 남은 바이트 수
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }

    /// 모두 전송했는지 여부
    pub fn is_complete(&self) -> bool {
        self.offset == self.payload.len()
    }

    /// 다음 청크 (복사 없이 페이로드를 slice)
    ///
    /// 완료됐으면 `None`. 빈 청크는 만들지 않는다.
    pub fn next_chunk(&self, max_chunk_size: usize) -> Option<Bytes> {
        if self.is_complete() || max_chunk_size == 0 {
            return None;
        }
        let end = (self.offset + max_chunk_size).min(self.payload.len());
        Some(self.payload.slice(self.offset..end))
    }

    /// 전송 성공한 청크만큼 전진
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining(), "cursor advanced past payload end");
        self.offset = (self.offset + n).min(self.payload.len());
    }
}

/// 페이로드 분할기
#[derive(Debug, Clone, Copy)]
pub struct ChunkSlicer {
    max_chunk_size: usize,
}

impl ChunkSlicer {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// 페이로드를 청크들로 분할
    pub fn split(&self, payload: &Bytes) -> Vec<Bytes> {
        let mut cursor = SendCursor::new(payload.clone());
        let mut chunks = Vec::with_capacity(self.chunk_count(payload.len()));
        while let Some(chunk) = cursor.next_chunk(self.max_chunk_size) {
            cursor.advance(chunk.len());
            chunks.push(chunk);
        }
        chunks
    }

    /// 페이로드 크기에 필요한 청크 수
    pub fn chunk_count(&self, payload_len: usize) -> usize {
        if self.max_chunk_size == 0 {
            return 0;
        }
        payload_len.div_ceil(self.max_chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_45_bytes() {
        let payload: Bytes = (0..45u8).collect::<Vec<_>>().into();
        let chunks = ChunkSlicer::new(20).split(&payload);

        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![20, 20, 5]);
        assert_eq!(chunks.concat(), payload.to_vec());
    }

    #[test]
    fn test_chunk_bounds() {
        let payload = Bytes::from(vec![7u8; 1000]);
        for max in [1, 3, 20, 244, 999, 1000, 4096] {
            let chunks = ChunkSlicer::new(max).split(&payload);
            assert_eq!(chunks.len(), ChunkSlicer::new(max).chunk_count(1000));
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= max));
        }
    }

    #[test]
    fn test_empty_payload_has_no_chunks() {
        let cursor = SendCursor::new(Bytes::new());
        assert!(cursor.is_complete());
        assert!(cursor.next_chunk(20).is_none());
        assert!(ChunkSlicer::new(20).split(&Bytes::new()).is_empty());
    }

    #[test]
    fn test_cursor_advance() {
        let mut cursor = SendCursor::new(Bytes::from_static(b"hello world"));
        let chunk = cursor.next_chunk(4).unwrap();
        assert_eq!(&chunk[..], b"hell");
        assert_eq!(cursor.offset(), 0);

        cursor.advance(chunk.len());
        assert_eq!(cursor.offset(), 4);
        assert_eq!(cursor.remaining(), 7);

        let chunk = cursor.next_chunk(100).unwrap();
        assert_eq!(&chunk[..], b"o world");
        cursor.advance(chunk.len());
        assert!(cursor.is_complete());
    }
}
