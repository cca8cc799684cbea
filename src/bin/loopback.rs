//! CTP 루프백 데모 - 메모리 링크 위에서 송신/수신 태스크를 돌려본다
//!
//! 페이로드를 MTU 크기 청크로 보내고, 수신측이 임계값으로 완료 판정한 뒤
//! CRC32로 원본과 비교한다.
//!
//! 사용법:
//!   cargo run --release --bin ctp-loopback -- [OPTIONS]
//!
//! 예시:
//!   # 기본 (5001 bytes, 20 bytes 청크, 임계값 5000)
//!   cargo run --release --bin ctp-loopback
//!
//!   # 파일 전송, BLE 5 청크 크기
//!   cargo run --release --bin ctp-loopback -- -f image.png --chunk-size 244

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::RngCore;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ctp::memory;
use ctp::runtime::spawn_link_pump;
use ctp::{Config, ReceiverHandle, SendReport, SenderHandle};

/// 데모 설정
struct DemoConfig {
    size: usize,
    file_path: Option<PathBuf>,
    threshold: Option<usize>,
    config: Config,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            size: ctp::DEFAULT_COMPLETION_THRESHOLD + 1,
            file_path: None,
            threshold: None,
            config: Config::default(),
        }
    }
}

/// 파일에서 페이로드 읽기
fn load_payload(path: &Path) -> ctp::Result<Bytes> {
    let data = std::fs::read(path)?;
    Ok(Bytes::from(data))
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" | "-s" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    config.size = value;
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if let Some(value) = args.get(i + 1) {
                    config.file_path = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--chunk-size" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    config.config.max_chunk_size = value;
                    i += 1;
                }
            }
            "--threshold" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    config.threshold = Some(value);
                    i += 1;
                }
            }
            "--depth" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    config.config.link_queue_depth = value;
                    i += 1;
                }
            }
            "--interval-ms" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    config.config.connection_interval_ms = value;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"CTP Loopback - Chunk Transfer Protocol 데모

메모리 링크 위에서 송신/수신 태스크로 페이로드를 전송하고 검증

옵션:
  -s, --size <BYTES>      랜덤 페이로드 크기 (기본: 5001)
  -f, --file <PATH>       전송할 파일 경로
  --chunk-size <BYTES>    최대 청크 크기 (기본: 20)
  --threshold <BYTES>     완료 임계값 (기본: 페이로드 크기 - 1)
  --depth <N>             링크 큐 깊이 (기본: 8)
  --interval-ms <MS>      연결 간격 시뮬레이션 (기본: 0)
  -h, --help              이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            other => warn!("알 수 없는 옵션: {}", other),
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let demo = parse_args();

    // 전송할 데이터 준비
    let data = if let Some(path) = &demo.file_path {
        info!("Loading file: {:?}", path);
        load_payload(path)?
    } else {
        info!("Using random data ({} bytes)", demo.size);
        let mut data = vec![0u8; demo.size];
        rand::thread_rng().fill_bytes(&mut data);
        Bytes::from(data)
    };

    let mut config = demo.config.clone().with_expected_len(data.len());
    if let Some(threshold) = demo.threshold {
        config.completion_threshold = threshold;
    }
    config.validate()?;

    if data.len() <= config.completion_threshold {
        warn!(
            "페이로드({} bytes)가 임계값({} bytes) 이하, 완료되지 않음",
            data.len(),
            config.completion_threshold
        );
    }

    info!("Payload size: {} bytes", data.len());
    info!("Chunk size: {} bytes", config.max_chunk_size);
    info!("Completion threshold: {} bytes", config.completion_threshold);
    info!("Link queue depth: {}", config.link_queue_depth);

    let expected_crc = crc32fast::hash(&data);
    let interval = Duration::from_millis(config.connection_interval_ms);

    let (transport, stream) = memory::channel(config.link_queue_depth);
    let (sender, mut reports) = SenderHandle::spawn(config.clone(), transport)?;
    let (receiver, mut payloads) = ReceiverHandle::spawn(config)?;
    let pump = spawn_link_pump(stream, sender.clone(), receiver.clone(), interval);

    let start = Instant::now();
    sender.stage(data.clone()).await?;
    sender.link_ready().await?;

    match reports.recv().await {
        Some(SendReport::Completed { total }) => info!("Sender drained {} bytes", total),
        Some(SendReport::Failed { offset, total }) => {
            warn!("Send failed at {}/{} bytes", offset, total)
        }
        None => warn!("Sender task ended"),
    }

    let received = tokio::time::timeout(Duration::from_secs(30), payloads.recv()).await;
    let elapsed = start.elapsed();

    match received {
        Ok(Some(payload)) => {
            let crc = crc32fast::hash(&payload);
            if crc == expected_crc && payload.len() == data.len() {
                info!("Payload verified: {} bytes, crc32={:08X}", payload.len(), crc);
            } else {
                warn!(
                    "Payload mismatch: {} bytes crc32={:08X}, expected {} bytes crc32={:08X}",
                    payload.len(),
                    crc,
                    data.len(),
                    expected_crc
                );
            }
        }
        Ok(None) => warn!("Receiver task ended"),
        Err(_) => warn!("Timed out, {} bytes pending", receiver.pending_len()),
    }

    info!("  Time: {:.2}s", elapsed.as_secs_f64());
    info!("  Sender: {}", sender.stats().summary());
    info!("  Receiver: {}", receiver.stats().summary());

    sender.stop().await;
    pump.await??;
    receiver.stop().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_payload_missing_file() {
        let path = std::env::temp_dir().join("ctp-loopback-missing-payload.bin");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(load_payload(&path), Err(ctp::Error::Io(_))));
    }

    #[test]
    fn test_load_payload_reads_file() {
        let path = std::env::temp_dir().join(format!("ctp-loopback-{}.bin", std::process::id()));
        std::fs::write(&path, b"payload bytes").unwrap();

        let payload = load_payload(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(payload, Bytes::from_static(b"payload bytes"));
    }
}
