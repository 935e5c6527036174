use crate::transfer::progress::ProgressTracker;
use crate::utils::error::TransferError;
use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

pub const CHUNK_SIZE: usize = 1024 * 1024;

// 分块复制，失败时报告已复制的字节数
pub fn copy_counted<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    progress: &ProgressTracker,
) -> Result<u64, TransferError> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total_transferred = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                progress.finish_with_error(&e.to_string());
                return Err(TransferError::PartialCopy { bytes: total_transferred, source: e });
            }
        };
        if let Err(e) = writer.write_all(&buffer[..bytes_read]) {
            progress.finish_with_error(&e.to_string());
            return Err(TransferError::PartialCopy { bytes: total_transferred, source: e });
        }
        total_transferred += bytes_read as u64;
        progress.update(total_transferred);
    }

    if let Err(e) = writer.flush() {
        progress.finish_with_error(&e.to_string());
        return Err(TransferError::PartialCopy { bytes: total_transferred, source: e });
    }

    progress.finish();
    Ok(total_transferred)
}

/// Reads two non-blocking streams side by side until `eof` reports the
/// producer is done and neither stream has anything left.
pub fn drain_streams<O: Read, E: Read>(
    stdout: &mut O,
    stderr: &mut E,
    eof: impl Fn() -> bool,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut out = Vec::new();
    let mut err = Vec::new();

    loop {
        // eof 先于读取检查，保证结束前至少再读空一轮
        let done = eof();
        let read_out = read_available(stdout, &mut buffer, &mut out)?;
        let read_err = read_available(stderr, &mut buffer, &mut err)?;
        if read_out || read_err {
            continue;
        }
        if done {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    Ok((out, err))
}

fn read_available<R: Read>(reader: &mut R, buffer: &mut [u8], sink: &mut Vec<u8>) -> io::Result<bool> {
    match reader.read(buffer) {
        Ok(0) => Ok(false),
        Ok(n) => {
            sink.extend_from_slice(&buffer[..n]);
            Ok(true)
        }
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Quotes a single word for a POSIX shell command line.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./:=@%+,".contains(&b));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
