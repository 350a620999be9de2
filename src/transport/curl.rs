//! Production transport backed by the curl crate (blocking Easy handles).

use std::path::Path;
use std::time::Duration;

use curl::easy::{Easy, Form};

use crate::error::TransferError;

use super::{ChunkControl, ChunkSink, FetchStatus, Transport, UploadProgress};

/// Multipart field name expected by the upload endpoint.
const UPLOAD_FIELD: &str = "mFile";

fn net(e: curl::Error) -> TransferError {
    TransferError::Network(e.to_string())
}

/// Curl-backed [`Transport`]. Cheap to construct; every request uses a fresh
/// Easy handle, so one instance can serve any number of worker threads.
#[derive(Debug, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        CurlTransport
    }

    fn easy(&self, url: &str) -> Result<Easy, TransferError> {
        let mut easy = Easy::new();
        easy.url(url).map_err(net)?;
        easy.follow_location(true).map_err(net)?;
        easy.connect_timeout(Duration::from_secs(30)).map_err(net)?;
        // Abort if throughput drops below 1 KiB/s for 60s; a stalled
        // connection must not pin a worker thread forever.
        easy.low_speed_limit(1024).map_err(net)?;
        easy.low_speed_time(Duration::from_secs(60)).map_err(net)?;
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn probe(&self, url: &str) -> Result<Option<u64>, TransferError> {
        let probe_err = |e: curl::Error| TransferError::Probe(e.to_string());

        let mut easy = Easy::new();
        easy.url(url).map_err(probe_err)?;
        easy.nobody(true).map_err(probe_err)?; // HEAD request
        easy.follow_location(true).map_err(probe_err)?;
        easy.connect_timeout(Duration::from_secs(15)).map_err(probe_err)?;
        easy.timeout(Duration::from_secs(30)).map_err(probe_err)?;
        easy.perform().map_err(probe_err)?;

        let code = easy.response_code().map_err(probe_err)?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Probe(format!("HEAD {} returned HTTP {}", url, code)));
        }

        let length = easy.content_length_download().map_err(probe_err)?;
        if length <= 0.0 {
            return Ok(None);
        }
        Ok(Some(length as u64))
    }

    fn fetch_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        sink: &mut ChunkSink<'_>,
    ) -> Result<FetchStatus, TransferError> {
        let mut easy = self.easy(url)?;
        easy.range(&format!("{}-{}", start, end)).map_err(net)?;

        let mut interrupted = false;
        let mut sink_error: Option<std::io::Error> = None;
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink(data) {
                    Ok(ChunkControl::Continue) => Ok(data.len()),
                    Ok(ChunkControl::Stop) => {
                        interrupted = true;
                        Ok(0)
                    }
                    Err(e) => {
                        sink_error = Some(e);
                        Ok(0)
                    }
                })
                .map_err(net)?;
            transfer.perform()
        };
        if let Err(e) = perform_result {
            // Returning 0 from write_function surfaces as a write error;
            // recover the real cause from the side channel.
            if e.is_write_error() {
                if interrupted {
                    return Ok(FetchStatus::Interrupted);
                }
                if let Some(io_err) = sink_error {
                    return Err(TransferError::Storage(io_err));
                }
            }
            return Err(net(e));
        }

        let code = easy.response_code().map_err(net)?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        Ok(FetchStatus::Completed)
    }

    fn upload(
        &self,
        url: &str,
        file: &Path,
        progress: &mut UploadProgress<'_>,
    ) -> Result<FetchStatus, TransferError> {
        let file_len = std::fs::metadata(file)
            .map_err(TransferError::Storage)?
            .len();

        let mut form = Form::new();
        form.part(UPLOAD_FIELD)
            .file(file)
            .content_type("application/octet-stream")
            .add()
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let mut easy = self.easy(url)?;
        easy.httppost(form).map_err(net)?;
        easy.progress(true).map_err(net)?;

        let mut interrupted = false;
        let mut last_sent = 0u64;
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .progress_function(|_dltotal, _dlnow, ultotal, ulnow| {
                    let total = if ultotal > 0.0 { ultotal as u64 } else { file_len };
                    let now = ulnow as u64;
                    let delta = now.saturating_sub(last_sent);
                    last_sent = now;
                    if progress(delta, total) == ChunkControl::Stop {
                        interrupted = true;
                        return false;
                    }
                    true
                })
                .map_err(net)?;
            transfer.perform()
        };
        if let Err(e) = perform_result {
            if e.is_aborted_by_callback() && interrupted {
                return Ok(FetchStatus::Interrupted);
            }
            return Err(net(e));
        }

        let code = easy.response_code().map_err(net)?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        Ok(FetchStatus::Completed)
    }
}
