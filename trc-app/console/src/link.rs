//! HTTP transport for the chassis API.
//!
//! `ehttp` runs the blocking request on its own thread; completion is handed
//! back to the executor through a `Signal`, so awaiting a request never
//! blocks the panel.

use std::sync::Arc;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use trc_core::utils::{connection::client::LinkResponse, ChassisLink};

type Completion = Signal<CriticalSectionRawMutex, ehttp::Result<ehttp::Response>>;

pub struct HttpLink {
    base_url: String,
}

impl HttpLink {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ChassisLink for HttpLink {
    async fn get(
        &self,
        path: &str,
    ) -> Result<LinkResponse, String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(%url, "GET");

        let done: Arc<Completion> = Arc::new(Signal::new());
        let notify = Arc::clone(&done);
        ehttp::fetch(ehttp::Request::get(url), move |result| notify.signal(result));

        let response = done.wait().await?;
        Ok(LinkResponse {
            ok: response.ok,
            status: response.status,
            status_text: response.status_text,
            body: response.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let link = HttpLink::new("http://10.0.0.2:8080/");
        assert_eq!(link.base_url, "http://10.0.0.2:8080");
    }
}
