use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{redirect, Proxy, StatusCode};

use super::{AttemptOutcome, Credential, CredentialProber, Target};

// one-shot HTTP Basic-Auth GET against the device root
#[derive(Clone, Debug)]
pub struct HttpBasicProber {
    client: reqwest::Client,
}

impl HttpBasicProber {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .pool_max_idle_per_host(0);
        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn send(&self, target: &Target, credential: &Credential) -> AttemptOutcome {
        let url = format!("http://{}", target.authority());
        let request = self
            .client
            .get(&url)
            .basic_auth(&credential.username, Some(&credential.password));

        match request.send().await {
            Ok(resp) if resp.status() == StatusCode::OK => AttemptOutcome::Accepted,
            Ok(resp) => AttemptOutcome::Rejected {
                status: resp.status().as_u16(),
            },
            Err(e) => {
                tracing::debug!(url = %url, error = ?e, "credential request failed");
                AttemptOutcome::Transport {
                    message: describe_transport_error(&e),
                }
            }
        }
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

impl CredentialProber for HttpBasicProber {
    fn attempt<'a>(
        &'a self,
        target: &'a Target,
        credential: &'a Credential,
    ) -> BoxFuture<'a, AttemptOutcome> {
        self.send(target, credential).boxed()
    }
}
