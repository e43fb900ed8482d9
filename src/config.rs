use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub port: u16,

    /// IP-echo endpoint probed through each proxy tunnel.
    pub probe_url: String,
    /// Per-probe deadline; the batch itself has no overall deadline.
    pub probe_timeout: Duration,
    /// Upper bound on proxy probes in flight at once.
    pub check_concurrency: usize,
}
